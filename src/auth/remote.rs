use super::{AuthBackend, AuthError};
use crate::domain::{Role, User};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

/// Per-request ceiling so an unreachable collaborator degrades to an
/// auth failure instead of hanging the handler.
const REMOTE_WAIT: Duration = Duration::from_secs(5);

/// GoTrue-style auth collaborator reached over HTTPS.
pub struct RemoteBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RemoteBackend {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn post_session(&self, path: &str, body: Value) -> Result<User, AuthError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .timeout(REMOTE_WAIT)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthError::Unavailable(format!("{url} returned {status}")));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| AuthError::Rejected(e.to_string()))?;
        user_from_session(&payload)
    }
}

#[async_trait]
impl AuthBackend for RemoteBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.post_session(
            "/auth/v1/token?grant_type=password",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        self.post_session(
            "/auth/v1/signup",
            json!({
                "email": email,
                "password": password,
                "data": { "full_name": name, "role": role.as_str() },
            }),
        )
        .await
    }

    async fn oauth_sign_in(&self, provider: &str) -> Result<User, AuthError> {
        // The provider handshake is a browser redirect dance this JSON
        // surface cannot drive end to end.
        Err(AuthError::Rejected(format!(
            "{provider} sign-in requires the hosted redirect flow"
        )))
    }
}

/// Maps a session payload onto a local identity. The user object may sit
/// under `user` or at the top level depending on the endpoint; the display
/// name falls back to the email local-part, then `"User"`, and any absent
/// or unknown role claim reads as FACULTY.
fn user_from_session(payload: &Value) -> Result<User, AuthError> {
    let user = payload.get("user").unwrap_or(payload);
    let email = user
        .get("email")
        .and_then(Value::as_str)
        .ok_or_else(|| AuthError::Rejected("session payload has no email".into()))?;

    let metadata = user.get("user_metadata").cloned().unwrap_or(Value::Null);
    let name = metadata
        .get("full_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| {
            email
                .split('@')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "User".to_string());
    let role = metadata
        .get("role")
        .and_then(Value::as_str)
        .and_then(|s| Role::try_from(s).ok())
        .unwrap_or(Role::Faculty);

    let id = user
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    Ok(User {
        id,
        email: email.to_string(),
        name,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_full_metadata() {
        let payload = json!({
            "access_token": "abc",
            "user": {
                "id": "9f6f1c52-6f0e-4f0a-9e21-3b1c9a40b6d7",
                "email": "prof@uni.edu",
                "user_metadata": { "full_name": "Prof Example", "role": "ADMIN" },
            },
        });
        let user = user_from_session(&payload).unwrap();
        assert_eq!(user.name, "Prof Example");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(
            user.id,
            Uuid::parse_str("9f6f1c52-6f0e-4f0a-9e21-3b1c9a40b6d7").unwrap()
        );
    }

    #[test]
    fn missing_name_falls_back_to_email_local_part() {
        let payload = json!({ "user": { "id": "x", "email": "dr.jones@uni.edu" } });
        let user = user_from_session(&payload).unwrap();
        assert_eq!(user.name, "dr.jones");
        assert_eq!(user.role, Role::Faculty);
    }

    #[test]
    fn blank_name_claim_falls_back_to_email() {
        let payload = json!({
            "user": { "email": "x@y.z", "user_metadata": { "full_name": "  " } },
        });
        assert_eq!(user_from_session(&payload).unwrap().name, "x");
    }

    #[test]
    fn unknown_role_claim_reads_as_faculty() {
        let payload = json!({
            "user": {
                "email": "a@b.c",
                "user_metadata": { "role": "WIZARD" },
            },
        });
        assert_eq!(user_from_session(&payload).unwrap().role, Role::Faculty);
    }

    #[test]
    fn top_level_user_object_is_accepted() {
        let payload = json!({ "email": "solo@uni.edu" });
        assert_eq!(user_from_session(&payload).unwrap().email, "solo@uni.edu");
    }

    #[test]
    fn missing_email_is_rejected() {
        let payload = json!({ "user": { "id": "1" } });
        assert!(matches!(
            user_from_session(&payload),
            Err(AuthError::Rejected(_))
        ));
    }
}
