use crate::services::retry::RetryPolicy;
use anyhow::{anyhow, Result};
use serde_json::json;
use tokio::time::Duration;

/// Welcome-mail sender over the server-side mail function. Without a
/// configured endpoint the message is logged instead of sent, which keeps
/// signup working in demo installs.
#[derive(Clone)]
pub struct MailService {
    http: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl MailService {
    pub fn new(api_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            retry: RetryPolicy::new(2, Duration::from_millis(500)),
        }
    }

    /// Mail failures are logged and swallowed; signup never fails because
    /// the mail collaborator is down.
    pub async fn send_welcome(&self, name: &str, email: &str) {
        let body = welcome_body(name);

        let Some(url) = &self.api_url else {
            tracing::info!("mail service not configured, welcome email for {email} logged only");
            tracing::debug!("welcome email body:\n{body}");
            return;
        };

        let result: Result<()> = self
            .retry
            .run(|| {
                let request = self
                    .http
                    .post(url)
                    .json(&json!({
                        "to": email,
                        "subject": "Welcome to Q-Genius",
                        "text": body,
                    }));
                let request = match &self.api_key {
                    Some(key) => request.bearer_auth(key),
                    None => request,
                };
                async move {
                    request
                        .send()
                        .await
                        .map_err(|e| anyhow!("mail request failed: {e}"))?
                        .error_for_status()
                        .map_err(|e| anyhow!("mail endpoint error: {e}"))?;
                    Ok(())
                }
            })
            .await;

        match result {
            Ok(()) => tracing::info!("welcome email sent to {email}"),
            Err(err) => tracing::error!("welcome email to {email} failed: {err}"),
        }
    }
}

fn welcome_body(name: &str) -> String {
    format!(
        r#"Welcome to Q-Genius a Sustainable AI-based Question Paper Generator for inclusive learning, {name}!

Hi {name},

Welcome to the Q-Genius family! We're thrilled to have you.

You're all set to start our app to create Question paper within its given time period.
Log in now and get started.

If you have any questions, just reply to this email, we're here to help!

Happy Creating!

Cheers,
The Q-Genius Team"#
    )
}
