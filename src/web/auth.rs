use crate::auth::AuthError;
use crate::domain::{Role, User};
use crate::state::SharedState;
use crate::web::session::{self, UserSession};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Deserialize)]
pub struct OauthRequest {
    pub provider: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ConfigResponse {
    pub configured: bool,
    pub demo_mode: bool,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/oauth", post(oauth))
        .route("/session", get(current_session))
        .route("/logout", post(logout))
        .with_state(state)
}

async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if payload.email.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = state
        .auth
        .sign_in(&payload.email, &payload.password)
        .await
        .map_err(auth_status)?;

    establish_session(&state, user).await
}

async fn signup(
    State(state): State<SharedState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if payload.email.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let role = payload.role.unwrap_or(Role::Faculty);

    let user = state
        .auth
        .sign_up(&payload.email, &payload.password, payload.name.trim(), role)
        .await
        .map_err(auth_status)?;

    // Send failures are logged inside the mailer; signup never blocks on mail.
    state.mailer.send_welcome(&user.name, &user.email).await;

    establish_session(&state, user).await
}

async fn oauth(
    State(state): State<SharedState>,
    Json(payload): Json<OauthRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = state
        .auth
        .oauth_sign_in(&payload.provider)
        .await
        .map_err(auth_status)?;

    establish_session(&state, user).await
}

async fn current_session(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<UserEnvelope>, StatusCode> {
    let user = session::current_user(&state, user_id)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Json(UserEnvelope { user }))
}

async fn logout(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<impl IntoResponse, StatusCode> {
    state.identities.write().await.remove(&user_id);
    state.drafts.write().await.remove(&user_id);
    tracing::info!("user {} signed out", user_id);

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        "session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
            .parse()
            .unwrap(),
    );
    Ok((headers, Json(OkResponse { ok: true })))
}

pub async fn config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        configured: !state.demo_mode,
        demo_mode: state.demo_mode,
    })
}

async fn establish_session(
    state: &SharedState,
    user: User,
) -> Result<(HeaderMap, Json<SessionResponse>), StatusCode> {
    let token = session::sign_session(user.id, user.role, &state.session_key)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    state.identities.write().await.insert(user.id, user.clone());

    // SECURITY: Use Secure flag in production (HTTPS only)
    let is_production = std::env::var("RAILWAY_ENVIRONMENT").is_ok()
        || std::env::var("RENDER").is_ok()
        || std::env::var("FLY_APP_NAME").is_ok()
        || std::env::var("PRODUCTION").is_ok();

    let secure_flag = if is_production { "; Secure" } else { "" };

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        format!(
            "session={token}; HttpOnly; SameSite=Lax; Path={}{}",
            "/", secure_flag
        )
        .parse()
        .unwrap(),
    );

    tracing::info!("user {} signed in as {}", user.id, user.role.as_str());

    Ok((headers, Json(SessionResponse { token, user })))
}

fn auth_status(err: AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Unavailable(ref msg) => {
            tracing::error!("auth backend unavailable: {msg}");
            StatusCode::BAD_GATEWAY
        }
        AuthError::Rejected(ref msg) => {
            tracing::error!("auth backend rejected request: {msg}");
            StatusCode::BAD_GATEWAY
        }
    }
}
