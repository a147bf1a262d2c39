use crate::domain::Role;
use crate::state::SharedState;
use crate::web::faculty::{self, FacultyHome};
use crate::web::oversight::{self, OversightOverview};
use crate::web::review::{self, ReviewQueue};
use crate::web::session::{self, UserSession};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

/// One workflow root per role, tagged so clients can dispatch without
/// string-matching anything else in the payload.
#[derive(Serialize)]
#[serde(tag = "role")]
pub enum DashboardPayload {
    #[serde(rename = "FACULTY")]
    Faculty { home: FacultyHome },
    #[serde(rename = "ADMIN")]
    Admin { queue: ReviewQueue },
    #[serde(rename = "SUPER_ADMIN")]
    SuperAdmin { overview: OversightOverview },
}

pub fn router(state: SharedState) -> Router {
    Router::new().route("/", get(dashboard)).with_state(state)
}

async fn dashboard(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<DashboardPayload>, StatusCode> {
    let user = session::current_user(&state, user_id)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let payload = match user.role {
        Role::Faculty => DashboardPayload::Faculty {
            home: faculty::home_payload(&state, &user).await,
        },
        Role::Admin => DashboardPayload::Admin {
            queue: review::queue_payload(&state.store).await,
        },
        Role::SuperAdmin => DashboardPayload::SuperAdmin {
            overview: oversight::overview_payload(&state.store).await,
        },
    };
    Ok(Json(payload))
}
