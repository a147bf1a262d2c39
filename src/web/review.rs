use crate::domain::{PaperStatus, QuestionPaper, Role};
use crate::state::SharedState;
use crate::store::{Applied, Store, StoreAction, StoreError, DEFAULT_REJECT_FEEDBACK};
use crate::web::session::{self, UserSession};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Serialize)]
pub struct ReviewQueue {
    pub pending: Vec<QuestionPaper>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/queue", get(queue))
        .route("/papers/:id", get(paper_detail))
        .route("/papers/:id/approve", post(approve))
        .route("/papers/:id/reject", post(reject))
        .with_state(state)
}

pub(crate) async fn queue_payload(store: &Store) -> ReviewQueue {
    ReviewQueue {
        pending: store.papers_by_status(PaperStatus::Pending).await,
    }
}

async fn queue(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<ReviewQueue>, StatusCode> {
    session::require_role(&state, user_id, Role::Admin).await?;
    Ok(Json(queue_payload(&state.store).await))
}

async fn paper_detail(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Path(id): Path<Uuid>,
) -> Result<Json<QuestionPaper>, StatusCode> {
    session::require_role(&state, user_id, Role::Admin).await?;
    state
        .store
        .paper(id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn approve(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Path(id): Path<Uuid>,
) -> Result<Json<QuestionPaper>, StatusCode> {
    let admin = session::require_role(&state, user_id, Role::Admin).await?;
    let paper = set_status(&state.store, id, PaperStatus::Approved, None).await?;
    tracing::info!("admin {} approved '{}'", admin.id, paper.title);
    Ok(Json(paper))
}

async fn reject(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<QuestionPaper>, StatusCode> {
    let admin = session::require_role(&state, user_id, Role::Admin).await?;
    let feedback = rejection_feedback(payload.feedback);
    let paper = set_status(&state.store, id, PaperStatus::Rejected, Some(feedback)).await?;
    tracing::info!("admin {} rejected '{}'", admin.id, paper.title);
    Ok(Json(paper))
}

pub(crate) async fn set_status(
    store: &Store,
    id: Uuid,
    status: PaperStatus,
    feedback: Option<String>,
) -> Result<QuestionPaper, StatusCode> {
    let applied = store
        .apply(StoreAction::SetPaperStatus {
            id,
            status,
            feedback,
        })
        .await
        .map_err(|e| match e {
            StoreError::UnknownPaper(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        })?;
    match applied {
        Applied::Paper(paper) => Ok(paper),
        _ => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// A rejection without any feedback text records the stock note.
fn rejection_feedback(feedback: Option<String>) -> String {
    feedback
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| DEFAULT_REJECT_FEEDBACK.to_string())
}
