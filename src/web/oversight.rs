use crate::domain::{Difficulty, PaperStatus, QuestionPaper, Role, User};
use crate::state::SharedState;
use crate::store::{Applied, Store, StoreAction, StoreError, OVERRIDE_REJECT_FEEDBACK};
use crate::web::review;
use crate::web::session::{self, UserSession};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct UserUpsertRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Serialize)]
pub struct OversightOverview {
    pub stats: SystemStats,
    pub activity: Vec<ActivityBucket>,
    pub difficulty: Vec<DifficultySlice>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_papers: usize,
    pub pending_reviews: usize,
    pub active_faculties: usize,
    pub total_questions: usize,
}

#[derive(Serialize)]
pub struct ActivityBucket {
    pub name: String,
    pub papers: usize,
}

#[derive(Serialize)]
pub struct DifficultySlice {
    pub name: String,
    pub value: usize,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/overview", get(overview))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route("/papers", get(list_papers))
        .route("/papers/:id/approve", post(override_approve))
        .route("/papers/:id/reject", post(override_reject))
        .with_state(state)
}

pub(crate) async fn overview_payload(store: &Store) -> OversightOverview {
    let papers = store.papers().await;
    let users = store.users().await;
    OversightOverview {
        stats: system_stats(&papers, &users),
        activity: weekly_activity(&papers, Utc::now().date_naive()),
        difficulty: difficulty_distribution(&papers),
    }
}

async fn overview(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<OversightOverview>, StatusCode> {
    session::require_role(&state, user_id, Role::SuperAdmin).await?;
    Ok(Json(overview_payload(&state.store).await))
}

async fn list_users(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<Vec<User>>, StatusCode> {
    session::require_role(&state, user_id, Role::SuperAdmin).await?;
    Ok(Json(state.store.users().await))
}

async fn create_user(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Json(payload): Json<UserUpsertRequest>,
) -> Result<Json<User>, StatusCode> {
    let actor = session::require_role(&state, user_id, Role::SuperAdmin).await?;
    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let applied = state
        .store
        .apply(StoreAction::AddUser {
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_string(),
            role: payload.role.unwrap_or(Role::Faculty),
        })
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let Applied::User(user) = applied else {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    tracing::info!("super admin {} added user {}", actor.id, user.email);
    Ok(Json(user))
}

async fn update_user(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpsertRequest>,
) -> Result<Json<User>, StatusCode> {
    session::require_role(&state, user_id, Role::SuperAdmin).await?;
    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // An omitted role keeps the one on file.
    let existing = state.store.user(id).await.ok_or(StatusCode::NOT_FOUND)?;
    let applied = state
        .store
        .apply(StoreAction::UpdateUser {
            id,
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_string(),
            role: payload.role.unwrap_or(existing.role),
        })
        .await
        .map_err(store_status)?;
    let Applied::User(user) = applied else {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    Ok(Json(user))
}

async fn delete_user(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<OkResponse>, StatusCode> {
    let actor = session::require_role(&state, user_id, Role::SuperAdmin).await?;
    if !params.confirm {
        return Err(StatusCode::BAD_REQUEST);
    }

    state
        .store
        .apply(StoreAction::RemoveUser { id })
        .await
        .map_err(store_status)?;

    tracing::info!("super admin {} removed user {}", actor.id, id);
    Ok(Json(OkResponse { ok: true }))
}

async fn list_papers(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<Vec<QuestionPaper>>, StatusCode> {
    session::require_role(&state, user_id, Role::SuperAdmin).await?;
    Ok(Json(state.store.papers().await))
}

async fn override_approve(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Path(id): Path<Uuid>,
) -> Result<Json<QuestionPaper>, StatusCode> {
    let actor = session::require_role(&state, user_id, Role::SuperAdmin).await?;
    let paper = review::set_status(&state.store, id, PaperStatus::Approved, None).await?;
    tracing::info!("super admin {} override-approved '{}'", actor.id, paper.title);
    Ok(Json(paper))
}

async fn override_reject(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Path(id): Path<Uuid>,
) -> Result<Json<QuestionPaper>, StatusCode> {
    let actor = session::require_role(&state, user_id, Role::SuperAdmin).await?;
    let paper = review::set_status(
        &state.store,
        id,
        PaperStatus::Rejected,
        Some(OVERRIDE_REJECT_FEEDBACK.to_string()),
    )
    .await?;
    tracing::info!("super admin {} override-rejected '{}'", actor.id, paper.title);
    Ok(Json(paper))
}

fn store_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::UnknownPaper(_) | StoreError::UnknownUser(_) => StatusCode::NOT_FOUND,
    }
}

fn system_stats(papers: &[QuestionPaper], users: &[User]) -> SystemStats {
    SystemStats {
        total_papers: papers.len(),
        pending_reviews: papers
            .iter()
            .filter(|p| p.status == PaperStatus::Pending)
            .count(),
        active_faculties: users.iter().filter(|u| u.role == Role::Faculty).count(),
        total_questions: papers.iter().map(|p| p.questions.len()).sum(),
    }
}

/// Papers created per calendar day over the trailing week, oldest bucket
/// first and today last, labelled with weekday abbreviations.
fn weekly_activity(papers: &[QuestionPaper], today: NaiveDate) -> Vec<ActivityBucket> {
    (0..7)
        .map(|i| {
            let date = today - chrono::Duration::days(6 - i);
            let count = papers
                .iter()
                .filter(|p| p.created_at.date_naive() == date)
                .count();
            ActivityBucket {
                name: date.format("%a").to_string(),
                papers: count,
            }
        })
        .collect()
}

/// Question counts per difficulty across every paper; empty slices are
/// dropped so charts render without zero wedges.
fn difficulty_distribution(papers: &[QuestionPaper]) -> Vec<DifficultySlice> {
    let mut easy = 0usize;
    let mut medium = 0usize;
    let mut hard = 0usize;
    for paper in papers {
        for question in &paper.questions {
            match question.difficulty {
                Difficulty::Easy => easy += 1,
                Difficulty::Medium => medium += 1,
                Difficulty::Hard => hard += 1,
            }
        }
    }
    [("Easy", easy), ("Medium", medium), ("Hard", hard)]
        .into_iter()
        .filter(|(_, value)| *value > 0)
        .map(|(name, value)| DifficultySlice {
            name: name.to_string(),
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::demo::seed_users;
    use crate::domain::{Question, QuestionType};

    fn paper_on(date: NaiveDate, difficulties: &[Difficulty]) -> QuestionPaper {
        let questions = difficulties
            .iter()
            .map(|d| Question {
                id: Uuid::new_v4(),
                text: "Sample".to_string(),
                question_type: QuestionType::Mcq,
                options: Some(vec!["A".into(), "B".into()]),
                correct_answer: Some("A".into()),
                marks: 1,
                difficulty: *d,
            })
            .collect();
        QuestionPaper {
            id: Uuid::new_v4(),
            title: "Synthetic".to_string(),
            subject: "Testing".to_string(),
            faculty_id: Uuid::new_v4(),
            faculty_name: "Dr. Smith".to_string(),
            status: PaperStatus::Pending,
            created_at: date.and_hms_opt(12, 0, 0).unwrap().and_utc(),
            questions,
            feedback: None,
            university_name: None,
            exam_date: None,
            max_marks: None,
            enrollment_code: None,
            instructions: None,
            format_file: None,
            template_id: None,
        }
    }

    #[tokio::test]
    async fn stats_reflect_the_seeded_demo_set() {
        let store = Store::new();
        store.seed_demo(&seed_users()).await;

        let overview = overview_payload(&store).await;
        assert_eq!(overview.stats.total_papers, 2);
        assert_eq!(overview.stats.pending_reviews, 1);
        assert_eq!(overview.stats.active_faculties, 1);
        assert_eq!(overview.stats.total_questions, 18);
    }

    #[test]
    fn activity_buckets_cover_the_trailing_week() {
        // 2024-03-10 is a Sunday.
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let papers = vec![
            paper_on(today, &[Difficulty::Easy]),
            paper_on(today, &[Difficulty::Easy]),
            paper_on(today - chrono::Duration::days(1), &[Difficulty::Hard]),
            paper_on(today - chrono::Duration::days(7), &[Difficulty::Hard]),
        ];

        let buckets = weekly_activity(&papers, today);
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].name, "Mon");
        assert_eq!(buckets[6].name, "Sun");
        assert_eq!(buckets[6].papers, 2);
        assert_eq!(buckets[5].papers, 1);
        let total: usize = buckets.iter().map(|b| b.papers).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn delete_confirmation_defaults_to_false() {
        let params: DeleteParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!params.confirm);
        let params: DeleteParams =
            serde_json::from_value(serde_json::json!({ "confirm": true })).unwrap();
        assert!(params.confirm);
    }

    #[tokio::test]
    async fn override_reject_of_an_approved_paper_is_visible_everywhere() {
        let store = Store::new();
        store.seed_demo(&seed_users()).await;
        let approved = store.papers_by_status(PaperStatus::Approved).await[0].clone();

        let paper = review::set_status(
            &store,
            approved.id,
            PaperStatus::Rejected,
            Some(OVERRIDE_REJECT_FEEDBACK.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(paper.status, PaperStatus::Rejected);
        assert_eq!(
            paper.feedback.as_deref(),
            Some("Rejected by Super Admin Override")
        );

        assert!(store.papers_by_status(PaperStatus::Approved).await.is_empty());
        assert_eq!(store.papers_by_status(PaperStatus::Rejected).await.len(), 1);
        assert_eq!(overview_payload(&store).await.stats.pending_reviews, 1);
    }

    #[tokio::test]
    async fn declining_delete_confirmation_leaves_users_unchanged() {
        let state = crate::state::demo_state().await;
        let actor = state
            .store
            .user_by_email("super@qgenius.com")
            .await
            .unwrap();
        state
            .identities
            .write()
            .await
            .insert(actor.id, actor.clone());
        let target = state
            .store
            .user_by_email("faculty@qgenius.com")
            .await
            .unwrap()
            .id;

        let declined = delete_user(
            State(state.clone()),
            UserSession(actor.id),
            Path(target),
            Query(DeleteParams { confirm: false }),
        )
        .await;
        assert!(matches!(declined, Err(StatusCode::BAD_REQUEST)));
        assert!(state.store.user(target).await.is_some());

        let confirmed = delete_user(
            State(state.clone()),
            UserSession(actor.id),
            Path(target),
            Query(DeleteParams { confirm: true }),
        )
        .await;
        assert!(confirmed.is_ok());
        assert!(state.store.user(target).await.is_none());
    }

    #[test]
    fn difficulty_distribution_drops_empty_slices() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let papers = vec![paper_on(
            today,
            &[Difficulty::Easy, Difficulty::Easy, Difficulty::Medium],
        )];

        let slices = difficulty_distribution(&papers);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].name, "Easy");
        assert_eq!(slices[0].value, 2);
        assert_eq!(slices[1].name, "Medium");

        assert!(difficulty_distribution(&[]).is_empty());
    }
}
