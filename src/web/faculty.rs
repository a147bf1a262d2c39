use crate::domain::{PaperStatus, PaperTemplate, Question, QuestionPaper, Role, User};
use crate::services::extract::ExtractError;
use crate::state::{DraftSession, SharedState};
use crate::store::{Applied, StoreAction};
use crate::web::session::{self, UserSession};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Curriculum and scan uploads are capped the way the upload forms cap them.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_QUESTION_COUNT: usize = 10;
const DEFAULT_MAX_MARKS: u32 = 50;
pub const DEFAULT_EXPORT_NAME: &str = "QuestionPaper.pdf";

const CURRICULUM_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];
const SCAN_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png"];
const TEMPLATE_EXTENSIONS: &[&str] = &["doc", "docx", "xls", "xlsx", "pdf"];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub university_name: Option<String>,
    #[serde(default)]
    pub exam_date: Option<String>,
    #[serde(default)]
    pub max_marks: Option<u32>,
    #[serde(default)]
    pub enrollment_code: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub question_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSelectRequest {
    pub template_id: Uuid,
}

#[derive(Serialize)]
pub struct FacultyHome {
    pub user: User,
    pub templates: Vec<PaperTemplate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReview {
    pub questions: Vec<Question>,
    pub selected: Vec<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateChoice {
    pub template: PaperTemplate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<QuestionPaper>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDescriptor {
    pub file_name: String,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/home", get(home))
        .route("/papers/generate", post(generate_paper))
        .route("/papers/curriculum", post(curriculum_paper))
        .route("/papers/extract", post(extract_questions))
        .route("/papers/extract/toggle", post(toggle_question))
        .route("/papers/extract/cancel", post(cancel_extraction))
        .route("/papers/import", post(import_selection))
        .route("/editor", get(editor))
        .route("/editor/template", post(select_template))
        .route("/editor/export", post(export_paper))
        .route("/editor/submit", post(submit_paper))
        .route("/templates", post(upload_template))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub(crate) async fn home_payload(state: &SharedState, user: &User) -> FacultyHome {
    FacultyHome {
        user: user.clone(),
        templates: state.store.templates().await,
    }
}

async fn home(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<FacultyHome>, StatusCode> {
    let user = session::require_role(&state, user_id, Role::Faculty).await?;
    Ok(Json(home_payload(&state, &user).await))
}

async fn generate_paper(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<QuestionPaper>, StatusCode> {
    let user = session::require_role(&state, user_id, Role::Faculty).await?;
    if payload.prompt.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let subject = payload.subject.unwrap_or_default();
    let generation_subject = if subject.is_empty() {
        "General"
    } else {
        subject.as_str()
    };
    let count = payload.count.unwrap_or(DEFAULT_QUESTION_COUNT);
    if count == 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let questions = state
        .generator
        .generate_from_prompt(&payload.prompt, count, generation_subject)
        .await;

    let mut drafts = state.drafts.write().await;
    let draft_session = drafts.entry(user_id).or_default();
    let mut paper = new_draft(
        &user,
        draft_session,
        generated_title(&subject),
        subject,
        questions,
    );
    paper.university_name = non_blank(payload.university_name);
    paper.exam_date = non_blank(payload.exam_date);
    paper.max_marks = Some(payload.max_marks.unwrap_or(DEFAULT_MAX_MARKS));
    paper.enrollment_code = non_blank(payload.enrollment_code);
    paper.instructions = non_blank(payload.instructions);
    draft_session.draft = Some(paper.clone());

    tracing::info!("faculty {} drafted '{}' from prompt", user.id, paper.title);
    Ok(Json(paper))
}

async fn curriculum_paper(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    multipart: Multipart,
) -> Result<Json<QuestionPaper>, StatusCode> {
    let user = session::require_role(&state, user_id, Role::Faculty).await?;
    let (file_name, bytes) = read_upload(multipart).await?;
    if !has_extension(&file_name, CURRICULUM_EXTENSIONS) {
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    let text = state.extractor.curriculum_text(&file_name, bytes).await;
    let questions = state.generator.generate_from_curriculum(&text).await;

    let mut drafts = state.drafts.write().await;
    let draft_session = drafts.entry(user_id).or_default();
    let paper = new_draft(
        &user,
        draft_session,
        generated_title(""),
        String::new(),
        questions,
    );
    draft_session.draft = Some(paper.clone());

    tracing::info!("faculty {} drafted a paper from {}", user.id, file_name);
    Ok(Json(paper))
}

async fn extract_questions(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    multipart: Multipart,
) -> Result<Json<ExtractionReview>, StatusCode> {
    let user = session::require_role(&state, user_id, Role::Faculty).await?;
    let (file_name, bytes) = read_upload(multipart).await?;
    if !has_extension(&file_name, SCAN_EXTENSIONS) {
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    // A fresh upload always discards the previous staging buffer, even if
    // this extraction then fails.
    {
        let mut drafts = state.drafts.write().await;
        let draft_session = drafts.entry(user_id).or_default();
        draft_session.staged.clear();
        draft_session.selected.clear();
    }

    let text = state
        .extractor
        .extract(&file_name, bytes)
        .await
        .map_err(extract_status)?;
    let questions = state.generator.parse_questions_from_text(&text).await;

    let mut drafts = state.drafts.write().await;
    let draft_session = drafts.entry(user_id).or_default();
    draft_session.staged = questions.clone();
    draft_session.selected = questions.iter().map(|q| q.id).collect();

    tracing::info!(
        "faculty {} staged {} questions from {}",
        user.id,
        questions.len(),
        file_name
    );
    Ok(Json(ExtractionReview {
        selected: ordered_selection(draft_session),
        questions,
    }))
}

async fn toggle_question(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<ExtractionReview>, StatusCode> {
    session::require_role(&state, user_id, Role::Faculty).await?;

    let mut drafts = state.drafts.write().await;
    let draft_session = drafts.get_mut(&user_id).ok_or(StatusCode::CONFLICT)?;
    if draft_session.staged.is_empty() {
        return Err(StatusCode::CONFLICT);
    }
    if !draft_session
        .staged
        .iter()
        .any(|q| q.id == payload.question_id)
    {
        return Err(StatusCode::NOT_FOUND);
    }

    if !draft_session.selected.remove(&payload.question_id) {
        draft_session.selected.insert(payload.question_id);
    }

    Ok(Json(ExtractionReview {
        questions: draft_session.staged.clone(),
        selected: ordered_selection(draft_session),
    }))
}

async fn cancel_extraction(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<OkResponse>, StatusCode> {
    session::require_role(&state, user_id, Role::Faculty).await?;

    let mut drafts = state.drafts.write().await;
    if let Some(draft_session) = drafts.get_mut(&user_id) {
        draft_session.staged.clear();
        draft_session.selected.clear();
    }
    Ok(Json(OkResponse { ok: true }))
}

async fn import_selection(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<QuestionPaper>, StatusCode> {
    let user = session::require_role(&state, user_id, Role::Faculty).await?;

    let mut drafts = state.drafts.write().await;
    let draft_session = drafts.entry(user_id).or_default();
    let selected = selection_to_import(draft_session);
    if selected.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let title = format!("Imported Paper - {}", Utc::now().format("%-m/%-d/%Y"));
    let paper = new_draft(&user, draft_session, title, "Imported".to_string(), selected);
    draft_session.draft = Some(paper.clone());

    tracing::info!(
        "faculty {} imported {} staged questions",
        user.id,
        paper.questions.len()
    );
    Ok(Json(paper))
}

async fn editor(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<QuestionPaper>, StatusCode> {
    session::require_role(&state, user_id, Role::Faculty).await?;

    let drafts = state.drafts.read().await;
    drafts
        .get(&user_id)
        .and_then(|s| s.draft.clone())
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn select_template(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    Json(payload): Json<TemplateSelectRequest>,
) -> Result<Json<TemplateChoice>, StatusCode> {
    session::require_role(&state, user_id, Role::Faculty).await?;
    let template = state
        .store
        .template(payload.template_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let mut drafts = state.drafts.write().await;
    let draft_session = drafts.entry(user_id).or_default();
    apply_template(draft_session, &template);

    Ok(Json(TemplateChoice {
        draft: draft_session.draft.clone(),
        template,
    }))
}

async fn upload_template(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
    multipart: Multipart,
) -> Result<Json<TemplateChoice>, StatusCode> {
    let user = session::require_role(&state, user_id, Role::Faculty).await?;
    let (file_name, _bytes) = read_upload(multipart).await?;
    if !has_extension(&file_name, TEMPLATE_EXTENSIONS) {
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    let template = PaperTemplate::from_upload(&file_name, Utc::now().date_naive());
    let applied = state
        .store
        .apply(StoreAction::AddTemplate(template))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let Applied::Template(template) = applied else {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    // An uploaded format is selected immediately, like picking it from the
    // saved list.
    let mut drafts = state.drafts.write().await;
    let draft_session = drafts.entry(user_id).or_default();
    apply_template(draft_session, &template);

    tracing::info!("faculty {} saved template {}", user.id, template.name);
    Ok(Json(TemplateChoice {
        draft: draft_session.draft.clone(),
        template,
    }))
}

async fn export_paper(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<ExportDescriptor>, StatusCode> {
    session::require_role(&state, user_id, Role::Faculty).await?;

    let template_id = {
        let drafts = state.drafts.read().await;
        let draft_session = drafts.get(&user_id).ok_or(StatusCode::CONFLICT)?;
        let draft = draft_session.draft.as_ref().ok_or(StatusCode::CONFLICT)?;
        draft.template_id
    };

    let file_name = match template_id {
        Some(id) => state
            .store
            .template(id)
            .await
            .map(|t| t.name)
            .unwrap_or_else(|| DEFAULT_EXPORT_NAME.to_string()),
        None => DEFAULT_EXPORT_NAME.to_string(),
    };

    Ok(Json(ExportDescriptor { file_name }))
}

async fn submit_paper(
    State(state): State<SharedState>,
    UserSession(user_id): UserSession,
) -> Result<Json<QuestionPaper>, StatusCode> {
    let user = session::require_role(&state, user_id, Role::Faculty).await?;

    let draft = {
        let mut drafts = state.drafts.write().await;
        let draft_session = drafts.get_mut(&user_id).ok_or(StatusCode::CONFLICT)?;
        let draft = draft_session.draft.take().ok_or(StatusCode::CONFLICT)?;
        // a submitted paper is never empty; keep the draft open instead
        if draft.questions.is_empty() {
            draft_session.draft = Some(draft);
            return Err(StatusCode::BAD_REQUEST);
        }
        draft
    };

    let applied = state
        .store
        .apply(StoreAction::SubmitPaper(draft))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let Applied::Paper(submitted) = applied else {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    tracing::info!(
        "faculty {} submitted '{}' for review",
        user.id,
        submitted.title
    );
    Ok(Json(submitted))
}

/// New drafts inherit the session's sticky template and format picks.
fn new_draft(
    user: &User,
    draft_session: &DraftSession,
    title: String,
    subject: String,
    questions: Vec<Question>,
) -> QuestionPaper {
    QuestionPaper {
        id: Uuid::new_v4(),
        title,
        subject,
        faculty_id: user.id,
        faculty_name: user.name.clone(),
        status: PaperStatus::Draft,
        created_at: Utc::now(),
        questions,
        feedback: None,
        university_name: None,
        exam_date: None,
        max_marks: Some(DEFAULT_MAX_MARKS),
        enrollment_code: None,
        instructions: None,
        format_file: draft_session.format_file.clone(),
        template_id: draft_session.template_id,
    }
}

fn apply_template(draft_session: &mut DraftSession, template: &PaperTemplate) {
    draft_session.template_id = Some(template.id);
    draft_session.format_file = Some(template.name.clone());
    if let Some(draft) = draft_session.draft.as_mut() {
        draft.template_id = Some(template.id);
        draft.format_file = Some(template.name.clone());
    }
}

/// An empty subject falls back to "Untitled" in the title only; the paper
/// keeps the empty subject it was created with.
fn generated_title(subject: &str) -> String {
    let label = if subject.is_empty() { "Untitled" } else { subject };
    format!("Generated Paper - {label}")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn selection_to_import(draft_session: &DraftSession) -> Vec<Question> {
    draft_session
        .staged
        .iter()
        .filter(|q| draft_session.selected.contains(&q.id))
        .cloned()
        .collect()
}

fn ordered_selection(draft_session: &DraftSession) -> Vec<Uuid> {
    draft_session
        .staged
        .iter()
        .filter(|q| draft_session.selected.contains(&q.id))
        .map(|q| q.id)
        .collect()
}

fn has_extension(file_name: &str, allowed: &[&str]) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), StatusCode> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(StatusCode::BAD_REQUEST)
}

fn extract_status(err: ExtractError) -> StatusCode {
    match err {
        ExtractError::Unsupported(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ExtractError::OcrUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ExtractError::Ocr(msg) => {
            tracing::error!("OCR request failed: {msg}");
            StatusCode::BAD_GATEWAY
        }
    }
}
