use crate::auth::AuthBackend;
use crate::domain::{Question, QuestionPaper, User};
use crate::services::extract::ExtractionService;
use crate::services::generate::GenerationService;
use crate::services::mail::MailService;
use crate::store::Store;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub auth: Arc<dyn AuthBackend>,
    pub generator: Arc<GenerationService>,
    pub extractor: Arc<ExtractionService>,
    pub mailer: Arc<MailService>,
    pub session_key: Vec<u8>,
    pub demo_mode: bool,
    pub identities: Arc<RwLock<HashMap<Uuid, User>>>, // user_id -> signed-in identity
    pub drafts: Arc<RwLock<HashMap<Uuid, DraftSession>>>, // user_id -> in-progress paper work
}

/// Faculty working state between question generation/extraction and the
/// moment the paper is submitted for review. Template and format picks
/// are sticky: they outlive a single draft and are stamped onto every
/// newly created one.
#[derive(Clone, Default)]
pub struct DraftSession {
    pub draft: Option<QuestionPaper>,
    pub staged: Vec<Question>,
    pub selected: HashSet<Uuid>, // staged question ids kept for import
    pub template_id: Option<Uuid>,
    pub format_file: Option<String>,
}

pub type SharedState = Arc<AppState>;

/// Fully wired state over the seeded demo store, with no services
/// configured. Handler tests register identities themselves.
#[cfg(test)]
pub(crate) async fn demo_state() -> SharedState {
    use crate::auth::demo::{seed_users, DemoBackend};
    use crate::services::{extract, generate, mail};

    let store = Store::new();
    let seeds = seed_users();
    store.seed_demo(&seeds).await;
    Arc::new(AppState {
        store: store.clone(),
        auth: Arc::new(DemoBackend::new(store, seeds)),
        generator: Arc::new(generate::GenerationService::new(
            None,
            "gpt-4o-mini".to_string(),
        )),
        extractor: Arc::new(extract::ExtractionService::new(None, None)),
        mailer: Arc::new(mail::MailService::new(None, None)),
        session_key: b"test-signing-key".to_vec(),
        demo_mode: true,
        identities: Arc::new(RwLock::new(HashMap::new())),
        drafts: Arc::new(RwLock::new(HashMap::new())),
    })
}
