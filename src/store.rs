use crate::domain::{
    Difficulty, PaperStatus, PaperTemplate, Question, QuestionPaper, QuestionType, Role, User,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Feedback applied when a reviewer rejects without entering any text.
pub const DEFAULT_REJECT_FEEDBACK: &str = "See comments";
/// Feedback stamped by the super-admin override reject action.
pub const OVERRIDE_REJECT_FEEDBACK: &str = "Rejected by Super Admin Override";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown paper: {0}")]
    UnknownPaper(Uuid),
    #[error("unknown user: {0}")]
    UnknownUser(Uuid),
}

/// Every mutation of the shared collections goes through one of these.
/// Handlers never touch the vectors directly, which keeps mutation sites
/// auditable.
#[derive(Debug)]
pub enum StoreAction {
    /// Re-stamps the paper id, forces PENDING and prepends, so the caller's
    /// draft copy is discarded rather than duplicated.
    SubmitPaper(QuestionPaper),
    /// Overwrites status and feedback together. Approvals pass
    /// `feedback: None`, which clears any prior rejection note.
    SetPaperStatus {
        id: Uuid,
        status: PaperStatus,
        feedback: Option<String>,
    },
    AddUser {
        name: String,
        email: String,
        role: Role,
    },
    UpdateUser {
        id: Uuid,
        name: String,
        email: String,
        role: Role,
    },
    RemoveUser {
        id: Uuid,
    },
    AddTemplate(PaperTemplate),
}

/// Canonical state written by an applied action. Submission re-stamps the
/// paper id, so callers respond with the entity returned here rather than
/// trusting their own copy.
#[derive(Debug, Clone)]
pub enum Applied {
    Paper(QuestionPaper),
    User(User),
    UserRemoved(Uuid),
    Template(PaperTemplate),
}

#[derive(Clone)]
pub struct Store {
    papers: Arc<RwLock<Vec<QuestionPaper>>>,
    users: Arc<RwLock<Vec<User>>>,
    templates: Arc<RwLock<Vec<PaperTemplate>>>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            papers: Arc::new(RwLock::new(Vec::new())),
            users: Arc::new(RwLock::new(Vec::new())),
            templates: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn apply(&self, action: StoreAction) -> Result<Applied, StoreError> {
        match action {
            StoreAction::SubmitPaper(mut paper) => {
                paper.id = Uuid::new_v4();
                paper.status = PaperStatus::Pending;
                let stored = paper.clone();
                let mut papers = self.papers.write().await;
                papers.insert(0, paper);
                Ok(Applied::Paper(stored))
            }
            StoreAction::SetPaperStatus {
                id,
                status,
                feedback,
            } => {
                let mut papers = self.papers.write().await;
                let paper = papers
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or(StoreError::UnknownPaper(id))?;
                paper.status = status;
                paper.feedback = feedback;
                Ok(Applied::Paper(paper.clone()))
            }
            StoreAction::AddUser { name, email, role } => {
                let user = User::new(email, name, role);
                let mut users = self.users.write().await;
                users.push(user.clone());
                Ok(Applied::User(user))
            }
            StoreAction::UpdateUser {
                id,
                name,
                email,
                role,
            } => {
                let mut users = self.users.write().await;
                let user = users
                    .iter_mut()
                    .find(|u| u.id == id)
                    .ok_or(StoreError::UnknownUser(id))?;
                user.name = name;
                user.email = email;
                user.role = role;
                Ok(Applied::User(user.clone()))
            }
            StoreAction::RemoveUser { id } => {
                let mut users = self.users.write().await;
                let before = users.len();
                users.retain(|u| u.id != id);
                if users.len() == before {
                    return Err(StoreError::UnknownUser(id));
                }
                Ok(Applied::UserRemoved(id))
            }
            StoreAction::AddTemplate(template) => {
                let mut templates = self.templates.write().await;
                templates.push(template.clone());
                Ok(Applied::Template(template))
            }
        }
    }

    pub async fn papers(&self) -> Vec<QuestionPaper> {
        self.papers.read().await.clone()
    }

    pub async fn paper(&self, id: Uuid) -> Option<QuestionPaper> {
        self.papers.read().await.iter().find(|p| p.id == id).cloned()
    }

    pub async fn papers_by_status(&self, status: PaperStatus) -> Vec<QuestionPaper> {
        self.papers
            .read()
            .await
            .iter()
            .filter(|p| p.status == status)
            .cloned()
            .collect()
    }

    pub async fn users(&self) -> Vec<User> {
        self.users.read().await.clone()
    }

    pub async fn user(&self, id: Uuid) -> Option<User> {
        self.users.read().await.iter().find(|u| u.id == id).cloned()
    }

    pub async fn user_by_email(&self, email: &str) -> Option<User> {
        let needle = email.trim().to_lowercase();
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned()
    }

    pub async fn templates(&self) -> Vec<PaperTemplate> {
        self.templates.read().await.clone()
    }

    pub async fn template(&self, id: Uuid) -> Option<PaperTemplate> {
        self.templates
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    /// Seeds the demo collections so dashboards are not empty on first
    /// login: three fixed accounts, two sample papers attributed to the
    /// seeded faculty member and the stock template set.
    pub async fn seed_demo(&self, demo_users: &[User]) {
        {
            let mut users = self.users.write().await;
            users.extend(demo_users.iter().cloned());
        }

        let faculty = demo_users
            .iter()
            .find(|u| u.role == Role::Faculty)
            .cloned()
            .unwrap_or_else(|| User::new("faculty@qgenius.com", "Dr. Smith", Role::Faculty));

        let mut questions = seed_questions(5, Difficulty::Easy);
        questions.extend(seed_questions(3, Difficulty::Medium));
        let approved = QuestionPaper {
            id: Uuid::new_v4(),
            title: "Mid-Term: Data Structures".to_string(),
            subject: "Computer Science".to_string(),
            faculty_id: faculty.id,
            faculty_name: faculty.name.clone(),
            status: PaperStatus::Approved,
            created_at: Utc::now() - Duration::days(2),
            questions,
            feedback: None,
            university_name: None,
            exam_date: None,
            max_marks: None,
            enrollment_code: None,
            instructions: None,
            format_file: None,
            template_id: None,
        };

        let mut questions = seed_questions(2, Difficulty::Easy);
        questions.extend(seed_questions(5, Difficulty::Medium));
        questions.extend(seed_questions(3, Difficulty::Hard));
        let pending = QuestionPaper {
            id: Uuid::new_v4(),
            title: "Quiz 1: React Basics".to_string(),
            subject: "Web Development".to_string(),
            faculty_id: faculty.id,
            faculty_name: faculty.name.clone(),
            status: PaperStatus::Pending,
            created_at: Utc::now(),
            questions,
            feedback: None,
            university_name: None,
            exam_date: None,
            max_marks: None,
            enrollment_code: None,
            instructions: None,
            format_file: None,
            template_id: None,
        };

        {
            let mut papers = self.papers.write().await;
            papers.push(approved);
            papers.push(pending);
        }

        let stock = [
            ("University_Standard_A4.docx", "DOCX", "2024-02-01"),
            ("Internal_Assessment_Excel.xlsx", "XLSX", "2024-01-20"),
            ("Legacy_Format.pdf", "PDF", "2023-11-15"),
        ];
        let mut templates = self.templates.write().await;
        for (name, kind, date) in stock {
            templates.push(PaperTemplate {
                id: Uuid::new_v4(),
                name: name.to_string(),
                kind: kind.to_string(),
                date: date.to_string(),
            });
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_questions(count: usize, difficulty: Difficulty) -> Vec<Question> {
    let marks = match difficulty {
        Difficulty::Easy => 1,
        Difficulty::Medium => 3,
        Difficulty::Hard => 5,
    };
    (0..count)
        .map(|i| Question {
            id: Uuid::new_v4(),
            text: format!("Sample {} question {}", difficulty.as_str(), i + 1),
            question_type: QuestionType::Mcq,
            options: Some(vec![
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ]),
            correct_answer: Some("A".to_string()),
            marks,
            difficulty,
        })
        .collect()
}
