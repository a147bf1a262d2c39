pub mod paper;
pub mod user;

pub use paper::{
    Difficulty, PaperStatus, PaperTemplate, Question, QuestionPaper, QuestionType,
};
pub use user::{Role, User};
