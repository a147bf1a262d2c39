use crate::domain::{Difficulty, Question, QuestionType};
use crate::services::retry::RetryPolicy;
use anyhow::{anyhow, Result};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionResponseFormat,
    ChatCompletionResponseFormatType, CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client};
use serde::Deserialize;
use uuid::Uuid;

/// Curriculum context handed to the model is capped at this many characters.
const CURRICULUM_SNIPPET_LEN: usize = 10_000;

const EXTRACT_SYSTEM_PROMPT: &str = r#"You are an assistant that extracts questions from raw OCR text.
Identify individual questions, their types, and options if available.
Clean up any OCR errors or formatting issues.
Return a valid JSON array of Question objects.
Assign reasonable default values for marks (e.g., 1 for MCQ, 5 for Subjective) and difficulty (MEDIUM) if not explicit.

Structure:
[{
  "id": "generated-id",
  "text": "Question Text",
  "type": "MCQ" | "SUBJECTIVE",
  "options": ["A", "B"] (optional),
  "correctAnswer": "A" (optional),
  "marks": number,
  "difficulty": "EASY" | "MEDIUM" | "HARD"
}]"#;

/// Boundary around the text-generation collaborator. Callers always get a
/// question list back: a missing credential or an unrecoverable failure
/// falls back to deterministic sample questions on the generation path, so
/// an unconfigured install still demos end to end.
#[derive(Clone)]
pub struct GenerationService {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    retry: RetryPolicy,
}

impl GenerationService {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        let client = api_key.map(|key| {
            let config = OpenAIConfig::new().with_api_key(key);
            Client::with_config(config)
        });
        Self {
            client,
            model,
            retry: RetryPolicy::standard(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn generate_from_prompt(
        &self,
        prompt: &str,
        count: usize,
        subject: &str,
    ) -> Vec<Question> {
        let Some(client) = &self.client else {
            tracing::warn!("generation credential missing, returning sample questions");
            return mock_questions(count);
        };

        let system_prompt = format!(
            r#"You are an academic expert. Generate {count} questions for the subject "{subject}".
The output must be a valid JSON array of objects.
Each object should have:
- id: string (unique)
- text: string (the question)
- type: "MCQ" or "SUBJECTIVE"
- options: array of strings (only for MCQ)
- correctAnswer: string
- marks: number
- difficulty: "EASY", "MEDIUM", or "HARD"

Do not include markdown formatting like ```json. Return raw JSON only."#
        );

        match self
            .request_questions(client, &system_prompt, prompt.to_string())
            .await
        {
            Ok(raw) => raw.into_iter().map(normalize_question).collect(),
            Err(err) => {
                tracing::error!("question generation failed: {err}");
                mock_questions(count)
            }
        }
    }

    /// Curriculum uploads reuse the prompt path with a bounded context
    /// snippet, a fixed smaller count and a generic subject.
    pub async fn generate_from_curriculum(&self, curriculum_text: &str) -> Vec<Question> {
        let snippet: String = curriculum_text.chars().take(CURRICULUM_SNIPPET_LEN).collect();
        self.generate_from_prompt(
            &format!("Based on this curriculum content: {snippet}... Generate 5 diverse questions."),
            5,
            "General",
        )
        .await
    }

    /// Structures raw OCR output into questions. Unlike the generation
    /// path, a service failure here yields an empty list so the import
    /// screen can report that nothing was found.
    pub async fn parse_questions_from_text(&self, raw_text: &str) -> Vec<Question> {
        let Some(client) = &self.client else {
            return mock_questions(3);
        };

        let snippet: String = raw_text.chars().take(CURRICULUM_SNIPPET_LEN).collect();
        match self
            .request_questions(
                client,
                EXTRACT_SYSTEM_PROMPT,
                format!("Extract questions from this text:\n\n{snippet}"),
            )
            .await
        {
            Ok(raw) => raw.into_iter().map(normalize_question).collect(),
            Err(err) => {
                tracing::error!("question extraction failed: {err}");
                Vec::new()
            }
        }
    }

    async fn request_questions(
        &self,
        client: &Client<OpenAIConfig>,
        system_prompt: &str,
        user_content: String,
    ) -> Result<Vec<RawQuestion>> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(|e| anyhow!("request build error: {e}"))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(user_content)
            .build()
            .map_err(|e| anyhow!("request build error: {e}"))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .response_format(ChatCompletionResponseFormat {
                r#type: ChatCompletionResponseFormatType::JsonObject,
            })
            .messages(vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ])
            .build()
            .map_err(|e| anyhow!("request build error: {e}"))?;

        let response = self
            .retry
            .run(|| {
                let client = client.clone();
                let request = request.clone();
                async move {
                    client
                        .chat()
                        .create(request)
                        .await
                        .map_err(|err| anyhow!("OpenAI error: {err}"))
                }
            })
            .await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(anyhow!("empty completion content"));
        }
        parse_question_payload(&content)
    }
}

/// Lenient shape of one service-returned question. Any id the service
/// invented is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(default)]
    text: String,
    #[serde(rename = "type", default)]
    question_type: Option<String>,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    correct_answer: Option<String>,
    #[serde(default)]
    marks: Option<f64>,
    #[serde(default)]
    difficulty: Option<String>,
}

fn normalize_question(raw: RawQuestion) -> Question {
    let question_type = raw
        .question_type
        .as_deref()
        .and_then(|t| QuestionType::try_from(t).ok())
        .unwrap_or(if raw.options.is_some() {
            QuestionType::Mcq
        } else {
            QuestionType::Subjective
        });
    let difficulty = raw
        .difficulty
        .as_deref()
        .and_then(|d| Difficulty::try_from(d).ok())
        .unwrap_or(Difficulty::Medium);
    let marks = raw
        .marks
        .map(|m| m as u32)
        .filter(|m| *m > 0)
        .unwrap_or_else(|| question_type.default_marks());
    Question {
        id: Uuid::new_v4(),
        text: raw.text,
        question_type,
        options: match question_type {
            QuestionType::Mcq => raw.options,
            QuestionType::Subjective => None,
        },
        correct_answer: raw.correct_answer,
        marks,
        difficulty,
    }
}

fn parse_question_payload(text: &str) -> Result<Vec<RawQuestion>> {
    match parse_questions(text) {
        Ok(questions) => Ok(questions),
        Err(first_err) => {
            // models sometimes fence the payload despite instructions
            let cleaned = strip_code_fences(text);
            parse_questions(&cleaned)
                .map_err(|_| anyhow!("unparseable question payload: {first_err}"))
        }
    }
}

/// JSON mode cannot emit a top-level array, so the question list may
/// arrive wrapped in an object; both shapes are accepted.
fn parse_questions(text: &str) -> Result<Vec<RawQuestion>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let payload = match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(_, member)| member)
            .find(serde_json::Value::is_array)
            .ok_or_else(|| anyhow!("object payload holds no question array"))?,
        other => other,
    };
    Ok(serde_json::from_value(payload)?)
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Deterministic fallback set: alternating MCQ and subjective questions
/// cycling through the three difficulty levels.
pub fn mock_questions(count: usize) -> Vec<Question> {
    (0..count)
        .map(|i| {
            let mcq = i % 2 == 0;
            Question {
                id: Uuid::new_v4(),
                text: format!(
                    "Sample AI Generated Question {} about the topic (Fallback)?",
                    i + 1
                ),
                question_type: if mcq {
                    QuestionType::Mcq
                } else {
                    QuestionType::Subjective
                },
                options: mcq.then(|| {
                    vec![
                        "Option A".to_string(),
                        "Option B".to_string(),
                        "Option C".to_string(),
                        "Option D".to_string(),
                    ]
                }),
                correct_answer: Some("Option A".to_string()),
                marks: if mcq { 1 } else { 5 },
                difficulty: match i % 3 {
                    0 => Difficulty::Easy,
                    1 => Difficulty::Medium,
                    _ => Difficulty::Hard,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn mock_set_matches_requested_count_and_shape() {
        let questions = mock_questions(10);
        assert_eq!(questions.len(), 10);
        for (i, q) in questions.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(q.question_type, QuestionType::Mcq);
                assert_eq!(q.options.as_ref().map(Vec::len), Some(4));
                assert_eq!(q.marks, 1);
            } else {
                assert_eq!(q.question_type, QuestionType::Subjective);
                assert!(q.options.is_none());
                assert_eq!(q.marks, 5);
            }
        }
        assert_eq!(questions[0].difficulty, Difficulty::Easy);
        assert_eq!(questions[1].difficulty, Difficulty::Medium);
        assert_eq!(questions[2].difficulty, Difficulty::Hard);
    }

    #[test]
    fn mock_ids_are_unique() {
        let ids: HashSet<_> = mock_questions(20).into_iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn unconfigured_service_yields_exactly_the_requested_count() {
        let service = GenerationService::new(None, "gpt-4o-mini".to_string());
        let questions = service
            .generate_from_prompt("10 questions on B-trees", 10, "Databases")
            .await;
        assert_eq!(questions.len(), 10);
    }

    #[tokio::test]
    async fn unconfigured_parse_path_yields_three_samples() {
        let service = GenerationService::new(None, "gpt-4o-mini".to_string());
        let questions = service.parse_questions_from_text("1. What is X?").await;
        assert_eq!(questions.len(), 3);
    }

    #[test]
    fn fenced_payload_parses_after_one_repair_pass() {
        let fenced = "```json\n[{\"text\": \"Define stack\", \"type\": \"SUBJECTIVE\", \"marks\": 5, \"difficulty\": \"EASY\"}]\n```";
        let parsed = parse_question_payload(fenced).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "Define stack");
    }

    #[test]
    fn object_wrapped_payload_from_json_mode_parses() {
        let wrapped = r#"{"questions": [{"text": "Define heap", "type": "SUBJECTIVE", "marks": 5, "difficulty": "MEDIUM"}]}"#;
        let parsed = parse_question_payload(wrapped).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "Define heap");
    }

    #[test]
    fn malformed_payload_is_an_error_after_repair() {
        assert!(parse_question_payload("no json here").is_err());
        assert!(parse_question_payload(r#"{"note": "no array inside"}"#).is_err());
    }

    #[test]
    fn normalize_fills_defaults_and_enforces_mcq_options() {
        let raw = RawQuestion {
            text: "Pick one".to_string(),
            question_type: Some("MCQ".to_string()),
            options: Some(vec!["A".to_string(), "B".to_string()]),
            correct_answer: Some("A".to_string()),
            marks: None,
            difficulty: None,
        };
        let q = normalize_question(raw);
        assert_eq!(q.question_type, QuestionType::Mcq);
        assert_eq!(q.marks, 1);
        assert_eq!(q.difficulty, Difficulty::Medium);

        let raw = RawQuestion {
            text: "Discuss".to_string(),
            question_type: Some("SUBJECTIVE".to_string()),
            options: Some(vec!["stray".to_string()]),
            correct_answer: None,
            marks: None,
            difficulty: Some("HARD".to_string()),
        };
        let q = normalize_question(raw);
        assert!(q.options.is_none());
        assert_eq!(q.marks, 5);
        assert_eq!(q.difficulty, Difficulty::Hard);
    }

    #[test]
    fn missing_type_is_inferred_from_options() {
        let raw = RawQuestion {
            text: "Choose".to_string(),
            question_type: None,
            options: Some(vec!["A".to_string(), "B".to_string()]),
            correct_answer: None,
            marks: Some(2.0),
            difficulty: None,
        };
        assert_eq!(normalize_question(raw).question_type, QuestionType::Mcq);
    }
}
