//! Minimal OpenAI client for quiz generation.
//!
//! We only call chat.completions and request a strict JSON object, which is then
//! shaped into a payload tree tagged `source_type: "ai"` at the root. The tree
//! goes through the same normalize → reconcile → save pipeline as edits.
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{Answer, CategoryId, Language, LanguageId, Question, SourceType, TestTree, Translation};
use crate::util::{fill_template, trunc_for_log};

#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("generation is disabled (no OPENAI_API_KEY)")]
  Disabled,

  #[error("none of the requested languages are known: {0:?}")]
  UnknownLanguages(Vec<LanguageId>),

  #[error("provider request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("provider returned HTTP {status}: {message}")]
  Status { status: u16, message: String },

  #[error("could not parse model output: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("model returned no usable questions")]
  Empty,
}

/// What to generate.
#[derive(Clone, Debug)]
pub struct GenerationSpec<'a> {
  pub topic: &'a str,
  pub question_count: u32,
  pub answers_per_question: u32,
  pub languages: &'a [Language],
  pub category_id: Option<CategoryId>,
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

// --- Model output shape ---

#[derive(Debug, Deserialize)]
pub(crate) struct GenTest {
  #[serde(default)] title: String,
  #[serde(default)] questions: Vec<GenQuestion>,
}
#[derive(Debug, Deserialize)]
struct GenQuestion {
  #[serde(default)] translations: Vec<GenText>,
  #[serde(default)] answers: Vec<GenAnswer>,
}
#[derive(Debug, Deserialize)]
struct GenAnswer {
  #[serde(default)] correct: bool,
  #[serde(default)] translations: Vec<GenText>,
}
#[derive(Debug, Deserialize)]
struct GenText {
  language: String,
  content: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, GenerateError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "quizsmith-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(GenerateError::Status { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(target: "generate", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text).map_err(|e| {
      error!(target: "generate", error = %e, preview = %trunc_for_log(&text, 120), "Model output is not the expected JSON");
      GenerateError::Parse(e)
    })
  }

  /// Generate a quiz and shape it into an AI-tagged payload tree.
  #[instrument(level = "info", skip(self, prompts, spec), fields(topic = %spec.topic, questions = spec.question_count))]
  pub async fn generate_test(&self, prompts: &Prompts, spec: &GenerationSpec<'_>) -> Result<TestTree, GenerateError> {
    let codes = spec.languages.iter().map(|l| l.code.as_str()).collect::<Vec<_>>().join(", ");
    let question_count = spec.question_count.to_string();
    let answers_per_question = spec.answers_per_question.to_string();
    let vars = [
      ("topic", spec.topic),
      ("question_count", question_count.as_str()),
      ("answers_per_question", answers_per_question.as_str()),
      ("languages", codes.as_str()),
    ];
    let system = fill_template(&prompts.generate_system, &vars);
    let user = fill_template(&prompts.generate_user_template, &vars);

    let start = std::time::Instant::now();
    let gen: GenTest = self.chat_json(&system, &user, 0.7).await?;
    info!(target: "generate", elapsed = ?start.elapsed(), questions = gen.questions.len(), "Model response received");

    shape_generated(gen, spec.languages, spec.category_id)
  }
}

/// Map model output onto the content tree. Unknown language codes are dropped;
/// questions left without any translation are skipped.
pub(crate) fn shape_generated(
  gen: GenTest,
  languages: &[Language],
  category_id: Option<CategoryId>,
) -> Result<TestTree, GenerateError> {
  let texts = |items: Vec<GenText>| -> Vec<Translation> {
    items
      .into_iter()
      .filter_map(|t| match languages.iter().find(|l| l.code.eq_ignore_ascii_case(t.language.trim())) {
        Some(lang) => Some(Translation::new(lang.id, t.content.trim())),
        None => {
          warn!(target: "generate", language = %t.language, "Dropping text in unknown language");
          None
        }
      })
      .collect()
  };

  let questions: Vec<Question> = gen
    .questions
    .into_iter()
    .filter_map(|q| {
      let question_translations = texts(q.translations);
      if question_translations.is_empty() {
        return None;
      }
      let answers = q
        .answers
        .into_iter()
        .map(|a| Answer { is_correct: a.correct, answer_translations: texts(a.translations), ..Answer::default() })
        .collect();
      Some(Question { question_translations, answers, ..Question::default() })
    })
    .collect();

  if questions.is_empty() {
    return Err(GenerateError::Empty);
  }

  Ok(TestTree {
    id: None,
    title: gen.title,
    category_id,
    source_type: Some(SourceType::Ai.to_string()),
    questions,
  })
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
