//! Loading service configuration (generation prompts + known languages) from TOML.
//!
//! See `QuizConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::Language;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub prompts: Prompts,
  /// Empty means "use the built-in languages".
  #[serde(default)]
  pub languages: Vec<Language>,
}

/// Prompts used by the OpenAI generator. Placeholders: `{topic}`, `{question_count}`,
/// `{answers_per_question}`, `{languages}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub generate_system: String,
  pub generate_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generate_system: "You are a quiz content generator. Respond ONLY with strict JSON.".into(),
      generate_user_template: "Write {question_count} multiple-choice questions about '{topic}', each with {answers_per_question} answers of which exactly one is correct. Provide every question and answer text in each of these language codes: {languages}.\nReturn JSON {\"title\": string, \"questions\": [{\"translations\": [{\"language\": code, \"content\": string}], \"answers\": [{\"correct\": boolean, \"translations\": [{\"language\": code, \"content\": string}]}]}]}.".into(),
    }
  }
}

/// Parse a TOML document into `QuizConfig`.
pub fn parse_config(s: &str) -> Result<QuizConfig, toml::de::Error> {
  toml::from_str::<QuizConfig>(s)
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_quiz_config_from_env() -> Option<QuizConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "quizsmith_backend", %path, languages = cfg.languages.len(), "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizsmith_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizsmith_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
