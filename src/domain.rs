//! Domain models: the quiz content tree (Test → Questions → Answers → Translations).
//!
//! The same shapes carry both a (possibly sparse) submission payload and the
//! persisted tree loaded from the store. Every node has an optional id; a node
//! without one is a new record.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type RecordId = i64;
pub type UserId = i64;
pub type LanguageId = i64;
pub type CategoryId = i64;

/// Who produced a piece of content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
  Human,
  Ai,
}

impl SourceType {
  pub const fn as_str(self) -> &'static str {
    match self {
      SourceType::Human => "human",
      SourceType::Ai => "ai",
    }
  }

  /// Exact membership in {"human", "ai"}. Empty strings, case variants and
  /// anything else are not provenance tags.
  pub fn from_tag(tag: Option<&str>) -> Option<Self> {
    match tag {
      Some("human") => Some(SourceType::Human),
      Some("ai") => Some(SourceType::Ai),
      _ => None,
    }
  }
}

impl Default for SourceType {
  fn default() -> Self { SourceType::Human }
}

impl fmt::Display for SourceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Provenance tags arrive from loosely typed clients. A string is kept raw for
/// the normalizer to judge; any other JSON value reads as absent.
fn lenient_tag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
  match Value::deserialize(deserializer)? {
    Value::String(tag) => Ok(Some(tag)),
    _ => Ok(None),
  }
}

/// A language known to the service (natural key for translations).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
  pub id: LanguageId,
  pub code: String,
}

/// Tree root.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestTree {
  #[serde(default)] pub id: Option<RecordId>,
  #[serde(default)] pub title: String,
  #[serde(default)] pub category_id: Option<CategoryId>,
  /// Provenance hint for the whole submission; generated content sets "ai".
  #[serde(default, deserialize_with = "lenient_tag")] pub source_type: Option<String>,
  #[serde(default)] pub questions: Vec<Question>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
  #[serde(default)] pub id: Option<RecordId>,
  // Raw as submitted; only "human" / "ai" survive normalization.
  #[serde(default, deserialize_with = "lenient_tag")] pub source_type: Option<String>,
  #[serde(default)] pub category_id: Option<CategoryId>,
  #[serde(default)] pub question_translations: Vec<Translation>,
  #[serde(default)] pub answers: Vec<Answer>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
  #[serde(default)] pub id: Option<RecordId>,
  #[serde(default, deserialize_with = "lenient_tag")] pub source_type: Option<String>,
  #[serde(default)] pub position: Option<u32>,
  #[serde(default)] pub is_correct: bool,
  #[serde(default)] pub answer_translations: Vec<Translation>,
}

/// Per-language content of a question or an answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
  #[serde(default)] pub id: Option<RecordId>,
  pub language_id: LanguageId,
  #[serde(default)] pub content: String,
  #[serde(default, deserialize_with = "lenient_tag")] pub source_type: Option<String>,
  #[serde(default)] pub created_by: Option<UserId>,
}

impl Translation {
  pub fn new(language_id: LanguageId, content: impl Into<String>) -> Self {
    Self { language_id, content: content.into(), ..Self::default() }
  }
}
