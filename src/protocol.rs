//! Public protocol structs for the HTTP endpoints (serde ready).
//! Content trees travel as `domain::TestTree` directly; these are the envelopes around them.

use serde::{Deserialize, Serialize};

use crate::domain::{CategoryId, LanguageId, RecordId, TestTree};
use crate::normalize::NormalizeReport;
use crate::tree::TreeStats;

/// Header carrying the acting user's id on mutating routes.
pub const ACTOR_HEADER: &str = "x-user-id";

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generation_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct TestListOut {
    pub ids: Vec<RecordId>,
}

/// Result of normalize + reconcile without saving.
#[derive(Debug, Serialize)]
pub struct PreviewOut {
    pub tree: TestTree,
    pub normalized: NormalizeReport,
    pub backfilled: usize,
    pub stats: TreeStats,
}

fn default_question_count() -> u32 { 5 }
fn default_answers_per_question() -> u32 { 4 }

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub topic: String,
    #[serde(default = "default_question_count")]
    pub question_count: u32,
    #[serde(default = "default_answers_per_question")]
    pub answers_per_question: u32,
    /// Empty means every known language.
    #[serde(default)]
    pub language_ids: Vec<LanguageId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}
