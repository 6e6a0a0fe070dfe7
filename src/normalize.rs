//! Top-down normalization of provenance, answer ordering and category metadata.
//!
//! Rules, applied root to leaves:
//!   - the Test `category_id` is inherited by questions that do not set their own
//!   - a `source_type` survives only if it is exactly "human" or "ai"; otherwise
//!     it is replaced by the owner's resolved value (the tree default for questions)
//!   - translations resolved to "human" get `created_by` = acting user when unset
//!   - answers without `position` get their 1-based submission index
//!
//! Ids are never read or written here.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::{SourceType, TestTree, Translation, UserId};

/// What a normalization pass changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
  pub source_types_resolved: usize,
  pub categories_inherited: usize,
  pub positions_assigned: usize,
  pub attributions_set: usize,
}

impl NormalizeReport {
  pub fn is_noop(&self) -> bool { *self == Self::default() }
}

/// Normalize an owned tree and hand it back.
pub fn normalize(mut tree: TestTree, acting_user_id: UserId, default_provenance: SourceType) -> TestTree {
  normalize_in_place(&mut tree, acting_user_id, default_provenance);
  tree
}

#[instrument(level = "debug", target = "reconcile", skip(tree), fields(questions = tree.questions.len()))]
pub fn normalize_in_place(
  tree: &mut TestTree,
  acting_user_id: UserId,
  default_provenance: SourceType,
) -> NormalizeReport {
  let mut report = NormalizeReport::default();
  let inherited_category = tree.category_id;

  for question in &mut tree.questions {
    let question_source = resolve_source(&mut question.source_type, default_provenance, &mut report);

    if question.category_id.is_none() && inherited_category.is_some() {
      question.category_id = inherited_category;
      report.categories_inherited += 1;
    }

    for translation in &mut question.question_translations {
      normalize_translation(translation, question_source, acting_user_id, &mut report);
    }

    for (index, answer) in question.answers.iter_mut().enumerate() {
      let answer_source = resolve_source(&mut answer.source_type, question_source, &mut report);

      if answer.position.is_none() {
        answer.position = Some(index as u32 + 1);
        report.positions_assigned += 1;
      }

      for translation in &mut answer.answer_translations {
        normalize_translation(translation, answer_source, acting_user_id, &mut report);
      }
    }
  }

  debug!(
    target: "reconcile",
    resolved = report.source_types_resolved,
    categories = report.categories_inherited,
    positions = report.positions_assigned,
    attributed = report.attributions_set,
    "Normalized payload tree"
  );
  report
}

/// Keep a valid tag, otherwise overwrite the slot with the inherited one.
fn resolve_source(slot: &mut Option<String>, inherited: SourceType, report: &mut NormalizeReport) -> SourceType {
  if let Some(valid) = SourceType::from_tag(slot.as_deref()) {
    return valid;
  }
  *slot = Some(inherited.to_string());
  report.source_types_resolved += 1;
  inherited
}

fn normalize_translation(
  translation: &mut Translation,
  owner_source: SourceType,
  acting_user_id: UserId,
  report: &mut NormalizeReport,
) {
  let resolved = resolve_source(&mut translation.source_type, owner_source, report);
  if resolved == SourceType::Human && translation.created_by.is_none() {
    translation.created_by = Some(acting_user_id);
    report.attributions_set += 1;
  }
}
