//! Identity reconciliation: backfill persisted translation ids onto a payload tree.
//!
//! Parents (questions, answers) are paired by id only. Inside a paired parent, a
//! translation without an id takes the id of the persisted sibling with the same
//! `language_id`. Only translation `id` fields are ever written.

use tracing::{debug, instrument};

use crate::domain::{TestTree, Translation};
use crate::tree::{find_by_id, find_by_language};

/// Reconcile an owned payload against the persisted tree and hand it back.
pub fn reconcile_ids(mut payload: TestTree, persisted: &TestTree) -> TestTree {
  backfill_ids(&mut payload, persisted);
  payload
}

/// In-place variant. Returns how many translation ids were filled in.
#[instrument(level = "debug", target = "reconcile", skip_all, fields(test_id = ?persisted.id))]
pub fn backfill_ids(payload: &mut TestTree, persisted: &TestTree) -> usize {
  let mut filled = 0;

  for question in &mut payload.questions {
    // New questions have nothing to match against; their subtree stays as-is.
    let Some(question_id) = question.id else { continue };
    let Some(stored_question) = find_by_id(&persisted.questions, question_id) else { continue };

    filled += backfill_translations(&mut question.question_translations, &stored_question.question_translations);

    for answer in &mut question.answers {
      let Some(answer_id) = answer.id else { continue };
      let Some(stored_answer) = find_by_id(&stored_question.answers, answer_id) else { continue };
      filled += backfill_translations(&mut answer.answer_translations, &stored_answer.answer_translations);
    }
  }

  debug!(target: "reconcile", filled, "Backfilled translation ids");
  filled
}

fn backfill_translations(incoming: &mut [Translation], stored: &[Translation]) -> usize {
  let mut filled = 0;
  // An explicit id is trusted even if its language disagrees with storage.
  for translation in incoming.iter_mut().filter(|t| t.id.is_none()) {
    if let Some(existing) = find_by_language(stored, translation.language_id) {
      translation.id = existing.id;
      filled += usize::from(existing.id.is_some());
    }
  }
  filled
}
