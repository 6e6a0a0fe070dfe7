//! Shared tree-walking and sibling-matching helpers used by the reconciler and the store.

use serde::Serialize;

use crate::domain::{Answer, LanguageId, Question, RecordId, TestTree, Translation};

/// A node that may carry a persisted id.
pub trait Identified {
  fn record_id(&self) -> Option<RecordId>;
}

/// A node matched by language within its parent.
pub trait Localized: Identified {
  fn language_id(&self) -> LanguageId;
}

impl Identified for Question {
  fn record_id(&self) -> Option<RecordId> { self.id }
}
impl Identified for Answer {
  fn record_id(&self) -> Option<RecordId> { self.id }
}
impl Identified for Translation {
  fn record_id(&self) -> Option<RecordId> { self.id }
}
impl Localized for Translation {
  fn language_id(&self) -> LanguageId { self.language_id }
}

/// First sibling carrying `id`.
pub fn find_by_id<T: Identified>(siblings: &[T], id: RecordId) -> Option<&T> {
  siblings.iter().find(|s| s.record_id() == Some(id))
}

/// First sibling with `language_id`, in iteration order.
///
/// At most one row per language per parent is expected. If persisted data ever
/// holds duplicates, the earliest one wins.
pub fn find_by_language<T: Localized>(siblings: &[T], language_id: LanguageId) -> Option<&T> {
  siblings.iter().find(|s| s.language_id() == language_id)
}

/// First language that appears more than once among siblings.
pub fn duplicate_language<T: Localized>(siblings: &[T]) -> Option<LanguageId> {
  siblings
    .iter()
    .enumerate()
    .find(|(i, s)| siblings[..*i].iter().any(|prev| prev.language_id() == s.language_id()))
    .map(|(_, s)| s.language_id())
}

/// Node counts, mostly for logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
  pub questions: usize,
  pub answers: usize,
  pub translations: usize,
  /// Nodes below the root without an id.
  pub new_records: usize,
}

pub fn stats(tree: &TestTree) -> TreeStats {
  let mut out = TreeStats::default();
  for q in &tree.questions {
    out.questions += 1;
    out.new_records += usize::from(q.id.is_none());
    for t in &q.question_translations {
      out.translations += 1;
      out.new_records += usize::from(t.id.is_none());
    }
    for a in &q.answers {
      out.answers += 1;
      out.new_records += usize::from(a.id.is_none());
      for t in &a.answer_translations {
        out.translations += 1;
        out.new_records += usize::from(t.id.is_none());
      }
    }
  }
  out
}

/// Largest id anywhere in the tree, root included.
pub fn max_record_id(tree: &TestTree) -> Option<RecordId> {
  let questions = tree.questions.iter().flat_map(|q| {
    let own = std::iter::once(q.id);
    let qt = q.question_translations.iter().map(|t| t.id);
    let answers = q.answers.iter().flat_map(|a| {
      std::iter::once(a.id).chain(a.answer_translations.iter().map(|t| t.id))
    });
    own.chain(qt).chain(answers)
  });
  std::iter::once(tree.id).chain(questions).flatten().max()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tr(id: Option<RecordId>, language_id: LanguageId) -> Translation {
    Translation { id, ..Translation::new(language_id, "x") }
  }

  #[test]
  fn find_by_language_prefers_first_match() {
    let rows = vec![tr(Some(1), 2), tr(Some(2), 1), tr(Some(3), 1)];
    assert_eq!(find_by_language(&rows, 1).and_then(|t| t.id), Some(2));
    assert!(find_by_language(&rows, 9).is_none());
  }

  #[test]
  fn find_by_id_skips_new_nodes() {
    let rows = vec![tr(None, 1), tr(Some(7), 2)];
    assert_eq!(find_by_id(&rows, 7).map(|t| t.language_id), Some(2));
    assert!(find_by_id(&rows, 8).is_none());
  }

  #[test]
  fn duplicate_language_reports_repeated_key() {
    assert_eq!(duplicate_language(&[tr(None, 1), tr(None, 2), tr(None, 1)]), Some(1));
    assert_eq!(duplicate_language(&[tr(None, 1), tr(None, 2)]), None);
  }

  #[test]
  fn stats_and_max_id_walk_the_whole_tree() {
    let tree = TestTree {
      id: Some(4),
      questions: vec![Question {
        id: Some(10),
        question_translations: vec![tr(Some(501), 1), tr(None, 2)],
        answers: vec![Answer {
          id: None,
          answer_translations: vec![tr(Some(701), 1)],
          ..Answer::default()
        }],
        ..Question::default()
      }],
      ..TestTree::default()
    };
    let s = stats(&tree);
    assert_eq!(s, TreeStats { questions: 1, answers: 1, translations: 3, new_records: 2 });
    assert_eq!(max_record_id(&tree), Some(701));
    assert_eq!(max_record_id(&TestTree::default()), None);
  }
}
