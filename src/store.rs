//! In-memory quiz store: the persistence collaborator behind the submission pipeline.
//!
//! Saving a tree inserts nodes without an id (fresh ids are allocated) and
//! updates nodes carrying one. The saved tree becomes the full state of the
//! test. Ids that do not exist under the same parent and duplicate languages
//! under one parent are rejected; this is the constraint backstop for content
//! the normalizer and reconciler deliberately let through.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, instrument};

use crate::domain::{LanguageId, RecordId, TestTree, Translation};
use crate::tree::{duplicate_language, find_by_id, max_record_id, stats, Identified};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("test {0} not found")]
    NotFound(RecordId),

    #[error("{kind} {id} does not exist under its parent")]
    UnknownId { kind: &'static str, id: RecordId },

    #[error("{kind} {id} appears more than once under its parent")]
    DuplicateId { kind: &'static str, id: RecordId },

    #[error("language {language_id} appears twice among the {kind}s of {parent}")]
    DuplicateLanguage {
        kind: &'static str,
        parent: String,
        language_id: LanguageId,
    },
}

#[derive(Debug, Default)]
struct Inner {
    tests: HashMap<RecordId, TestTree>,
    next_id: RecordId,
}

#[derive(Debug)]
pub struct QuizStore {
    inner: RwLock<Inner>,
}

impl QuizStore {
    /// Build a store holding `tests`. Ids are allocated above the largest seeded one.
    pub fn with_tests(tests: Vec<TestTree>) -> Self {
        let next_id = tests.iter().filter_map(max_record_id).max().unwrap_or(0) + 1;
        let tests = tests
            .into_iter()
            .filter_map(|t| t.id.map(|id| (id, t)))
            .collect();
        Self { inner: RwLock::new(Inner { tests, next_id }) }
    }

    /// Snapshot of one persisted tree.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_test(&self, id: RecordId) -> Option<TestTree> {
        self.inner.read().await.tests.get(&id).cloned()
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn test_ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<_> = self.inner.read().await.tests.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Exclusive access for a load → reconcile → save sequence. Other writers
    /// wait until the returned guard is dropped.
    pub async fn begin(&self) -> StoreTxn<'_> {
        StoreTxn { guard: self.inner.write().await }
    }
}

impl Default for QuizStore {
    fn default() -> Self { Self::with_tests(Vec::new()) }
}

pub struct StoreTxn<'a> {
    guard: RwLockWriteGuard<'a, Inner>,
}

impl StoreTxn<'_> {
    pub fn load_tree(&self, id: RecordId) -> Option<&TestTree> {
        self.guard.tests.get(&id)
    }

    #[instrument(level = "info", skip_all, fields(test_id = ?tree.id))]
    pub fn save_tree(&mut self, tree: TestTree) -> Result<TestTree, StoreError> {
        self.guard.save_tree(tree)
    }
}

impl Inner {
    fn save_tree(&mut self, mut tree: TestTree) -> Result<TestTree, StoreError> {
        check_languages(&tree)?;
        let existing = match tree.id {
            Some(id) => Some(self.tests.get(&id).ok_or(StoreError::NotFound(id))?),
            None => None,
        };
        check_known_ids(&tree, existing)?;

        let before = stats(&tree);
        let test_id = *tree.id.get_or_insert_with(|| self.allocate());
        for question in &mut tree.questions {
            question.id.get_or_insert_with(|| self.allocate());
            self.assign_translation_ids(&mut question.question_translations);
            for answer in &mut question.answers {
                answer.id.get_or_insert_with(|| self.allocate());
                self.assign_translation_ids(&mut answer.answer_translations);
            }
        }

        info!(
            target: "store",
            test_id,
            questions = before.questions,
            answers = before.answers,
            translations = before.translations,
            inserted = before.new_records,
            "Saved test tree"
        );
        self.tests.insert(test_id, tree.clone());
        Ok(tree)
    }

    fn assign_translation_ids(&mut self, translations: &mut [Translation]) {
        for translation in translations {
            translation.id.get_or_insert_with(|| self.allocate());
        }
    }

    fn allocate(&mut self) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn check_languages(tree: &TestTree) -> Result<(), StoreError> {
    let label = |id: Option<RecordId>, kind: &str| match id {
        Some(id) => format!("{kind} {id}"),
        None => format!("new {kind}"),
    };
    for question in &tree.questions {
        if let Some(language_id) = duplicate_language(&question.question_translations) {
            return Err(StoreError::DuplicateLanguage {
                kind: "translation",
                parent: label(question.id, "question"),
                language_id,
            });
        }
        for answer in &question.answers {
            if let Some(language_id) = duplicate_language(&answer.answer_translations) {
                return Err(StoreError::DuplicateLanguage {
                    kind: "translation",
                    parent: label(answer.id, "answer"),
                    language_id,
                });
            }
        }
    }
    Ok(())
}

/// Every id in the payload must already exist under the same persisted parent,
/// and may be used by only one sibling.
fn check_known_ids(tree: &TestTree, existing: Option<&TestTree>) -> Result<(), StoreError> {
    let stored_questions = existing.map(|t| t.questions.as_slice());
    ensure_known("question", &tree.questions, stored_questions)?;

    for question in &tree.questions {
        let stored_question = match (question.id, stored_questions) {
            (Some(id), Some(stored)) => find_by_id(stored, id),
            _ => None,
        };
        ensure_known(
            "question translation",
            &question.question_translations,
            stored_question.map(|q| q.question_translations.as_slice()),
        )?;
        ensure_known("answer", &question.answers, stored_question.map(|q| q.answers.as_slice()))?;

        for answer in &question.answers {
            let stored_answer = match (answer.id, stored_question) {
                (Some(id), Some(q)) => find_by_id(&q.answers, id),
                _ => None,
            };
            ensure_known(
                "answer translation",
                &answer.answer_translations,
                stored_answer.map(|a| a.answer_translations.as_slice()),
            )?;
        }
    }
    Ok(())
}

fn ensure_known<T: Identified>(kind: &'static str, incoming: &[T], stored: Option<&[T]>) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    for id in incoming.iter().filter_map(|node| node.record_id()) {
        if !seen.insert(id) {
            debug!(target: "store", kind, id, "Rejecting repeated id");
            return Err(StoreError::DuplicateId { kind, id });
        }
        if stored.and_then(|s| find_by_id(s, id)).is_none() {
            debug!(target: "store", kind, id, "Rejecting unknown id");
            return Err(StoreError::UnknownId { kind, id });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeds::demo_test;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> TestTree {
        serde_json::from_value(value).expect("fixture parses")
    }

    #[tokio::test]
    async fn new_tree_gets_fresh_ids_everywhere() {
        let store = QuizStore::with_tests(vec![demo_test()]);
        let mut txn = store.begin().await;
        let saved = txn
            .save_tree(tree(json!({
                "title": "New",
                "questions": [{
                    "question_translations": [{ "language_id": 1, "content": "q" }],
                    "answers": [{ "answer_translations": [{ "language_id": 1, "content": "a" }] }]
                }]
            })))
            .expect("save succeeds");
        drop(txn);

        let floor = max_record_id(&demo_test()).unwrap_or(0);
        let test_id = saved.id.expect("test id assigned");
        assert!(test_id > floor);
        let q = &saved.questions[0];
        assert!(q.id.is_some() && q.question_translations[0].id.is_some());
        assert!(q.answers[0].id.is_some() && q.answers[0].answer_translations[0].id.is_some());
        assert_eq!(store.get_test(test_id).await, Some(saved));
    }

    #[tokio::test]
    async fn existing_ids_update_in_place() {
        let store = QuizStore::with_tests(vec![demo_test()]);
        let mut edited = demo_test();
        edited.questions[0].question_translations[0].content = "Changed".into();
        let saved = store.begin().await.save_tree(edited.clone()).expect("save succeeds");
        assert_eq!(saved, edited);
        assert_eq!(store.get_test(1).await, Some(edited));
    }

    #[tokio::test]
    async fn unknown_test_is_not_found() {
        let store = QuizStore::default();
        let err = store.begin().await.save_tree(tree(json!({ "id": 77 }))).unwrap_err();
        assert_eq!(err, StoreError::NotFound(77));
    }

    #[tokio::test]
    async fn ids_from_other_parents_are_rejected() {
        let store = QuizStore::with_tests(vec![demo_test()]);
        // 701 exists, but as an answer translation, not under question 10.
        let err = store
            .begin()
            .await
            .save_tree(tree(json!({
                "id": 1,
                "questions": [{ "id": 10, "question_translations": [{ "id": 701, "language_id": 1 }] }]
            })))
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownId { kind: "question translation", id: 701 });
    }

    #[tokio::test]
    async fn repeated_sibling_ids_are_rejected() {
        let store = QuizStore::with_tests(vec![demo_test()]);
        let err = store
            .begin()
            .await
            .save_tree(tree(json!({ "id": 1, "questions": [{ "id": 10 }, { "id": 10 }] })))
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateId { kind: "question", id: 10 });

        let err = store
            .begin()
            .await
            .save_tree(tree(json!({
                "id": 1,
                "questions": [{
                    "id": 10,
                    "answers": [{
                        "id": 100,
                        "answer_translations": [
                            { "id": 701, "language_id": 1 },
                            { "id": 701, "language_id": 2 }
                        ]
                    }]
                }]
            })))
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateId { kind: "answer translation", id: 701 });
        assert_eq!(store.get_test(1).await, Some(demo_test()));
    }

    #[tokio::test]
    async fn children_of_new_parents_cannot_carry_ids() {
        let store = QuizStore::with_tests(vec![demo_test()]);
        let err = store
            .begin()
            .await
            .save_tree(tree(json!({ "questions": [{ "answers": [{ "id": 100 }] }] })))
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownId { kind: "answer", id: 100 });
    }

    #[tokio::test]
    async fn duplicate_languages_are_rejected() {
        let store = QuizStore::default();
        let err = store
            .begin()
            .await
            .save_tree(tree(json!({
                "questions": [{
                    "question_translations": [
                        { "language_id": 2, "content": "a" },
                        { "language_id": 2, "content": "b" }
                    ]
                }]
            })))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateLanguage { language_id: 2, .. }));
    }
}
