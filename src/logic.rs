//! Submission pipeline shared by the HTTP handlers.
//!
//! raw payload → normalize → reconcile (against the persisted tree) → save.
//! The store's write guard is held from load to save, so the tree used for
//! reconciliation is the one the save replaces.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Language, LanguageId, SourceType, TestTree, UserId};
use crate::error::ApiError;
use crate::normalize::{normalize_in_place, NormalizeReport};
use crate::openai::{GenerateError, GenerationSpec};
use crate::protocol::{GenerateIn, PreviewOut};
use crate::reconcile::backfill_ids;
use crate::state::AppState;
use crate::store::StoreError;
use crate::tree::stats;

/// A payload after both passes, ready for the store.
#[derive(Debug)]
pub struct Prepared {
  pub tree: TestTree,
  pub normalized: NormalizeReport,
  pub backfilled: usize,
}

/// Tree-level provenance: "ai" only when the root explicitly says so.
pub fn default_provenance(tree: &TestTree) -> SourceType {
  SourceType::from_tag(tree.source_type.as_deref()).unwrap_or(SourceType::Human)
}

/// Pure part of the pipeline. `persisted` is the stored version of the same test, if any.
pub fn prepare(mut payload: TestTree, persisted: Option<&TestTree>, actor: UserId) -> Prepared {
  let provenance = default_provenance(&payload);
  let normalized = normalize_in_place(&mut payload, actor, provenance);
  let backfilled = persisted.map_or(0, |stored| backfill_ids(&mut payload, stored));
  Prepared { tree: payload, normalized, backfilled }
}

/// Normalize, reconcile and save one submission. Returns the saved tree with every id assigned.
#[instrument(level = "info", skip(state, payload), fields(test_id = ?payload.id, %actor))]
pub async fn submit_test(state: &AppState, payload: TestTree, actor: UserId) -> Result<TestTree, ApiError> {
  let submission = Uuid::new_v4();
  let mut txn = state.store.begin().await;

  let prepared = {
    let persisted = match payload.id {
      Some(id) => Some(txn.load_tree(id).ok_or(StoreError::NotFound(id))?),
      None => None,
    };
    prepare(payload, persisted, actor)
  };

  let saved = txn.save_tree(prepared.tree)?;
  drop(txn);

  info!(
    target: "submission",
    %submission,
    test_id = ?saved.id,
    resolved = prepared.normalized.source_types_resolved,
    positions = prepared.normalized.positions_assigned,
    attributed = prepared.normalized.attributions_set,
    backfilled = prepared.backfilled,
    "Submission saved"
  );
  Ok(saved)
}

/// Same passes as `submit_test`, without saving.
#[instrument(level = "info", skip(state, payload), fields(test_id = ?payload.id, %actor))]
pub async fn preview_test(state: &AppState, payload: TestTree, actor: UserId) -> Result<PreviewOut, ApiError> {
  let persisted = match payload.id {
    Some(id) => Some(state.store.get_test(id).await.ok_or(StoreError::NotFound(id))?),
    None => None,
  };
  let prepared = prepare(payload, persisted.as_ref(), actor);
  let stats = stats(&prepared.tree);
  Ok(PreviewOut {
    tree: prepared.tree,
    normalized: prepared.normalized,
    backfilled: prepared.backfilled,
    stats,
  })
}

/// Languages to generate in: the requested ids, or every known language when none are given.
pub fn select_languages(known: &[Language], requested: &[LanguageId]) -> Result<Vec<Language>, GenerateError> {
  if requested.is_empty() {
    return Ok(known.to_vec());
  }
  let chosen: Vec<Language> = known.iter().filter(|l| requested.contains(&l.id)).cloned().collect();
  if chosen.is_empty() {
    return Err(GenerateError::UnknownLanguages(requested.to_vec()));
  }
  Ok(chosen)
}

/// Generate a quiz with the AI collaborator and submit it as a new test.
#[instrument(level = "info", skip(state, req), fields(topic = %req.topic, %actor))]
pub async fn generate_test(state: &AppState, req: &GenerateIn, actor: UserId) -> Result<TestTree, ApiError> {
  let oa = state.openai.as_ref().ok_or(GenerateError::Disabled)?;
  let languages = select_languages(&state.languages, &req.language_ids)?;
  let spec = GenerationSpec {
    topic: &req.topic,
    question_count: req.question_count.clamp(1, 50),
    answers_per_question: req.answers_per_question.clamp(2, 10),
    languages: &languages,
    category_id: req.category_id,
  };
  let generated = oa.generate_test(&state.prompts, &spec).await?;
  submit_test(state, generated, actor).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::{default_languages, demo_test};
  use serde_json::json;

  fn payload(value: serde_json::Value) -> TestTree {
    serde_json::from_value(value).expect("payload parses")
  }

  #[test]
  fn provenance_defaults_to_human_unless_root_says_ai() {
    assert_eq!(default_provenance(&payload(json!({}))), SourceType::Human);
    assert_eq!(default_provenance(&payload(json!({ "source_type": "ai" }))), SourceType::Ai);
    assert_eq!(default_provenance(&payload(json!({ "source_type": "robot" }))), SourceType::Human);
  }

  #[test]
  fn prepare_runs_both_passes() {
    let stored = demo_test();
    let prepared = prepare(
      payload(json!({
        "id": 1,
        "questions": [{
          "id": 10,
          "source_type": "nonsense",
          "question_translations": [{ "language_id": 1, "content": "Updated question" }],
          "answers": [{ "id": 100, "answer_translations": [{ "language_id": 1, "content": "Updated answer" }] }]
        }]
      })),
      Some(&stored),
      7,
    );
    let q = &prepared.tree.questions[0];
    assert_eq!(prepared.backfilled, 2);
    assert_eq!(q.question_translations[0].id, Some(501));
    assert_eq!(q.question_translations[0].created_by, Some(7));
    assert_eq!(q.answers[0].answer_translations[0].id, Some(701));
    assert_eq!(q.source_type.as_deref(), Some("human"));
  }

  #[tokio::test]
  async fn submit_updates_existing_rows_instead_of_duplicating() {
    let state = AppState::default();
    let saved = submit_test(
      &state,
      payload(json!({
        "id": 1,
        "category_id": 3,
        "questions": [{
          "id": 10,
          "question_translations": [
            { "language_id": 1, "content": "Updated question" },
            { "language_id": 2, "content": "Updated question EN" }
          ],
          "answers": [
            { "id": 100, "is_correct": true, "answer_translations": [{ "language_id": 1, "content": "Budapest!" }] },
            { "answer_translations": [{ "language_id": 1, "content": "Szeged" }] }
          ]
        }]
      })),
      7,
    )
    .await
    .expect("submission saves");

    let q = &saved.questions[0];
    assert_eq!(q.question_translations[0].id, Some(501));
    assert_eq!(q.question_translations[1].id, Some(502));
    assert_eq!(q.answers[0].answer_translations[0].id, Some(701));
    assert_eq!(q.answers[1].position, Some(2));
    let new_answer = q.answers[1].id.expect("new answer got an id");
    assert!(new_answer > 704);
    assert_eq!(state.store.get_test(1).await, Some(saved));
  }

  #[tokio::test]
  async fn backfill_onto_a_claimed_id_is_rejected() {
    let state = AppState::default();
    // 502 is already claimed explicitly, so backfilling the English row would reuse it.
    let err = submit_test(
      &state,
      payload(json!({
        "id": 1,
        "questions": [{
          "id": 10,
          "question_translations": [
            { "id": 502, "language_id": 1, "content": "moved" },
            { "language_id": 2, "content": "fresh" }
          ]
        }]
      })),
      7,
    )
    .await
    .unwrap_err();
    assert!(matches!(
      err,
      ApiError::Store(StoreError::DuplicateId { kind: "question translation", id: 502 })
    ));

    let err = submit_test(&state, payload(json!({ "id": 1, "questions": [{ "id": 10 }, { "id": 10 }] })), 7)
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Store(StoreError::DuplicateId { kind: "question", id: 10 })));
    assert_eq!(state.store.get_test(1).await, Some(demo_test()));
  }

  #[tokio::test]
  async fn submit_of_unknown_test_is_not_found() {
    let state = AppState::default();
    let err = submit_test(&state, payload(json!({ "id": 404 })), 7).await.unwrap_err();
    assert!(matches!(err, ApiError::Store(StoreError::NotFound(404))));
  }

  #[tokio::test]
  async fn preview_does_not_save() {
    let state = AppState::default();
    let out = preview_test(
      &state,
      payload(json!({ "id": 1, "questions": [{ "id": 10, "question_translations": [{ "language_id": 2, "content": "x" }] }] })),
      7,
    )
    .await
    .expect("preview succeeds");
    assert_eq!(out.backfilled, 1);
    assert_eq!(out.tree.questions[0].question_translations[0].id, Some(502));
    assert_eq!(state.store.get_test(1).await, Some(demo_test()));
  }

  #[tokio::test]
  async fn generation_without_client_is_disabled() {
    let state = AppState::default();
    let req = GenerateIn {
      topic: "rivers".into(),
      question_count: 2,
      answers_per_question: 3,
      language_ids: vec![],
      category_id: None,
    };
    let err = generate_test(&state, &req, 7).await.unwrap_err();
    assert!(matches!(err, ApiError::Generate(GenerateError::Disabled)));
  }

  #[test]
  fn select_languages_filters_known_ids() {
    let known = default_languages();
    assert_eq!(select_languages(&known, &[]).expect("all").len(), 2);
    assert_eq!(select_languages(&known, &[2, 9]).expect("some")[0].code, "en");
    assert!(matches!(select_languages(&known, &[9]), Err(GenerateError::UnknownLanguages(_))));
  }
}
