//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  async_trait,
  extract::{FromRequest, FromRequestParts, Path, State},
  http::request::Parts,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::domain::{RecordId, TestTree, UserId};
use crate::error::ApiError;
use crate::logic::{generate_test, preview_test, submit_test};
use crate::protocol::*;
use crate::state::AppState;
use crate::store::StoreError;

/// Acting user, taken from the `X-User-Id` header set by the auth layer in front of us.
#[derive(Clone, Copy, Debug)]
pub struct Actor(pub UserId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .headers
      .get(ACTOR_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse::<UserId>().ok())
      .map(Actor)
      .ok_or(ApiError::Unauthenticated)
  }
}

/// JSON body whose parse failures answer with the usual `{error, message}` shape.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generation_enabled: state.openai.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_tests(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(TestListOut { ids: state.store.test_ids().await })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_test(
  State(state): State<Arc<AppState>>,
  Path(id): Path<RecordId>,
) -> Result<Json<TestTree>, ApiError> {
  let tree = state.store.get_test(id).await.ok_or(StoreError::NotFound(id))?;
  Ok(Json(tree))
}

#[instrument(level = "info", skip(state, body), fields(test_id = ?body.id, questions = body.questions.len(), actor = actor.0))]
pub async fn http_post_test(
  State(state): State<Arc<AppState>>,
  actor: Actor,
  ApiJson(body): ApiJson<TestTree>,
) -> Result<Json<TestTree>, ApiError> {
  let saved = submit_test(&state, body, actor.0).await?;
  info!(target: "submission", test_id = ?saved.id, "HTTP test saved");
  Ok(Json(saved))
}

/// `PUT /tests/:id`: the path id wins over any id in the body.
#[instrument(level = "info", skip(state, body), fields(questions = body.questions.len(), actor = actor.0))]
pub async fn http_put_test(
  State(state): State<Arc<AppState>>,
  Path(id): Path<RecordId>,
  actor: Actor,
  ApiJson(body): ApiJson<TestTree>,
) -> Result<Json<TestTree>, ApiError> {
  let body = TestTree { id: Some(id), ..body };
  let saved = submit_test(&state, body, actor.0).await?;
  info!(target: "submission", test_id = id, "HTTP test updated");
  Ok(Json(saved))
}

#[instrument(level = "info", skip(state, body), fields(test_id = ?body.id, actor = actor.0))]
pub async fn http_post_preview(
  State(state): State<Arc<AppState>>,
  actor: Actor,
  ApiJson(body): ApiJson<TestTree>,
) -> Result<Json<PreviewOut>, ApiError> {
  let out = preview_test(&state, body, actor.0).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(topic = %body.topic, actor = actor.0))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  actor: Actor,
  ApiJson(body): ApiJson<GenerateIn>,
) -> Result<Json<TestTree>, ApiError> {
  let saved = generate_test(&state, &body, actor.0).await?;
  info!(target: "submission", test_id = ?saved.id, questions = saved.questions.len(), "HTTP generated test saved");
  Ok(Json(saved))
}
