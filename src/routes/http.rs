//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler resolves the caller identity, then delegates to `logic`.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::HeaderMap, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::domain::{QuestionId, TopicId};
use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::routes::user_from_headers;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, headers))]
pub async fn http_dashboard(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<DashboardOut>, ApiError> {
  let user = user_from_headers(&headers)?;
  Ok(Json(dashboard(&state, &user).await))
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_list_topics(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Vec<TopicOut>>, ApiError> {
  let user = user_from_headers(&headers)?;
  Ok(Json(list_topics(&state, &user).await))
}

#[instrument(level = "info", skip(state, headers), fields(%topic_id))]
pub async fn http_get_topic(
  State(state): State<Arc<AppState>>,
  Path(topic_id): Path<TopicId>,
  headers: HeaderMap,
) -> Result<Json<TopicDetailOut>, ApiError> {
  let user = user_from_headers(&headers)?;
  Ok(Json(topic_detail(&state, &user, topic_id).await?))
}

#[instrument(level = "info", skip(state, headers), fields(%question_id))]
pub async fn http_get_question(
  State(state): State<Arc<AppState>>,
  Path(question_id): Path<QuestionId>,
  headers: HeaderMap,
) -> Result<Json<QuestionDetailOut>, ApiError> {
  let user = user_from_headers(&headers)?;
  Ok(Json(question_detail(&state, &user, question_id).await?))
}

#[instrument(level = "info", skip(state, headers, body), fields(code_len = body.code.len()))]
pub async fn http_run_code(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<CodeIn>,
) -> Result<Json<RunOut>, ApiError> {
  user_from_headers(&headers)?;
  Ok(Json(run_code(&state, &body.code).await?))
}

#[instrument(level = "info", skip(state, headers, body), fields(%question_id, code_len = body.code.len()))]
pub async fn http_submit_code(
  State(state): State<Arc<AppState>>,
  Path(question_id): Path<QuestionId>,
  headers: HeaderMap,
  Json(body): Json<CodeIn>,
) -> Result<Json<SubmitOut>, ApiError> {
  let user = user_from_headers(&headers)?;
  let out = submit_code(&state, &user, question_id, &body.code).await?;
  info!(target: "grading", %question_id, passed = out.verdict.passed, attempts = out.progress.attempts, "HTTP submit evaluated");
  Ok(Json(out))
}
