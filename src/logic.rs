//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Submitting code for a question (grade, then record progress)
//!   - Ungraded sandbox runs
//!   - Topic/question views with lock checks, and the dashboard

use tracing::{info, instrument, warn, Span};
use uuid::Uuid;

use crate::domain::{QuestionId, Topic, TopicId};
use crate::error::ApiError;
use crate::grader::VerdictKind;
use crate::protocol::*;
use crate::sandbox::Execution;
use crate::state::AppState;

#[instrument(level = "info", skip(state, code), fields(%user, %question_id, code_len = code.len(), submission_id = tracing::field::Empty))]
pub async fn submit_code(state: &AppState, user: &str, question_id: QuestionId, code: &str) -> Result<SubmitOut, ApiError> {
  let question = state
    .curriculum
    .question(question_id)
    .ok_or(ApiError::QuestionNotFound(question_id))?;
  if code.trim().is_empty() {
    return Err(ApiError::EmptySubmission);
  }

  let submission_id = Uuid::new_v4();
  Span::current().record("submission_id", tracing::field::display(submission_id));

  let verdict = state.grader.grade(code, question).await;
  let progress = state
    .progress
    .record_submission(&state.curriculum, user, question, code, verdict.passed)
    .await;
  info!(target: "grading", %submission_id, kind = ?verdict.kind, passed = verdict.passed, attempts = progress.attempts, "Submission graded");

  let hint = (verdict.kind == VerdictKind::KeywordGateFailure && !question.hint.is_empty())
    .then(|| question.hint.clone());
  Ok(SubmitOut { submission_id, verdict, progress, hint })
}

#[instrument(level = "info", skip(state, code), fields(code_len = code.len()))]
pub async fn run_code(state: &AppState, code: &str) -> Result<RunOut, ApiError> {
  if code.trim().is_empty() {
    return Err(ApiError::EmptySubmission);
  }
  let timeout = state.grader.timeout();
  let out = match state.grader.sandbox().execute(code, timeout).await {
    Ok(Execution::Completed(r)) => RunOut { stdout: r.stdout, stderr: r.stderr },
    Ok(Execution::TimedOut) => RunOut {
      stdout: String::new(),
      stderr: format!("Code execution timed out (max {} seconds)", timeout.as_secs_f32()),
    },
    Ok(Execution::OutputLimitExceeded { limit }) => RunOut {
      stdout: String::new(),
      stderr: format!("Output limit exceeded (max {limit} bytes per stream)"),
    },
    Err(e) => {
      warn!(target: "grading", error = %e, "Sandbox fault during ungraded run");
      RunOut { stdout: String::new(), stderr: e.to_string() }
    }
  };
  Ok(out)
}

async fn topic_out(state: &AppState, user: &str, t: &Topic) -> TopicOut {
  let progress = &state.progress;
  TopicOut {
    id: t.id,
    title: t.title.clone(),
    description: t.description.clone(),
    order: t.order,
    is_unlocked: progress.is_topic_unlocked(&state.curriculum, user, t.id).await,
    is_completed: progress.is_topic_completed(user, t.id).await,
    questions_count: state.curriculum.question_count(t.id),
    completed_count: progress.completed_count(&state.curriculum, user, t.id).await,
  }
}

#[instrument(level = "info", skip(state), fields(%user))]
pub async fn list_topics(state: &AppState, user: &str) -> Vec<TopicOut> {
  let mut out = Vec::with_capacity(state.curriculum.topics().len());
  for t in state.curriculum.topics() {
    out.push(topic_out(state, user, t).await);
  }
  out
}

#[instrument(level = "info", skip(state), fields(%user))]
pub async fn dashboard(state: &AppState, user: &str) -> DashboardOut {
  let topics = list_topics(state, user).await;
  DashboardOut {
    user: user.to_string(),
    progress: ProgressTotalsOut {
      total_topics: state.curriculum.topics().len(),
      completed_topics: state.progress.completed_topic_total(user).await,
      total_questions: state.curriculum.question_total(),
      completed_questions: state.progress.completed_question_total(user).await,
    },
    topics,
  }
}

async fn ensure_unlocked(state: &AppState, user: &str, topic: TopicId) -> Result<(), ApiError> {
  if state.progress.is_topic_unlocked(&state.curriculum, user, topic).await {
    Ok(())
  } else {
    Err(ApiError::TopicLocked(topic))
  }
}

#[instrument(level = "info", skip(state), fields(%user, %topic_id))]
pub async fn topic_detail(state: &AppState, user: &str, topic_id: TopicId) -> Result<TopicDetailOut, ApiError> {
  let topic = state.curriculum.topic(topic_id).ok_or(ApiError::TopicNotFound(topic_id))?;
  ensure_unlocked(state, user, topic.id).await?;

  let mut questions = Vec::new();
  for q in state.curriculum.questions_in(topic.id) {
    let is_completed = state
      .progress
      .question_progress(user, q.id)
      .await
      .is_some_and(|p| p.completed);
    questions.push(QuestionSummaryOut {
      id: q.id,
      title: q.title.clone(),
      description: q.description.clone(),
      order: q.order,
      is_completed,
    });
  }

  Ok(TopicDetailOut {
    id: topic.id,
    title: topic.title.clone(),
    description: topic.description.clone(),
    theory: topic.theory.clone(),
    order: topic.order,
    questions,
    is_unlocked: true,
    is_completed: state.progress.is_topic_completed(user, topic.id).await,
  })
}

#[instrument(level = "info", skip(state), fields(%user, %question_id))]
pub async fn question_detail(state: &AppState, user: &str, question_id: QuestionId) -> Result<QuestionDetailOut, ApiError> {
  let q = state
    .curriculum
    .question(question_id)
    .ok_or(ApiError::QuestionNotFound(question_id))?;
  ensure_unlocked(state, user, q.topic_id).await?;

  let topic_title = state
    .curriculum
    .topic(q.topic_id)
    .map(|t| t.title.clone())
    .unwrap_or_default();
  let progress = state.progress.question_progress(user, q.id).await.unwrap_or_default();

  Ok(QuestionDetailOut {
    id: q.id,
    topic: q.topic_id,
    topic_title,
    title: q.title.clone(),
    description: q.description.clone(),
    expected_output: q.expected_output.clone(),
    order: q.order,
    required_keywords: q.required_keywords.clone(),
    hint: q.hint.clone(),
    is_completed: progress.completed,
    attempts: progress.attempts,
    submitted_code: progress.submitted_code,
  })
}
