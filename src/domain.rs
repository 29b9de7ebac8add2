//! Domain models used by the backend: curriculum entries (topics, questions) and
//! the per-user progress rows the grading pipeline mutates.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub type UserId = String;
pub type TopicId = i64;
pub type QuestionId = i64;

/// A unit of the curriculum. `order` is globally unique; the lowest one is the entry topic.
#[derive(Clone, Debug)]
pub struct Topic {
  pub id: TopicId,
  pub title: String,
  pub description: String,
  pub theory: String,
  pub order: i32,
}

/// A coding exercise. Submissions are graded against `expected_output`.
#[derive(Clone, Debug)]
pub struct Question {
  pub id: QuestionId,
  pub topic_id: TopicId,
  pub title: String,
  pub description: String,
  pub expected_output: String,
  pub order: i32,
  /// Comma-separated tokens that must appear in the source (empty = no gate).
  pub required_keywords: String,
  /// Display-only; never consulted by grading.
  pub hint: String,
}

/// Progress of one user on one question. Created lazily on first submission.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct UserProgress {
  pub completed: bool,
  pub completed_at: Option<DateTime<Utc>>,
  pub attempts: u32,
  pub submitted_code: String,
}

/// Progress of one user on one topic.
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct TopicProgress {
  pub is_unlocked: bool,
  pub is_completed: bool,
}

impl TopicProgress {
  pub fn unlocked() -> Self {
    Self { is_unlocked: true, is_completed: false }
  }
}
