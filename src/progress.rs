//! Per-user progress: question attempts/completion and the topic unlock cascade.
//!
//! Question states: not attempted → attempted → completed (sticky).
//! Topic states: locked → unlocked → completed. Completing a topic unlocks the
//! topic with the next higher order, once.
//!
//! All mutations for one submission run under a single write lock, so two
//! concurrent submissions for the same (user, question) cannot lose an attempt.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::curriculum::Curriculum;
use crate::domain::{Question, QuestionId, TopicId, TopicProgress, UserId, UserProgress};

/// What a submission changed, returned to the caller alongside the verdict.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ProgressDelta {
    pub attempts: u32,
    pub topic_completed: bool,
    pub next_topic_unlocked: bool,
    pub next_topic_name: Option<String>,
}

#[derive(Default)]
struct Ledger {
    questions: HashMap<(UserId, QuestionId), UserProgress>,
    topics: HashMap<(UserId, TopicId), TopicProgress>,
}

impl Ledger {
    fn completed_in(&self, curriculum: &Curriculum, user: &str, topic: TopicId) -> usize {
        curriculum
            .questions_in(topic)
            .iter()
            .filter(|q| {
                self.questions
                    .get(&(user.to_string(), q.id))
                    .is_some_and(|p| p.completed)
            })
            .count()
    }
}

#[derive(Default)]
pub struct ProgressBook {
    ledger: RwLock<Ledger>,
}

impl ProgressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one graded submission and run the completion cascade.
    #[instrument(level = "info", skip(self, curriculum, question, code), fields(%user, question_id = question.id, %passed))]
    pub async fn record_submission(
        &self,
        curriculum: &Curriculum,
        user: &str,
        question: &Question,
        code: &str,
        passed: bool,
    ) -> ProgressDelta {
        let mut ledger = self.ledger.write().await;

        if let Some(entry) = curriculum.entry_topic() {
            ledger
                .topics
                .entry((user.to_string(), entry.id))
                .or_insert_with(TopicProgress::unlocked)
                .is_unlocked = true;
        }

        let row = ledger
            .questions
            .entry((user.to_string(), question.id))
            .or_default();
        row.attempts += 1;
        row.submitted_code = code.to_string();
        if passed {
            row.completed = true;
            row.completed_at = Some(Utc::now());
        }
        let mut delta = ProgressDelta {
            attempts: row.attempts,
            ..Default::default()
        };
        debug!(target: "progress", %user, question_id = question.id, attempts = row.attempts, completed = row.completed, "Question progress recorded");

        if !passed {
            return delta;
        }

        let Some(topic) = curriculum.topic(question.topic_id) else {
            return delta;
        };
        let total = curriculum.question_count(topic.id);
        let done = ledger.completed_in(curriculum, user, topic.id);
        if total == 0 || done < total {
            return delta;
        }

        let topic_row = ledger.topics.entry((user.to_string(), topic.id)).or_default();
        if topic_row.is_completed {
            return delta;
        }
        topic_row.is_completed = true;
        topic_row.is_unlocked = true;
        delta.topic_completed = true;
        info!(target: "progress", %user, topic_id = topic.id, "Topic completed");

        if let Some(next) = curriculum.next_topic_after(topic.order) {
            ledger
                .topics
                .entry((user.to_string(), next.id))
                .or_default()
                .is_unlocked = true;
            delta.next_topic_unlocked = true;
            delta.next_topic_name = Some(next.title.clone());
            info!(target: "progress", %user, topic_id = next.id, "Next topic unlocked");
        }
        delta
    }

    pub async fn question_progress(&self, user: &str, question: QuestionId) -> Option<UserProgress> {
        let ledger = self.ledger.read().await;
        ledger.questions.get(&(user.to_string(), question)).cloned()
    }

    pub async fn topic_progress(&self, user: &str, topic: TopicId) -> Option<TopicProgress> {
        let ledger = self.ledger.read().await;
        ledger.topics.get(&(user.to_string(), topic)).copied()
    }

    /// The entry topic is always unlocked; others need an unlocked progress row.
    pub async fn is_topic_unlocked(&self, curriculum: &Curriculum, user: &str, topic: TopicId) -> bool {
        if curriculum.entry_topic().is_some_and(|t| t.id == topic) {
            return true;
        }
        self.topic_progress(user, topic)
            .await
            .is_some_and(|p| p.is_unlocked)
    }

    pub async fn is_topic_completed(&self, user: &str, topic: TopicId) -> bool {
        self.topic_progress(user, topic)
            .await
            .is_some_and(|p| p.is_completed)
    }

    pub async fn completed_count(&self, curriculum: &Curriculum, user: &str, topic: TopicId) -> usize {
        let ledger = self.ledger.read().await;
        ledger.completed_in(curriculum, user, topic)
    }

    pub async fn completed_question_total(&self, user: &str) -> usize {
        let ledger = self.ledger.read().await;
        ledger
            .questions
            .iter()
            .filter(|((u, _), p)| u == user && p.completed)
            .count()
    }

    pub async fn completed_topic_total(&self, user: &str) -> usize {
        let ledger = self.ledger.read().await;
        ledger
            .topics
            .iter()
            .filter(|((u, _), p)| u == user && p.is_completed)
            .count()
    }
}
