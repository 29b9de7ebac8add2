//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{QuestionId, TopicId};
use crate::grader::Verdict;
use crate::progress::ProgressDelta;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    RunCode {
        code: String,
    },
    SubmitCode {
        #[serde(rename = "questionId")]
        question_id: QuestionId,
        code: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    RunResult {
        stdout: String,
        stderr: String,
    },
    SubmitResult {
        result: SubmitOut,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct CodeIn {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct RunOut {
    pub stdout: String,
    pub stderr: String,
}

/// Verdict merged with the progress side effects of the submission.
#[derive(Debug, Serialize)]
pub struct SubmitOut {
    pub submission_id: Uuid,
    #[serde(flatten)]
    pub verdict: Verdict,
    #[serde(flatten)]
    pub progress: ProgressDelta,
    /// Question hint, attached when the keyword gate rejected the code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TopicOut {
    pub id: TopicId,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub is_unlocked: bool,
    pub is_completed: bool,
    pub questions_count: usize,
    pub completed_count: usize,
}

#[derive(Debug, Serialize)]
pub struct QuestionSummaryOut {
    pub id: QuestionId,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct TopicDetailOut {
    pub id: TopicId,
    pub title: String,
    pub description: String,
    pub theory: String,
    pub order: i32,
    pub questions: Vec<QuestionSummaryOut>,
    pub is_unlocked: bool,
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct QuestionDetailOut {
    pub id: QuestionId,
    pub topic: TopicId,
    pub topic_title: String,
    pub title: String,
    pub description: String,
    pub expected_output: String,
    pub order: i32,
    pub required_keywords: String,
    pub hint: String,
    pub is_completed: bool,
    pub attempts: u32,
    pub submitted_code: String,
}

#[derive(Debug, Serialize)]
pub struct ProgressTotalsOut {
    pub total_topics: usize,
    pub completed_topics: usize,
    pub total_questions: usize,
    pub completed_questions: usize,
}

#[derive(Debug, Serialize)]
pub struct DashboardOut {
    pub user: String,
    pub progress: ProgressTotalsOut,
    pub topics: Vec<TopicOut>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
