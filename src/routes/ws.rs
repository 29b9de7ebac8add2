//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//! The caller identity is taken once, from the upgrade request headers.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  http::HeaderMap,
  response::{IntoResponse, Response},
};
use tracing::{info, error, instrument, debug};

use crate::logic::{run_code, submit_code};
use crate::protocol::{ClientWsMessage, RunOut, ServerWsMessage};
use crate::routes::user_from_headers;
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state, headers))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
  let user = match user_from_headers(&headers) {
    Ok(u) => u,
    Err(e) => return e.into_response(),
  };
  info!(target: "pylearn_backend", %user, "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state, user))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, user: String) {
  info!(target: "pylearn_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "pylearn_backend", "WS received: {}", kind_of(&incoming));
            handle_client_ws(incoming, &state, &user).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "pylearn_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "pylearn_backend", "WebSocket disconnected");
}

// Message bodies carry source code, which stays out of the logs.
fn kind_of(msg: &ClientWsMessage) -> &'static str {
  match msg {
    ClientWsMessage::Ping => "ping",
    ClientWsMessage::RunCode { .. } => "run_code",
    ClientWsMessage::SubmitCode { .. } => "submit_code",
  }
}

async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, user: &str) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::RunCode { code } => match run_code(state, &code).await {
      Ok(RunOut { stdout, stderr }) => ServerWsMessage::RunResult { stdout, stderr },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::SubmitCode { question_id, code } => match submit_code(state, user, question_id, &code).await {
      Ok(result) => {
        info!(target: "grading", %question_id, passed = result.verdict.passed, "WS submit evaluated");
        ServerWsMessage::SubmitResult { result }
      }
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::curriculum_parts;
  use crate::curriculum::Curriculum;
  use crate::grader::Grader;
  use crate::sandbox::Sandbox;
  use crate::seeds::seed_topics;

  fn state() -> AppState {
    let (topics, questions) = curriculum_parts(&seed_topics());
    AppState::new(Curriculum::new(topics, questions), Grader::new(Sandbox::new("sh")))
  }

  #[test]
  fn parses_client_messages() {
    let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"submit_code","questionId":3,"code":"x"}"#).unwrap();
    assert!(matches!(msg, ClientWsMessage::SubmitCode { question_id: 3, .. }));
    let msg: ClientWsMessage = serde_json::from_str(r#"{"type":"run_code","code":"x"}"#).unwrap();
    assert_eq!(kind_of(&msg), "run_code");
  }

  #[tokio::test]
  async fn submit_over_ws_serializes_tagged_result() {
    let state = state();
    let reply = handle_client_ws(
      ClientWsMessage::SubmitCode { question_id: 1, code: "# print\necho 'Hello, World!'".into() },
      &state,
      "ws-user",
    )
    .await;
    let json = serde_json::to_value(&reply).unwrap();
    assert_eq!(json["type"], "submit_result");
    assert_eq!(json["result"]["passed"], true);
    assert_eq!(json["result"]["attempts"], 1);
  }

  #[tokio::test]
  async fn unknown_question_becomes_error_message() {
    let reply = handle_client_ws(
      ClientWsMessage::SubmitCode { question_id: 77, code: "echo".into() },
      &state(),
      "ws-user",
    )
    .await;
    let json = serde_json::to_value(&reply).unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["message"], "Question 77 not found");
  }
}
