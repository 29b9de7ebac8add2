//! Loading service configuration (sandbox settings + optional curriculum) from TOML.
//!
//! See `AppConfig`, `SandboxCfg` and `TopicCfg` for the expected schema.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::{Question, QuestionId, Topic, TopicId};
use crate::sandbox::DEFAULT_OUTPUT_LIMIT;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub sandbox: SandboxCfg,
  #[serde(default)]
  pub topics: Vec<TopicCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SandboxCfg {
  #[serde(default = "default_interpreter")]
  pub interpreter: String,
  /// Directory for submission files; the OS temp dir when absent.
  #[serde(default)]
  pub temp_dir: Option<PathBuf>,
  /// Per-stream cap on captured stdout/stderr; a run going past it is killed.
  #[serde(default = "default_max_output_bytes")]
  pub max_output_bytes: usize,
}

impl Default for SandboxCfg {
  fn default() -> Self {
    Self {
      interpreter: default_interpreter(),
      temp_dir: None,
      max_output_bytes: default_max_output_bytes(),
    }
  }
}

fn default_interpreter() -> String { "python3".into() }
fn default_max_output_bytes() -> usize { DEFAULT_OUTPUT_LIMIT }

/// Topic entry accepted in TOML configuration, with its questions nested.
#[derive(Clone, Debug, Deserialize)]
pub struct TopicCfg {
  pub id: TopicId,
  pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub theory: String,
  pub order: i32,
  #[serde(default)] pub questions: Vec<QuestionCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  pub id: QuestionId,
  pub title: String,
  #[serde(default)] pub description: String,
  pub expected_output: String,
  #[serde(default)] pub order: i32,
  #[serde(default)] pub required_keywords: String,
  #[serde(default)] pub hint: String,
}

/// Flatten nested topic entries into the catalog's topic and question lists.
pub fn curriculum_parts(topics: &[TopicCfg]) -> (Vec<Topic>, Vec<Question>) {
  let mut out_topics = Vec::with_capacity(topics.len());
  let mut out_questions = Vec::new();
  for t in topics {
    out_topics.push(Topic {
      id: t.id,
      title: t.title.clone(),
      description: t.description.clone(),
      theory: t.theory.clone(),
      order: t.order,
    });
    for q in &t.questions {
      out_questions.push(Question {
        id: q.id,
        topic_id: t.id,
        title: q.title.clone(),
        description: q.description.clone(),
        expected_output: q.expected_output.clone(),
        order: q.order,
        required_keywords: q.required_keywords.clone(),
        hint: q.hint.clone(),
      });
    }
  }
  (out_topics, out_questions)
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Attempt to load `AppConfig` from PYLEARN_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("PYLEARN_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "pylearn_backend", %path, topics = cfg.topics.len(), "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "pylearn_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "pylearn_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// PYTHON_BIN wins over the configured interpreter.
pub fn resolve_interpreter(cfg: &SandboxCfg) -> String {
  std::env::var("PYTHON_BIN")
    .ok()
    .filter(|s| !s.trim().is_empty())
    .unwrap_or_else(|| cfg.interpreter.clone())
}
