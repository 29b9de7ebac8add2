//! Application state: curriculum catalog, progress book and the grader.
//!
//! This module owns:
//!   - the read-only curriculum (from TOML or built-in seeds)
//!   - the in-memory progress rows for every user
//!   - the grader and the sandbox it drives

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::{curriculum_parts, load_app_config_from_env, resolve_interpreter};
use crate::curriculum::Curriculum;
use crate::grader::Grader;
use crate::progress::ProgressBook;
use crate::sandbox::Sandbox;
use crate::seeds::seed_topics;

#[derive(Clone)]
pub struct AppState {
    pub curriculum: Arc<Curriculum>,
    pub progress: Arc<ProgressBook>,
    pub grader: Grader,
}

impl AppState {
    /// Build state from env: load config, fall back to seeds, configure the sandbox.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();

        let topics = if cfg.topics.is_empty() {
            warn!(target: "pylearn_backend", "No topics configured; using built-in seed curriculum");
            seed_topics()
        } else {
            cfg.topics.clone()
        };
        let (topics, questions) = curriculum_parts(&topics);
        let curriculum = Curriculum::new(topics, questions);

        let mut sandbox = Sandbox::new(resolve_interpreter(&cfg.sandbox)).with_output_limit(cfg.sandbox.max_output_bytes);
        if let Some(dir) = &cfg.sandbox.temp_dir {
            sandbox = sandbox.with_temp_dir(dir);
        }
        info!(target: "pylearn_backend", interpreter = %sandbox.interpreter(), temp_dir = ?cfg.sandbox.temp_dir, max_output_bytes = sandbox.output_limit(), "Sandbox configured (no isolation beyond timeout and output cap; run inside an isolated host)");

        Self::new(curriculum, Grader::new(sandbox))
    }

    pub fn new(curriculum: Curriculum, grader: Grader) -> Self {
        Self {
            curriculum: Arc::new(curriculum),
            progress: Arc::new(ProgressBook::new()),
            grader,
        }
    }
}
