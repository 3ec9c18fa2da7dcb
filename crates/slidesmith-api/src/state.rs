//! Application state wiring the machine to concrete infrastructure.
//!
//! The state machine is generic over its ports; AppState pins it to the
//! in-memory session repository and the Gemini client (which implements all
//! three generation ports).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use slidesmith_core::machine::DeckMachine;
use slidesmith_infra::config::{ServiceConfig, api_key_from_env, load_config};
use slidesmith_infra::gemini::GeminiClient;
use slidesmith_infra::session::MemorySessionRepository;

/// The machine pinned to concrete infra implementations.
pub type ConcreteMachine =
    DeckMachine<MemorySessionRepository, GeminiClient, GeminiClient, GeminiClient>;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub machine: Arc<ConcreteMachine>,
    pub output_dir: PathBuf,
}

impl AppState {
    /// Load configuration, resolve the API key, and wire the machine.
    pub async fn init() -> anyhow::Result<Self> {
        let config = load_config(Path::new(".")).await;
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServiceConfig) -> anyhow::Result<Self> {
        let api_key = api_key_from_env()
            .context("no provider API key: set SLIDESMITH_API_KEY or GEMINI_API_KEY")?;

        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .with_context(|| format!("creating output dir {}", config.output_dir.display()))?;

        let client = GeminiClient::new(&config, api_key);
        let machine = DeckMachine::new(
            MemorySessionRepository::new(),
            client.clone(),
            client.clone(),
            client,
            config.output_dir.clone(),
        );

        Ok(Self {
            machine: Arc::new(machine),
            output_dir: config.output_dir,
        })
    }
}
