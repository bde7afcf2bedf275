//! Core library for the TierFed coordinator: latency profiling, tier
//! construction, credit-constrained adaptive scheduling and client selection
//! for tier-based federated training runs.
//!
//! The round loop lives in [`orchestrator`]; the training, aggregation and
//! evaluation collaborators behind it are the traits defined in [`training`],
//! with deterministic simulated implementations in [`sim`].

use once_cell::sync::OnceCell;
use thiserror::Error;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for a federated run. Configuration problems fail fast
/// before the first round; aggregation failures abort the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("profiling failed: {0}")]
    Profiling(String),
    #[error("training failed: {0}")]
    Training(String),
    #[error("aggregation failed: {0}")]
    Aggregation(String),
    #[error("metrics serialization failed: {0}")]
    Metrics(#[from] serde_json::Error),
}

/// Installs the fmt subscriber once per process. Safe to call from every
/// binary and test entry point.
pub fn init_tracing(service: &str) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_target(true)
            .try_init()
            .map_err(|e| Error::Config(e.to_string()))
    })?;
    tracing::info!(service, "tracing initialized");
    Ok(())
}

pub mod client;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod scheduler;
pub mod selector;
pub mod sim;
pub mod tiering;
pub mod training;

pub use client::{Client, ClientId};
pub use config::{load_config, RunConfig};
pub use metrics::{MetricsLog, RoundRecord};
pub use orchestrator::RoundOrchestrator;
pub use scheduler::AdaptiveScheduler;
pub use selector::{Selection, Strategy};
pub use sim::{FedAvgAggregator, SimEvaluator, SimTrainer};
pub use tiering::{build_tiers, profile_clients, Tier};
pub use training::{Aggregator, Evaluation, Evaluator, LocalUpdate, Trainer, WeightedUpdate};
