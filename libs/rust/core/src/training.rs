//! Collaborator boundary: local training, weighted aggregation and global
//! model evaluation are supplied by the caller. The coordinator only depends
//! on these traits; see [`crate::sim`] for the simulated implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::Result;

/// Result of one local training invocation. `elapsed_secs` is the raw
/// elapsed time; callers divide it by the client's capacity factor before
/// treating it as latency.
#[derive(Debug, Clone)]
pub struct LocalUpdate {
    pub weights: Vec<f32>,
    pub elapsed_secs: f64,
    pub loss: f64,
}

/// One participant's contribution to aggregation.
#[derive(Debug, Clone)]
pub struct WeightedUpdate {
    pub weights: Vec<f32>,
    pub sample_weight: u64,
}

/// Global model quality after a round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Evaluation {
    /// Accuracy in `[0, 1]`.
    pub accuracy: f64,
    /// Non-negative loss.
    pub loss: f64,
}

/// Runs one local training pass for a client, seeded with the latest shared
/// weights. Must be repeatable: every call re-starts from `global_weights`.
#[async_trait]
pub trait Trainer: Send + Sync {
    async fn train(&self, global_weights: &[f32], client: &Client) -> Result<LocalUpdate>;
}

/// Merges local updates into new shared weights via sample-weight-normalized
/// elementwise averaging. Empty input or zero total weight is an error.
#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn aggregate(&self, updates: &[WeightedUpdate]) -> Result<Vec<f32>>;
}

/// Scores the shared weights on held-out data.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, global_weights: &[f32]) -> Result<Evaluation>;
}
