//! Deterministic simulated collaborators. These stand in for the real
//! training stack so that seeded runs reproduce exactly: elapsed time is
//! proportional to the client's sample count, local loss decays with the
//! number of training calls, and evaluation accuracy climbs toward an
//! asymptote with a periodic dip so the scheduler sees regressions.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

use crate::client::{Client, ClientId};
use crate::training::{Aggregator, Evaluation, Evaluator, LocalUpdate, Trainer, WeightedUpdate};
use crate::{Error, Result};

/// Simulated local trainer. Per-client call counts live behind a lock since
/// train calls within a round run concurrently.
pub struct SimTrainer {
    per_sample_cost: f64,
    step: f32,
    calls: RwLock<HashMap<ClientId, u32>>,
}

impl SimTrainer {
    pub fn new(per_sample_cost: f64, step: f32) -> Self {
        Self { per_sample_cost, step, calls: RwLock::new(HashMap::new()) }
    }
}

impl Default for SimTrainer {
    fn default() -> Self {
        Self::new(1e-4, 0.01)
    }
}

/// Stable per-client drift so different clients push the model in different
/// directions regardless of process hash seeds.
fn id_drift(id: &str) -> f32 {
    let h = id
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    (h % 1000) as f32 / 1000.0 - 0.5
}

#[async_trait]
impl Trainer for SimTrainer {
    async fn train(&self, global_weights: &[f32], client: &Client) -> Result<LocalUpdate> {
        let call = {
            let mut calls = self.calls.write();
            let counter = calls.entry(client.id.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        let drift = self.step * id_drift(&client.id);
        let weights = global_weights.iter().map(|w| w + drift).collect();
        Ok(LocalUpdate {
            weights,
            elapsed_secs: client.data_size as f64 * self.per_sample_cost,
            loss: 1.0 / (f64::from(call) + 1.0),
        })
    }
}

/// Reference FedAvg: `w_global = sum(w_i * n_i) / sum(n_i)`.
pub struct FedAvgAggregator;

#[async_trait]
impl Aggregator for FedAvgAggregator {
    async fn aggregate(&self, updates: &[WeightedUpdate]) -> Result<Vec<f32>> {
        if updates.is_empty() {
            return Err(Error::Aggregation("no updates to aggregate".into()));
        }
        let total: u64 = updates.iter().map(|u| u.sample_weight).sum();
        if total == 0 {
            return Err(Error::Aggregation("total sample weight is zero".into()));
        }
        let dim = updates[0].weights.len();
        let mut merged = vec![0f64; dim];
        for update in updates {
            if update.weights.len() != dim {
                return Err(Error::Aggregation(format!(
                    "weight dimension mismatch: {} != {dim}",
                    update.weights.len()
                )));
            }
            let share = update.sample_weight as f64 / total as f64;
            for (acc, w) in merged.iter_mut().zip(&update.weights) {
                *acc += share * f64::from(*w);
            }
        }
        Ok(merged.into_iter().map(|w| w as f32).collect())
    }
}

/// Simulated held-out evaluation. Accuracy follows a saturating curve over
/// evaluation calls, dented every seventh call to produce the occasional
/// regression; loss mirrors the remaining error.
pub struct SimEvaluator {
    asymptote: f64,
    rate: f64,
    evals: Mutex<u32>,
}

impl SimEvaluator {
    pub fn new(asymptote: f64, rate: f64) -> Self {
        Self { asymptote: asymptote.clamp(0.0, 1.0), rate, evals: Mutex::new(0) }
    }
}

impl Default for SimEvaluator {
    fn default() -> Self {
        Self::new(0.95, 0.05)
    }
}

#[async_trait]
impl Evaluator for SimEvaluator {
    async fn evaluate(&self, _global_weights: &[f32]) -> Result<Evaluation> {
        let call = {
            let mut evals = self.evals.lock();
            *evals += 1;
            *evals
        };
        let mut accuracy = self.asymptote * (1.0 - (-self.rate * f64::from(call)).exp());
        if call % 7 == 0 {
            accuracy *= 0.97;
        }
        Ok(Evaluation { accuracy, loss: (1.0 - accuracy).max(0.0) })
    }
}
