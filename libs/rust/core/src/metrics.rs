//! Per-round metrics records, serializable for downstream reporting tools.

use serde::{Deserialize, Serialize};

use crate::Result;

/// One round's outcome. `training_time` is the maximum simulated
/// per-participant latency of the round; `wall_clock_time` is cumulative
/// elapsed real time since the run began, both in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub accuracy: f64,
    pub loss: f64,
    pub training_time: f64,
    pub wall_clock_time: f64,
}

/// Append-only, ordered sequence of round records.
#[derive(Debug, Default)]
pub struct MetricsLog {
    records: Vec<RoundRecord>,
}

impl MetricsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: RoundRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }
}
