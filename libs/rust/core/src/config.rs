//! Run configuration: defaults, optional config file, environment overrides.
//!
//! Layered the usual way: built-in defaults, then the file named by
//! `TIERFED_CONFIG_FILE` (YAML/TOML/JSON, optional), then `TIERFED`-prefixed
//! environment variables, e.g. `TIERFED_NUM_ROUNDS=200`. Everything is
//! validated before a round runs.

use config::ConfigError;
use serde::Deserialize;

use crate::selector::Strategy;
use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Dataset/task identifier, forwarded to the collaborators.
    pub dataset: String,
    pub strategy: Strategy,
    pub num_rounds: u32,
    pub clients_per_round: usize,
    pub num_clients: usize,
    pub num_tiers: usize,
    /// Rounds between probability rebalances.
    pub interval: u32,
    pub initial_credits: u32,
    /// Profiling passes per client.
    pub sync_rounds: u32,
    pub seed: u64,
    /// Capacity factor per client group; clients are assigned to groups in
    /// construction order.
    pub cpu_alloc: Vec<f64>,
    pub metrics_path: String,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_rounds < 1 {
            return Err(Error::Config("num_rounds must be at least 1".into()));
        }
        if self.clients_per_round < 1 {
            return Err(Error::Config("clients_per_round must be at least 1".into()));
        }
        if self.num_clients < 1 {
            return Err(Error::Config("num_clients must be at least 1".into()));
        }
        if self.num_tiers < 1 {
            return Err(Error::Config("num_tiers must be at least 1".into()));
        }
        if self.num_tiers > self.num_clients {
            return Err(Error::Config(format!(
                "num_tiers ({}) cannot exceed num_clients ({})",
                self.num_tiers, self.num_clients
            )));
        }
        if self.interval < 1 {
            return Err(Error::Config("interval must be at least 1".into()));
        }
        if self.initial_credits < 1 {
            return Err(Error::Config("initial_credits must be at least 1".into()));
        }
        if self.sync_rounds < 1 {
            return Err(Error::Config("sync_rounds must be at least 1".into()));
        }
        if self.cpu_alloc.is_empty() {
            return Err(Error::Config("cpu_alloc must name at least one group".into()));
        }
        if self.cpu_alloc.iter().any(|&c| c <= 0.0) {
            return Err(Error::Config("cpu_alloc factors must be positive".into()));
        }
        if self.strategy == Strategy::Unconstrained && self.clients_per_round > self.num_clients {
            return Err(Error::Config(format!(
                "unconstrained selection of {} clients exceeds the pool of {}",
                self.clients_per_round, self.num_clients
            )));
        }
        Ok(())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

pub fn load_config() -> Result<RunConfig> {
    let mut builder = config::Config::builder()
        .set_default("dataset", "mnist")?
        .set_default("strategy", "adaptive")?
        .set_default("num_rounds", 200)?
        .set_default("clients_per_round", 5)?
        .set_default("num_clients", 20)?
        .set_default("num_tiers", 5)?
        .set_default("interval", 50)?
        .set_default("initial_credits", 10)?
        .set_default("sync_rounds", 3)?
        .set_default("seed", 42)?
        .set_default("cpu_alloc", vec![4.0, 2.0, 1.0, 0.5])?
        .set_default("metrics_path", "metrics.json")?;

    if let Ok(file) = std::env::var("TIERFED_CONFIG_FILE") {
        builder = builder.add_source(config::File::with_name(&file).required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix("TIERFED").separator("__"));

    let cfg: RunConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RunConfig {
        RunConfig {
            dataset: "mnist".into(),
            strategy: Strategy::Adaptive,
            num_rounds: 100,
            clients_per_round: 5,
            num_clients: 20,
            num_tiers: 5,
            interval: 50,
            initial_credits: 10,
            sync_rounds: 3,
            seed: 42,
            cpu_alloc: vec![4.0, 2.0, 1.0, 0.5],
            metrics_path: "metrics.json".into(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut c = base();
        c.num_rounds = 0;
        assert!(c.validate().is_err());

        let mut c = base();
        c.num_tiers = 21;
        assert!(c.validate().is_err());

        let mut c = base();
        c.cpu_alloc = vec![1.0, 0.0];
        assert!(c.validate().is_err());

        let mut c = base();
        c.sync_rounds = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn unconstrained_cannot_oversample_pool() {
        let mut c = base();
        c.strategy = Strategy::Unconstrained;
        c.clients_per_round = 21;
        assert!(c.validate().is_err());
        c.clients_per_round = 20;
        assert!(c.validate().is_ok());
    }
}
