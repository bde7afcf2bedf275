//! TierFed coordinator: wires configuration, client construction, latency
//! profiling/tiering and the round loop, then serializes the metrics log.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use tierfed_core::{
    build_tiers, load_config, profile_clients, AdaptiveScheduler, Client, FedAvgAggregator,
    RoundOrchestrator, RunConfig, SimEvaluator, SimTrainer, Strategy,
};

/// Shared-weight vector size for the simulated model.
const MODEL_DIM: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    tierfed_core::init_tracing("tierfed-coordinator")?;
    let cfg = load_config()?;
    info!(
        dataset = %cfg.dataset,
        strategy = ?cfg.strategy,
        rounds = cfg.num_rounds,
        clients = cfg.num_clients,
        "coordinator starting"
    );

    let clients = build_clients(&cfg)?;
    let initial_weights = vec![0.0f32; MODEL_DIM];
    let trainer = SimTrainer::default();

    let mut tiers = None;
    let mut scheduler = None;
    if cfg.strategy != Strategy::Unconstrained {
        info!(sync_rounds = cfg.sync_rounds, "profiling clients");
        let latencies =
            profile_clients(&trainer, &clients, &initial_weights, cfg.sync_rounds).await?;
        let built = build_tiers(&latencies, cfg.num_tiers)?;
        for tier in &built {
            info!(
                tier = tier.id,
                clients = tier.clients.len(),
                avg_latency = tier.avg_latency,
                "tier ready"
            );
        }
        if cfg.strategy == Strategy::Adaptive {
            scheduler = Some(AdaptiveScheduler::new(
                cfg.num_tiers,
                cfg.interval,
                cfg.initial_credits,
            )?);
        }
        tiers = Some(built);
    }

    let mut orchestrator = RoundOrchestrator::new(
        clients,
        cfg.strategy,
        trainer,
        FedAvgAggregator,
        SimEvaluator::default(),
        cfg.num_rounds,
        cfg.clients_per_round,
    )?;
    if let Some(tiers) = tiers {
        orchestrator = orchestrator.with_tiers(tiers);
    }
    if let Some(scheduler) = scheduler {
        orchestrator = orchestrator.with_scheduler(scheduler);
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let metrics = orchestrator.run(initial_weights, &mut rng).await?;

    tokio::fs::write(&cfg.metrics_path, metrics.to_json()?).await?;
    if let Some(last) = metrics.records().last() {
        info!(
            accuracy = last.accuracy,
            total_secs = last.wall_clock_time,
            path = %cfg.metrics_path,
            "run finished"
        );
    }
    Ok(())
}

/// Builds the simulated client pool. Clients are spread across the
/// configured capacity groups in construction order, the last group
/// absorbing any remainder; per-client sample counts vary deterministically.
fn build_clients(cfg: &RunConfig) -> Result<Vec<Client>> {
    let groups = cfg.cpu_alloc.len();
    let per_group = (cfg.num_clients / groups).max(1);
    (0..cfg.num_clients)
        .map(|i| {
            let group = (i / per_group).min(groups - 1);
            let data_size = 200 + (i as u64 * 37) % 200;
            Ok(Client::new(format!("client-{i:03}"), cfg.cpu_alloc[group], data_size)?)
        })
        .collect()
}
