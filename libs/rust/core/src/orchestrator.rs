//! The round loop: select participants, train them concurrently, aggregate,
//! evaluate, feed accuracy back into the scheduler, record metrics.
//!
//! Rounds are strictly sequential: aggregation and evaluation of round `r`
//! complete before round `r + 1` starts. Within a round the per-client
//! training calls run concurrently and the barrier waits for all of them.
//! There is no per-client timeout, so a hung collaborator blocks the round.

use futures::future;
use rand::Rng;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use crate::client::{Client, ClientId};
use crate::metrics::{MetricsLog, RoundRecord};
use crate::scheduler::AdaptiveScheduler;
use crate::selector::Strategy;
use crate::tiering::Tier;
use crate::training::{Aggregator, Evaluator, Trainer, WeightedUpdate};
use crate::{Error, Result};

pub struct RoundOrchestrator<T, A, E> {
    clients: Vec<Client>,
    strategy: Strategy,
    tiers: Option<Vec<Tier>>,
    scheduler: Option<AdaptiveScheduler>,
    trainer: T,
    aggregator: A,
    evaluator: E,
    num_rounds: u32,
    clients_per_round: usize,
}

impl<T, A, E> RoundOrchestrator<T, A, E>
where
    T: Trainer,
    A: Aggregator,
    E: Evaluator,
{
    pub fn new(
        clients: Vec<Client>,
        strategy: Strategy,
        trainer: T,
        aggregator: A,
        evaluator: E,
        num_rounds: u32,
        clients_per_round: usize,
    ) -> Result<Self> {
        if clients.is_empty() {
            return Err(Error::Config("orchestrator needs at least one client".into()));
        }
        if num_rounds < 1 {
            return Err(Error::Config("num_rounds must be at least 1".into()));
        }
        if clients_per_round < 1 {
            return Err(Error::Config("clients_per_round must be at least 1".into()));
        }
        Ok(Self {
            clients,
            strategy,
            tiers: None,
            scheduler: None,
            trainer,
            aggregator,
            evaluator,
            num_rounds,
            clients_per_round,
        })
    }

    pub fn with_tiers(mut self, tiers: Vec<Tier>) -> Self {
        self.tiers = Some(tiers);
        self
    }

    pub fn with_scheduler(mut self, scheduler: AdaptiveScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Drives all rounds to completion, threading the shared weights from
    /// each aggregation into the next round's training calls.
    pub async fn run<R: Rng>(
        &mut self,
        initial_weights: Vec<f32>,
        rng: &mut R,
    ) -> Result<MetricsLog> {
        let RoundOrchestrator {
            clients,
            strategy,
            tiers,
            scheduler,
            trainer,
            aggregator,
            evaluator,
            num_rounds,
            clients_per_round,
        } = self;

        if *strategy != Strategy::Unconstrained && tiers.is_none() {
            return Err(Error::Config(format!(
                "strategy {strategy:?} requires profiled tiers"
            )));
        }
        if *strategy == Strategy::Adaptive && scheduler.is_none() {
            return Err(Error::Config("adaptive strategy requires a scheduler".into()));
        }

        // Shared borrow: the per-round training futures hold it concurrently.
        let trainer: &T = trainer;

        let population: Vec<ClientId> = clients.iter().map(|c| c.id.clone()).collect();
        let index: HashMap<&str, &Client> =
            clients.iter().map(|c| (c.id.as_str(), c)).collect();

        info!(
            strategy = ?strategy,
            rounds = *num_rounds,
            clients_per_round = *clients_per_round,
            population = population.len(),
            "starting federated run"
        );

        let mut global = initial_weights;
        let mut metrics = MetricsLog::new();
        let run_start = Instant::now();

        for round in 0..*num_rounds {
            let selection = strategy.select(
                &population,
                tiers.as_deref(),
                scheduler.as_mut(),
                *clients_per_round,
                round,
                rng,
            )?;
            let round_clients: Vec<&Client> = selection
                .clients
                .iter()
                .map(|id| {
                    index.get(id.as_str()).copied().ok_or_else(|| {
                        Error::Config(format!("selected unknown client {id}"))
                    })
                })
                .collect::<Result<_>>()?;

            let outcomes =
                future::join_all(round_clients.iter().map(|c| trainer.train(&global, c))).await;

            let mut updates = Vec::with_capacity(round_clients.len());
            let mut max_latency = 0f64;
            for (client, outcome) in round_clients.iter().zip(outcomes) {
                let update = outcome?;
                max_latency = max_latency.max(update.elapsed_secs / client.capacity);
                updates.push(WeightedUpdate {
                    weights: update.weights,
                    sample_weight: client.data_size,
                });
            }

            global = aggregator.aggregate(&updates).await?;
            let eval = evaluator.evaluate(&global).await?;

            if let (Some(scheduler), Some(tier)) = (scheduler.as_mut(), selection.tier) {
                scheduler.update_tier_accuracy(tier, eval.accuracy);
            }

            debug!(
                round,
                accuracy = eval.accuracy,
                loss = eval.loss,
                training_time = max_latency,
                tier = ?selection.tier,
                "round complete"
            );
            if (round + 1) % 50 == 0 {
                info!(round = round + 1, accuracy = eval.accuracy, loss = eval.loss, "progress");
            }

            metrics.push(RoundRecord {
                round,
                accuracy: eval.accuracy,
                loss: eval.loss,
                training_time: max_latency,
                wall_clock_time: run_start.elapsed().as_secs_f64(),
            });
        }

        info!(
            rounds = *num_rounds,
            total_secs = run_start.elapsed().as_secs_f64(),
            "federated run complete"
        );
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{FedAvgAggregator, SimEvaluator, SimTrainer};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(n: usize) -> Vec<Client> {
        (0..n)
            .map(|i| Client::new(format!("c-{i:02}"), 1.0 + i as f64, 100 + 10 * i as u64).unwrap())
            .collect()
    }

    #[test]
    fn rejects_degenerate_parameters() {
        let mk = |clients: Vec<Client>, rounds, k| {
            RoundOrchestrator::new(
                clients,
                Strategy::Unconstrained,
                SimTrainer::default(),
                FedAvgAggregator,
                SimEvaluator::default(),
                rounds,
                k,
            )
        };
        assert!(mk(vec![], 5, 2).is_err());
        assert!(mk(pool(4), 0, 2).is_err());
        assert!(mk(pool(4), 5, 0).is_err());
    }

    #[tokio::test]
    async fn tier_strategy_without_tiers_fails_before_any_round() {
        let mut orch = RoundOrchestrator::new(
            pool(6),
            Strategy::FastestTier,
            SimTrainer::default(),
            FedAvgAggregator,
            SimEvaluator::default(),
            5,
            2,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(orch.run(vec![0.0; 8], &mut rng).await.is_err());
    }

    #[tokio::test]
    async fn unconstrained_run_records_every_round() {
        let mut orch = RoundOrchestrator::new(
            pool(8),
            Strategy::Unconstrained,
            SimTrainer::default(),
            FedAvgAggregator,
            SimEvaluator::default(),
            12,
            3,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let metrics = orch.run(vec![0.0; 8], &mut rng).await.unwrap();
        assert_eq!(metrics.len(), 12);
        let mut last_wall = 0.0;
        for record in metrics.records() {
            assert!((0.0..=1.0).contains(&record.accuracy));
            assert!(record.loss >= 0.0);
            assert!(record.training_time > 0.0);
            assert!(record.wall_clock_time >= last_wall);
            last_wall = record.wall_clock_time;
        }
    }
}
