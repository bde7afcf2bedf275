//! Latency profiling and tier construction.
//!
//! Profiling measures each client's simulated per-round latency by running a
//! handful of training passes and averaging elapsed time scaled by the
//! client's capacity. Tiers then bucket clients by ascending latency: tier 0
//! holds the fastest clients, the last tier the slowest plus any remainder.

use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::client::{Client, ClientId};
use crate::training::Trainer;
use crate::{Error, Result};

/// A latency-ordered bucket of clients. Tiers partition the profiled set:
/// member sets are disjoint and their union is the full input.
#[derive(Debug, Clone)]
pub struct Tier {
    pub id: usize,
    pub clients: Vec<ClientId>,
    pub avg_latency: f64,
}

/// Measures each client's mean simulated latency over `sync_rounds`
/// profiling passes. Each pass's elapsed time is divided by the client's
/// capacity factor before averaging.
pub async fn profile_clients<T: Trainer + ?Sized>(
    trainer: &T,
    clients: &[Client],
    global_weights: &[f32],
    sync_rounds: u32,
) -> Result<HashMap<ClientId, f64>> {
    if sync_rounds < 1 {
        return Err(Error::Profiling(format!(
            "sync_rounds must be at least 1, got {sync_rounds}"
        )));
    }
    if clients.is_empty() {
        return Err(Error::Profiling("no clients to profile".into()));
    }
    let mut latencies = HashMap::with_capacity(clients.len());
    for client in clients {
        let mut total = 0.0;
        for _ in 0..sync_rounds {
            let update = trainer.train(global_weights, client).await?;
            total += update.elapsed_secs / client.capacity;
        }
        let mean = total / f64::from(sync_rounds);
        debug!(client = %client.id, latency = mean, "profiled client");
        latencies.insert(client.id.clone(), mean);
    }
    Ok(latencies)
}

/// Splits profiled clients into `num_tiers` buckets by ascending latency,
/// ties broken by client id so the layout is deterministic. The first
/// `num_tiers - 1` tiers take `floor(N / num_tiers)` clients each; the last
/// tier absorbs the remainder.
pub fn build_tiers(latencies: &HashMap<ClientId, f64>, num_tiers: usize) -> Result<Vec<Tier>> {
    if num_tiers < 1 {
        return Err(Error::Config("num_tiers must be at least 1".into()));
    }
    let n = latencies.len();
    if n < num_tiers {
        return Err(Error::Config(format!(
            "{n} profiled clients cannot fill {num_tiers} tiers"
        )));
    }

    let mut sorted: Vec<(&ClientId, f64)> = latencies.iter().map(|(id, &l)| (id, l)).collect();
    sorted.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let base = n / num_tiers;
    let mut tiers = Vec::with_capacity(num_tiers);
    for tier_id in 0..num_tiers {
        let start = tier_id * base;
        let end = if tier_id + 1 < num_tiers { start + base } else { n };
        let members = &sorted[start..end];
        let avg_latency = members.iter().map(|(_, l)| l).sum::<f64>() / members.len() as f64;
        tiers.push(Tier {
            id: tier_id,
            clients: members.iter().map(|(id, _)| (*id).clone()).collect(),
            avg_latency,
        });
    }
    Ok(tiers)
}
