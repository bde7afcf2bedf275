//! Client selection strategies.
//!
//! Every strategy samples without replacement. Tier-scoped strategies clamp
//! the requested count to the tier's size (graceful degradation); the
//! unconstrained strategy over the full population treats an oversized
//! request as a configuration error.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::client::ClientId;
use crate::scheduler::AdaptiveScheduler;
use crate::tiering::Tier;
use crate::{Error, Result};

/// The closed set of selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Uniform sample from the whole population, ignoring tiers.
    Unconstrained,
    /// One tier picked uniformly at random, then sampled.
    UniformTier,
    /// Always tier 0.
    FastestTier,
    /// Always the highest-index tier.
    SlowestTier,
    /// Tier chosen by the credit-constrained adaptive scheduler.
    Adaptive,
}

/// A round's participant draw. `tier` is set only by the adaptive strategy
/// so the caller can report the round's accuracy back to the scheduler.
#[derive(Debug, Clone)]
pub struct Selection {
    pub clients: Vec<ClientId>,
    pub tier: Option<usize>,
}

impl Strategy {
    /// Dispatches to the strategy's sampler. Tier-scoped strategies require
    /// `tiers`; the adaptive strategy additionally requires `scheduler`.
    pub fn select<R: Rng>(
        &self,
        population: &[ClientId],
        tiers: Option<&[Tier]>,
        scheduler: Option<&mut AdaptiveScheduler>,
        k: usize,
        round: u32,
        rng: &mut R,
    ) -> Result<Selection> {
        match self {
            Strategy::Unconstrained => Ok(Selection {
                clients: unconstrained(population, k, rng)?,
                tier: None,
            }),
            Strategy::UniformTier => {
                let tiers = require_tiers(tiers)?;
                let tier = tiers
                    .get(rng.gen_range(0..tiers.len()))
                    .ok_or_else(|| Error::Config("empty tier list".into()))?;
                Ok(Selection { clients: sample_tier(tier, k, rng), tier: None })
            }
            Strategy::FastestTier => {
                let tiers = require_tiers(tiers)?;
                let tier = tiers.first().ok_or_else(|| Error::Config("empty tier list".into()))?;
                Ok(Selection { clients: sample_tier(tier, k, rng), tier: None })
            }
            Strategy::SlowestTier => {
                let tiers = require_tiers(tiers)?;
                let tier = tiers.last().ok_or_else(|| Error::Config("empty tier list".into()))?;
                Ok(Selection { clients: sample_tier(tier, k, rng), tier: None })
            }
            Strategy::Adaptive => {
                let tiers = require_tiers(tiers)?;
                let scheduler = scheduler.ok_or_else(|| {
                    Error::Config("adaptive strategy requires a scheduler".into())
                })?;
                let tier_id = scheduler.select_tier(round, rng);
                let tier = tiers.get(tier_id).ok_or_else(|| {
                    Error::Config(format!("scheduler chose unknown tier {tier_id}"))
                })?;
                Ok(Selection { clients: sample_tier(tier, k, rng), tier: Some(tier_id) })
            }
        }
    }
}

fn require_tiers<'a>(tiers: Option<&'a [Tier]>) -> Result<&'a [Tier]> {
    tiers.ok_or_else(|| Error::Config("strategy requires profiled tiers".into()))
}

/// `k` distinct ids uniformly from the full population. `k` must not exceed
/// the population size.
pub fn unconstrained<R: Rng>(
    population: &[ClientId],
    k: usize,
    rng: &mut R,
) -> Result<Vec<ClientId>> {
    if k > population.len() {
        return Err(Error::Config(format!(
            "cannot select {k} clients from a population of {}",
            population.len()
        )));
    }
    Ok(population.choose_multiple(rng, k).cloned().collect())
}

/// `min(k, tier size)` distinct ids from one tier.
fn sample_tier<R: Rng>(tier: &Tier, k: usize, rng: &mut R) -> Vec<ClientId> {
    let take = k.min(tier.clients.len());
    tier.clients.choose_multiple(rng, take).cloned().collect()
}
