//! Credit-constrained, accuracy-adaptive tier scheduler.
//!
//! Each tier starts with an equal selection probability and a fixed credit
//! budget. Selecting a tier consumes one credit; when every tier is
//! exhausted the pool resets atomically. Every `interval` rounds the
//! probability table is rebalanced: a tier whose most recent recorded
//! accuracy regressed gets its probability decayed, then the table is
//! renormalized to sum to 1.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::debug;

use crate::{Error, Result};

/// Multiplier applied to a tier's probability when its accuracy regresses.
const PROB_DECAY: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct AdaptiveScheduler {
    credits: Vec<u32>,
    initial_credits: u32,
    probs: Vec<f64>,
    histories: Vec<Vec<f64>>,
    interval: u32,
}

impl AdaptiveScheduler {
    pub fn new(num_tiers: usize, interval: u32, initial_credits: u32) -> Result<Self> {
        if num_tiers < 1 {
            return Err(Error::Config("scheduler needs at least one tier".into()));
        }
        if interval < 1 {
            return Err(Error::Config("rebalance interval must be at least 1".into()));
        }
        if initial_credits < 1 {
            return Err(Error::Config("initial_credits must be at least 1".into()));
        }
        Ok(Self {
            credits: vec![initial_credits; num_tiers],
            initial_credits,
            probs: vec![1.0 / num_tiers as f64; num_tiers],
            histories: vec![Vec::new(); num_tiers],
            interval,
        })
    }

    /// Picks the tier for `round` and consumes one of its credits.
    ///
    /// The draw samples the probability table restricted to tiers that still
    /// hold credit (renormalized over that subset), so a single draw always
    /// lands on a feasible tier; an exhausted pool resets first. This keeps
    /// the intent of the probability table without an unbounded retry loop.
    pub fn select_tier<R: Rng>(&mut self, round: u32, rng: &mut R) -> usize {
        if round > 0 && round % self.interval == 0 {
            self.rebalance();
        }
        if self.credits.iter().all(|&c| c == 0) {
            debug!("all tier credits exhausted, resetting pool");
            self.reset_credits();
        }
        let feasible: Vec<usize> =
            (0..self.credits.len()).filter(|&t| self.credits[t] > 0).collect();
        let weights: Vec<f64> = feasible.iter().map(|&t| self.probs[t]).collect();
        let drawn = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            // Degenerate mass on the feasible subset: fall back to uniform.
            Err(_) => rng.gen_range(0..feasible.len()),
        };
        let tier = feasible[drawn];
        self.credits[tier] -= 1;
        debug!(tier, credits_left = self.credits[tier], "tier selected");
        tier
    }

    /// Records the accuracy observed for the tier used this round.
    pub fn update_tier_accuracy(&mut self, tier: usize, accuracy: f64) {
        if let Some(history) = self.histories.get_mut(tier) {
            history.push(accuracy);
        }
    }

    /// Decays the probability of every tier whose latest accuracy dropped
    /// below its previous one, then renormalizes. Gated on tier 0's history
    /// depth, matching the reference behavior: if tier 0 is rarely selected
    /// the rebalance is skipped even when other tiers have history.
    fn rebalance(&mut self) {
        if self.histories[0].len() <= 1 {
            return;
        }
        for (tier, history) in self.histories.iter().enumerate() {
            if let [.., prev, last] = history.as_slice() {
                if last < prev {
                    self.probs[tier] *= PROB_DECAY;
                    debug!(tier, prob = self.probs[tier], "tier probability decayed");
                }
            }
        }
        let total: f64 = self.probs.iter().sum();
        for p in &mut self.probs {
            *p /= total;
        }
    }

    fn reset_credits(&mut self) {
        for c in &mut self.credits {
            *c = self.initial_credits;
        }
    }

    pub fn credits(&self) -> &[u32] {
        &self.credits
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    pub fn history(&self, tier: usize) -> &[f64] {
        self.histories.get(tier).map(Vec::as_slice).unwrap_or(&[])
    }
}
