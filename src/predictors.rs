//! Access predictors: likelihood oracles for near-future key accesses.
//!
//! Strategies:
//! 1. Distance decay: nearby keys are likely, falling off geometrically
//! 2. Dynamic distance decay: same, biased toward the direction of travel
//! 3. Dynamic data: scores a fixed set of navigation jumps, boosted by
//!    the jumps actually observed in recent history

use std::collections::HashMap;

use crate::Key;

/// Navigation steps a frame-scrubbing UI typically offers.
pub const DEFAULT_NAVIGATION_JUMPS: [i64; 7] = [-15, -5, -1, 1, 5, 15, 30];

/// Likelihood oracle for the cache's prediction driver.
///
/// Implementations must be thread-safe and cheap: `likelihoods` runs on
/// the worker's reconciliation path. An empty map means "no speculation";
/// an `Err` skips the current reconciliation pass without disturbing the
/// cache.
pub trait AccessPredictor: Send + Sync + 'static {
    fn likelihoods(&self, current: Key, history: &[Key]) -> anyhow::Result<HashMap<Key, f64>>;
}

fn offset_key(current: Key, delta: i64) -> Option<Key> {
    current.checked_add_signed(delta)
}

/// Most recent step direction: +1 forward, -1 backward, defaulting to
/// forward when the history holds fewer than two entries.
fn travel_direction(history: &[Key]) -> i64 {
    match history {
        [.., previous, last] if last < previous => -1,
        _ => 1,
    }
}

/// Symmetric geometric decay around the current key.
#[derive(Debug, Clone)]
pub struct DistanceDecayPredictor {
    lookahead: u32,
    decay: f64,
}

impl DistanceDecayPredictor {
    pub fn new(lookahead: u32, decay: f64) -> Self {
        Self { lookahead, decay }
    }
}

impl Default for DistanceDecayPredictor {
    fn default() -> Self {
        Self::new(10, 0.8)
    }
}

impl AccessPredictor for DistanceDecayPredictor {
    fn likelihoods(&self, current: Key, _history: &[Key]) -> anyhow::Result<HashMap<Key, f64>> {
        let mut scores = HashMap::new();
        for distance in 1..=self.lookahead {
            let score = self.decay.powi(distance as i32 - 1);
            for delta in [distance as i64, -(distance as i64)] {
                if let Some(key) = offset_key(current, delta) {
                    scores.insert(key, score);
                }
            }
        }
        Ok(scores)
    }
}

/// Distance decay with the direction of recent travel boosted.
#[derive(Debug, Clone)]
pub struct DynamicDistanceDecayPredictor {
    lookahead: u32,
    decay: f64,
    forward_bias: f64,
}

impl DynamicDistanceDecayPredictor {
    pub fn new(lookahead: u32, decay: f64, forward_bias: f64) -> Self {
        Self {
            lookahead,
            decay,
            forward_bias,
        }
    }
}

impl Default for DynamicDistanceDecayPredictor {
    fn default() -> Self {
        Self::new(10, 0.8, 2.0)
    }
}

impl AccessPredictor for DynamicDistanceDecayPredictor {
    fn likelihoods(&self, current: Key, history: &[Key]) -> anyhow::Result<HashMap<Key, f64>> {
        let direction = travel_direction(history);
        let mut scores = HashMap::new();
        for distance in 1..=self.lookahead {
            let base = self.decay.powi(distance as i32 - 1);
            for delta in [distance as i64, -(distance as i64)] {
                let Some(key) = offset_key(current, delta) else {
                    continue;
                };
                let score = if delta.signum() == direction {
                    base * self.forward_bias
                } else {
                    base
                };
                scores.insert(key, score);
            }
        }
        Ok(scores)
    }
}

/// Scores a configured set of navigation jumps, weighting each jump by
/// how often it actually occurred in the recent access history.
#[derive(Debug, Clone)]
pub struct DynamicDataPredictor {
    possible_jumps: Vec<i64>,
}

impl DynamicDataPredictor {
    pub fn new(possible_jumps: impl Into<Vec<i64>>) -> Self {
        Self {
            possible_jumps: possible_jumps.into(),
        }
    }

    /// Count how often each configured jump appears among consecutive
    /// history deltas.
    fn observed_jumps(&self, history: &[Key]) -> HashMap<i64, usize> {
        let mut counts = HashMap::new();
        for pair in history.windows(2) {
            let delta = pair[1] as i64 - pair[0] as i64;
            if self.possible_jumps.contains(&delta) {
                *counts.entry(delta).or_insert(0) += 1;
            }
        }
        counts
    }
}

impl Default for DynamicDataPredictor {
    fn default() -> Self {
        Self::new(DEFAULT_NAVIGATION_JUMPS)
    }
}

impl AccessPredictor for DynamicDataPredictor {
    fn likelihoods(&self, current: Key, history: &[Key]) -> anyhow::Result<HashMap<Key, f64>> {
        let observed = self.observed_jumps(history);
        let mut scores = HashMap::new();
        for &jump in &self.possible_jumps {
            if jump == 0 {
                continue;
            }
            let Some(key) = offset_key(current, jump) else {
                continue;
            };
            let base = 1.0 / jump.unsigned_abs() as f64;
            let boost = *observed.get(&jump).unwrap_or(&0) as f64;
            scores.insert(key, base * (1.0 + boost));
        }
        Ok(scores)
    }
}
