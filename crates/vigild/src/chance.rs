//! Injectable randomness for simulated health noise and repair outcomes.
//!
//! Production runs use a seeded or entropy-backed generator. Tests swap in
//! [`FixedChance`] or [`ScriptedChance`] to force exact outcomes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Source of yes/no decisions with a given probability
pub trait Chance: Send + Sync {
    /// Returns true with probability `probability` (clamped to 0.0..=1.0)
    fn roll(&self, probability: f64) -> bool;
}

/// Generator-backed chance source
pub struct RandomChance {
    rng: Mutex<StdRng>,
}

impl RandomChance {
    /// Deterministic sequence for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl Chance for RandomChance {
    fn roll(&self, probability: f64) -> bool {
        let p = probability.clamp(0.0, 1.0);
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        // A poisoned lock only means another roll panicked mid-draw; the
        // generator state itself is still usable.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_bool(p)
    }
}

/// Always answers the same, regardless of probability
#[derive(Debug, Clone, Copy)]
pub struct FixedChance(pub bool);

impl FixedChance {
    pub fn always() -> Self {
        Self(true)
    }

    pub fn never() -> Self {
        Self(false)
    }
}

impl Chance for FixedChance {
    fn roll(&self, _probability: f64) -> bool {
        self.0
    }
}

/// Replays a queue of outcomes, then falls back to a default
pub struct ScriptedChance {
    outcomes: Mutex<VecDeque<bool>>,
    fallback: bool,
}

impl ScriptedChance {
    pub fn new(outcomes: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            fallback,
        }
    }
}

impl Chance for ScriptedChance {
    fn roll(&self, _probability: f64) -> bool {
        let mut outcomes = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
        outcomes.pop_front().unwrap_or(self.fallback)
    }
}
