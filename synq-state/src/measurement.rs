//! Born-rule sampling in the computational basis
//!
//! Sampling builds a Walker alias table over the non-zero part of the
//! distribution (O(2^n) setup) and then draws each shot in O(1). Outcomes
//! with zero probability are never produced.

use crate::error::{Result, StateError};
use crate::state::bitstring;
use std::collections::HashMap;

/// Counts from a multi-shot sampling run
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingResult {
    /// Map from basis state index to count
    pub counts: HashMap<usize, usize>,

    /// Total number of shots
    pub shots: usize,

    /// Index drawn by the final shot
    pub last_outcome: Option<usize>,
}

impl SamplingResult {
    pub fn new(shots: usize) -> Self {
        Self {
            counts: HashMap::new(),
            shots,
            last_outcome: None,
        }
    }

    /// Record one shot
    pub fn add_outcome(&mut self, outcome: usize) {
        *self.counts.entry(outcome).or_insert(0) += 1;
        self.last_outcome = Some(outcome);
    }

    pub fn get_count(&self, outcome: usize) -> usize {
        self.counts.get(&outcome).copied().unwrap_or(0)
    }

    /// Observed frequency of an outcome (count / shots)
    pub fn get_probability(&self, outcome: usize) -> f64 {
        if self.shots == 0 {
            return 0.0;
        }
        self.get_count(outcome) as f64 / self.shots as f64
    }

    /// Outcomes by count, descending; ties broken by index
    pub fn sorted_outcomes(&self) -> Vec<(usize, usize)> {
        let mut outcomes: Vec<_> = self.counts.iter().map(|(&k, &v)| (k, v)).collect();
        outcomes.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        outcomes
    }

    /// Counts keyed by MSB-first bitstring
    pub fn to_bitstring_counts(&self, num_qubits: usize) -> HashMap<String, usize> {
        self.counts
            .iter()
            .map(|(&outcome, &count)| (bitstring(outcome, num_qubits), count))
            .collect()
    }
}

/// Draw `shots` independent samples from `probabilities`.
///
/// `rng` must return uniform values in `[0, 1)`.
pub fn sample(
    probabilities: &[f64],
    shots: usize,
    rng: &mut dyn FnMut() -> f64,
) -> Result<SamplingResult> {
    let table = AliasTable::new(probabilities)?;
    let mut result = SamplingResult::new(shots);
    for _ in 0..shots {
        result.add_outcome(table.sample(rng));
    }
    Ok(result)
}

/// Index of the largest probability (first on ties)
pub fn most_likely(probabilities: &[f64]) -> Option<(usize, f64)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, p)| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((i, p)),
        })
}

/// Walker alias table over the support of a distribution
#[derive(Debug, Clone)]
pub struct AliasTable {
    /// Basis index for each slot
    outcomes: Vec<usize>,

    /// Probability threshold for each slot
    prob: Vec<f64>,

    /// Alias slot for each slot
    alias: Vec<usize>,
}

impl AliasTable {
    /// Build a table from a (not necessarily normalized) distribution
    pub fn new(probabilities: &[f64]) -> Result<Self> {
        let outcomes: Vec<usize> = probabilities
            .iter()
            .enumerate()
            .filter(|(_, &p)| p > 0.0)
            .map(|(i, _)| i)
            .collect();
        if outcomes.is_empty() {
            return Err(StateError::NotNormalized { norm: 0.0 });
        }

        let n = outcomes.len();
        let total: f64 = outcomes.iter().map(|&i| probabilities[i]).sum();
        let mut scaled: Vec<f64> = outcomes
            .iter()
            .map(|&i| probabilities[i] * n as f64 / total)
            .collect();

        let mut prob = vec![0.0; n];
        let mut alias: Vec<usize> = (0..n).collect();
        let (mut small, mut large): (Vec<usize>, Vec<usize>) = (0..n).partition(|&i| scaled[i] < 1.0);

        loop {
            let (Some(&s), Some(&l)) = (small.last(), large.last()) else {
                break;
            };
            small.pop();
            prob[s] = scaled[s];
            alias[s] = l;
            scaled[l] = (scaled[l] + scaled[s]) - 1.0;
            if scaled[l] < 1.0 {
                large.pop();
                small.push(l);
            }
        }

        // leftovers are 1 up to rounding
        for i in small.into_iter().chain(large) {
            prob[i] = 1.0;
        }

        Ok(Self {
            outcomes,
            prob,
            alias,
        })
    }

    /// Sample a basis index in O(1)
    pub fn sample(&self, rng: &mut dyn FnMut() -> f64) -> usize {
        let n = self.prob.len();
        let slot = ((rng() * n as f64) as usize).min(n - 1);
        let chosen = if rng() < self.prob[slot] {
            slot
        } else {
            self.alias[slot]
        };
        self.outcomes[chosen]
    }
}
