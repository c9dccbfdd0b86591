//! Escalation state machine over simulation resolution.

use serde::{Deserialize, Serialize};

use crate::config::{Config, EscalationLevel};
use crate::error::{Error, Result};
use crate::permutation::{counter_rng_seed, SimulationBatch};

/// Outcome of one resolution level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    /// Trials requested at this level.
    pub n_trials: usize,
    /// Trials that produced a statistic.
    pub n_valid: usize,
    /// Valid trials at least as extreme as the observed statistic.
    pub exceed: usize,
    /// Whether this level triggered a re-run at the next level.
    pub escalated: bool,
}

/// Final state of the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveOutcome {
    /// `(1 + exceed) / (1 + n_valid)` at the terminal level.
    pub p: f64,
    /// Exceedances at the terminal level.
    pub exceed: usize,
    /// Trials requested at the terminal level.
    pub n_trials: usize,
    /// Valid trials at the terminal level.
    pub n_valid: usize,
    /// Every level visited, in order.
    pub levels: Vec<LevelSummary>,
    /// Simulation batch of the terminal level.
    pub batch: SimulationBatch,
}

/// Runs a simulation at increasing resolution until the evidence is settled.
///
/// Level `k` asks for `schedule[k].n_trials` trials. If fewer than
/// `schedule[k].min_exceed` of them reach the observed statistic the whole
/// simulation is re-run at level `k + 1`; earlier batches are discarded, not
/// merged. The last level always terminates.
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    schedule: Vec<EscalationLevel>,
    seed: u64,
}

impl AdaptiveController {
    /// Controller for `schedule`, seeding level `k` from `counter_rng_seed(seed, k)`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSchedule`] if the schedule is empty, has a zero-trial
    /// level, or is not strictly increasing.
    pub fn new(schedule: Vec<EscalationLevel>, seed: u64) -> Result<Self> {
        if schedule.is_empty() {
            return Err(Error::InvalidSchedule("no levels".into()));
        }
        if schedule.iter().any(|level| level.n_trials == 0) {
            return Err(Error::InvalidSchedule("level with zero trials".into()));
        }
        if let Some(pair) = schedule
            .windows(2)
            .find(|pair| pair[0].n_trials >= pair[1].n_trials)
        {
            return Err(Error::InvalidSchedule(format!(
                "{} trials followed by {}",
                pair[0].n_trials, pair[1].n_trials
            )));
        }
        Ok(Self { schedule, seed })
    }

    /// Controller using the schedule and seed in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.schedule.clone(), config.seed)
    }

    /// Levels this controller may visit.
    pub fn schedule(&self) -> &[EscalationLevel] {
        &self.schedule
    }

    /// Drive `simulate(n_trials, seed)` through the schedule.
    ///
    /// `observed` is compared in absolute value against every trial statistic.
    ///
    /// # Errors
    ///
    /// - Any error returned by `simulate`.
    /// - [`Error::NoValidTrials`] if a level keeps no trials.
    pub fn run<S>(&self, observed: f64, mut simulate: S) -> Result<AdaptiveOutcome>
    where
        S: FnMut(usize, u64) -> Result<SimulationBatch>,
    {
        let mut levels = Vec::with_capacity(self.schedule.len());
        let last = self.schedule.len() - 1;
        let mut k = 0;
        loop {
            let level = self.schedule[k];
            let batch = simulate(level.n_trials, counter_rng_seed(self.seed, k as u64))?;
            let n_valid = batch.n_valid();
            if n_valid == 0 {
                return Err(Error::NoValidTrials {
                    n_trials: level.n_trials,
                });
            }
            let exceed = batch.exceedances(observed);
            let escalated = k < last && exceed < level.min_exceed;
            tracing::debug!(
                level = k,
                n_trials = level.n_trials,
                n_valid,
                exceed,
                escalated,
                "simulation level finished"
            );
            levels.push(LevelSummary {
                n_trials: level.n_trials,
                n_valid,
                exceed,
                escalated,
            });
            if !escalated {
                return Ok(AdaptiveOutcome {
                    p: (1 + exceed) as f64 / (1 + n_valid) as f64,
                    exceed,
                    n_trials: level.n_trials,
                    n_valid,
                    levels,
                    batch,
                });
            }
            k += 1;
        }
    }
}
