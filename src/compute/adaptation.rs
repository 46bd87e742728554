//! Map-based Bayesian optimization (M-BOA) on a damaged arm.
//!
//! The illumination archive is the Gaussian Process prior: the prior mean of
//! a cell is the task fitness its intact behavior predicts, the prior variance
//! is the kernel self-covariance. Each trial executes one archived controller
//! on the damaged robot, then the posterior over every cell is recomputed from
//! scratch with all trials so far.
//!
//! Residuals are always taken against the prior mean, never the previous
//! posterior mean, so repeated refits cannot drift.

use nalgebra::DVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{
    AdaptationConfig, AdaptationProgress, Behavior, Cell, ConfigError, StopReason, TrialRecord,
};

use super::Robot;
use super::evolution::{Archive, task_fitness};
use super::kernel::Matern52;

/// Singular values below this are dropped by the pseudo-inverse.
const PSEUDO_INVERSE_EPS: f64 = 1e-10;

/// Adaptation errors.
#[derive(Debug, thiserror::Error)]
pub enum AdaptationError {
    #[error("Adaptation needs a non-empty archive")]
    EmptyArchive,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Cell {0:?} is not in the archive")]
    UnknownCell(Cell),
    #[error("Trial budget of {0} already used")]
    BudgetExhausted(usize),
    #[error("Gram matrix pseudo-inverse failed: {0}")]
    PseudoInverse(&'static str),
}

/// Gaussian Process belief about task fitness at one archive cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosteriorEntry {
    pub cell: Cell,
    /// Intact behavior stored in the archive.
    pub behavior: Behavior,
    /// Task fitness predicted by the intact archive.
    pub prior_mean: f64,
    pub mean: f64,
    pub variance: f64,
}

/// Outcome of an adaptation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationResult {
    pub trials: Vec<TrialRecord>,
    pub posterior: Vec<PosteriorEntry>,
    pub best_trial: Option<TrialRecord>,
    pub stop_reason: StopReason,
}

/// Sequential trial selection, evaluation and posterior refit.
pub struct AdaptationEngine<'a> {
    archive: &'a Archive,
    config: AdaptationConfig,
    kernel: Matern52,
    /// One entry per archive cell, in archive order.
    posterior: Vec<PosteriorEntry>,
    trials: Vec<TrialRecord>,
}

impl<'a> AdaptationEngine<'a> {
    /// Seed the posterior from the archive's intact predictions.
    pub fn new(archive: &'a Archive, config: AdaptationConfig) -> Result<Self, AdaptationError> {
        config.validate()?;
        if archive.is_empty() {
            return Err(AdaptationError::EmptyArchive);
        }

        let kernel = Matern52::new(config.length_scale);
        let posterior = archive
            .iter()
            .map(|(cell, entry)| {
                let prior_mean = task_fitness(&entry.behavior, &config.target);
                PosteriorEntry {
                    cell,
                    behavior: entry.behavior,
                    prior_mean,
                    mean: prior_mean,
                    variance: kernel.self_covariance(&entry.behavior),
                }
            })
            .collect();

        Ok(Self {
            archive,
            config,
            kernel,
            posterior,
            trials: Vec::new(),
        })
    }

    pub fn config(&self) -> &AdaptationConfig {
        &self.config
    }

    pub fn posterior(&self) -> &[PosteriorEntry] {
        &self.posterior
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    /// Upper-confidence-bound score of a posterior entry.
    #[inline]
    pub fn acquisition(&self, entry: &PosteriorEntry) -> f64 {
        entry.mean + self.config.kappa * entry.variance
    }

    /// Index of the entry with the highest acquisition. Ties go to the first.
    fn select_index(&self) -> usize {
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, entry) in self.posterior.iter().enumerate() {
            let score = self.acquisition(entry);
            if score > best_score {
                best = i;
                best_score = score;
            }
        }
        best
    }

    /// Cell the next trial would execute.
    pub fn select(&self) -> Cell {
        self.posterior[self.select_index()].cell
    }

    /// Highest acquisition value over the posterior.
    pub fn max_acquisition(&self) -> f64 {
        self.acquisition(&self.posterior[self.select_index()])
    }

    /// Cell the intact archive predicts to be best, i.e. what an unadapted
    /// robot would execute.
    pub fn predicted_best(&self) -> &PosteriorEntry {
        self.posterior
            .iter()
            .fold(&self.posterior[0], |best, entry| {
                if entry.prior_mean > best.prior_mean {
                    entry
                } else {
                    best
                }
            })
    }

    /// Trial with the highest observed task fitness.
    pub fn best_trial(&self) -> Option<&TrialRecord> {
        self.trials.iter().fold(None, |best, trial| match best {
            Some(b) if b.observed >= trial.observed => best,
            _ => Some(trial),
        })
    }

    /// Append an observation for an archive cell without refitting.
    pub fn record_trial(
        &mut self,
        cell: Cell,
        observed: f64,
    ) -> Result<TrialRecord, AdaptationError> {
        let entry = self
            .archive
            .lookup(cell)
            .ok_or(AdaptationError::UnknownCell(cell))?;
        let record = TrialRecord {
            cell,
            behavior: entry.behavior,
            observed,
        };
        self.trials.push(record);
        Ok(record)
    }

    /// Recompute the posterior of every cell from all trials.
    pub fn refit(&mut self) -> Result<(), AdaptationError> {
        if self.trials.is_empty() {
            let kernel = self.kernel;
            for entry in &mut self.posterior {
                entry.mean = entry.prior_mean;
                entry.variance = kernel.self_covariance(&entry.behavior);
            }
            return Ok(());
        }

        let points: Vec<Behavior> = self.trials.iter().map(|t| t.behavior).collect();
        let gram = self.kernel.gram(&points, self.config.noise);
        let gram_inv = gram
            .pseudo_inverse(PSEUDO_INVERSE_EPS)
            .map_err(AdaptationError::PseudoInverse)?;

        let target = self.config.target;
        let residuals = DVector::from_iterator(
            self.trials.len(),
            self.trials
                .iter()
                .map(|t| t.observed - task_fitness(&t.behavior, &target)),
        );
        let weights = &gram_inv * residuals;

        let kernel = self.kernel;
        self.posterior.par_iter_mut().for_each(|entry| {
            let k = kernel.cross(&entry.behavior, &points);
            entry.mean = entry.prior_mean + k.dot(&weights);
            // Rounding can push a fully explained variance just below zero.
            entry.variance =
                (kernel.self_covariance(&entry.behavior) - k.dot(&(&gram_inv * &k))).max(0.0);
        });

        Ok(())
    }

    /// Select, execute on `robot`, record and refit.
    pub fn step<R: Robot + ?Sized>(&mut self, robot: &R) -> Result<TrialRecord, AdaptationError> {
        if self.trials.len() >= self.config.max_trials {
            return Err(AdaptationError::BudgetExhausted(self.config.max_trials));
        }

        let cell = self.select();
        let controller = &self
            .archive
            .lookup(cell)
            .ok_or(AdaptationError::UnknownCell(cell))?
            .controller;
        let reached = robot.execute(controller);
        let observed = task_fitness(&reached, &self.config.target);

        let record = self.record_trial(cell, observed)?;
        self.refit()?;

        log::info!(
            "Trial {}: cell ({}, {}) reached ({:.3}, {:.3}), fitness {:.4}",
            self.trials.len(),
            cell.x,
            cell.y,
            reached.x,
            reached.y,
            observed
        );
        Ok(record)
    }

    /// Whether adaptation is over, and why.
    pub fn should_stop(&self) -> Option<StopReason> {
        if self
            .best_trial()
            .is_some_and(|t| t.observed > self.config.success_threshold)
        {
            return Some(StopReason::Success);
        }
        if self.trials.len() >= self.config.max_trials {
            return Some(StopReason::Budget);
        }
        None
    }

    /// Run adaptation (blocking).
    pub fn run<R: Robot + ?Sized>(
        &mut self,
        robot: &R,
    ) -> Result<AdaptationResult, AdaptationError> {
        self.run_with_callback(robot, |_| {})
    }

    /// Run adaptation with a callback after every trial.
    pub fn run_with_callback<R, F>(
        &mut self,
        robot: &R,
        callback: F,
    ) -> Result<AdaptationResult, AdaptationError>
    where
        R: Robot + ?Sized,
        F: Fn(&AdaptationProgress),
    {
        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            let record = self.step(robot)?;
            callback(&AdaptationProgress {
                trial: self.trials.len(),
                record,
                best_observed: self.best_trial().map_or(record.observed, |t| t.observed),
                max_acquisition: self.max_acquisition(),
            });
        };

        let best_trial = self.best_trial().copied();
        log::info!(
            "Adaptation stopped after {} trials ({:?}), best fitness {:.4}",
            self.trials.len(),
            stop_reason,
            best_trial.map_or(f64::NEG_INFINITY, |t| t.observed)
        );

        Ok(AdaptationResult {
            trials: self.trials.clone(),
            posterior: self.posterior.clone(),
            best_trial,
            stop_reason,
        })
    }
}
