//! MAP-Elites illumination of the intact arm's behavior space.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::compute::Arm;
use crate::schema::{
    ConfigError, Controller, ExperimentConfig, IlluminationConfig, IlluminationProgress,
    IlluminationStats, StopReason,
};

use super::archive::{Archive, ArchiveError};
use super::fitness::{Evaluation, FitnessEvaluator};
use super::mutation::ControllerRng;

/// Illumination errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Drives archive population: random bootstrap, then mutation of archived
/// controllers.
pub struct IlluminationSearch {
    config: IlluminationConfig,
    evaluator: FitnessEvaluator,
    joints: usize,
    rng: ControllerRng,
    cancelled: Arc<AtomicBool>,
}

impl IlluminationSearch {
    /// Create a search from a validated experiment configuration.
    pub fn new(config: &ExperimentConfig) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self::with_parts(
            config.illumination.clone(),
            Arm::from_config(&config.arm),
            ControllerRng::from_optional_seed(config.random_seed),
        ))
    }

    /// Create a search from its parts without validation.
    pub fn with_parts(config: IlluminationConfig, arm: Arm, rng: ControllerRng) -> Self {
        Self {
            config,
            evaluator: FitnessEvaluator::new(arm),
            joints: arm.joints(),
            rng,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Run illumination (blocking).
    pub fn run(&mut self, archive: &mut Archive) -> Result<IlluminationStats, SearchError> {
        self.run_with_callback(archive, |_| {})
    }

    /// Run illumination with progress callback.
    pub fn run_with_callback<F>(
        &mut self,
        archive: &mut Archive,
        callback: F,
    ) -> Result<IlluminationStats, SearchError>
    where
        F: Fn(&IlluminationProgress),
    {
        log::info!(
            "Illumination: {} iterations ({} bootstrap), batch size {}",
            self.config.iterations,
            self.config.bootstrap,
            self.config.batch_size
        );
        let start_time = Instant::now();

        let (iterations, improvements, stop_reason) = if self.config.batch_size == 0 {
            self.run_sequential(archive, &callback)?
        } else {
            self.run_batched(archive, &callback)?
        };

        let elapsed = start_time.elapsed().as_secs_f64();
        let stats = IlluminationStats {
            iterations,
            improvements,
            filled_cells: archive.len(),
            elapsed_seconds: elapsed,
            evaluations_per_second: iterations as f64 / elapsed.max(f64::EPSILON),
            stop_reason,
        };
        log::info!(
            "Illumination finished: {} cells filled ({:.2}% coverage), {} improvements, {:?}",
            stats.filled_cells,
            archive.coverage() * 100.0,
            stats.improvements,
            stats.stop_reason
        );
        Ok(stats)
    }

    /// One evaluation and one archive update per iteration, in order.
    fn run_sequential<F>(
        &mut self,
        archive: &mut Archive,
        callback: &F,
    ) -> Result<(usize, usize, StopReason), SearchError>
    where
        F: Fn(&IlluminationProgress),
    {
        let report_interval = self.config.report_interval.max(1);
        let mut improvements = 0;

        for i in 0..self.config.iterations {
            if self.cancelled.load(Ordering::Relaxed) {
                return Ok((i, improvements, StopReason::Cancelled));
            }

            let controller = if i < self.config.bootstrap {
                self.rng.random_controller(self.joints)
            } else {
                let parent = archive.sample_random_entry(&mut self.rng)?;
                self.rng.perturb(&parent.controller, &self.config.mutation)
            };

            if archive.offer(self.evaluator.evaluate(controller))? {
                improvements += 1;
            }

            if (i + 1) % report_interval == 0 {
                self.report(archive, i + 1, callback);
            }
        }

        Ok((self.config.iterations, improvements, StopReason::IterationsExhausted))
    }

    /// Batches evaluated in parallel, merged in iteration order.
    ///
    /// Parents for a batch come from the archive as it was when the batch
    /// started. Bootstrap and mutation iterations never share a batch.
    fn run_batched<F>(
        &mut self,
        archive: &mut Archive,
        callback: &F,
    ) -> Result<(usize, usize, StopReason), SearchError>
    where
        F: Fn(&IlluminationProgress),
    {
        let total = self.config.iterations;
        let bootstrap = self.config.bootstrap.min(total);
        let batch_size = self.config.batch_size;
        let mutation = self.config.mutation;
        let joints = self.joints;
        let evaluator = self.evaluator;

        let mut improvements = 0;
        let mut start = 0;

        while start < total {
            if self.cancelled.load(Ordering::Relaxed) {
                return Ok((start, improvements, StopReason::Cancelled));
            }

            let end = if start < bootstrap {
                (start + batch_size).min(bootstrap)
            } else {
                (start + batch_size).min(total)
            };

            let tasks: Vec<(u64, Option<Controller>)> = if start < bootstrap {
                (start..end).map(|_| (self.rng.next_seed(), None)).collect()
            } else {
                (start..end)
                    .map(|_| -> Result<(u64, Option<Controller>), ArchiveError> {
                        let parent = archive.sample_random_entry(&mut self.rng)?;
                        Ok((self.rng.next_seed(), Some(parent.controller.clone())))
                    })
                    .collect::<Result<_, ArchiveError>>()?
            };

            let candidates: Vec<Evaluation> = tasks
                .into_par_iter()
                .map(|(seed, parent)| {
                    let mut rng = ControllerRng::new(seed);
                    let controller = match parent {
                        Some(parent) => rng.perturb(&parent, &mutation),
                        None => rng.random_controller(joints),
                    };
                    evaluator.evaluate(controller)
                })
                .collect();

            for candidate in candidates {
                if archive.offer(candidate)? {
                    improvements += 1;
                }
            }

            log::debug!(
                "Illumination batch {}..{}: {} cells filled",
                start,
                end,
                archive.len()
            );
            self.report(archive, end, callback);
            start = end;
        }

        Ok((total, improvements, StopReason::IterationsExhausted))
    }

    fn report<F>(&self, archive: &Archive, iteration: usize, callback: &F)
    where
        F: Fn(&IlluminationProgress),
    {
        let progress = IlluminationProgress {
            iteration,
            total_iterations: self.config.iterations,
            filled_cells: archive.len(),
            coverage: archive.coverage(),
            best_performance: archive
                .best()
                .map_or(f64::NEG_INFINITY, |(_, entry)| entry.performance),
        };
        log::debug!(
            "Illumination {}/{}: {} cells, best {:.5}",
            progress.iteration,
            progress.total_iterations,
            progress.filled_cells,
            progress.best_performance
        );
        callback(&progress);
    }
}
