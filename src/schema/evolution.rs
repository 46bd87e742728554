//! Search and adaptation configuration, plus the progress/result types the
//! two phases report.
//!
//! Illumination (MAP-Elites) fills the behavior archive on the intact arm.
//! Adaptation (M-BOA) then uses that archive as a Gaussian Process prior and
//! runs a handful of trials on the damaged arm.

use serde::{Deserialize, Serialize};

use super::{Behavior, Cell, ConfigError};

/// MAP-Elites illumination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IlluminationConfig {
    /// Total number of evaluations.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Leading iterations that sample fully random controllers.
    #[serde(default = "default_bootstrap")]
    pub bootstrap: usize,
    /// Polynomial mutation settings.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Iterations per parallel batch. 0 runs the strictly sequential loop.
    #[serde(default)]
    pub batch_size: usize,
    /// Progress callback interval for the sequential loop.
    #[serde(default = "default_report_interval")]
    pub report_interval: usize,
}

impl Default for IlluminationConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            bootstrap: default_bootstrap(),
            mutation: MutationConfig::default(),
            batch_size: 0,
            report_interval: default_report_interval(),
        }
    }
}

fn default_iterations() -> usize {
    2_000_000
}
fn default_bootstrap() -> usize {
    400
}
fn default_report_interval() -> usize {
    100_000
}

/// Polynomial mutation parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Distribution index (eta). Larger values keep children closer to the parent.
    #[serde(default = "default_eta")]
    pub eta: f64,
    /// Per-gene mutation probability.
    #[serde(default = "default_mutation_rate")]
    pub rate: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            eta: default_eta(),
            rate: default_mutation_rate(),
        }
    }
}

fn default_eta() -> f64 {
    10.0
}
fn default_mutation_rate() -> f64 {
    0.125
}

/// Map-based Bayesian optimization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationConfig {
    /// Matern-5/2 length-scale (rho).
    #[serde(default = "default_length_scale")]
    pub length_scale: f64,
    /// Observation noise variance added to the Gram diagonal.
    #[serde(default = "default_noise")]
    pub noise: f64,
    /// UCB exploration weight (kappa).
    #[serde(default = "default_kappa")]
    pub kappa: f64,
    /// Maximum number of real trials.
    #[serde(default = "default_max_trials")]
    pub max_trials: usize,
    /// A trial with task fitness strictly above this ends adaptation.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: f64,
    /// Point the end-effector should reach.
    #[serde(default = "default_target")]
    pub target: Behavior,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            length_scale: default_length_scale(),
            noise: default_noise(),
            kappa: default_kappa(),
            max_trials: default_max_trials(),
            success_threshold: default_success_threshold(),
            target: default_target(),
        }
    }
}

impl AdaptationConfig {
    /// Validate the Gaussian Process and budget parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.length_scale > 0.0) {
            return Err(ConfigError::InvalidLengthScale(self.length_scale));
        }
        if !(self.noise >= 0.0) {
            return Err(ConfigError::InvalidNoise(self.noise));
        }
        if self.max_trials == 0 {
            return Err(ConfigError::InvalidTrialBudget);
        }
        Ok(())
    }
}

fn default_length_scale() -> f64 {
    0.1
}
fn default_noise() -> f64 {
    0.03
}
fn default_kappa() -> f64 {
    0.3
}
fn default_max_trials() -> usize {
    20
}
fn default_success_threshold() -> f64 {
    -0.05
}
fn default_target() -> Behavior {
    Behavior::new(0.0, 0.62)
}

/// Reason a search or adaptation run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// All configured iterations were performed.
    IterationsExhausted,
    /// Cancelled through the cancel handle.
    Cancelled,
    /// A trial beat the success threshold.
    Success,
    /// The trial budget was used up.
    Budget,
}

/// Progress snapshot emitted during illumination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IlluminationProgress {
    /// Iterations completed so far.
    pub iteration: usize,
    /// Total iterations requested.
    pub total_iterations: usize,
    /// Occupied cells.
    pub filled_cells: usize,
    /// Fraction of the grid that is occupied.
    pub coverage: f64,
    /// Best intact performance in the archive.
    pub best_performance: f64,
}

/// Final statistics of an illumination run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IlluminationStats {
    pub iterations: usize,
    /// Insertions that created or replaced an entry.
    pub improvements: usize,
    pub filled_cells: usize,
    pub elapsed_seconds: f64,
    pub evaluations_per_second: f64,
    pub stop_reason: StopReason,
}

/// One real evaluation on the damaged arm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Archive cell whose controller was executed.
    pub cell: Cell,
    /// Archive (intact) behavior of that cell.
    pub behavior: Behavior,
    /// Task fitness actually observed on the damaged arm.
    pub observed: f64,
}

/// Progress snapshot emitted after each adaptation trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationProgress {
    /// Number of trials performed so far.
    pub trial: usize,
    /// Latest trial.
    pub record: TrialRecord,
    /// Best observed task fitness so far.
    pub best_observed: f64,
    /// Highest acquisition value after the refit.
    pub max_acquisition: f64,
}
