//! Configuration types for an illumination + adaptation experiment.

use serde::{Deserialize, Serialize};

use super::{AdaptationConfig, DamageSpec, IlluminationConfig, default_damage};

/// Top-level experiment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Arm geometry.
    #[serde(default)]
    pub arm: ArmConfig,
    /// Behavior grid used by the archive.
    #[serde(default)]
    pub grid: GridConfig,
    /// MAP-Elites settings.
    #[serde(default)]
    pub illumination: IlluminationConfig,
    /// M-BOA settings.
    #[serde(default)]
    pub adaptation: AdaptationConfig,
    /// Damage applied to the arm during adaptation.
    #[serde(default = "default_damage")]
    pub damage: DamageSpec,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            arm: ArmConfig::default(),
            grid: GridConfig::default(),
            illumination: IlluminationConfig::default(),
            adaptation: AdaptationConfig::default(),
            damage: default_damage(),
            random_seed: None,
        }
    }
}

/// Planar arm geometry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArmConfig {
    /// Number of joints (and segments).
    #[serde(default = "default_joints")]
    pub joints: usize,
    /// Total arm length in meters, split evenly across segments.
    #[serde(default = "default_arm_length")]
    pub length: f64,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            joints: default_joints(),
            length: default_arm_length(),
        }
    }
}

fn default_joints() -> usize {
    8
}
fn default_arm_length() -> f64 {
    0.62
}

/// Square behavior grid centered on the arm base.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridConfig {
    /// Bins per axis.
    #[serde(default = "default_resolution")]
    pub resolution: usize,
    /// Half side length of the covered square, in meters.
    #[serde(default = "default_span")]
    pub span: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            span: default_span(),
        }
    }
}

fn default_resolution() -> usize {
    200
}
fn default_span() -> f64 {
    0.7
}

impl GridConfig {
    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.resolution * self.resolution
    }
}

impl ExperimentConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arm.joints == 0 {
            return Err(ConfigError::InvalidJointCount);
        }
        if !(self.arm.length > 0.0) {
            return Err(ConfigError::InvalidArmLength(self.arm.length));
        }
        if self.grid.resolution == 0 {
            return Err(ConfigError::InvalidResolution);
        }
        if !(self.grid.span > 0.0) {
            return Err(ConfigError::InvalidSpan(self.grid.span));
        }
        if self.grid.span < self.arm.length {
            return Err(ConfigError::SpanBelowReach {
                span: self.grid.span,
                reach: self.arm.length,
            });
        }

        let illumination = &self.illumination;
        if illumination.bootstrap == 0 && illumination.iterations > 0 {
            return Err(ConfigError::MissingBootstrap);
        }
        if !(illumination.mutation.eta >= 0.0) {
            return Err(ConfigError::InvalidMutationIndex(illumination.mutation.eta));
        }
        if !(0.0..=1.0).contains(&illumination.mutation.rate) {
            return Err(ConfigError::InvalidMutationRate(illumination.mutation.rate));
        }

        self.adaptation.validate()?;

        self.damage.validate_for(self.arm.joints)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Joint count must be non-zero")]
    InvalidJointCount,
    #[error("Arm length must be positive, got {0}")]
    InvalidArmLength(f64),
    #[error("Grid resolution must be non-zero")]
    InvalidResolution,
    #[error("Grid span must be positive, got {0}")]
    InvalidSpan(f64),
    #[error("Grid span {span} does not cover the arm reach {reach}")]
    SpanBelowReach { span: f64, reach: f64 },
    #[error("Illumination needs at least one bootstrap iteration before mutating")]
    MissingBootstrap,
    #[error("Mutation index must be non-negative, got {0}")]
    InvalidMutationIndex(f64),
    #[error("Mutation rate must be within [0, 1], got {0}")]
    InvalidMutationRate(f64),
    #[error("Kernel length-scale must be positive, got {0}")]
    InvalidLengthScale(f64),
    #[error("Observation noise must be non-negative, got {0}")]
    InvalidNoise(f64),
    #[error("Trial budget must be non-zero")]
    InvalidTrialBudget,
    #[error("Damage references joint {joint} but the arm has {joints} joints")]
    InvalidDamageJoint { joint: usize, joints: usize },
}
