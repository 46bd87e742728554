//! Arm recovery - damage recovery for a planar arm without diagnosing the damage.
//!
//! Recovery runs in two phases:
//!
//! 1. **Illumination** (MAP-Elites): on the intact arm, fill an archive that
//!    maps every reachable end-effector cell to the best controller reaching it.
//! 2. **Adaptation** (M-BOA): on the damaged arm, use the archive as a Gaussian
//!    Process prior and try a handful of archived controllers until one reaches
//!    the target.
//!
//! # Architecture
//!
//! - `schema`: Configuration, damage catalogue and shared value types
//! - `compute`: Kinematics, illumination search, covariance kernel, adaptation
//!
//! # Example
//!
//! ```rust,no_run
//! use arm_recovery::{
//!     compute::{AdaptationEngine, Arm, DamagedArm, Grid},
//!     compute::evolution::{Archive, IlluminationSearch},
//!     schema::ExperimentConfig,
//! };
//!
//! let mut config = ExperimentConfig::default();
//! config.illumination.iterations = 200_000;
//! config.illumination.batch_size = 20_000;
//! config.random_seed = Some(42);
//!
//! // Phase (a): illuminate the intact arm
//! let mut archive = Archive::new(Grid::from_config(&config.grid));
//! IlluminationSearch::new(&config).unwrap().run(&mut archive).unwrap();
//!
//! // Phase (b): adapt on the damaged arm
//! let robot = DamagedArm::new(Arm::from_config(&config.arm), config.damage.clone());
//! let mut engine = AdaptationEngine::new(&archive, config.adaptation.clone()).unwrap();
//! let result = engine.run(&robot).unwrap();
//!
//! println!("{:?} after {} trials", result.stop_reason, result.trials.len());
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{Archive, IlluminationSearch};
pub use compute::{AdaptationEngine, AdaptationResult, Arm, DamagedArm, Robot};
pub use schema::{Behavior, Cell, Controller, DamageSpec, ExperimentConfig};
