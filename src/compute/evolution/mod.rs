//! MAP-Elites illumination of the intact arm.
//!
//! # Overview
//!
//! - **Fitness** (`fitness`): intact posture fitness and damaged task fitness
//! - **Mutation** (`mutation`): random controllers and polynomial mutation
//! - **Archive** (`archive`): elitist grid of the best controller per behavior cell
//! - **Search** (`search`): bootstrap + mutation loop filling the archive
//!
//! # Example
//!
//! ```rust,no_run
//! use arm_recovery::schema::ExperimentConfig;
//! use arm_recovery::compute::{Grid, evolution::{Archive, IlluminationSearch}};
//!
//! let mut config = ExperimentConfig::default();
//! config.illumination.iterations = 100_000;
//! config.illumination.batch_size = 10_000;
//!
//! let mut archive = Archive::new(Grid::from_config(&config.grid));
//! let mut search = IlluminationSearch::new(&config).unwrap();
//! let stats = search.run(&mut archive).unwrap();
//!
//! println!("{} cells filled in {:.1}s", stats.filled_cells, stats.elapsed_seconds);
//! ```

mod archive;
mod fitness;
mod mutation;
mod search;

pub use archive::{Archive, ArchiveEntry, ArchiveError, ArchiveStats, Grid};
pub use fitness::{Evaluation, FitnessEvaluator, MAX_GENE_VARIANCE, intact_fitness, task_fitness};
pub use mutation::{ControllerRng, polynomial_mutation};
pub use search::{IlluminationSearch, SearchError};
