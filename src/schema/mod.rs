//! Schema module - Configuration and domain types for arm recovery experiments.

mod config;
mod damage;
mod evolution;
mod types;

pub use config::*;
pub use damage::*;
pub use evolution::*;
pub use types::*;
