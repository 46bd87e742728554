//! Compute module - Kinematics, illumination and adaptation.

mod adaptation;
mod kernel;
mod kinematics;

pub mod evolution;

pub use adaptation::*;
pub use evolution::Grid;
pub use kernel::*;
pub use kinematics::*;
