//! Fitness functions for illumination and adaptation.
//!
//! Illumination scores controllers on the intact arm with a posture-smoothness
//! proxy that ignores where the end-effector lands. Adaptation scores the
//! damaged arm by how close it gets to a target point.

use crate::compute::Arm;
use crate::schema::{Behavior, Controller};

/// Largest variance a controller with genes in [0, 1] can have.
pub const MAX_GENE_VARIANCE: f64 = 0.25;

/// Negative variance of the genes around their own mean.
///
/// Zero iff every gene is equal, negative otherwise.
pub fn intact_fitness(controller: &Controller) -> f64 {
    let genes = controller.genes();
    if genes.is_empty() {
        return 0.0;
    }
    let n = genes.len() as f64;
    let mean = genes.iter().sum::<f64>() / n;
    -genes.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / n
}

/// Negative Euclidean distance from `behavior` to `target`.
#[inline]
pub fn task_fitness(behavior: &Behavior, target: &Behavior) -> f64 {
    -behavior.distance(target)
}

/// Result of evaluating one controller on the intact arm.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub controller: Controller,
    pub behavior: Behavior,
    pub performance: f64,
}

/// Evaluates controllers on the intact arm for illumination.
#[derive(Debug, Clone, Copy)]
pub struct FitnessEvaluator {
    arm: Arm,
}

impl FitnessEvaluator {
    pub fn new(arm: Arm) -> Self {
        Self { arm }
    }

    pub fn arm(&self) -> &Arm {
        &self.arm
    }

    /// Run forward kinematics and score the controller.
    pub fn evaluate(&self, controller: Controller) -> Evaluation {
        let behavior = self.arm.evaluate(&controller);
        let performance = intact_fitness(&controller);
        Evaluation {
            controller,
            behavior,
            performance,
        }
    }
}
