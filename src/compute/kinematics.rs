//! Forward kinematics of the planar arm, intact and damaged.
//!
//! Each gene in [0, 1] maps linearly to a joint angle in [-pi/2, pi/2].
//! Angles accumulate along the chain; the zero pose points straight along +y.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::schema::{ArmConfig, Behavior, Controller, DamageSpec};

/// Anything that executes a controller and reports where the end-effector went.
pub trait Robot {
    fn execute(&self, controller: &Controller) -> Behavior;
}

/// Intact planar arm with equal-length segments.
#[derive(Debug, Clone, Copy)]
pub struct Arm {
    joints: usize,
    segment_length: f64,
}

impl Arm {
    pub fn new(joints: usize, length: f64) -> Self {
        Self {
            joints,
            segment_length: length / joints.max(1) as f64,
        }
    }

    pub fn from_config(config: &ArmConfig) -> Self {
        Self::new(config.joints, config.length)
    }

    #[inline]
    pub fn joints(&self) -> usize {
        self.joints
    }

    /// Total reach.
    #[inline]
    pub fn length(&self) -> f64 {
        self.segment_length * self.joints as f64
    }

    /// Joint angles in radians.
    pub fn angles(&self, controller: &Controller) -> Vec<f64> {
        controller.genes().iter().map(|&g| gene_to_angle(g)).collect()
    }

    /// End-effector position for a controller on the intact arm.
    pub fn evaluate(&self, controller: &Controller) -> Behavior {
        self.forward(&self.angles(controller))
    }

    /// End-effector position with `damage` applied to the joint angles.
    ///
    /// Stuck joints are overwritten first, then offsets are added.
    pub fn evaluate_damaged(&self, controller: &Controller, damage: &DamageSpec) -> Behavior {
        let mut angles = self.angles(controller);

        for (&joint, &degrees) in &damage.stuck {
            if let Some(angle) = angles.get_mut(joint) {
                *angle = degrees.to_radians();
            }
        }
        for (&joint, &degrees) in &damage.offset {
            if let Some(angle) = angles.get_mut(joint) {
                *angle += degrees.to_radians();
            }
        }

        self.forward(&angles)
    }

    /// Sum of segment displacements along the cumulative angle.
    pub fn forward(&self, angles: &[f64]) -> Behavior {
        let mut heading = 0.0;
        let mut x = 0.0;
        let mut y = 0.0;
        for &angle in angles {
            heading += angle;
            x += self.segment_length * heading.sin();
            y += self.segment_length * heading.cos();
        }
        Behavior::new(x, y)
    }
}

impl Robot for Arm {
    fn execute(&self, controller: &Controller) -> Behavior {
        self.evaluate(controller)
    }
}

/// An arm with a fixed damage, as seen during adaptation.
#[derive(Debug, Clone)]
pub struct DamagedArm {
    pub arm: Arm,
    pub damage: DamageSpec,
}

impl DamagedArm {
    pub fn new(arm: Arm, damage: DamageSpec) -> Self {
        Self { arm, damage }
    }
}

impl Robot for DamagedArm {
    fn execute(&self, controller: &Controller) -> Behavior {
        self.arm.evaluate_damaged(controller, &self.damage)
    }
}

/// Gene in [0, 1] to angle in [-pi/2, pi/2].
#[inline]
pub fn gene_to_angle(gene: f64) -> f64 {
    gene * PI - FRAC_PI_2
}
