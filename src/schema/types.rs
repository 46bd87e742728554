//! Core value types shared by illumination and adaptation.

use serde::{Deserialize, Serialize};

/// Normalized joint values of the arm, one gene per joint in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Controller(pub Vec<f64>);

impl Controller {
    /// Wrap raw genes.
    pub fn new(genes: Vec<f64>) -> Self {
        Self(genes)
    }

    /// Controller with every gene set to `value`.
    pub fn uniform(joints: usize, value: f64) -> Self {
        Self(vec![value; joints])
    }

    #[inline]
    pub fn genes(&self) -> &[f64] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f64>> for Controller {
    fn from(genes: Vec<f64>) -> Self {
        Self(genes)
    }
}

/// End-effector position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Behavior {
    pub x: f64,
    pub y: f64,
}

impl Behavior {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another behavior.
    #[inline]
    pub fn distance(&self, other: &Behavior) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Distance from the arm base.
    #[inline]
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl From<(f64, f64)> for Behavior {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Discretized grid coordinate of a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_behavior_distance() {
        let a = Behavior::new(0.0, 0.0);
        let b = Behavior::new(0.3, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-12);
        assert!((b.norm() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_controller_serializes_as_plain_list() {
        let controller = Controller::uniform(3, 0.5);
        let json = serde_json::to_string(&controller).unwrap();
        assert_eq!(json, "[0.5,0.5,0.5]");
    }
}
