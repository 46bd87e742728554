//! Damage specifications and the fixed catalogue of damage scenarios.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Which joints are broken and how.
///
/// Angles are in degrees. Stuck joints are applied first, then offsets, so a
/// joint present in both maps ends up at `stuck + offset`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageSpec {
    /// Joint index -> fixed angle the joint is frozen at.
    #[serde(default)]
    pub stuck: BTreeMap<usize, f64>,
    /// Joint index -> angle added to whatever the joint would have done.
    #[serde(default)]
    pub offset: BTreeMap<usize, f64>,
}

impl DamageSpec {
    /// No damage at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Freeze `joint` at `degrees`.
    pub fn with_stuck(mut self, joint: usize, degrees: f64) -> Self {
        self.stuck.insert(joint, degrees);
        self
    }

    /// Shift `joint` by `degrees`.
    pub fn with_offset(mut self, joint: usize, degrees: f64) -> Self {
        self.offset.insert(joint, degrees);
        self
    }

    /// True if the spec changes nothing.
    pub fn is_intact(&self) -> bool {
        self.stuck.is_empty() && self.offset.is_empty()
    }

    /// Largest joint index mentioned, if any.
    pub fn max_joint(&self) -> Option<usize> {
        self.stuck
            .keys()
            .chain(self.offset.keys())
            .copied()
            .max()
    }

    /// Reject damage on joints an arm with `joints` joints does not have.
    pub fn validate_for(&self, joints: usize) -> Result<(), ConfigError> {
        match self.max_joint() {
            Some(joint) if joint >= joints => Err(ConfigError::InvalidDamageJoint { joint, joints }),
            _ => Ok(()),
        }
    }
}

/// A catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedDamage {
    pub name: String,
    pub spec: DamageSpec,
}

/// Joints the catalogue damages.
pub const DAMAGED_JOINTS: [usize; 2] = [1, 5];

/// The 14 damage scenarios used for adaptation experiments.
///
/// Per damaged joint: stuck at -45, 0 and 45 degrees, offset by +30 and -30
/// degrees. Then four two-joint combinations.
pub fn damage_catalogue() -> Vec<NamedDamage> {
    let mut catalogue = Vec::with_capacity(14);

    for joint in DAMAGED_JOINTS {
        for degrees in [-45.0, 0.0, 45.0] {
            catalogue.push(NamedDamage {
                name: format!("joint{joint}_stuck_{degrees}"),
                spec: DamageSpec::none().with_stuck(joint, degrees),
            });
        }
        for degrees in [30.0, -30.0] {
            catalogue.push(NamedDamage {
                name: format!("joint{joint}_offset_{degrees}"),
                spec: DamageSpec::none().with_offset(joint, degrees),
            });
        }
    }

    let [a, b] = DAMAGED_JOINTS;
    catalogue.push(NamedDamage {
        name: format!("joints{a}{b}_stuck_45"),
        spec: DamageSpec::none().with_stuck(a, 45.0).with_stuck(b, 45.0),
    });
    catalogue.push(NamedDamage {
        name: format!("joints{a}{b}_stuck_-45"),
        spec: DamageSpec::none().with_stuck(a, -45.0).with_stuck(b, -45.0),
    });
    catalogue.push(NamedDamage {
        name: format!("joints{a}{b}_offset_30"),
        spec: DamageSpec::none().with_offset(a, 30.0).with_offset(b, 30.0),
    });
    catalogue.push(NamedDamage {
        name: format!("joint{a}_stuck_45_joint{b}_offset_-30"),
        spec: DamageSpec::none().with_stuck(a, 45.0).with_offset(b, -30.0),
    });

    catalogue
}

/// Look up a catalogue entry by name.
pub fn damage_by_name(name: &str) -> Option<DamageSpec> {
    damage_catalogue()
        .into_iter()
        .find(|d| d.name == name)
        .map(|d| d.spec)
}

/// Default damage: joint 5 stuck at 45 degrees.
pub fn default_damage() -> DamageSpec {
    DamageSpec::none().with_stuck(5, 45.0)
}
