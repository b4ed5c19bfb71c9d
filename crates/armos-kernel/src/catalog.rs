//! [`JointCatalog`] – joint naming and counts-to-radians calibration.
//!
//! Every (arm, motor) pair has a published name and a linear scale
//! `rad = counts * scale`.  Scales default to [`DEFAULT_RAD_PER_COUNT`] and
//! can be overridden per joint.

use std::collections::HashMap;

use armos_hal::ArmSpec;
use armos_types::{ArmError, JointKey};

/// Default linear scale from encoder counts to radians.
pub const DEFAULT_RAD_PER_COUNT: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct JointCatalog {
    names: HashMap<JointKey, String>,
    scales: HashMap<JointKey, f64>,
    default_scale: f64,
}

impl JointCatalog {
    /// Build the catalog for `specs`.
    ///
    /// `joint_names` lists one name per motor, arms in configuration order and
    /// motors in arm order.  An empty list yields `"{arm}_joint{motor}"`
    /// names.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Config`] when a non-empty `joint_names` does not
    /// cover exactly the configured motors.
    pub fn new(specs: &[ArmSpec], joint_names: &[String], default_scale: f64) -> Result<Self, ArmError> {
        let keys: Vec<JointKey> = specs
            .iter()
            .flat_map(|s| s.motor_ids.iter().map(|&m| JointKey::new(s.id.clone(), m)))
            .collect();

        if !joint_names.is_empty() && joint_names.len() != keys.len() {
            return Err(ArmError::Config(format!(
                "joint_names lists {} names but {} motors are configured",
                joint_names.len(),
                keys.len()
            )));
        }

        let names = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let name = joint_names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| default_name(key));
                (key.clone(), name)
            })
            .collect();

        Ok(Self {
            names,
            scales: HashMap::new(),
            default_scale,
        })
    }

    /// Override the scale of one joint.
    pub fn with_scale(mut self, key: JointKey, rad_per_count: f64) -> Self {
        self.scales.insert(key, rad_per_count);
        self
    }

    pub fn name(&self, key: &JointKey) -> String {
        self.names
            .get(key)
            .cloned()
            .unwrap_or_else(|| default_name(key))
    }

    pub fn scale(&self, key: &JointKey) -> f64 {
        self.scales.get(key).copied().unwrap_or(self.default_scale)
    }

    pub fn to_radians(&self, key: &JointKey, counts: i32) -> f64 {
        f64::from(counts) * self.scale(key)
    }
}

fn default_name(key: &JointKey) -> String {
    format!("{}_joint{}", key.arm, key.motor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<ArmSpec> {
        vec![ArmSpec::new("left", vec![1, 2]), ArmSpec::new("right", vec![1])]
    }

    #[test]
    fn default_names_and_scale() {
        let catalog = JointCatalog::new(&specs(), &[], DEFAULT_RAD_PER_COUNT).unwrap();
        let key = JointKey::new("left", 2);
        assert_eq!(catalog.name(&key), "left_joint2");
        assert!((catalog.to_radians(&key, 1500) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn configured_names_follow_arm_then_motor_order() {
        let names: Vec<String> = vec!["l_shoulder".into(), "l_elbow".into(), "r_shoulder".into()];
        let catalog = JointCatalog::new(&specs(), &names, DEFAULT_RAD_PER_COUNT).unwrap();
        assert_eq!(catalog.name(&JointKey::new("left", 2)), "l_elbow");
        assert_eq!(catalog.name(&JointKey::new("right", 1)), "r_shoulder");
    }

    #[test]
    fn mismatched_name_count_is_rejected() {
        let names = vec!["only_one".to_string()];
        let err = JointCatalog::new(&specs(), &names, DEFAULT_RAD_PER_COUNT).unwrap_err();
        assert!(matches!(err, ArmError::Config(_)));
    }

    #[test]
    fn per_joint_scale_override() {
        let key = JointKey::new("right", 1);
        let catalog = JointCatalog::new(&specs(), &[], DEFAULT_RAD_PER_COUNT)
            .unwrap()
            .with_scale(key.clone(), 0.002);
        assert!((catalog.to_radians(&key, 1000) - 2.0).abs() < 1e-12);
        assert!((catalog.to_radians(&JointKey::new("left", 1), 1000) - 1.0).abs() < 1e-12);
    }
}
