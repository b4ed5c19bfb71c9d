//! Engine configuration.
//!
//! Every field has a serde default so a partial (or empty) TOML table yields
//! a usable configuration.  Loading from disk and environment overrides live
//! in the `armos` binary; this module only describes and validates the shape.

use std::collections::HashMap;
use std::time::Duration;

use armos_hal::ArmSpec;
use armos_kernel::{DEFAULT_RAD_PER_COUNT, JointCatalog, MonitorSettings};
use armos_types::{ArmError, JointKey, MotorId};
use serde::{Deserialize, Serialize};

/// One configured arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmConfig {
    pub id: String,
    pub motor_ids: Vec<MotorId>,
}

impl ArmConfig {
    pub fn new(id: impl Into<String>, motor_ids: Vec<MotorId>) -> Self {
        Self {
            id: id.into(),
            motor_ids,
        }
    }
}

/// Counts-to-radians calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_rad_per_count")]
    pub default_rad_per_count: f64,

    /// Per-joint overrides keyed by `"arm/motor"`.
    #[serde(default)]
    pub per_joint: HashMap<String, f64>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            default_rad_per_count: default_rad_per_count(),
            per_joint: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_arms")]
    pub arms: Vec<ArmConfig>,

    /// Published joint names, one per motor in arm order.  Empty means
    /// `"{arm}_joint{motor}"`.
    #[serde(default)]
    pub joint_names: Vec<String>,

    #[serde(default = "default_current_threshold_ma")]
    pub current_threshold_ma: i32,

    #[serde(default = "default_publish_rate_hz")]
    pub publish_rate_hz: f64,

    #[serde(default = "default_monitor_rate_hz")]
    pub monitor_rate_hz: f64,

    /// Executor poll increment; the preemption and fault latency bound.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub calibration: CalibrationConfig,

    #[serde(default = "default_unavailable_report_period_ms")]
    pub unavailable_report_period_ms: u64,
}

fn default_arms() -> Vec<ArmConfig> {
    vec![ArmConfig::new("left", vec![1, 2, 3]), ArmConfig::new("right", vec![1, 2, 3])]
}
fn default_current_threshold_ma() -> i32 {
    15_000
}
fn default_publish_rate_hz() -> f64 {
    50.0
}
fn default_monitor_rate_hz() -> f64 {
    10.0
}
fn default_poll_interval_ms() -> u64 {
    10
}
fn default_rad_per_count() -> f64 {
    DEFAULT_RAD_PER_COUNT
}
fn default_unavailable_report_period_ms() -> u64 {
    1_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            arms: default_arms(),
            joint_names: Vec::new(),
            current_threshold_ma: default_current_threshold_ma(),
            publish_rate_hz: default_publish_rate_hz(),
            monitor_rate_hz: default_monitor_rate_hz(),
            poll_interval_ms: default_poll_interval_ms(),
            calibration: CalibrationConfig::default(),
            unavailable_report_period_ms: default_unavailable_report_period_ms(),
        }
    }
}

impl EngineConfig {
    /// Check the configuration for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ArmError> {
        if !(self.publish_rate_hz.is_finite() && self.publish_rate_hz > 0.0) {
            return Err(ArmError::Config(format!("publish_rate_hz must be > 0, got {}", self.publish_rate_hz)));
        }
        if !(self.monitor_rate_hz.is_finite() && self.monitor_rate_hz > 0.0) {
            return Err(ArmError::Config(format!("monitor_rate_hz must be > 0, got {}", self.monitor_rate_hz)));
        }
        if self.poll_interval_ms == 0 {
            return Err(ArmError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.current_threshold_ma <= 0 {
            return Err(ArmError::Config(format!(
                "current_threshold_ma must be > 0, got {}",
                self.current_threshold_ma
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for arm in &self.arms {
            if !seen.insert(arm.id.as_str()) {
                return Err(ArmError::Config(format!("arm '{}' is configured twice", arm.id)));
            }
        }

        let motors: usize = self.arms.iter().map(|a| a.motor_ids.len()).sum();
        if !self.joint_names.is_empty() && self.joint_names.len() != motors {
            return Err(ArmError::Config(format!(
                "{} joint names configured for {motors} motors",
                self.joint_names.len()
            )));
        }

        if !(self.calibration.default_rad_per_count.is_finite() && self.calibration.default_rad_per_count != 0.0) {
            return Err(ArmError::Config("calibration.default_rad_per_count must be non-zero".into()));
        }
        for key in self.calibration.per_joint.keys() {
            parse_joint_key(key)?;
        }
        Ok(())
    }

    pub fn arm_specs(&self) -> Vec<ArmSpec> {
        self.arms
            .iter()
            .map(|a| ArmSpec::new(a.id.clone(), a.motor_ids.clone()))
            .collect()
    }

    /// Build the joint catalog, applying per-joint calibration overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Config`] for a bad joint-name list or a malformed
    /// `per_joint` key.
    pub fn joint_catalog(&self) -> Result<JointCatalog, ArmError> {
        let mut catalog = JointCatalog::new(
            &self.arm_specs(),
            &self.joint_names,
            self.calibration.default_rad_per_count,
        )?;
        for (key, &scale) in &self.calibration.per_joint {
            catalog = catalog.with_scale(parse_joint_key(key)?, scale);
        }
        Ok(catalog)
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            current_threshold_ma: self.current_threshold_ma,
            unavailable_report_period: Duration::from_millis(self.unavailable_report_period_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_joint_key(raw: &str) -> Result<JointKey, ArmError> {
    let invalid = || ArmError::Config(format!("calibration key '{raw}' is not of the form 'arm/motor'"));
    let (arm, motor) = raw.rsplit_once('/').ok_or_else(invalid)?;
    if arm.is_empty() {
        return Err(invalid());
    }
    let motor = motor.parse::<MotorId>().map_err(|_| invalid())?;
    Ok(JointKey::new(arm, motor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_yields_defaults() {
        let cfg: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.current_threshold_ma, 15_000);
        assert_eq!(cfg.publish_rate_hz, 50.0);
        assert_eq!(cfg.monitor_rate_hz, 10.0);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(10));
        assert_eq!(cfg.calibration.default_rad_per_count, 0.001);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_full_document() {
        let raw = r#"
            joint_names = ["shoulder", "elbow", "wrist"]
            current_threshold_ma = 12000
            publish_rate_hz = 100
            poll_interval_ms = 5

            [[arms]]
            id = "left"
            motor_ids = [1, 2]

            [[arms]]
            id = "right"
            motor_ids = [7]

            [calibration]
            default_rad_per_count = 0.002

            [calibration.per_joint]
            "right/7" = 0.01
        "#;
        let cfg: EngineConfig = toml::from_str(raw).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.arms.len(), 2);
        assert_eq!(cfg.monitor_rate_hz, 10.0);
        assert_eq!(cfg.monitor_settings().current_threshold_ma, 12_000);

        let catalog = cfg.joint_catalog().unwrap();
        let wrist = JointKey::new("right", 7);
        assert_eq!(catalog.name(&wrist), "wrist");
        assert!((catalog.to_radians(&wrist, 100) - 1.0).abs() < 1e-12);
        assert!((catalog.to_radians(&JointKey::new("left", 1), 100) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn rejects_zero_rates_and_poll_interval() {
        let cfg = EngineConfig {
            publish_rate_hz: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ArmError::Config(_))));

        let cfg = EngineConfig {
            monitor_rate_hz: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ArmError::Config(_))));

        let cfg = EngineConfig {
            poll_interval_ms: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ArmError::Config(_))));
    }

    #[test]
    fn rejects_joint_name_count_mismatch() {
        let cfg = EngineConfig {
            joint_names: vec!["only_one".into()],
            ..EngineConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("1 joint names configured for 6 motors"), "{err}");
    }

    #[test]
    fn rejects_duplicate_arm_ids() {
        let cfg = EngineConfig {
            arms: vec![ArmConfig::new("left", vec![1]), ArmConfig::new("left", vec![2])],
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ArmError::Config(_))));
    }

    #[test]
    fn rejects_malformed_calibration_keys() {
        for key in ["left", "left/", "/3", "left/x", "left/300"] {
            let mut cfg = EngineConfig::default();
            cfg.calibration.per_joint.insert(key.to_string(), 0.01);
            assert!(cfg.validate().is_err(), "key {key:?} accepted");
        }
    }
}
