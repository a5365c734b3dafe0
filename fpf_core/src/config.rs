//! Configuration for a batch run.
//!
//! Every numeric constant of the algorithm lives in [`GeometryConfig`] and is
//! passed down explicitly; no stage reads module-level tuning state.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

use crate::envelope::EnvelopeModel;
use crate::error::{FpfError, Result};
use crate::priority::PriorityCode;
use crate::traffic::FlightPhase;

/// One nautical mile in meters.
pub const NM: f64 = 1852.0;

/// Largest grid coordinate an obstacle vertex may reach. Half the i64 range,
/// leaving room for the intruder-velocity offset.
const GRID_LIMIT: f64 = i64::MAX as f64 / 2.0;

/// Constants of the VO construction and clipping stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Points used to discretize each annulus circle (default: 180)
    pub angle_resolution: usize,

    /// Multiplier taking velocity coordinates to the integer clipping grid (default: 2^31)
    pub fixed_point_scale: f64,

    /// Upper bound on the VO half-angle in radians (default: 0.4999π ≈ 89.982°)
    pub max_half_angle: f64,

    /// Minimum divergence angle for loss-of-separation geometry (default: π/4)
    pub los_divergence_angle: f64,

    /// Dart-tip angle multiplier applied to the divergence angle (default: 1.5)
    pub los_angle_multiplier: f64,

    /// Dart-tip leg length multiplier on vmax / cos(beta) (default: 1.1)
    pub los_leg_multiplier: f64,

    /// VO side rays reach this many vmax along the bearing axis (default: 2.0)
    pub cone_length_factor: f64,

    /// Multiplier on the pair separation minimum (default: 1.0)
    pub separation_margin: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            angle_resolution: 180,
            fixed_point_scale: 2_147_483_648.0,
            max_half_angle: 0.4999 * PI,
            los_divergence_angle: PI / 4.0,
            los_angle_multiplier: 1.5,
            los_leg_multiplier: 1.1,
            cone_length_factor: 2.0,
            separation_margin: 1.0,
        }
    }
}

impl GeometryConfig {
    /// Dart-tip half angle beta.
    pub fn los_beta(&self) -> f64 {
        self.los_angle_multiplier * self.los_divergence_angle
    }

    /// Largest distance from the origin of any obstacle vertex for an ownship
    /// with top speed `vmax`, before the intruder-velocity offset.
    pub fn max_reach(&self, vmax: f64) -> f64 {
        let cone = self.cone_length_factor / self.max_half_angle.cos();
        let dart = self.los_leg_multiplier / self.los_beta().cos();
        vmax * cone.max(dart)
    }

    pub fn validate(&self) -> Result<()> {
        if self.angle_resolution < 3 {
            return Err(FpfError::config(format!(
                "angle_resolution must be at least 3, got {}",
                self.angle_resolution
            )));
        }
        if !(self.fixed_point_scale.is_finite() && self.fixed_point_scale > 0.0) {
            return Err(FpfError::config(format!(
                "fixed_point_scale must be positive, got {}",
                self.fixed_point_scale
            )));
        }
        if !(self.max_half_angle > 0.0 && self.max_half_angle < PI / 2.0) {
            return Err(FpfError::config("max_half_angle must lie in (0, π/2)"));
        }
        // cos(beta) must stay positive or the dart-tip leg flips
        let beta = self.los_beta();
        if !(beta > 0.0 && beta < PI / 2.0) {
            return Err(FpfError::config(format!(
                "los_angle_multiplier * los_divergence_angle must lie in (0, π/2), got {}",
                beta
            )));
        }
        if !(self.los_leg_multiplier > 0.0 && self.cone_length_factor > 1.0) {
            return Err(FpfError::config(
                "los_leg_multiplier must be positive and cone_length_factor greater than 1",
            ));
        }
        if !(self.separation_margin.is_finite() && self.separation_margin > 0.0) {
            return Err(FpfError::config(format!(
                "separation_margin must be positive, got {}",
                self.separation_margin
            )));
        }
        Ok(())
    }
}

/// Configuration for a batch run over a traffic table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Bucket width in seconds (default: 10)
    pub lookahead_seconds: f64,

    /// ADS-B-equivalent reception cutoff in meters (default: 65 NM)
    pub sensor_range_meters: f64,

    /// Priority rule applied to every aircraft of the run
    pub priority_rule: PriorityCode,

    pub geometry: GeometryConfig,

    pub envelopes: EnvelopeModel,

    /// Classify rows without a status label by ground speed (default: false, i.e. Unknown)
    pub phase_from_ground_speed: bool,

    /// Fan out per-aircraft work across the rayon pool (default: true)
    pub parallel: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            lookahead_seconds: 10.0,
            sensor_range_meters: 65.0 * NM,
            priority_rule: PriorityCode::Default,
            geometry: GeometryConfig::default(),
            envelopes: EnvelopeModel::default(),
            phase_from_ground_speed: false,
            parallel: true,
        }
    }
}

impl BatchConfig {
    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Sets the bucket width.
    pub fn with_lookahead(mut self, secs: f64) -> Self {
        self.lookahead_seconds = secs;
        self
    }

    /// Sets the priority rule.
    pub fn with_priority(mut self, rule: PriorityCode) -> Self {
        self.priority_rule = rule;
        self
    }

    /// Fail-fast validation run before any bucket is processed.
    pub fn validate(&self) -> Result<()> {
        if !(self.lookahead_seconds.is_finite() && self.lookahead_seconds > 0.0) {
            return Err(FpfError::config(format!(
                "lookahead_seconds must be positive, got {}",
                self.lookahead_seconds
            )));
        }
        if !(self.sensor_range_meters.is_finite() && self.sensor_range_meters > 0.0) {
            return Err(FpfError::config(format!(
                "sensor_range_meters must be positive, got {}",
                self.sensor_range_meters
            )));
        }
        self.geometry.validate()?;
        self.envelopes.validate()?;

        // Vertices beyond the grid range would saturate when snapped
        let vmax = FlightPhase::ALL
            .iter()
            .map(|phase| self.envelopes.envelope(*phase).vmax)
            .fold(0.0, f64::max);
        let reach = self.geometry.max_reach(vmax) * self.geometry.fixed_point_scale;
        if !(reach < GRID_LIMIT) {
            return Err(FpfError::config(format!(
                "fixed_point_scale {} puts obstacle vertices outside the integer grid (reach {:e})",
                self.geometry.fixed_point_scale, reach
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_lookahead() {
        let config = BatchConfig::default().with_lookahead(0.0);
        assert!(matches!(config.validate(), Err(FpfError::Configuration(_))));

        let config = BatchConfig::default().with_lookahead(-5.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_sensor_range() {
        let config = BatchConfig {
            sensor_range_meters: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_coarse_circle() {
        let mut config = BatchConfig::default();
        config.geometry.angle_resolution = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_scale_that_overflows_the_grid() {
        let mut config = BatchConfig::default();
        config.geometry.fixed_point_scale = 1e13;
        assert!(matches!(config.validate(), Err(FpfError::Configuration(_))));

        // Default scale leaves headroom for the fastest default envelope
        let config = BatchConfig::default();
        let vmax = config.envelopes.envelope(FlightPhase::Unknown).vmax;
        let reach = config.geometry.max_reach(vmax) * config.geometry.fixed_point_scale;
        assert!(reach < GRID_LIMIT);
    }

    #[test]
    fn test_rejects_non_positive_margin() {
        let mut config = BatchConfig::default();
        config.geometry.separation_margin = 0.0;
        assert!(config.validate().is_err());

        config.geometry.separation_margin = 1.05;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_partial_overrides() {
        let config = BatchConfig::from_json_str(
            r#"{ "lookahead_seconds": 30.0, "priority_rule": "RS6", "geometry": { "angle_resolution": 360 } }"#,
        )
        .unwrap();

        assert_eq!(config.lookahead_seconds, 30.0);
        assert_eq!(config.priority_rule, PriorityCode::Rs6);
        assert_eq!(config.geometry.angle_resolution, 360);
        assert_eq!(config.geometry.los_leg_multiplier, 1.1);
        assert_eq!(config.geometry.separation_margin, 1.0);
        assert_eq!(config.sensor_range_meters, 65.0 * NM);
    }

    #[test]
    fn test_json_garbage_is_configuration_error() {
        assert!(matches!(
            BatchConfig::from_json_str("{ not json"),
            Err(FpfError::Configuration(_))
        ));
    }
}
