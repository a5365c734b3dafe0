//! Velocity Envelope Model - flight phase to {vmin, vmax, separation}.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{FpfError, Result};
use crate::traffic::{FlightPhase, KNOTS_TO_MPS};

/// Reachable speed range and required separation for one flight phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityEnvelope {
    /// Minimum ground speed (m/s)
    pub vmin: f64,
    /// Maximum ground speed (m/s)
    pub vmax: f64,
    /// Minimum horizontal separation (m)
    pub separation: f64,
}

impl VelocityEnvelope {
    pub const fn new(vmin: f64, vmax: f64, separation: f64) -> Self {
        Self { vmin, vmax, separation }
    }

    /// Area of the reachable-velocity annulus, π(vmax² − vmin²).
    pub fn annulus_area(&self) -> f64 {
        PI * (self.vmax * self.vmax - self.vmin * self.vmin)
    }

    /// True when `self` is at least as conservative as `other`:
    /// no smaller separation and no narrower speed range.
    pub fn dominates(&self, other: &VelocityEnvelope) -> bool {
        self.separation >= other.separation && self.vmin <= other.vmin && self.vmax >= other.vmax
    }

    fn validate(&self, phase: FlightPhase) -> Result<()> {
        let finite = self.vmin.is_finite() && self.vmax.is_finite() && self.separation.is_finite();
        if !finite || self.vmin < 0.0 || self.vmax <= self.vmin || self.separation <= 0.0 {
            return Err(FpfError::config(format!(
                "envelope for {} must satisfy 0 <= vmin < vmax and separation > 0, got {:?}",
                phase, self
            )));
        }
        Ok(())
    }
}

/// One envelope per flight phase.
///
/// The `unknown` entry must dominate every other entry, since it decides how
/// aggressively forbidden velocities are carved for unlabeled traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeModel {
    pub pushback: VelocityEnvelope,
    pub taxi: VelocityEnvelope,
    pub takeoff_landing: VelocityEnvelope,
    pub enroute: VelocityEnvelope,
    pub unknown: VelocityEnvelope,
}

impl Default for EnvelopeModel {
    fn default() -> Self {
        Self {
            pushback: VelocityEnvelope::new(0.0, 4.0 * KNOTS_TO_MPS, 50.0),
            taxi: VelocityEnvelope::new(0.0, 30.0 * KNOTS_TO_MPS, 150.0),
            takeoff_landing: VelocityEnvelope::new(30.0 * KNOTS_TO_MPS, 200.0 * KNOTS_TO_MPS, 1852.0),
            // 5 NM en-route separation
            enroute: VelocityEnvelope::new(250.0 * KNOTS_TO_MPS, 300.0 * KNOTS_TO_MPS, 9260.0),
            unknown: VelocityEnvelope::new(0.0, 300.0 * KNOTS_TO_MPS, 9260.0),
        }
    }
}

impl EnvelopeModel {
    /// Envelope for a phase. Total over the phase enumeration.
    pub fn envelope(&self, phase: FlightPhase) -> VelocityEnvelope {
        match phase {
            FlightPhase::Pushback => self.pushback,
            FlightPhase::Taxi => self.taxi,
            FlightPhase::TakeoffLanding => self.takeoff_landing,
            FlightPhase::Enroute => self.enroute,
            FlightPhase::Unknown => self.unknown,
        }
    }

    /// Checks each envelope and that `unknown` is the most conservative one.
    pub fn validate(&self) -> Result<()> {
        for phase in FlightPhase::ALL {
            self.envelope(phase).validate(phase)?;
        }
        for phase in FlightPhase::ALL {
            if !self.unknown.dominates(&self.envelope(phase)) {
                return Err(FpfError::config(format!(
                    "unknown envelope must be at least as conservative as {}",
                    phase
                )));
            }
        }
        Ok(())
    }
}
