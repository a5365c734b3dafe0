//! Traffic ingestion - rows of the input table and the per-bucket aircraft state.
//!
//! Phase labels are parsed exactly once here into the closed [`FlightPhase`]
//! enumeration; nothing downstream ever looks at the raw status string again.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::{FpfError, Result};

/// Meters per second in one knot.
pub const KNOTS_TO_MPS: f64 = 1852.0 / 3600.0;

/// Flight phase of an aircraft, driving its velocity envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPhase {
    Pushback,
    Taxi,
    TakeoffLanding,
    Enroute,
    /// Missing or unrecognized label; always gets the most conservative envelope
    Unknown,
}

impl FlightPhase {
    /// All phases, in envelope-table order.
    pub const ALL: [FlightPhase; 5] = [
        FlightPhase::Pushback,
        FlightPhase::Taxi,
        FlightPhase::TakeoffLanding,
        FlightPhase::Enroute,
        FlightPhase::Unknown,
    ];

    /// Parses a surveillance status label. Total: anything unrecognized is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "PUSHBACK" | "PUSH_BACK" => FlightPhase::Pushback,
            "TAXI" | "ONSURFACE" | "ON_SURFACE" => FlightPhase::Taxi,
            "TAKEOFF/LANDING" | "TAKEOFF_LANDING" | "TAKEOFF" | "LANDING" | "DEPARTURE"
            | "ARRIVAL" => FlightPhase::TakeoffLanding,
            "ENROUTE" | "EN_ROUTE" | "CRUISE" | "AIRBORNE" => FlightPhase::Enroute,
            _ => FlightPhase::Unknown,
        }
    }

    /// Classifies by ground speed in knots.
    ///
    /// Bands are closed below and open above, so every finite non-negative
    /// speed lands in exactly one phase:
    /// `[0,4)` pushback, `[4,30)` taxi, `[30,200)` takeoff/landing, `[200,∞)` enroute.
    pub fn from_ground_speed(knots: f64) -> Self {
        if !knots.is_finite() || knots < 0.0 {
            return FlightPhase::Unknown;
        }
        match knots {
            k if k < 4.0 => FlightPhase::Pushback,
            k if k < 30.0 => FlightPhase::Taxi,
            k if k < 200.0 => FlightPhase::TakeoffLanding,
            _ => FlightPhase::Enroute,
        }
    }

    /// Returns the canonical label.
    pub fn name(&self) -> &'static str {
        match self {
            FlightPhase::Pushback => "PUSHBACK",
            FlightPhase::Taxi => "TAXI",
            FlightPhase::TakeoffLanding => "TAKEOFF/LANDING",
            FlightPhase::Enroute => "ENROUTE",
            FlightPhase::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One row of the input traffic table (one report of one aircraft).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRow {
    /// Report time in seconds
    pub time: f64,

    /// Aircraft identifier
    pub callsign: String,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Ground speed in knots
    pub ground_speed: f64,

    /// Track in degrees, clockwise from true north
    pub heading: f64,

    /// Surveillance status label (e.g. "TAXI"), may be absent
    #[serde(default)]
    pub status: Option<String>,
}

impl TrafficRow {
    /// Creates a row with a status label.
    pub fn new(
        time: f64,
        callsign: impl Into<String>,
        latitude: f64,
        longitude: f64,
        ground_speed: f64,
        heading: f64,
        status: &str,
    ) -> Self {
        Self {
            time,
            callsign: callsign.into(),
            latitude,
            longitude,
            ground_speed,
            heading,
            status: Some(status.to_string()),
        }
    }
}

/// Snapshot of one aircraft inside a bucket. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftState {
    pub callsign: String,

    /// Report time in seconds
    pub time: f64,

    pub latitude: f64,
    pub longitude: f64,

    /// Ground velocity [east, north] in m/s
    pub velocity: Vector2<f64>,

    /// Track in degrees, clockwise from true north
    pub heading_deg: f64,

    pub phase: FlightPhase,
}

impl AircraftState {
    /// Builds an aircraft state from a traffic row.
    ///
    /// A missing status is `Unknown` unless `phase_from_ground_speed` is set,
    /// in which case the ground-speed bands decide.
    pub fn from_row(row: &TrafficRow, phase_from_ground_speed: bool) -> Result<Self> {
        if !row.time.is_finite() || !row.latitude.is_finite() || !row.longitude.is_finite() {
            return Err(FpfError::InvalidRow(format!(
                "{}: non-finite time or position",
                row.callsign
            )));
        }
        if row.latitude.abs() > 90.0 {
            return Err(FpfError::InvalidRow(format!(
                "{}: latitude {} out of range",
                row.callsign, row.latitude
            )));
        }

        let phase = match row.status.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => FlightPhase::from_label(label),
            _ if phase_from_ground_speed => FlightPhase::from_ground_speed(row.ground_speed),
            _ => FlightPhase::Unknown,
        };

        // A missing speed or heading means a stationary report, not a bad row
        let speed = if row.ground_speed.is_finite() { row.ground_speed.max(0.0) } else { 0.0 };
        let heading_deg = if row.heading.is_finite() { row.heading.rem_euclid(360.0) } else { 0.0 };

        Ok(Self {
            callsign: row.callsign.clone(),
            time: row.time,
            latitude: row.latitude,
            longitude: row.longitude,
            velocity: ground_velocity(speed * KNOTS_TO_MPS, heading_deg),
            heading_deg,
            phase,
        })
    }

    /// Ground speed in m/s.
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }
}

/// East/north velocity from a speed (m/s) and a track (degrees from north).
pub fn ground_velocity(speed: f64, heading_deg: f64) -> Vector2<f64> {
    let hdg = heading_deg.to_radians();
    Vector2::new(speed * hdg.sin(), speed * hdg.cos())
}
