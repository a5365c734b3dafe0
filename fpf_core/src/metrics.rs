//! Metric Calculator - Free Path Fraction per aircraft.
//!
//! ```text
//!            area(ARV)
//! FPF = -------------------        1.0 when area(FRV) = 0
//!       area(ARV) + area(FRV)      0.0 when area(ARV) = 0
//! ```
//!
//! For one ownship the calculator gathers every intruder in sensor range,
//! builds its velocity obstacle, lets the batch's priority rule sort it into
//! the primary or secondary layer (or waive it), clips the envelope annulus
//! against the binding layer and integrates the result.
//!
//! Errors never escape [`MetricCalculator::record`]: a failing aircraft gets a
//! NaN record and the rest of the bucket carries on.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::clipping::{ClipEngine, ClipOutcome};
use crate::config::BatchConfig;
use crate::error::Result;
use crate::geometry::PairwiseGeometry;
use crate::obstacle::{ObstacleBuilder, VelocityObstacle};
use crate::priority::{Encounter, PriorityRule, Refinement};
use crate::traffic::AircraftState;

/// Value written in place of the FPF when an aircraft could not be assessed.
pub const FAILURE_SENTINEL: f64 = f64::NAN;

/// FPF from the two integrated areas.
pub fn free_path_fraction(arv_area: f64, frv_area: f64) -> f64 {
    if frv_area <= 0.0 {
        return 1.0;
    }
    if arv_area <= 0.0 {
        return 0.0;
    }
    (arv_area / (arv_area + frv_area)).clamp(0.0, 1.0)
}

// =============================================================================
// OUTPUT RECORD
// =============================================================================

/// One output row: an aircraft's metric in one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Bucket start time in seconds
    pub time: f64,

    pub callsign: String,

    /// Free Path Fraction in [0, 1], NaN when the aircraft failed
    pub fpf: f64,

    /// Aircraft within sensor range
    #[serde(default)]
    pub intruders: usize,

    /// Current velocity inside a binding obstacle
    #[serde(default)]
    pub in_conflict: bool,
}

impl ConflictRecord {
    /// Record for an aircraft whose metric could not be computed.
    pub fn failed(time: f64, callsign: impl Into<String>) -> Self {
        Self {
            time,
            callsign: callsign.into(),
            fpf: FAILURE_SENTINEL,
            intruders: 0,
            in_conflict: false,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.fpf.is_nan()
    }
}

// =============================================================================
// PER-AIRCRAFT ASSESSMENT
// =============================================================================

/// Everything computed for one ownship in one bucket.
#[derive(Debug, Clone)]
pub struct AircraftMetrics {
    pub fpf: f64,
    pub arv_area: f64,
    pub frv_area: f64,
    pub outcome: ClipOutcome,

    /// Aircraft within sensor range
    pub intruders: usize,

    /// Obstacles that were actually clipped against
    pub binding: usize,

    pub in_conflict: bool,
}

/// Runs the VO / clip / area pipeline for one aircraft of a bucket.
///
/// Holds only shared references, so one calculator serves every worker thread;
/// clipping engines are created per call.
#[derive(Debug, Clone, Copy)]
pub struct MetricCalculator<'a> {
    config: &'a BatchConfig,
    rule: &'a dyn PriorityRule,
}

impl<'a> MetricCalculator<'a> {
    pub fn new(config: &'a BatchConfig, rule: &'a dyn PriorityRule) -> Self {
        Self { config, rule }
    }

    /// Assesses aircraft `own` against the rest of the bucket.
    pub fn assess(
        &self,
        own: usize,
        fleet: &[AircraftState],
        geometry: &PairwiseGeometry,
    ) -> Result<AircraftMetrics> {
        let ownship = &fleet[own];
        let envelopes = &self.config.envelopes;
        let envelope = envelopes.envelope(ownship.phase);
        let builder = ObstacleBuilder::new(&self.config.geometry);

        let mut primary: Vec<VelocityObstacle> = Vec::new();
        let mut secondary: Vec<VelocityObstacle> = Vec::new();
        let mut intruders = 0;

        for pair in geometry.neighbors(own, self.config.sensor_range_meters) {
            intruders += 1;
            let intruder = &fleet[pair.other(own)];

            // The stricter minimum of the two aircraft applies to the pair
            let separation = envelope
                .separation
                .max(envelopes.envelope(intruder.phase).separation)
                * self.config.geometry.separation_margin;
            let obstacle = builder.build(own, pair, intruder, &envelope, separation)?;

            let refinement = self.rule.refine(&Encounter {
                own_index: own,
                own: ownship,
                intruder,
                pair,
                obstacle: &obstacle,
            });
            match refinement {
                None => primary.push(obstacle),
                Some(Refinement::Defer) => secondary.push(obstacle),
                Some(Refinement::Waive) => {}
            }
        }

        let binding = if primary.is_empty() { secondary } else { primary };
        let velocity = [ownship.velocity.x, ownship.velocity.y];
        let in_conflict = binding.iter().any(|vo| vo.contains(velocity));

        let obstacles: Vec<&VelocityObstacle> = binding.iter().collect();
        let sets = ClipEngine::new(&self.config.geometry).clip(&envelope, &obstacles)?;
        let fpf = free_path_fraction(sets.arv_area, sets.frv_area);

        trace!(
            callsign = %ownship.callsign,
            intruders,
            binding = binding.len(),
            fpf,
            "assessed aircraft"
        );

        Ok(AircraftMetrics {
            fpf,
            arv_area: sets.arv_area,
            frv_area: sets.frv_area,
            outcome: sets.outcome,
            intruders,
            binding: binding.len(),
            in_conflict,
        })
    }

    /// Output record for aircraft `own`, labelled with the bucket start time.
    pub fn record(
        &self,
        bucket_time: f64,
        own: usize,
        fleet: &[AircraftState],
        geometry: &PairwiseGeometry,
    ) -> ConflictRecord {
        let callsign = &fleet[own].callsign;
        match self.assess(own, fleet, geometry) {
            Ok(metrics) => ConflictRecord {
                time: bucket_time,
                callsign: callsign.clone(),
                fpf: metrics.fpf,
                intruders: metrics.intruders,
                in_conflict: metrics.in_conflict,
            },
            Err(e) => {
                warn!(callsign = %callsign, time = bucket_time, "aircraft skipped: {}", e);
                ConflictRecord::failed(bucket_time, callsign.clone())
            }
        }
    }
}
