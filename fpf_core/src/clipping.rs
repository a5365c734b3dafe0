//! Clipping Engine - Forbidden and Allowed Reachable Velocity sets.
//!
//! ```text
//! annulus = { v : vmin <= |v| <= vmax }        (discretized, N_angle points)
//! FRV     = annulus ∩ (VO_1 ∪ VO_2 ∪ ...)
//! ARV     = annulus − (VO_1 ∪ VO_2 ∪ ...)
//! ```
//!
//! All boolean operations run on the integer grid of [`FixedPoint`]: every
//! input vertex is snapped before the sweep and every output vertex is snapped
//! again before it is scaled back. Results are oriented (exteriors CCW, holes
//! CW) and flattened into a [`RingSet`] right here, so callers never see the
//! polygon library's shapes.
//!
//! An engine is built per aircraft and never shared between threads.

use geo::algorithm::orient::{Direction, Orient};
use geo::{BooleanOps, MultiPolygon, Polygon};
use std::panic::{self, AssertUnwindSafe};
use tracing::trace;

use crate::config::GeometryConfig;
use crate::envelope::VelocityEnvelope;
use crate::error::{FpfError, Result};
use crate::obstacle::VelocityObstacle;
use crate::polygon::{FixedPoint, Ring, RingSet};

/// Which of the three clipping branches produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOutcome {
    /// Nothing carved: no obstacle, or no obstacle reaches the annulus
    Unobstructed,
    /// Some velocities forbidden, some allowed
    Partial,
    /// Every reachable velocity is forbidden
    Blocked,
}

/// ARV and FRV of one aircraft with their areas in (m/s)².
#[derive(Debug, Clone)]
pub struct ReachableSets {
    pub arv: RingSet,
    pub frv: RingSet,
    pub arv_area: f64,
    pub frv_area: f64,
    pub outcome: ClipOutcome,
}

/// Per-aircraft polygon boolean-ops engine.
#[derive(Debug, Clone)]
pub struct ClipEngine<'a> {
    config: &'a GeometryConfig,
    fixed: FixedPoint,
}

impl<'a> ClipEngine<'a> {
    pub fn new(config: &'a GeometryConfig) -> Self {
        Self {
            config,
            fixed: FixedPoint::new(config.fixed_point_scale),
        }
    }

    pub fn fixed_point(&self) -> FixedPoint {
        self.fixed
    }

    /// Reachable-velocity annulus: outer circle CCW, inner circle CW.
    /// The inner ring is omitted when `vmin` is zero.
    pub fn annulus(&self, envelope: &VelocityEnvelope) -> RingSet {
        let n = self.config.angle_resolution;
        let step = std::f64::consts::TAU / n as f64;

        // Unit circle sampled clockwise from north
        let unit: Vec<[f64; 2]> = (0..n)
            .map(|k| {
                let angle = k as f64 * step;
                [angle.sin(), angle.cos()]
            })
            .collect();

        let scaled = |r: f64| Ring::new(unit.iter().map(|p| [p[0] * r, p[1] * r]).collect());

        let mut rings = vec![scaled(envelope.vmax).reversed()];
        if envelope.vmin > 0.0 {
            rings.push(scaled(envelope.vmin));
        }
        RingSet::new(rings)
    }

    /// Result when nothing constrains the aircraft.
    pub fn unobstructed(&self, envelope: &VelocityEnvelope) -> ReachableSets {
        ReachableSets {
            arv: self.annulus(envelope),
            frv: RingSet::empty(),
            arv_area: envelope.annulus_area(),
            frv_area: 0.0,
            outcome: ClipOutcome::Unobstructed,
        }
    }

    /// Result when every reachable velocity is forbidden.
    pub fn blocked(&self, envelope: &VelocityEnvelope) -> ReachableSets {
        ReachableSets {
            arv: RingSet::empty(),
            frv: self.annulus(envelope),
            arv_area: 0.0,
            frv_area: envelope.annulus_area(),
            outcome: ClipOutcome::Blocked,
        }
    }

    /// Clips the annulus against the union of `obstacles`.
    pub fn clip(
        &self,
        envelope: &VelocityEnvelope,
        obstacles: &[&VelocityObstacle],
    ) -> Result<ReachableSets> {
        let Some((first, rest)) = obstacles.split_first() else {
            return Ok(self.unobstructed(envelope));
        };

        let annulus = MultiPolygon::new(vec![self.annulus_polygon(envelope)]);

        // Non-zero fill over the clip paths: overlapping obstacles count once
        let mut union = MultiPolygon::new(vec![self.fixed.polygon(&first.ring)]);
        for vo in rest {
            let next = MultiPolygon::new(vec![self.fixed.polygon(&vo.ring)]);
            union = sweep(|| union.union(&next))?;
        }

        let frv = self.normalize(sweep(|| annulus.intersection(&union))?);
        let arv = self.normalize(sweep(|| annulus.difference(&union))?);

        let arv_area = self.fixed.area(&arv);
        let frv_area = self.fixed.area(&frv);
        trace!(
            obstacles = obstacles.len(),
            arv_rings = arv.len(),
            frv_rings = frv.len(),
            arv_area,
            frv_area,
            "clipped annulus"
        );

        if arv.is_empty() || arv_area <= 0.0 {
            return Ok(self.blocked(envelope));
        }
        if frv.is_empty() || frv_area <= 0.0 {
            return Ok(self.unobstructed(envelope));
        }

        Ok(ReachableSets {
            arv,
            frv,
            arv_area,
            frv_area,
            outcome: ClipOutcome::Partial,
        })
    }

    fn annulus_polygon(&self, envelope: &VelocityEnvelope) -> Polygon<f64> {
        // annulus() always yields the outer ring first
        let rings: Vec<_> = self.annulus(envelope).iter().map(|ring| self.fixed.to_geo(ring)).collect();
        let mut rings = rings.into_iter();
        match rings.next() {
            Some(exterior) => Polygon::new(exterior, rings.collect()),
            None => Polygon::new(Vec::<geo::Coord<f64>>::new().into(), vec![]),
        }
    }

    fn normalize(&self, result: MultiPolygon<f64>) -> RingSet {
        self.fixed.ring_set(&result.orient(Direction::Default))
    }
}

/// Runs one boolean operation, turning a failed sweep into a per-aircraft error.
fn sweep<F>(op: F) -> Result<MultiPolygon<f64>>
where
    F: FnOnce() -> MultiPolygon<f64>,
{
    // The sweep can panic on near-degenerate input
    panic::catch_unwind(AssertUnwindSafe(op))
        .map_err(|_| FpfError::polygon("boolean operation failed on near-degenerate input"))
}
