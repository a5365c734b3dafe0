//! Velocity-Obstacle builder.
//!
//! For an ownship and one intruder in range, builds the set of ownship
//! velocities that lead to loss of separation:
//!
//! - **Cone**: the standard triangular VO. Apex at the origin of relative
//!   velocity space, side rays at `qdr ± alpha` reaching
//!   `cone_length_factor × vmax` along the bearing axis, translated by the
//!   intruder's velocity (Minkowski sum).
//! - **Dart-tip**: used when the pair is already inside the separation minimum,
//!   where the cone half-angle is undefined. A 4-point kite pointing along the
//!   bearing, anchored at the ownship velocity origin.
//!
//! # Mirror convention
//!
//! Pair geometry is stored once, with the bearing pointing from the lower
//! index to the higher one. The VO seen from the higher index is the point
//! reflection of the stored cone: the cone is negated (and for the dart-tip the
//! bearing is turned by 180°) before the intruder velocity is added.
//!
//! Coincident aircraft have no bearing: the pair stores 0 (north), so the
//! lower index gets a dart-tip pointing north and the higher index one pointing
//! south. Results for stacked aircraft therefore depend on their order in the
//! bucket.

use geo::{Contains, Coord, LineString, Polygon};

use crate::config::GeometryConfig;
use crate::envelope::VelocityEnvelope;
use crate::error::{FpfError, Result};
use crate::geometry::PairGeometry;
use crate::polygon::{FixedPoint, Ring};
use crate::traffic::AircraftState;

/// Which construction produced an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    /// Standard triangular VO
    Cone,
    /// Loss of separation already in effect
    DartTip,
}

/// A velocity obstacle in ownship velocity space.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityObstacle {
    /// Bucket index of the intruder
    pub intruder: usize,

    pub kind: ObstacleKind,

    /// Polygon in absolute ownship velocity space [east, north] (m/s)
    pub ring: Ring,

    /// Polygon before the intruder-velocity offset
    relative: Ring,

    /// Half-angle of the cone in radians (None for a dart-tip)
    pub half_angle: Option<f64>,
}

impl VelocityObstacle {
    /// The obstacle in relative velocity space (no Minkowski offset).
    pub fn relative_cone(&self) -> &Ring {
        &self.relative
    }

    /// True when `velocity` lies strictly inside the obstacle.
    pub fn contains(&self, velocity: [f64; 2]) -> bool {
        let exterior: LineString<f64> = self
            .ring
            .points
            .iter()
            .map(|p| Coord { x: p[0], y: p[1] })
            .collect::<Vec<_>>()
            .into();
        Polygon::new(exterior, vec![]).contains(&Coord { x: velocity[0], y: velocity[1] })
    }
}

/// Builds obstacles for one ownship. Stateless apart from its configuration.
#[derive(Debug, Clone, Copy)]
pub struct ObstacleBuilder<'a> {
    config: &'a GeometryConfig,
    fixed: FixedPoint,
}

impl<'a> ObstacleBuilder<'a> {
    pub fn new(config: &'a GeometryConfig) -> Self {
        Self {
            config,
            fixed: FixedPoint::new(config.fixed_point_scale),
        }
    }

    /// Builds the obstacle intruder `pair.other(own)` imposes on `own`.
    ///
    /// `separation` is the pair's separation minimum; `envelope` is the ownship's.
    pub fn build(
        &self,
        own: usize,
        pair: &PairGeometry,
        intruder: &AircraftState,
        envelope: &VelocityEnvelope,
        separation: f64,
    ) -> Result<VelocityObstacle> {
        // Clamp below the minimum up to the minimum; the clamped value marks LOS
        let distance = pair.distance.max(separation);

        let obstacle = if distance == separation {
            let relative = self.dart_tip(pair.bearing_from(own), envelope.vmax);
            VelocityObstacle {
                intruder: pair.other(own),
                kind: ObstacleKind::DartTip,
                ring: relative.clone(),
                relative,
                half_angle: None,
            }
        } else {
            let alpha = (separation / distance).asin().min(self.config.max_half_angle);
            let mut relative = self.cone(pair.bearing, alpha, envelope.vmax);
            if pair.is_mirrored_for(own) {
                relative = relative.reflected();
            }
            let offset = [intruder.velocity.x, intruder.velocity.y];
            VelocityObstacle {
                intruder: pair.other(own),
                kind: ObstacleKind::Cone,
                ring: relative.translated(offset),
                relative,
                half_angle: Some(alpha),
            }
        };

        self.check(&obstacle)?;
        Ok(obstacle)
    }

    /// Triangle with apex at the origin, opening towards `qdr` with half-angle `alpha`.
    pub fn cone(&self, qdr: f64, alpha: f64, vmax: f64) -> Ring {
        let length = self.config.cone_length_factor * vmax;
        let (sinqdr, cosqdr) = qdr.sin_cos();
        let tanalpha = alpha.tan();

        let x1 = (sinqdr + cosqdr * tanalpha) * length;
        let y1 = (cosqdr - sinqdr * tanalpha) * length;
        let x2 = (sinqdr - cosqdr * tanalpha) * length;
        let y2 = (cosqdr + sinqdr * tanalpha) * length;

        Ring::new(vec![[0.0, 0.0], [x1, y1], [x2, y2]])
    }

    /// Kite pointing along `qdr_los`: outer legs at `qdr_los ± 2β`, notch at the origin.
    pub fn dart_tip(&self, qdr_los: f64, vmax: f64) -> Ring {
        let beta = self.config.los_beta();
        let leg = self.config.los_leg_multiplier * vmax / beta.cos();

        let mut points: Vec<[f64; 2]> = [qdr_los + 2.0 * beta, qdr_los, qdr_los - 2.0 * beta]
            .iter()
            .map(|angle| [leg * angle.sin(), leg * angle.cos()])
            .collect();
        points.push([0.0, 0.0]);

        Ring::new(points)
    }

    fn check(&self, obstacle: &VelocityObstacle) -> Result<()> {
        if !obstacle.ring.is_finite() {
            return Err(FpfError::polygon(format!(
                "non-finite {:?} vertices against intruder {}",
                obstacle.kind, obstacle.intruder
            )));
        }
        if FixedPoint::doubled_area(&self.fixed.quantize(&obstacle.ring)) == 0 {
            return Err(FpfError::polygon(format!(
                "zero-area {:?} against intruder {}",
                obstacle.kind, obstacle.intruder
            )));
        }
        Ok(())
    }
}
