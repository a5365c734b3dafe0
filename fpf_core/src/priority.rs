//! Priority rules - policies deciding which obstacles bind an ownship.
//!
//! A rule is chosen once per batch ([`PriorityCode::rule`]) and consulted for
//! every encounter. Returning `None` keeps the obstacle in the primary layer,
//! so the default rule is the identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::PairGeometry;
use crate::obstacle::VelocityObstacle;
use crate::traffic::AircraftState;

/// Configured priority rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PriorityCode {
    /// Shortest way out: every obstacle in range binds
    #[default]
    #[serde(alias = "default", alias = "RS1")]
    Default,
    /// Only obstacles the current velocity is inside of bind
    #[serde(rename = "RS5", alias = "rs5")]
    Rs5,
    /// Rules of the air: only give-way encounters bind
    #[serde(rename = "RS6", alias = "rs6")]
    Rs6,
    /// Sequential: current conflicts first, the remaining traffic as a second layer
    #[serde(rename = "RS7", alias = "rs7")]
    Rs7,
    /// Sequential over the rules-of-the-air subset
    #[serde(rename = "RS8", alias = "rs8")]
    Rs8,
}

impl PriorityCode {
    pub fn all() -> Vec<PriorityCode> {
        vec![
            PriorityCode::Default,
            PriorityCode::Rs5,
            PriorityCode::Rs6,
            PriorityCode::Rs7,
            PriorityCode::Rs8,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PriorityCode::Default => "default",
            PriorityCode::Rs5 => "RS5",
            PriorityCode::Rs6 => "RS6",
            PriorityCode::Rs7 => "RS7",
            PriorityCode::Rs8 => "RS8",
        }
    }

    /// Builds the strategy for this code.
    pub fn rule(&self) -> Box<dyn PriorityRule> {
        match self {
            PriorityCode::Default => Box::new(ShortestWayOut),
            PriorityCode::Rs5 => Box::new(ConflictOnly),
            PriorityCode::Rs6 => Box::new(RulesOfTheAir::default()),
            PriorityCode::Rs7 => Box::new(Sequential::new("RS7", ShortestWayOut)),
            PriorityCode::Rs8 => Box::new(Sequential::new("RS8", RulesOfTheAir::default())),
        }
    }
}

impl fmt::Display for PriorityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PriorityCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "rs1" => Ok(PriorityCode::Default),
            "rs5" => Ok(PriorityCode::Rs5),
            "rs6" => Ok(PriorityCode::Rs6),
            "rs7" => Ok(PriorityCode::Rs7),
            "rs8" => Ok(PriorityCode::Rs8),
            _ => Err(format!("Unknown priority rule: {}", s)),
        }
    }
}

/// One ownship/intruder encounter, as seen from the ownship.
#[derive(Debug, Clone, Copy)]
pub struct Encounter<'a> {
    pub own_index: usize,
    pub own: &'a AircraftState,
    pub intruder: &'a AircraftState,
    pub pair: &'a PairGeometry,
    pub obstacle: &'a VelocityObstacle,
}

impl Encounter<'_> {
    /// True when the ownship's current velocity is inside this obstacle.
    pub fn own_velocity_inside(&self) -> bool {
        self.obstacle.contains([self.own.velocity.x, self.own.velocity.y])
    }

    /// Bearing of the intruder relative to the ownship heading, degrees in (-180, 180].
    pub fn relative_bearing_deg(&self) -> f64 {
        signed_degrees(self.pair.bearing_from(self.own_index).to_degrees() - self.own.heading_deg)
    }

    /// Bearing of the ownship relative to the intruder heading, degrees in (-180, 180].
    pub fn intruder_relative_bearing_deg(&self) -> f64 {
        let other = self.pair.other(self.own_index);
        signed_degrees(self.pair.bearing_from(other).to_degrees() - self.intruder.heading_deg)
    }
}

fn signed_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// How a rule re-interprets an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refinement {
    /// The obstacle does not bind the ownship
    Waive,
    /// Secondary layer: carved only when no primary-layer obstacle binds
    Defer,
}

/// Priority rule strategy.
pub trait PriorityRule: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Classifies one encounter. `None` keeps the obstacle in the primary layer.
    fn refine(&self, encounter: &Encounter<'_>) -> Option<Refinement>;
}

/// Default rule: identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestWayOut;

impl PriorityRule for ShortestWayOut {
    fn name(&self) -> &'static str {
        "default"
    }

    fn refine(&self, _encounter: &Encounter<'_>) -> Option<Refinement> {
        None
    }
}

/// RS5: only encounters the ownship is currently in conflict with constrain it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictOnly;

impl PriorityRule for ConflictOnly {
    fn name(&self) -> &'static str {
        "RS5"
    }

    fn refine(&self, encounter: &Encounter<'_>) -> Option<Refinement> {
        if encounter.own_velocity_inside() {
            None
        } else {
            Some(Refinement::Waive)
        }
    }
}

/// RS6: the ownship gives way to traffic head-on or converging from the
/// right, and when it is overtaking. Everything else is the intruder's problem.
#[derive(Debug, Clone, Copy)]
pub struct RulesOfTheAir {
    /// Give-way sector, relative to the ownship heading (degrees)
    pub give_way_sector: (f64, f64),
    /// Overtaking: ownship more than this far abaft the intruder's beam (degrees)
    pub overtaking_limit: f64,
}

impl Default for RulesOfTheAir {
    fn default() -> Self {
        Self {
            give_way_sector: (-20.0, 110.0),
            overtaking_limit: 110.0,
        }
    }
}

impl RulesOfTheAir {
    fn binds(&self, encounter: &Encounter<'_>) -> bool {
        let brg_own = encounter.relative_bearing_deg();
        let brg_other = encounter.intruder_relative_bearing_deg();

        let give_way = brg_own >= self.give_way_sector.0 && brg_own <= self.give_way_sector.1;
        let overtaking = brg_other <= -self.overtaking_limit || brg_other >= self.overtaking_limit;
        give_way || overtaking
    }
}

impl PriorityRule for RulesOfTheAir {
    fn name(&self) -> &'static str {
        "RS6"
    }

    fn refine(&self, encounter: &Encounter<'_>) -> Option<Refinement> {
        if self.binds(encounter) {
            None
        } else {
            Some(Refinement::Waive)
        }
    }
}

/// RS7/RS8: two-layer sequential detection on top of a base rule.
///
/// Obstacles the base rule keeps and that contain the current velocity form
/// the primary layer; the rest of the kept obstacles are deferred.
#[derive(Debug, Clone, Copy)]
pub struct Sequential<R> {
    name: &'static str,
    base: R,
}

impl<R: PriorityRule> Sequential<R> {
    /// Wraps `base`; `name` is the code the combined rule reports.
    pub fn new(name: &'static str, base: R) -> Self {
        Self { name, base }
    }
}

impl<R: PriorityRule> PriorityRule for Sequential<R> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn refine(&self, encounter: &Encounter<'_>) -> Option<Refinement> {
        match self.base.refine(encounter) {
            Some(refinement) => Some(refinement),
            None if encounter.own_velocity_inside() => None,
            None => Some(Refinement::Defer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeometryConfig;
    use crate::envelope::VelocityEnvelope;
    use crate::obstacle::ObstacleBuilder;
    use crate::traffic::{ground_velocity, FlightPhase};

    fn state(speed: f64, heading_deg: f64) -> AircraftState {
        AircraftState {
            callsign: "TEST".to_string(),
            time: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            velocity: ground_velocity(speed, heading_deg),
            heading_deg,
            phase: FlightPhase::Taxi,
        }
    }

    /// Ownship (index 0) and intruder (index 1) with the intruder at `bearing_deg`.
    fn classify(rule: &dyn PriorityRule, own: &AircraftState, intruder: &AircraftState, bearing_deg: f64) -> Option<Refinement> {
        let config = GeometryConfig::default();
        let pair = PairGeometry { i: 0, j: 1, bearing: bearing_deg.to_radians(), distance: 400.0 };
        let envelope = VelocityEnvelope::new(0.0, 10.0, 100.0);
        let obstacle = ObstacleBuilder::new(&config)
            .build(0, &pair, intruder, &envelope, 100.0)
            .unwrap();

        let encounter = Encounter { own_index: 0, own, intruder, pair: &pair, obstacle: &obstacle };
        rule.refine(&encounter)
    }

    #[test]
    fn test_parse_codes() {
        assert_eq!("rs6".parse::<PriorityCode>().unwrap(), PriorityCode::Rs6);
        assert_eq!("RS1".parse::<PriorityCode>().unwrap(), PriorityCode::Default);
        assert!("rs9".parse::<PriorityCode>().is_err());
        for code in PriorityCode::all() {
            assert_eq!(code.rule().name(), code.name());
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&PriorityCode::Rs7).unwrap(), "\"RS7\"");
        let code: PriorityCode = serde_json::from_str("\"Default\"").unwrap();
        assert_eq!(code, PriorityCode::Default);
    }

    #[test]
    fn test_default_is_identity() {
        let own = state(5.0, 0.0);
        let intruder = state(5.0, 180.0);
        assert_eq!(classify(&ShortestWayOut, &own, &intruder, 0.0), None);
        assert_eq!(classify(&ShortestWayOut, &own, &intruder, 180.0), None);
    }

    #[test]
    fn test_conflict_only() {
        // Heading straight at a stationary intruder
        let own = state(5.0, 0.0);
        let intruder = state(0.0, 0.0);
        assert_eq!(classify(&ConflictOnly, &own, &intruder, 0.0), None);

        // Heading away from it
        let own = state(5.0, 180.0);
        assert_eq!(classify(&ConflictOnly, &own, &intruder, 0.0), Some(Refinement::Waive));
    }

    #[test]
    fn test_rules_of_the_air_sectors() {
        let rule = RulesOfTheAir::default();
        let own = state(5.0, 0.0);

        // Head-on
        let intruder = state(5.0, 180.0);
        assert_eq!(classify(&rule, &own, &intruder, 0.0), None);

        // Converging from the right
        let intruder = state(5.0, 270.0);
        assert_eq!(classify(&rule, &own, &intruder, 60.0), None);

        // Converging from the left: intruder gives way
        let intruder = state(5.0, 90.0);
        assert_eq!(classify(&rule, &own, &intruder, 300.0), Some(Refinement::Waive));

        // Overtaking a slower aircraft ahead-left of the sector
        let intruder = state(2.0, 330.0);
        assert_eq!(classify(&rule, &own, &intruder, 330.0), None);
    }

    #[test]
    fn test_sequential_layers() {
        let rule = Sequential::new("RS7", ShortestWayOut);
        let intruder = state(0.0, 0.0);

        let towards = state(5.0, 0.0);
        assert_eq!(classify(&rule, &towards, &intruder, 0.0), None);

        let away = state(5.0, 180.0);
        assert_eq!(classify(&rule, &away, &intruder, 0.0), Some(Refinement::Defer));
    }

    #[test]
    fn test_sequential_keeps_base_waiver() {
        let rule = Sequential::new("RS8", RulesOfTheAir::default());
        let own = state(5.0, 0.0);
        let intruder = state(5.0, 90.0);
        assert_eq!(classify(&rule, &own, &intruder, 300.0), Some(Refinement::Waive));
    }

    #[test]
    fn test_sequential_name_is_independent_of_base() {
        assert_eq!(Sequential::new("RS8", RulesOfTheAir::default()).name(), "RS8");
        assert_eq!(Sequential::new("RS7", ConflictOnly).name(), "RS7");
        assert_eq!(PriorityCode::Rs8.rule().name(), "RS8");
    }

    #[test]
    fn test_signed_degrees() {
        assert_eq!(signed_degrees(190.0), -170.0);
        assert_eq!(signed_degrees(-190.0), 170.0);
        assert_eq!(signed_degrees(180.0), 180.0);
        assert_eq!(signed_degrees(720.0), 0.0);
    }
}
