//! Traffic scenarios with known conflict-metric outcomes.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// FPF-001: single aircraft, nothing to avoid
    LoneAircraft,

    /// FPF-002: stationary pair at twice the separation minimum
    GoldenWedge,

    /// FPF-003: two aircraft taxiing straight at each other
    HeadOn,

    /// FPF-004: converging at right angles
    Crossing,

    /// FPF-005: pair already inside the separation minimum
    LosOverlap,

    /// FPF-006: seeded crowd of pushback and taxi traffic on one ramp
    RampCongestion,

    /// FPF-007: en-route pair beyond sensor range
    OutOfRange,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::LoneAircraft,
            ScenarioId::GoldenWedge,
            ScenarioId::HeadOn,
            ScenarioId::Crossing,
            ScenarioId::LosOverlap,
            ScenarioId::RampCongestion,
            ScenarioId::OutOfRange,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::LoneAircraft => "lone_aircraft",
            ScenarioId::GoldenWedge => "golden_wedge",
            ScenarioId::HeadOn => "head_on",
            ScenarioId::Crossing => "crossing",
            ScenarioId::LosOverlap => "los_overlap",
            ScenarioId::RampCongestion => "ramp_congestion",
            ScenarioId::OutOfRange => "out_of_range",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::LoneAircraft => "One taxiing aircraft, FPF must stay 1.0",
            ScenarioId::GoldenWedge => "Stationary taxi pair 300 m apart, 30° half-angle, FPF = 5/6",
            ScenarioId::HeadOn => "Opposite headings on one taxiway, both aircraft in conflict",
            ScenarioId::Crossing => "Perpendicular taxi routes converging on one intersection",
            ScenarioId::LosOverlap => "Pair 40 m apart with a 150 m minimum, dart-tip obstacles",
            ScenarioId::RampCongestion => "Seeded ramp crowd with position noise, range and determinism checks",
            ScenarioId::OutOfRange => "En-route pair 100 NM apart, no intruders in range",
        }
    }

    /// True when the expected outcome depends on the default priority rule.
    pub fn expects_default_rule(&self) -> bool {
        matches!(
            self,
            ScenarioId::GoldenWedge | ScenarioId::HeadOn | ScenarioId::LosOverlap
        )
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lone_aircraft" | "lone" | "fpf-001" => Ok(ScenarioId::LoneAircraft),
            "golden_wedge" | "golden" | "fpf-002" => Ok(ScenarioId::GoldenWedge),
            "head_on" | "headon" | "fpf-003" => Ok(ScenarioId::HeadOn),
            "crossing" | "fpf-004" => Ok(ScenarioId::Crossing),
            "los_overlap" | "los" | "fpf-005" => Ok(ScenarioId::LosOverlap),
            "ramp_congestion" | "ramp" | "fpf-006" => Ok(ScenarioId::RampCongestion),
            "out_of_range" | "fpf-007" => Ok(ScenarioId::OutOfRange),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
