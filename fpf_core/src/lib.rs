//! FPF Core - Free Path Fraction conflict metric for shared airspace
//!
//! For every aircraft of a traffic snapshot, measures what fraction of its
//! physically reachable velocities stay clear of loss of separation:
//! 1. **Geometry**: flat-earth bearing and distance for every pair, once per bucket
//! 2. **Velocity Obstacles**: a cone (or a dart-tip when already inside the minimum) per intruder
//! 3. **Clipping**: envelope annulus against the union of obstacles, on an integer grid
//! 4. **Metric**: FPF = area(ARV) / (area(ARV) + area(FRV))

pub mod batch;
pub mod clipping;
pub mod config;
pub mod envelope;
pub mod error;
pub mod geometry;
pub mod metrics;
pub mod obstacle;
pub mod polygon;
pub mod priority;
pub mod traffic;

// Re-export key types for convenience
pub use batch::{BatchDriver, BatchSummary, Bucket};
pub use clipping::{ClipEngine, ClipOutcome, ReachableSets};
pub use config::{BatchConfig, GeometryConfig};
pub use envelope::{EnvelopeModel, VelocityEnvelope};
pub use error::{FpfError, Result};
pub use geometry::{PairGeometry, PairwiseGeometry};
pub use metrics::{free_path_fraction, AircraftMetrics, ConflictRecord, MetricCalculator};
pub use obstacle::{ObstacleBuilder, ObstacleKind, VelocityObstacle};
pub use polygon::{FixedPoint, Ring, RingSet};
pub use priority::{PriorityCode, PriorityRule, Refinement};
pub use traffic::{AircraftState, FlightPhase, TrafficRow};
