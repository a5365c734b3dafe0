//! Batch Driver - buckets a traffic table and runs the pipeline per aircraft.
//!
//! ```text
//! rows ──► ingest ──► buckets [t0 + kL, t0 + (k+1)L) ──► geometry (once)
//!                                                          │
//!                                  ┌───────────────────────┼───────────────────┐
//!                                  ▼                       ▼                   ▼
//!                             aircraft 0              aircraft 1     ...  aircraft n-1
//!                           (VO, clip, FPF)         (VO, clip, FPF)
//!                                  └───────────────────────┴───────────────────┘
//!                                                          ▼
//!                                               records, bucket order
//! ```
//!
//! Buckets are independent. Within a bucket the pairwise geometry is computed
//! once and read by every aircraft; per-aircraft work fans out over rayon.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::error::Result;
use crate::geometry::PairwiseGeometry;
use crate::metrics::{ConflictRecord, MetricCalculator};
use crate::priority::PriorityRule;
use crate::traffic::{AircraftState, TrafficRow};

/// One populated time slice of the traffic table.
#[derive(Debug, Clone)]
pub struct Bucket {
    /// Slice number k counted from the earliest report
    pub index: u64,

    /// Label: start of the slice in seconds
    pub start: f64,

    /// Latest report per aircraft, ordered by callsign
    pub aircraft: Vec<AircraftState>,
}

/// Runs the conflict metric over a whole traffic table.
#[derive(Debug)]
pub struct BatchDriver {
    config: BatchConfig,
    rule: Box<dyn PriorityRule>,
    cancel: Option<Arc<AtomicBool>>,
}

impl BatchDriver {
    /// Validates the configuration and selects the priority rule for the run.
    pub fn new(config: BatchConfig) -> Result<Self> {
        config.validate()?;
        let rule = config.priority_rule.rule();
        Ok(Self { config, rule, cancel: None })
    }

    /// Shares a flag that abandons the remaining buckets once set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn rule_name(&self) -> &'static str {
        self.rule.name()
    }

    /// Converts rows to aircraft states, dropping rows that cannot be used.
    pub fn ingest(&self, rows: &[TrafficRow]) -> Vec<AircraftState> {
        rows.iter()
            .filter_map(|row| match AircraftState::from_row(row, self.config.phase_from_ground_speed) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!("dropping row: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Partitions aircraft states into populated buckets, in time order.
    pub fn partition(&self, states: Vec<AircraftState>) -> Vec<Bucket> {
        let Some(t0) = states.iter().map(|s| s.time).reduce(f64::min) else {
            return Vec::new();
        };
        let width = self.config.lookahead_seconds;

        let mut slices: BTreeMap<u64, BTreeMap<String, AircraftState>> = BTreeMap::new();
        for state in states {
            let k = ((state.time - t0) / width).floor() as u64;
            let slice = slices.entry(k).or_default();
            match slice.get(&state.callsign) {
                Some(existing) if existing.time > state.time => {}
                _ => {
                    slice.insert(state.callsign.clone(), state);
                }
            }
        }

        slices
            .into_iter()
            .map(|(index, slice)| Bucket {
                index,
                start: t0 + index as f64 * width,
                aircraft: slice.into_values().collect(),
            })
            .collect()
    }

    /// Computes one record per aircraft of the bucket, in bucket order.
    pub fn run_bucket(&self, bucket: &Bucket) -> Vec<ConflictRecord> {
        let geometry = PairwiseGeometry::compute(&bucket.aircraft);
        let calculator = MetricCalculator::new(&self.config, self.rule.as_ref());
        let fleet = &bucket.aircraft;

        if self.config.parallel {
            (0..fleet.len())
                .into_par_iter()
                .map(|own| calculator.record(bucket.start, own, fleet, &geometry))
                .collect()
        } else {
            (0..fleet.len())
                .map(|own| calculator.record(bucket.start, own, fleet, &geometry))
                .collect()
        }
    }

    /// Runs every bucket of the table. Records are ordered by bucket, then callsign.
    pub fn run(&self, rows: &[TrafficRow]) -> Vec<ConflictRecord> {
        let buckets = self.partition(self.ingest(rows));
        info!(
            rows = rows.len(),
            buckets = buckets.len(),
            rule = self.rule_name(),
            "starting batch"
        );

        let mut records = Vec::new();
        for bucket in &buckets {
            if self.is_cancelled() {
                warn!(bucket = bucket.index, "batch cancelled, abandoning remaining buckets");
                break;
            }
            let out = self.run_bucket(bucket);
            debug!(
                bucket = bucket.index,
                start = bucket.start,
                aircraft = bucket.aircraft.len(),
                "bucket done"
            );
            records.extend(out);
        }

        info!(records = records.len(), "batch complete");
        records
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

/// Aggregate view of a run's output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub buckets: usize,
    pub records: usize,
    pub failures: usize,
    pub in_conflict: usize,

    /// Mean FPF over successful records (None when there are none)
    pub mean_fpf: Option<f64>,

    pub min_fpf: Option<f64>,
}

impl BatchSummary {
    pub fn from_records(records: &[ConflictRecord]) -> Self {
        let mut summary = BatchSummary {
            records: records.len(),
            ..Default::default()
        };

        let mut last_time: Option<f64> = None;
        let mut total = 0.0;
        let mut counted = 0usize;
        for record in records {
            if last_time != Some(record.time) {
                summary.buckets += 1;
                last_time = Some(record.time);
            }
            if record.in_conflict {
                summary.in_conflict += 1;
            }
            if record.is_failure() {
                summary.failures += 1;
                continue;
            }
            total += record.fpf;
            counted += 1;
            summary.min_fpf = Some(summary.min_fpf.map_or(record.fpf, |m| m.min(record.fpf)));
        }

        if counted > 0 {
            summary.mean_fpf = Some(total / counted as f64);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FpfError;
    use crate::geometry::EARTH_RADIUS;
    use crate::priority::PriorityCode;
    use approx::assert_relative_eq;

    const LAT: f64 = 40.64;
    const LON: f64 = -73.78;

    fn row(time: f64, callsign: &str, north_m: f64, east_m: f64, speed: f64, heading: f64) -> TrafficRow {
        let lat = LAT + (north_m / EARTH_RADIUS).to_degrees();
        let lon = LON + (east_m / (EARTH_RADIUS * LAT.to_radians().cos())).to_degrees();
        TrafficRow::new(time, callsign, lat, lon, speed, heading, "TAXI")
    }

    fn driver(config: BatchConfig) -> BatchDriver {
        BatchDriver::new(config).unwrap()
    }

    fn ramp() -> Vec<TrafficRow> {
        vec![
            row(0.0, "DAL10", 0.0, 0.0, 8.0, 45.0),
            row(1.0, "JBU22", 120.0, 80.0, 12.0, 200.0),
            row(2.0, "UAL7", -300.0, 40.0, 0.0, 0.0),
            row(3.0, "AAL301", 10.0, -260.0, 20.0, 90.0),
            row(4.0, "SKW88", 600.0, 600.0, 15.0, 225.0),
            row(12.0, "DAL10", 20.0, 20.0, 8.0, 45.0),
            row(13.0, "JBU22", 100.0, 60.0, 12.0, 200.0),
        ]
    }

    #[test]
    fn test_config_errors_fail_fast() {
        let result = BatchDriver::new(BatchConfig::default().with_lookahead(0.0));
        assert!(matches!(result, Err(FpfError::Configuration(_))));
    }

    #[test]
    fn test_driver_reports_configured_rule() {
        for code in PriorityCode::all() {
            let batch = driver(BatchConfig::default().with_priority(code));
            assert_eq!(batch.rule_name(), code.name());
        }
    }

    #[test]
    fn test_single_aircraft_bucket() {
        let records = driver(BatchConfig::default()).run(&[row(5.0, "N123", 0.0, 0.0, 10.0, 90.0)]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fpf, 1.0);
        assert_eq!(records[0].time, 5.0);
    }

    #[test]
    fn test_identical_positions_take_dart_tip() {
        let records = driver(BatchConfig::default()).run(&[
            row(0.0, "A", 0.0, 0.0, 10.0, 0.0),
            row(0.0, "B", 0.0, 0.0, 10.0, 90.0),
        ]);
        assert_eq!(records.len(), 2);
        for record in &records {
            assert!(!record.is_failure());
            assert!(record.fpf < 1.0 && record.fpf > 0.0, "fpf = {}", record.fpf);
        }
    }

    #[test]
    fn test_golden_wedge() {
        let records = driver(BatchConfig::default()).run(&[
            row(0.0, "A", 0.0, 0.0, 0.0, 0.0),
            row(0.0, "B", 300.0, 0.0, 0.0, 0.0),
        ]);
        for record in &records {
            assert_relative_eq!(record.fpf, 5.0 / 6.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_buckets_skip_empty_slices() {
        let driver = driver(BatchConfig::default());
        let records = driver.run(&[
            row(0.0, "A", 0.0, 0.0, 5.0, 0.0),
            row(5.0, "B", 5_000.0, 0.0, 5.0, 0.0),
            row(25.0, "A", 0.0, 0.0, 5.0, 0.0),
        ]);

        let labels: Vec<(f64, &str)> = records.iter().map(|r| (r.time, r.callsign.as_str())).collect();
        assert_eq!(labels, vec![(0.0, "A"), (0.0, "B"), (20.0, "A")]);
    }

    #[test]
    fn test_latest_report_wins() {
        let driver = driver(BatchConfig::default());
        let states = driver.ingest(&[
            row(100.0, "A", 0.0, 0.0, 5.0, 0.0),
            row(108.0, "A", 50.0, 0.0, 5.0, 0.0),
            row(104.0, "A", 20.0, 0.0, 5.0, 0.0),
            row(103.0, "B", 0.0, 0.0, 5.0, 0.0),
        ]);

        let buckets = driver.partition(states);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].start, 100.0);
        let callsigns: Vec<&str> = buckets[0].aircraft.iter().map(|a| a.callsign.as_str()).collect();
        assert_eq!(callsigns, vec!["A", "B"]);
        assert_eq!(buckets[0].aircraft[0].time, 108.0);
    }

    #[test]
    fn test_invalid_rows_are_dropped() {
        let mut bad = row(0.0, "BAD", 0.0, 0.0, 5.0, 0.0);
        bad.latitude = f64::NAN;
        let records = driver(BatchConfig::default()).run(&[bad, row(0.0, "GOOD", 0.0, 0.0, 5.0, 0.0)]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].callsign, "GOOD");
    }

    #[test]
    fn test_empty_table() {
        assert!(driver(BatchConfig::default()).run(&[]).is_empty());
    }

    #[test]
    fn test_fpf_in_range_for_every_rule() {
        for code in PriorityCode::all() {
            let records = driver(BatchConfig::default().with_priority(code)).run(&ramp());
            assert_eq!(records.len(), 7);
            for record in &records {
                assert!(
                    record.is_failure() || (0.0..=1.0).contains(&record.fpf),
                    "{}: {} has fpf {}",
                    code,
                    record.callsign,
                    record.fpf
                );
            }
        }
    }

    #[test]
    fn test_runs_are_deterministic() {
        let driver = driver(BatchConfig::default());
        let first = serde_json::to_string(&driver.run(&ramp())).unwrap();
        let second = serde_json::to_string(&driver.run(&ramp())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let parallel = driver(BatchConfig::default()).run(&ramp());
        let sequential = driver(BatchConfig {
            parallel: false,
            ..Default::default()
        })
        .run(&ramp());

        assert_eq!(
            serde_json::to_string(&parallel).unwrap(),
            serde_json::to_string(&sequential).unwrap()
        );
    }

    #[test]
    fn test_cancellation_abandons_buckets() {
        let flag = Arc::new(AtomicBool::new(true));
        let driver = driver(BatchConfig::default()).with_cancel_flag(flag.clone());
        assert!(driver.run(&ramp()).is_empty());

        flag.store(false, Ordering::Relaxed);
        assert_eq!(driver.run(&ramp()).len(), 7);
    }

    #[test]
    fn test_summary() {
        let mut records = driver(BatchConfig::default()).run(&ramp());
        records.push(ConflictRecord::failed(10.0, "ZZZ"));

        let summary = BatchSummary::from_records(&records);
        assert_eq!(summary.buckets, 2);
        assert_eq!(summary.records, 8);
        assert_eq!(summary.failures, 1);

        let mean = summary.mean_fpf.unwrap();
        assert!((0.0..=1.0).contains(&mean));
        assert!(summary.min_fpf.unwrap() <= mean);
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = BatchSummary::from_records(&[]);
        assert_eq!(summary.records, 0);
        assert!(summary.mean_fpf.is_none());
    }
}
