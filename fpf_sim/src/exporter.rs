//! JSON exporter for batch runs.
//!
//! Writes the configuration, summary and every record of a run so downstream
//! plotting can pick it up without re-running the batch.

use fpf_core::{BatchConfig, BatchSummary, ConflictRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Complete export of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Scenario name, or the input file for table runs
    pub source: String,

    /// Seed used (scenario runs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub config: BatchConfig,

    pub summary: BatchSummary,

    /// Failed records carry `null` in place of the FPF
    pub records: Vec<ConflictRecord>,

    /// Scenario verdict, if the run was a scenario
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
}

impl RunExport {
    /// Creates a new export container.
    pub fn new(source: &str, config: &BatchConfig, records: Vec<ConflictRecord>) -> Self {
        Self {
            source: source.to_string(),
            seed: None,
            config: config.clone(),
            summary: BatchSummary::from_records(&records),
            records,
            passed: None,
        }
    }

    /// Marks the export as a scenario run.
    pub fn with_scenario(mut self, seed: u64, passed: bool) -> Self {
        self.seed = Some(seed);
        self.passed = Some(passed);
        self
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_json_shape() {
        let records = vec![
            ConflictRecord {
                time: 0.0,
                callsign: "A".to_string(),
                fpf: 0.75,
                intruders: 1,
                in_conflict: true,
            },
            ConflictRecord::failed(0.0, "B"),
        ];
        let export = RunExport::new("golden_wedge", &BatchConfig::default(), records).with_scenario(42, true);

        let json: serde_json::Value = serde_json::to_value(&export).unwrap();
        assert_eq!(json["source"], "golden_wedge");
        assert_eq!(json["seed"], 42);
        assert_eq!(json["summary"]["failures"], 1);
        assert_eq!(json["records"][0]["fpf"], 0.75);
        assert!(json["records"][1]["fpf"].is_null());
        assert_eq!(json["config"]["priority_rule"], "Default");
    }

    #[test]
    fn test_table_run_omits_scenario_fields() {
        let export = RunExport::new("traffic.csv", &BatchConfig::default(), Vec::new());
        let json = serde_json::to_value(&export).unwrap();
        assert!(json.get("seed").is_none());
        assert!(json.get("passed").is_none());
    }
}
