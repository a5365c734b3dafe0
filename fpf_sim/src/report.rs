//! Machine-readable run summaries for the `--json` mode of the CLI.
//!
//! The document is the only thing written to stdout in that mode; logging goes
//! to stderr and is capped at WARN.

use fpf_core::{BatchSummary, PriorityCode};
use serde_json::{json, Value};
use tracing::Level;

use crate::runner::ScenarioResult;

/// Log level for a CLI run.
pub fn log_level(verbose: bool, json: bool) -> Level {
    match (json, verbose) {
        (true, _) => Level::WARN,
        (false, true) => Level::DEBUG,
        (false, false) => Level::INFO,
    }
}

/// Summary of a scenario run, one entry per scenario.
pub fn scenario_report(results: &[ScenarioResult], rule: PriorityCode) -> Value {
    let failed = results.iter().filter(|r| !r.passed).count();
    json!({
        "total": results.len(),
        "passed": results.len() - failed,
        "failed": failed,
        "rule": rule.name(),
        "results": results.iter().map(|r| {
            json!({
                "scenario": r.scenario.name(),
                "seed": r.seed,
                "passed": r.passed,
                "rows": r.traffic_rows,
                "buckets": r.summary.buckets,
                "records": r.summary.records,
                "mean_fpf": r.summary.mean_fpf,
                "min_fpf": r.summary.min_fpf,
                "failure_reason": r.failure_reason,
            })
        }).collect::<Vec<_>>(),
    })
}

/// Summary of a table run.
pub fn table_report(input: &str, rows: usize, rule: &str, summary: &BatchSummary) -> Value {
    json!({
        "input": input,
        "rows": rows,
        "rule": rule,
        "summary": summary,
    })
}

/// Renders a report as the pretty-printed document written to stdout.
pub fn render(report: &Value) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioId;
    use crate::ScenarioRunner;
    use fpf_core::ConflictRecord;

    #[test]
    fn test_json_mode_keeps_info_off_stdout() {
        assert_eq!(log_level(false, true), Level::WARN);
        assert_eq!(log_level(true, true), Level::WARN);
        assert_eq!(log_level(true, false), Level::DEBUG);
        assert_eq!(log_level(false, false), Level::INFO);
    }

    #[test]
    fn test_scenario_report_parses_back() {
        let runner = ScenarioRunner::new(42);
        let results = vec![runner.run(ScenarioId::LoneAircraft), runner.run(ScenarioId::GoldenWedge)];

        let text = render(&scenario_report(&results, PriorityCode::Default)).unwrap();
        assert!(text.starts_with('{'));

        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["total"], 2);
        assert_eq!(parsed["failed"], 0);
        assert_eq!(parsed["rule"], "Default");
        assert_eq!(parsed["results"][0]["scenario"], "lone_aircraft");
        assert_eq!(parsed["results"][1]["passed"], true);
        assert!(parsed["results"][0]["failure_reason"].is_null());
    }

    #[test]
    fn test_table_report_with_failures_parses_back() {
        let records = vec![ConflictRecord::failed(0.0, "A")];
        let summary = BatchSummary::from_records(&records);

        let text = render(&table_report("traffic.csv", 1, "RS7", &summary)).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["input"], "traffic.csv");
        assert_eq!(parsed["rule"], "RS7");
        assert_eq!(parsed["summary"]["failures"], 1);
        assert!(parsed["summary"]["mean_fpf"].is_null());
    }
}
