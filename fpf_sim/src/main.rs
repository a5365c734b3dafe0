//! FPF Simulator CLI
//!
//! Runs the conflict metric over a CSV traffic table, or over the built-in
//! deterministic scenarios.

use clap::Parser;
use fpf_core::{BatchConfig, BatchDriver, BatchSummary, PriorityCode};
use fpf_sim::scenarios::ScenarioId;
use fpf_sim::{report, table, RunExport, ScenarioResult, ScenarioRunner};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Free Path Fraction batch and scenario CLI
#[derive(Parser, Debug)]
#[command(name = "fpf-sim")]
#[command(about = "Compute Free Path Fraction conflict metrics for aircraft traffic", long_about = None)]
struct Args {
    /// Scenario to run (lone_aircraft, golden_wedge, head_on, crossing, los_overlap, ramp_congestion, out_of_range, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Seed for generated traffic
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Traffic table (CSV) to process instead of the scenarios
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write the time,callsign,fpf table here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Batch configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Priority rule override (default, RS5, RS6, RS7, RS8)
    #[arg(short, long)]
    priority: Option<PriorityCode>,

    /// Bucket width override in seconds
    #[arg(short, long)]
    lookahead: Option<f64>,

    /// Simulated time span of each scenario in seconds
    #[arg(short, long, default_value = "30")]
    duration: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing (stdout carries only the JSON document)
    #[arg(long)]
    json: bool,

    /// Write the generated traffic table of a single scenario (CSV)
    #[arg(long)]
    dump_traffic: Option<PathBuf>,

    /// Export the full run (config, summary, records) to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for results
    let subscriber = FmtSubscriber::builder()
        .with_max_level(report::log_level(args.verbose, args.json))
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if !args.json {
        info!("FPF Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!(
            "rule={} lookahead={}s sensor_range={:.0}m",
            config.priority_rule, config.lookahead_seconds, config.sensor_range_meters
        );
    }

    let code = match &args.input {
        Some(input) => run_table(&args, config, input),
        None => run_scenarios(&args, config),
    };
    std::process::exit(code);
}

/// Configuration file (if any) plus command-line overrides, validated.
fn load_config(args: &Args) -> fpf_core::Result<BatchConfig> {
    let mut config = match &args.config {
        Some(path) => BatchConfig::from_json_file(path)?,
        None => BatchConfig::default(),
    };
    if let Some(rule) = args.priority {
        config.priority_rule = rule;
    }
    if let Some(secs) = args.lookahead {
        config.lookahead_seconds = secs;
    }
    config.validate()?;
    Ok(config)
}

/// Batch mode: CSV in, CSV/JSON out.
fn run_table(args: &Args, config: BatchConfig, input: &Path) -> i32 {
    let rows = match table::read_traffic_file(input) {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to read {}: {}", input.display(), e);
            return 1;
        }
    };

    let driver = match BatchDriver::new(config) {
        Ok(driver) => driver,
        Err(e) => {
            error!("{}", e);
            return 2;
        }
    };

    let records = driver.run(&rows);
    let summary = BatchSummary::from_records(&records);

    if let Some(path) = &args.output {
        if let Err(e) = table::write_records_file(path, &records) {
            error!("Failed to write {}: {}", path.display(), e);
            return 1;
        }
        info!("Wrote {} records to {}", records.len(), path.display());
    }

    if let Some(path) = &args.export {
        let export = RunExport::new(&input.display().to_string(), driver.config(), records);
        if let Err(e) = export.write_to_file(path) {
            error!("Failed to write export: {:?}", e);
            return 1;
        }
        info!("Exported run to {}", path.display());
    }

    if args.json {
        print_json(&report::table_report(
            &input.display().to_string(),
            rows.len(),
            driver.rule_name(),
            &summary,
        ));
    } else {
        info!(
            "{} rows -> {} records in {} buckets ({} failed, {} in conflict)",
            rows.len(),
            summary.records,
            summary.buckets,
            summary.failures,
            summary.in_conflict
        );
        if let Some(mean) = summary.mean_fpf {
            info!("mean FPF {:.4}", mean);
        }
    }
    0
}

/// Scenario mode: generated traffic with per-scenario expectations.
fn run_scenarios(args: &Args, config: BatchConfig) -> i32 {
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: {}, all", scenario_names());
                return 1;
            }
        }
    };

    let single_only = args.output.is_some() || args.export.is_some() || args.dump_traffic.is_some();
    if scenarios.len() > 1 && single_only {
        eprintln!("Error: --output, --export and --dump-traffic only support a single scenario, not 'all'");
        return 1;
    }

    let runner = ScenarioRunner::new(args.seed)
        .with_config(config.clone())
        .with_duration(args.duration);

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for scenario in &scenarios {
        debug!("{}: {}", scenario.name(), scenario.description());
        let result = runner.run(*scenario);

        if !args.json {
            if result.passed {
                info!("✓ {} (seed={}) PASSED", scenario.name(), args.seed);
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    scenario.name(),
                    args.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
        all_results.push(result);
    }

    // Single-scenario outputs
    if let Some(result) = all_results.first().filter(|_| all_results.len() == 1) {
        if let Some(path) = &args.dump_traffic {
            let rows = runner.traffic(result.scenario);
            if let Err(e) = table::write_traffic_file(path, &rows) {
                error!("Failed to write {}: {}", path.display(), e);
                return 1;
            }
            info!("Wrote {} traffic rows to {}", rows.len(), path.display());
        }
        if let Some(path) = &args.output {
            if let Err(e) = table::write_records_file(path, &result.records) {
                error!("Failed to write {}: {}", path.display(), e);
                return 1;
            }
        }
        if let Some(path) = &args.export {
            let export = RunExport::new(result.scenario.name(), &config, result.records.clone())
                .with_scenario(result.seed, result.passed);
            if let Err(e) = export.write_to_file(path) {
                error!("Failed to write export: {:?}", e);
                return 1;
            }
            info!("Exported {} records to {}", result.records.len(), path.display());
        }
    }

    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();

    if args.json {
        print_json(&report::scenario_report(&all_results, config.priority_rule));
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
        }
    }

    if failed_count > 0 {
        1
    } else {
        0
    }
}

fn scenario_names() -> String {
    ScenarioId::all()
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_json(value: &serde_json::Value) {
    match report::render(value) {
        Ok(text) => println!("{}", text),
        Err(e) => error!("Failed to render JSON: {}", e),
    }
}
