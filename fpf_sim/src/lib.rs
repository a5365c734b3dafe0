//! FPF Scenario Harness
//!
//! Deterministic traffic scenarios for the FPF engine, plus the table and JSON
//! plumbing used by the `fpf-sim` binary.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ScenarioRunner                          │
//! │                                                               │
//! │  ┌───────────────┐   TrafficRow   ┌────────────────────────┐  │
//! │  │ TrafficOracle │ ─────────────► │ fpf_core::BatchDriver  │  │
//! │  │ (seeded)      │                └───────────┬────────────┘  │
//! │  └───────────────┘                            │               │
//! │                                        ConflictRecord         │
//! │                                               ▼               │
//! │                                   expectations per scenario   │
//! └──────────────────────────────────────────────────────────────┘
//!         │                                       │
//!    table (CSV)                     exporter / report (JSON)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use fpf_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::GoldenWedge);
//! assert!(result.passed);
//! ```

mod exporter;
mod oracle;
pub mod report;
mod runner;
pub mod scenarios;
pub mod table;

pub use exporter::RunExport;
pub use oracle::{SimAircraft, TrafficOracle};
pub use runner::{ScenarioResult, ScenarioRunner};
