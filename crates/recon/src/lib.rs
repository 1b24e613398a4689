//! `clusterprice-recon` — sales, price and cost join-and-enrichment engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns the enriched
//! table and a run report. No CLI or IO dependencies.

pub mod config;
pub mod dedup;
pub mod error;
pub mod join;
pub mod keys;
pub mod kpi;
pub mod log;
pub mod model;
pub mod namespace;
pub mod pipeline;
pub mod sources;
pub mod table;

pub use config::ReconConfig;
pub use error::ReconError;
pub use log::{MemoryLog, RunLog, TracingLog};
pub use model::{Origin, RunReport, Source, Warning};
pub use pipeline::{run, PipelineOutput, Sources};
pub use table::{Column, Table, Value};
