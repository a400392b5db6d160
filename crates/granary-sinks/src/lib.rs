//! Sink implementations for Granary.
//!
//! This crate provides sink implementations for writing classified,
//! schema-tagged row batches to destinations. All sinks implement the
//! `TableSink` trait from `granary_core`.
//!
//! # Available Sinks
//!
//! - **Ndjson**: append rows as JSON lines per table, schema written beside
//!   the data for downstream loaders
//! - **Stdout**: serialize batches to standard output for debugging
//! - **Memory**: keep batches in memory for dry runs and tests
//!
//! The core never retries a sink: an insertion failure surfaces to the
//! caller as a `SinkError` and the batch counts as "attempted once".

use std::sync::Arc;

use granary_config::{PipelineSpec, SinkCfg};
use granary_core::ArcDynTableSink;

pub mod memory;
pub mod ndjson;
pub mod stdout;

pub use memory::MemorySink;
pub use ndjson::NdjsonSink;
pub use stdout::StdoutSink;

/// Build all sinks from a pipeline specification.
///
/// # Errors
///
/// Returns an error if a sink configuration is invalid (e.g., an output
/// directory that cannot be created).
pub fn build_sinks(ps: &PipelineSpec) -> anyhow::Result<Vec<ArcDynTableSink>> {
    ps.spec
        .sinks
        .iter()
        .map(|cfg| {
            let sink: ArcDynTableSink = match cfg {
                SinkCfg::Ndjson { id, dir } => {
                    Arc::new(NdjsonSink::new(id, dir)) as ArcDynTableSink
                }
                SinkCfg::Stdout { id } => {
                    Arc::new(StdoutSink::new(id)) as ArcDynTableSink
                }
                SinkCfg::Memory { id } => {
                    Arc::new(MemorySink::new(id)) as ArcDynTableSink
                }
            };
            Ok(sink)
        })
        .collect()
}
