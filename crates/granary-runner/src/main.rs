use anyhow::{Context, Result};
use clap::Parser;
use metrics::counter;
use tracing::{debug, info};

use granary_assemble::Assembler;
use granary_config::{PipelineSpec, load_cfg};
use granary_runner::{flush::flush_all, ingest::read_events};
use granary_sinks::build_sinks;

#[derive(Parser, Debug)]
struct Args {
    /// Pipeline spec file or directory of specs.
    #[arg(short, long)]
    config: String,

    /// NDJSON file of change events, one event per line.
    #[arg(short, long)]
    input: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = granary_o11y::O11yConfig {
        logging: granary_o11y::logging::Config {
            level: None,
            json: args.log_json,
            with_targets: false,
        },
        install_panic_hook: true,
    };
    let _ = granary_o11y::init_all(&cfg);

    let specs = load_pipeline_cfgs(&args.config).context("load pipeline specs")?;
    let events = read_events(&args.input).await?;
    info!(records = events.len(), "received rows for ingestion");

    for spec in specs {
        counter!("granary_pipelines_total").increment(1);
        run_pipeline(&spec, &events).await.with_context(|| {
            format!("pipeline {} failed", spec.metadata.name)
        })?;
    }

    Ok(())
}

async fn run_pipeline(
    spec: &PipelineSpec,
    events: &[granary_core::ChangeEvent],
) -> Result<()> {
    let sinks = build_sinks(spec).context("build sinks")?;

    let assembled = Assembler::new(spec.spec.policies).assemble(events)?;
    info!(
        pipeline = %spec.metadata.name,
        destinations = assembled.tables.len(),
        rows = assembled.total_rows,
        skipped = assembled.skipped,
        assembled_at = %assembled.assembled_at,
        "batch assembled"
    );

    let flushed = flush_all(assembled, &sinks).await?;
    info!(
        pipeline = %spec.metadata.name,
        rows = flushed,
        "successfully ingested rows"
    );
    Ok(())
}

fn load_pipeline_cfgs(path: &str) -> Result<Vec<PipelineSpec>> {
    let specs = load_cfg(path)?;
    info!(specs_found = specs.len(), "pipeline specs loaded");
    debug!(pipeline_specs = ?specs, "pipeline spec");
    Ok(specs)
}
