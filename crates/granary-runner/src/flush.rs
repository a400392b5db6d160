//! Concurrent bucket flushing.
//!
//! One flush task per destination, all started without waiting on one
//! another, joined with an all-or-nothing wait: every task is awaited and
//! the first error wins. There is no cross-destination ordering, no retry,
//! and no backpressure — the core fails fast and leaves delivery semantics
//! to the sinks.

use anyhow::{Context, Result, anyhow};
use metrics::{counter, histogram};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use granary_assemble::Assembled;
use granary_core::ArcDynTableSink;

/// Flush every bucket to every sink. Returns the number of rows flushed.
pub async fn flush_all(
    assembled: Assembled,
    sinks: &[ArcDynTableSink],
) -> Result<usize> {
    if sinks.is_empty() {
        warn!("no sinks configured; dropping assembled batch");
        return Ok(0);
    }

    let batch_id = Uuid::new_v4();
    counter!("granary_batches_total").increment(1);

    let mut tasks = Vec::with_capacity(assembled.tables.len());
    for (table, bucket) in assembled.tables {
        if bucket.rows.is_empty() {
            continue;
        }

        let sinks = sinks.to_vec();
        tasks.push(tokio::spawn(async move {
            let started = Instant::now();
            let rows = bucket.rows.len();

            for sink in &sinks {
                sink.insert(&table, &bucket.schema, &bucket.rows)
                    .await
                    .with_context(|| {
                        format!("sink {} insert into {table}", sink.id())
                    })?;
            }

            histogram!("granary_flush_seconds")
                .record(started.elapsed().as_secs_f64());
            counter!("granary_rows_flushed_total").increment(rows as u64);
            anyhow::Ok((table, bucket.fingerprint, rows))
        }));
    }

    // Await every task; surface the first failure after all have settled.
    let mut flushed = 0usize;
    let mut first_err: Option<anyhow::Error> = None;

    for result in futures::future::join_all(tasks).await {
        match result {
            Ok(Ok((table, fingerprint, rows))) => {
                info!(
                    batch_id = %batch_id,
                    table = %table,
                    fingerprint = %fingerprint,
                    rows,
                    "bulk insert complete"
                );
                flushed += rows;
            }
            Ok(Err(e)) => {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(anyhow!("flush task panicked: {e}"));
                }
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(flushed),
    }
}
