//! Stdout sink. Debugging aid: one JSON line per row, tagged with the
//! destination table.

use async_trait::async_trait;
use granary_core::{FieldSchema, SinkResult, TableSink};
use serde_json::{Value, json};
use tokio::io::{AsyncWriteExt, stdout};

pub struct StdoutSink {
    id: String,
}

impl StdoutSink {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl TableSink for StdoutSink {
    fn id(&self) -> &str {
        &self.id
    }

    async fn insert(
        &self,
        table: &str,
        _schema: &[FieldSchema],
        rows: &[Value],
    ) -> SinkResult<()> {
        let mut buf = Vec::with_capacity(rows.len() * 128);
        for row in rows {
            serde_json::to_writer(&mut buf, &json!({"table": table, "row": row}))?;
            buf.push(b'\n');
        }

        let mut out = stdout();
        out.write_all(&buf).await?;
        out.flush().await?;
        Ok(())
    }
}
