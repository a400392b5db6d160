//! NDJSON file sink.
//!
//! Appends each row as one JSON line to `<dir>/<table>.ndjson` and writes
//! the batch schema to `<dir>/<table>.schema.json` beside it, so a
//! downstream loader can create the destination table before reading rows.

use async_trait::async_trait;
use granary_core::{FieldSchema, SinkResult, TableSink};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub struct NdjsonSink {
    id: String,
    dir: PathBuf,
}

impl NdjsonSink {
    pub fn new(id: impl Into<String>, dir: impl AsRef<Path>) -> Self {
        Self {
            id: id.into(),
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn data_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.ndjson"))
    }

    fn schema_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.schema.json"))
    }
}

#[async_trait]
impl TableSink for NdjsonSink {
    fn id(&self) -> &str {
        &self.id
    }

    async fn insert(
        &self,
        table: &str,
        schema: &[FieldSchema],
        rows: &[Value],
    ) -> SinkResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let schema_json = serde_json::to_vec_pretty(schema)?;
        fs::write(self.schema_path(table), schema_json).await?;

        let mut buf = Vec::with_capacity(rows.len() * 128);
        for row in rows {
            serde_json::to_writer(&mut buf, row)?;
            buf.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.data_path(table))
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;

        debug!(
            sink = %self.id,
            table = %table,
            rows = rows.len(),
            "appended batch"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use granary_core::{FieldMode, FieldType};
    use serde_json::json;

    #[tokio::test]
    async fn writes_rows_and_schema_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let sink = NdjsonSink::new("local", dir.path());
        let schema = vec![
            FieldSchema::scalar("score", FieldType::Integer),
            FieldSchema::scalar("tags", FieldType::String)
                .with_mode(FieldMode::Repeated),
        ];

        sink.insert(
            "assessment_adhd_results",
            &schema,
            &[
                json!({"score": 7, "tags": ["x", "y"]}),
                json!({"score": 9, "tags": []}),
            ],
        )
        .await
        .unwrap();

        let data = std::fs::read_to_string(
            dir.path().join("assessment_adhd_results.ndjson"),
        )
        .unwrap();
        let lines: Vec<&str> = data.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            serde_json::from_str::<Value>(lines[0]).unwrap()["score"],
            json!(7)
        );

        let sidecar: Vec<FieldSchema> = serde_json::from_str(
            &std::fs::read_to_string(
                dir.path().join("assessment_adhd_results.schema.json"),
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(sidecar, schema);
    }

    #[tokio::test]
    async fn appends_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let sink = NdjsonSink::new("local", dir.path());
        let schema = vec![FieldSchema::scalar("n", FieldType::Integer)];

        sink.insert("journeys", &schema, &[json!({"n": 1})])
            .await
            .unwrap();
        sink.insert("journeys", &schema, &[json!({"n": 2})])
            .await
            .unwrap();

        let data =
            std::fs::read_to_string(dir.path().join("journeys.ndjson"))
                .unwrap();
        assert_eq!(data.lines().count(), 2);
    }
}
