//! In-memory sink for dry runs and tests.

use async_trait::async_trait;
use granary_core::{FieldSchema, SinkResult, TableSink};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// One destination table's accumulated state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub schema: Vec<FieldSchema>,
    pub rows: Vec<Value>,
}

/// Keeps every inserted batch in memory.
#[derive(Default)]
pub struct MemorySink {
    id: String,
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemorySink {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of one table's state, if any rows were inserted.
    pub async fn table(&self, table: &str) -> Option<MemoryTable> {
        self.tables.read().await.get(table).cloned()
    }

    /// Names of all tables that received rows.
    pub async fn table_names(&self) -> Vec<String> {
        self.tables.read().await.keys().cloned().collect()
    }

    /// Total rows across all tables.
    pub async fn row_count(&self) -> usize {
        self.tables
            .read()
            .await
            .values()
            .map(|t| t.rows.len())
            .sum()
    }
}

#[async_trait]
impl TableSink for MemorySink {
    fn id(&self) -> &str {
        &self.id
    }

    async fn insert(
        &self,
        table: &str,
        schema: &[FieldSchema],
        rows: &[Value],
    ) -> SinkResult<()> {
        let mut tables = self.tables.write().await;
        let entry = tables.entry(table.to_string()).or_default();
        // Schema is fixed per invocation; the latest batch's schema wins
        // across invocations, matching a create-if-absent destination store.
        entry.schema = schema.to_vec();
        entry.rows.extend_from_slice(rows);
        Ok(())
    }
}
