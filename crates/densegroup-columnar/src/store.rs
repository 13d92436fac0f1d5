use crate::error::{ColumnarError, ColumnarResult};
use crate::table::Table;
use crate::types::{ColumnType, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Keyed storage for tables.
///
/// Callers load a table, mutate their copy, and save it back under the same key.
pub trait TableStore: fmt::Debug + Send + Sync {
    fn load(&self, key: &str) -> ColumnarResult<Table>;
    fn save(&self, key: &str, table: Table) -> ColumnarResult<()>;
    /// Remove `key`, returning the table it held.
    fn remove(&self, key: &str) -> ColumnarResult<Table>;
    fn keys(&self) -> Vec<String>;

    fn contains(&self, key: &str) -> bool {
        self.keys().iter().any(|k| k == key)
    }

    fn add_column(
        &self,
        mut table: Table,
        name: &str,
        column_type: ColumnType,
        default: Value,
    ) -> ColumnarResult<Table> {
        table.add_column(name, column_type, default)?;
        Ok(table)
    }

    /// Drop every stored table. Returns how many were removed.
    fn clear(&self) -> usize {
        let keys = self.keys();
        keys.iter().filter(|k| self.remove(k).is_ok()).count()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    tables: Mutex<BTreeMap<String, Table>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, BTreeMap<String, Table>> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl TableStore for InMemoryTableStore {
    fn load(&self, key: &str) -> ColumnarResult<Table> {
        self.tables()
            .get(key)
            .cloned()
            .ok_or_else(|| ColumnarError::UnknownTable(key.to_string()))
    }

    fn save(&self, key: &str, table: Table) -> ColumnarResult<()> {
        log::debug!(
            "saving table {key:?} ({} rows, {} partitions)",
            table.row_count(),
            table.partition_count()
        );
        self.tables().insert(key.to_string(), table);
        Ok(())
    }

    fn remove(&self, key: &str) -> ColumnarResult<Table> {
        self.tables()
            .remove(key)
            .ok_or_else(|| ColumnarError::UnknownTable(key.to_string()))
    }

    fn keys(&self) -> Vec<String> {
        self.tables().keys().cloned().collect()
    }

    fn contains(&self, key: &str) -> bool {
        self.tables().contains_key(key)
    }
}
