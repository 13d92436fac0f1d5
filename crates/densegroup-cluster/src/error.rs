use crate::cluster::NodeId;
use densegroup_columnar::ColumnType;

/// Failure of one task run. `E` is the error type of the task's map function.
#[derive(Debug, thiserror::Error)]
pub enum TaskError<E> {
    /// The columns a task asked for do not exist on the table, or a column was requested twice.
    /// Detected before any partition is dispatched.
    #[error("inconsistent task columns {columns:?} for a table with {column_count} columns")]
    InconsistentState {
        columns: Vec<usize>,
        column_count: usize,
    },

    /// A group-by key column that does not hold integers.
    #[error("group key column {column} has type {actual}, expected int")]
    KeyColumnType { column: usize, actual: ColumnType },

    /// A map function failed. The whole run is abandoned and no partial result is returned.
    #[error("map failed on partition {partition} (node {node}): {source}")]
    Partition {
        partition: usize,
        node: NodeId,
        #[source]
        source: E,
    },
}

impl<E> TaskError<E> {
    /// Convert the map error, keeping the partition and node it came from.
    pub fn map_source<F>(self, f: impl FnOnce(E) -> F) -> TaskError<F> {
        match self {
            TaskError::InconsistentState {
                columns,
                column_count,
            } => TaskError::InconsistentState {
                columns,
                column_count,
            },
            TaskError::KeyColumnType { column, actual } => {
                TaskError::KeyColumnType { column, actual }
            }
            TaskError::Partition {
                partition,
                node,
                source,
            } => TaskError::Partition {
                partition,
                node,
                source: f(source),
            },
        }
    }
}

pub type TaskResult<T, E> = Result<T, TaskError<E>>;

/// Key extraction failures of the group-by task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupKeyError {
    #[error("row {row} has no group key")]
    NullKey { row: usize },

    #[error("row {row} has negative group key {key}")]
    NegativeKey { row: usize, key: i64 },
}
