use densegroup_cluster::{GroupId, GroupKeyError, NodeId, TaskError};
use densegroup_columnar::{ColumnType, ColumnarError, Table, TableFingerprint};
use std::fmt;

/// The pipeline stages that scan the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pass {
    Tag,
    Discover,
    Relabel,
    Aggregate,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pass::Tag => "tag",
            Pass::Discover => "discover",
            Pass::Relabel => "relabel",
            Pass::Aggregate => "aggregate",
        })
    }
}

/// Failure of a pass's map function on one row.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("row {row} has no group value")]
    NullGroupValue { row: usize },

    #[error("row {row} has no sparse group id")]
    NullSparseId { row: usize },

    #[error("sparse group id {sparse_id} at row {row} has no dense id")]
    MissingMapping { sparse_id: i64, row: usize },

    #[error(transparent)]
    GroupKey(#[from] GroupKeyError),

    #[error(transparent)]
    Columnar(#[from] ColumnarError),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A row's sparse id has no entry in the group-id mapping. The mapping was built over
    /// different data than is being relabeled.
    #[error(
        "sparse group id {sparse_id} at row {row} (partition {partition}, node {node}) is missing from the group-id mapping"
    )]
    MissingMapping {
        sparse_id: i64,
        row: usize,
        partition: usize,
        node: NodeId,
    },

    #[error("{pass} pass failed on partition {partition} (node {node}): {source}")]
    PartitionTask {
        pass: Pass,
        partition: usize,
        node: NodeId,
        #[source]
        source: RowError,
    },

    #[error("{pass} pass rejected columns {columns:?} for a table with {column_count} columns")]
    InconsistentState {
        pass: Pass,
        columns: Vec<usize>,
        column_count: usize,
    },

    #[error("{pass} pass needs column {column} to be {expected}, found {actual}")]
    ColumnType {
        pass: Pass,
        column: usize,
        expected: ColumnType,
        actual: ColumnType,
    },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// The table was written after the mapping was built from it.
    #[error("group-id mapping was built from table state {expected:?}, table is now {actual:?}")]
    StaleMapping {
        expected: TableFingerprint,
        actual: TableFingerprint,
    },

    /// Aggregation produced a group outside `1..=groups`: some row was never relabeled.
    #[error("dense group id {dense_id} outside 1..={groups}")]
    DenseIdOutOfRange { dense_id: GroupId, groups: usize },

    #[error(transparent)]
    Columnar(#[from] ColumnarError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn from_task<E: Into<RowError>>(pass: Pass, err: TaskError<E>) -> Self {
        match err.map_source(|source| -> RowError { source.into() }) {
            TaskError::InconsistentState {
                columns,
                column_count,
            } => PipelineError::InconsistentState {
                pass,
                columns,
                column_count,
            },
            TaskError::KeyColumnType { column, actual } => PipelineError::ColumnType {
                pass,
                column,
                expected: ColumnType::Int,
                actual,
            },
            TaskError::Partition {
                partition,
                node,
                source: RowError::MissingMapping { sparse_id, row },
            } => PipelineError::MissingMapping {
                sparse_id,
                row,
                partition,
                node,
            },
            TaskError::Partition {
                partition,
                node,
                source,
            } => PipelineError::PartitionTask {
                pass,
                partition,
                node,
                source,
            },
        }
    }
}

/// Reject `column` when it exists but does not hold `expected` values. Missing columns are left
/// to the cluster's own column validation.
pub(crate) fn require_column_type(
    table: &Table,
    pass: Pass,
    column: usize,
    expected: ColumnType,
) -> PipelineResult<()> {
    match table.column_type(column) {
        Some(actual) if actual != expected => Err(PipelineError::ColumnType {
            pass,
            column,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}
