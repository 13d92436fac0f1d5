use crate::types::ColumnType;

#[derive(Debug, thiserror::Error)]
pub enum ColumnarError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("column index {column} out of range (table has {column_count} columns)")]
    ColumnOutOfRange { column: usize, column_count: usize },

    #[error("row {row} out of range (length {len})")]
    RowOutOfRange { row: usize, len: usize },

    #[error("type mismatch: expected {expected} value, got {actual}")]
    TypeMismatch {
        expected: ColumnType,
        actual: ColumnType,
    },

    #[error("schema mismatch: expected {expected} values, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },
}

pub type ColumnarResult<T> = Result<T, ColumnarError>;
