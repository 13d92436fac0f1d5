//! Partitioned columnar tables for densegroup.
//!
//! This crate focuses on:
//! - Row-aligned partitions: every column is split at the same row boundaries, so partition `i`
//!   of every column covers the same rows and can be processed independently.
//! - Typed chunk access (read/write at a row offset within a partition), with nulls tracked
//!   per chunk.
//! - Adding columns to an existing table with a default value.
//! - A keyed [`TableStore`] with an in-memory implementation.

#![forbid(unsafe_code)]

mod chunk;
mod error;
mod null_mask;
mod store;
mod table;
mod types;

pub use crate::chunk::Chunk;
pub use crate::error::{ColumnarError, ColumnarResult};
pub use crate::store::{InMemoryTableStore, TableStore};
pub use crate::table::{
    ColumnSchema, Partition, Table, TableBuilder, TableFingerprint, TableOptions,
};
pub use crate::types::{ColumnType, Value};
