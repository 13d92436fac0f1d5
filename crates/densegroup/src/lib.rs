//! Distributed group-by with dense group ids.
//!
//! Groups the rows of a partitioned [`densegroup_columnar::Table`] by an integer column whose
//! values may be arbitrary (sparse), compacts the distinct values to contiguous ids `1..=N`, and
//! computes a min/max/count [`Summary`] of a numeric column per group.
//!
//! Each pass is a data-parallel task on a [`densegroup_cluster::Cluster`] and can be run on its
//! own ([`tag_rows`], [`discover_distinct`], [`relabel`], [`aggregate`]), or all of them in order
//! through a [`GroupedSummaryPipeline`].

#![forbid(unsafe_code)]

mod aggregate;
mod config;
mod distinct;
mod error;
mod mapping;
mod pipeline;
mod relabel;
mod summary;
mod tag;

pub use crate::aggregate::aggregate;
pub use crate::config::{PipelineConfig, DEFAULT_DENSE_COLUMN, DEFAULT_SPARSE_COLUMN};
pub use crate::distinct::discover_distinct;
pub use crate::error::{Pass, PipelineError, PipelineResult, RowError};
pub use crate::mapping::GroupIdMapping;
pub use crate::pipeline::{GroupColumns, GroupSummary, GroupedSummaries, GroupedSummaryPipeline};
pub use crate::relabel::relabel;
pub use crate::summary::{Summary, SummaryGroupBy};
pub use crate::tag::tag_rows;

pub use densegroup_cluster::{Cluster, ClusterConfig, ExecutionMode, GroupId};
