//! Cluster task primitives for densegroup.
//!
//! A [`Cluster`] spreads the partitions of a [`densegroup_columnar::Table`] over a set of nodes
//! and runs data-parallel tasks on them:
//! - [`MapReduce`]: a map per partition, partial results merged pairwise into one.
//! - [`GroupBy`]: rows routed to per-group accumulators keyed by an integer column, merged
//!   per key across partitions and nodes.
//!
//! Maps only ever see their own partition. Nothing is shared between them except the task
//! itself, which is borrowed immutably.

#![forbid(unsafe_code)]

mod cluster;
mod error;
mod group_by;
mod parallel;
mod reduce;
mod task;

pub use crate::cluster::{Cluster, ClusterConfig, ExecutionMode, NodeId};
pub use crate::error::{GroupKeyError, TaskError, TaskResult};
pub use crate::group_by::{GroupBy, GroupId};
pub use crate::reduce::pairwise_reduce;
pub use crate::task::{ChunkView, MapReduce};
