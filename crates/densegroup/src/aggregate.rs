use crate::error::{require_column_type, Pass, PipelineError, PipelineResult};
use crate::summary::{Summary, SummaryGroupBy};
use densegroup_cluster::{Cluster, GroupId};
use densegroup_columnar::{ColumnType, Table};
use std::collections::BTreeMap;

/// Pass 4: min/max/count of `value_column` for every dense id in `dense_column`.
pub fn aggregate(
    cluster: &Cluster,
    table: &mut Table,
    dense_column: usize,
    value_column: usize,
) -> PipelineResult<BTreeMap<GroupId, Summary>> {
    require_column_type(table, Pass::Aggregate, dense_column, ColumnType::Int)?;

    let groups = cluster
        .group_by(table, dense_column, &[value_column], &SummaryGroupBy)
        .map_err(|err| PipelineError::from_task(Pass::Aggregate, err))?;
    log::debug!("aggregate pass: {} group summaries", groups.len());
    Ok(groups)
}
