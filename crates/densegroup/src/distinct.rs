use crate::error::{require_column_type, Pass, PipelineError, PipelineResult, RowError};
use densegroup_cluster::{ChunkView, Cluster, MapReduce};
use densegroup_columnar::{ColumnType, Table};
use std::collections::BTreeSet;

/// Collects the sparse ids seen in a partition; partial sets are unioned.
struct DiscoverDistinct;

impl MapReduce for DiscoverDistinct {
    type Output = BTreeSet<i64>;
    type Error = RowError;

    fn map(&self, chunks: &mut ChunkView<'_>) -> Result<BTreeSet<i64>, RowError> {
        let mut seen = BTreeSet::new();
        for row in 0..chunks.len() {
            let sparse = chunks.get_i64(0, row).ok_or(RowError::NullSparseId {
                row: chunks.row_offset() + row,
            })?;
            seen.insert(sparse);
        }
        Ok(seen)
    }

    fn reduce(&self, mut left: BTreeSet<i64>, mut right: BTreeSet<i64>) -> BTreeSet<i64> {
        if left.len() < right.len() {
            std::mem::swap(&mut left, &mut right);
        }
        left.append(&mut right);
        left
    }
}

/// Pass 2: the set of distinct values in `sparse_column`.
pub fn discover_distinct(
    cluster: &Cluster,
    table: &mut Table,
    sparse_column: usize,
) -> PipelineResult<BTreeSet<i64>> {
    require_column_type(table, Pass::Discover, sparse_column, ColumnType::Int)?;

    let distinct = cluster
        .run(table, &[sparse_column], &DiscoverDistinct)
        .map_err(|err| PipelineError::from_task(Pass::Discover, err))?;
    log::debug!(
        "discover pass: {} distinct sparse ids over {} rows",
        distinct.len(),
        table.row_count()
    );
    Ok(distinct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use densegroup_cluster::{ClusterConfig, ExecutionMode};
    use densegroup_columnar::{ColumnSchema, TableBuilder, TableOptions, Value};
    use pretty_assertions::assert_eq;

    fn table(values: &[i64], partition_size_rows: usize) -> Table {
        let mut builder = TableBuilder::new(
            vec![ColumnSchema::new("sparse", ColumnType::Int)],
            TableOptions {
                partition_size_rows,
            },
        );
        for &v in values {
            builder.append_row(&[Value::Int(v)]).unwrap();
        }
        builder.finalize().unwrap()
    }

    #[test]
    fn matches_a_single_scan_for_any_partitioning() {
        let values = [1_700, 5, 5, -40, 1_700, 88, 5, 0, 1 << 40];
        let expected: BTreeSet<i64> = values.iter().copied().collect();
        for partition_size_rows in 1..=values.len() {
            for nodes in [1, 2, 5] {
                let cluster = Cluster::new(ClusterConfig {
                    nodes,
                    mode: ExecutionMode::Parallel,
                });
                let mut t = table(&values, partition_size_rows);
                let distinct = discover_distinct(&cluster, &mut t, 0).unwrap();
                assert_eq!(distinct, expected);
            }
        }
    }

    #[test]
    fn empty_table_has_no_groups() {
        let mut t = table(&[], 4);
        assert!(discover_distinct(&Cluster::sequential(2), &mut t, 0)
            .unwrap()
            .is_empty());
    }
}
