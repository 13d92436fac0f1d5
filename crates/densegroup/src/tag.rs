use crate::error::{require_column_type, Pass, PipelineError, PipelineResult, RowError};
use densegroup_cluster::{ChunkView, Cluster, MapReduce};
use densegroup_columnar::{ColumnType, Table};

const GROUP: usize = 0;
const SPARSE: usize = 1;

/// Copies each row's group value into the sparse-id column.
struct TagSparseIds;

impl MapReduce for TagSparseIds {
    type Output = ();
    type Error = RowError;

    fn map(&self, chunks: &mut ChunkView<'_>) -> Result<(), RowError> {
        for row in 0..chunks.len() {
            let Some(group) = chunks.get_i64(GROUP, row) else {
                return Err(RowError::NullGroupValue {
                    row: chunks.row_offset() + row,
                });
            };
            chunks.set_i64(SPARSE, row, group)?;
        }
        Ok(())
    }

    fn reduce(&self, _: (), _: ()) {}
}

/// Pass 1: populate `sparse_column` with the value of `group_column` for every row.
///
/// Both columns must hold integers. A null group value fails the pass.
pub fn tag_rows(
    cluster: &Cluster,
    table: &mut Table,
    group_column: usize,
    sparse_column: usize,
) -> PipelineResult<()> {
    require_column_type(table, Pass::Tag, group_column, ColumnType::Int)?;
    require_column_type(table, Pass::Tag, sparse_column, ColumnType::Int)?;

    log::debug!(
        "tag pass: column {group_column} -> {sparse_column} over {} partitions",
        table.partition_count()
    );
    cluster
        .run(table, &[group_column, sparse_column], &TagSparseIds)
        .map_err(|err| PipelineError::from_task(Pass::Tag, err))
}
