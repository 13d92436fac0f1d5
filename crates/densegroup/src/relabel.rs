use crate::error::{require_column_type, Pass, PipelineError, PipelineResult, RowError};
use crate::mapping::GroupIdMapping;
use densegroup_cluster::{ChunkView, Cluster, MapReduce};
use densegroup_columnar::{ColumnType, Table};

const SPARSE: usize = 0;
const DENSE: usize = 1;

/// Writes the dense id of each row's sparse id. Every map reads the same mapping.
struct AssignDenseIds<'m> {
    mapping: &'m GroupIdMapping,
}

impl MapReduce for AssignDenseIds<'_> {
    type Output = ();
    type Error = RowError;

    fn map(&self, chunks: &mut ChunkView<'_>) -> Result<(), RowError> {
        for row in 0..chunks.len() {
            let table_row = chunks.row_offset() + row;
            let sparse_id = chunks
                .get_i64(SPARSE, row)
                .ok_or(RowError::NullSparseId { row: table_row })?;
            let dense = self
                .mapping
                .dense_id(sparse_id)
                .ok_or(RowError::MissingMapping {
                    sparse_id,
                    row: table_row,
                })?;
            // Dense ids are bounded by the row count.
            chunks.set_i64(DENSE, row, dense as i64)?;
        }
        Ok(())
    }

    fn reduce(&self, _: (), _: ()) {}
}

/// Pass 3: fill `dense_column` with `mapping(sparse)` for every row.
///
/// The mapping must have been built from this table in its current state; any write to the
/// table since then (including an earlier relabel) is rejected with
/// [`PipelineError::StaleMapping`] before a single row is touched. A sparse id without a dense
/// id fails the pass with [`PipelineError::MissingMapping`].
pub fn relabel(
    cluster: &Cluster,
    table: &mut Table,
    mapping: &GroupIdMapping,
    sparse_column: usize,
    dense_column: usize,
) -> PipelineResult<()> {
    let actual = table.fingerprint();
    if mapping.fingerprint() != actual {
        return Err(PipelineError::StaleMapping {
            expected: mapping.fingerprint(),
            actual,
        });
    }
    require_column_type(table, Pass::Relabel, sparse_column, ColumnType::Int)?;
    require_column_type(table, Pass::Relabel, dense_column, ColumnType::Int)?;

    log::debug!(
        "relabel pass: {} groups, column {sparse_column} -> {dense_column}",
        mapping.len()
    );
    cluster
        .run(
            table,
            &[sparse_column, dense_column],
            &AssignDenseIds { mapping },
        )
        .map_err(|err| PipelineError::from_task(Pass::Relabel, err))
}
