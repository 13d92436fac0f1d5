use crate::cluster::Cluster;
use crate::error::{GroupKeyError, TaskError, TaskResult};
use crate::task::{ChunkView, MapReduce};
use ahash::AHashMap;
use densegroup_columnar::{ColumnType, Table, Value};
use std::collections::hash_map::Entry;
use std::collections::BTreeMap;

pub type GroupId = u64;

/// Per-group accumulation: how to create, update, and combine one group's state.
///
/// `merge` must be associative and commutative; partial accumulators for a group are combined in
/// whatever order partitions and nodes finish.
pub trait GroupBy: Sync {
    type Accumulator: Send;

    fn make(&self) -> Self::Accumulator;

    /// Fold one row into its group. `values` holds the row's value columns, in the order they
    /// were passed to [`Cluster::group_by`].
    fn fold(&self, acc: &mut Self::Accumulator, values: &[Value]);

    fn merge(&self, acc: &mut Self::Accumulator, other: Self::Accumulator);
}

struct GroupByTask<'g, G> {
    group_by: &'g G,
    /// Chunk slot of each value column. Slot 0 is always the key.
    value_slots: Vec<usize>,
}

impl<G: GroupBy> MapReduce for GroupByTask<'_, G> {
    type Output = AHashMap<GroupId, G::Accumulator>;
    type Error = GroupKeyError;

    fn map(&self, chunks: &mut ChunkView<'_>) -> Result<Self::Output, GroupKeyError> {
        let mut groups = AHashMap::new();
        let mut values = Vec::with_capacity(self.value_slots.len());
        for row in 0..chunks.len() {
            let table_row = chunks.row_offset() + row;
            let Some(key) = chunks.get_i64(0, row) else {
                return Err(GroupKeyError::NullKey { row: table_row });
            };
            let Ok(group) = GroupId::try_from(key) else {
                return Err(GroupKeyError::NegativeKey {
                    row: table_row,
                    key,
                });
            };

            values.clear();
            values.extend(self.value_slots.iter().map(|&slot| chunks.get(slot, row)));
            let acc = groups.entry(group).or_insert_with(|| self.group_by.make());
            self.group_by.fold(acc, &values);
        }
        Ok(groups)
    }

    fn reduce(&self, left: Self::Output, right: Self::Output) -> Self::Output {
        let (mut into, from) = if left.len() >= right.len() {
            (left, right)
        } else {
            (right, left)
        };
        for (group, acc) in from {
            match into.entry(group) {
                Entry::Occupied(mut entry) => self.group_by.merge(entry.get_mut(), acc),
                Entry::Vacant(entry) => {
                    entry.insert(acc);
                }
            }
        }
        into
    }
}

impl Cluster {
    /// Group the rows of `table` by the integer key in `key_column` and fold `value_columns` into
    /// one accumulator per key.
    ///
    /// Keys must be non-null and non-negative; any other key fails the run. The result is ordered
    /// by group id.
    pub fn group_by<G: GroupBy>(
        &self,
        table: &mut Table,
        key_column: usize,
        value_columns: &[usize],
        group_by: &G,
    ) -> TaskResult<BTreeMap<GroupId, G::Accumulator>, GroupKeyError> {
        if let Some(actual) = table.column_type(key_column) {
            if actual != ColumnType::Int {
                return Err(TaskError::KeyColumnType {
                    column: key_column,
                    actual,
                });
            }
        }

        // A value column may repeat the key (or another value column); each table column is
        // fetched once and shared between slots.
        let mut columns = vec![key_column];
        let value_slots = value_columns
            .iter()
            .map(|&col| match columns.iter().position(|&c| c == col) {
                Some(slot) => slot,
                None => {
                    columns.push(col);
                    columns.len() - 1
                }
            })
            .collect();

        let task = GroupByTask {
            group_by,
            value_slots,
        };
        let groups = self.run(table, &columns, &task)?;
        log::debug!(
            "group-by over column {key_column} produced {} groups",
            groups.len()
        );
        Ok(groups.into_iter().collect())
    }
}
