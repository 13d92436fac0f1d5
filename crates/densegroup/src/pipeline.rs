use crate::aggregate::aggregate;
use crate::config::PipelineConfig;
use crate::distinct::discover_distinct;
use crate::error::{PipelineError, PipelineResult};
use crate::mapping::GroupIdMapping;
use crate::relabel::relabel;
use crate::summary::Summary;
use crate::tag::tag_rows;
use densegroup_cluster::{Cluster, GroupId};
use densegroup_columnar::{ColumnType, Table, TableStore, Value};

/// Column indices a run works with, resolved against one table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupColumns {
    pub group: usize,
    pub value: usize,
    pub sparse: usize,
    pub dense: usize,
}

/// The finalized summary of one group.
///
/// A group whose values were all missing still appears, with an empty summary: `count` is 0 and
/// `min`/`max` keep their initial `f64::MAX`/`f64::MIN`. Check [`Summary::is_empty`] before
/// reading them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupSummary {
    pub dense_id: GroupId,
    /// The raw grouping value the group was compacted from.
    pub group_value: i64,
    pub summary: Summary,
}

/// Per-group summaries of a completed run, ordered by dense id.
///
/// Dense ids follow ascending raw group value, so this is also raw value order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupedSummaries {
    groups: Vec<GroupSummary>,
}

impl GroupedSummaries {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GroupSummary> {
        self.groups.iter()
    }

    pub fn by_dense_id(&self, dense_id: GroupId) -> Option<&GroupSummary> {
        let idx = usize::try_from(dense_id).ok()?.checked_sub(1)?;
        self.groups.get(idx)
    }

    pub fn by_group_value(&self, group_value: i64) -> Option<&GroupSummary> {
        let idx = self
            .groups
            .binary_search_by_key(&group_value, |g| g.group_value)
            .ok()?;
        self.groups.get(idx)
    }

    pub fn into_vec(self) -> Vec<GroupSummary> {
        self.groups
    }
}

impl<'a> IntoIterator for &'a GroupedSummaries {
    type Item = &'a GroupSummary;
    type IntoIter = std::slice::Iter<'a, GroupSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Groups a table by an integer column and summarizes a value column per group.
///
/// A run is five steps, each finishing before the next starts:
/// 0. add the sparse and dense id columns (zero-filled) if the table lacks them
/// 1. tag: copy the group value of each row into the sparse column
/// 2. discover: collect the distinct sparse ids
/// 3. relabel: compact them to `1..=N` and write each row's dense id
/// 4. aggregate: min/max/count of the value column per dense id
///
/// The table is borrowed mutably for the whole run, so nothing else can write to it between
/// passes.
#[derive(Clone, Debug)]
pub struct GroupedSummaryPipeline {
    cluster: Cluster,
    config: PipelineConfig,
}

impl GroupedSummaryPipeline {
    pub fn new(cluster: Cluster, config: PipelineConfig) -> Self {
        Self { cluster, config }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn resolve(&self, table: &Table, name: &str) -> PipelineResult<usize> {
        table
            .find(name)
            .ok_or_else(|| PipelineError::UnknownColumn(name.to_string()))
    }

    fn id_column(&self, table: &mut Table, name: &str) -> PipelineResult<usize> {
        match table.find(name) {
            Some(idx) => Ok(idx),
            None => Ok(table.add_column(name, ColumnType::Int, Value::Int(0))?),
        }
    }

    /// Pass 0: resolve the configured columns, adding the id columns where missing.
    pub fn prepare(&self, table: &mut Table) -> PipelineResult<GroupColumns> {
        let group = self.resolve(table, &self.config.group_column)?;
        let value = self.resolve(table, &self.config.value_column)?;
        let sparse = self.id_column(table, &self.config.sparse_column)?;
        let dense = self.id_column(table, &self.config.dense_column)?;
        Ok(GroupColumns {
            group,
            value,
            sparse,
            dense,
        })
    }

    pub fn run(&self, table: &mut Table) -> PipelineResult<GroupedSummaries> {
        let columns = self.prepare(table)?;
        self.run_passes(table, columns)
    }

    /// Passes 1 through 4 over columns that already exist on `table`.
    pub fn run_passes(
        &self,
        table: &mut Table,
        columns: GroupColumns,
    ) -> PipelineResult<GroupedSummaries> {
        log::debug!(
            "grouping {} rows in {} partitions by column {} over {} nodes",
            table.row_count(),
            table.partition_count(),
            columns.group,
            self.cluster.node_count()
        );

        tag_rows(&self.cluster, table, columns.group, columns.sparse)?;

        let distinct = discover_distinct(&self.cluster, table, columns.sparse)?;
        let mapping = GroupIdMapping::compact(&distinct, table.fingerprint());
        drop(distinct);

        relabel(&self.cluster, table, &mapping, columns.sparse, columns.dense)?;

        let summaries = aggregate(&self.cluster, table, columns.dense, columns.value)?;

        let mut groups = Vec::with_capacity(summaries.len());
        for (dense_id, summary) in summaries {
            let Some(group_value) = mapping.raw_value(dense_id) else {
                return Err(PipelineError::DenseIdOutOfRange {
                    dense_id,
                    groups: mapping.len(),
                });
            };
            groups.push(GroupSummary {
                dense_id,
                group_value,
                summary,
            });
        }

        let result = GroupedSummaries { groups };
        if self.config.log_summaries {
            log_summaries(&result);
        }
        Ok(result)
    }

    /// Run against the table stored under `key`.
    ///
    /// The id columns are added through the store and the table saved before any pass runs; the
    /// relabeled table is saved back afterwards, or removed when
    /// [`PipelineConfig::remove_table_after_run`] is set.
    pub fn run_stored(
        &self,
        store: &dyn TableStore,
        key: &str,
    ) -> PipelineResult<GroupedSummaries> {
        let mut table = store.load(key)?;
        for name in [&self.config.sparse_column, &self.config.dense_column] {
            if table.find(name).is_none() {
                table = store.add_column(table, name, ColumnType::Int, Value::Int(0))?;
            }
        }
        store.save(key, table.clone())?;

        let result = self.run(&mut table)?;

        if self.config.remove_table_after_run {
            store.remove(key)?;
            log::debug!("removed table {key:?}");
        } else {
            store.save(key, table)?;
        }
        Ok(result)
    }
}

fn report_line(group: &GroupSummary) -> String {
    if group.summary.is_empty() {
        return format!(
            "group {} (dense id {}): no values",
            group.group_value, group.dense_id
        );
    }
    format!(
        "group {} (dense id {}): min {} max {} n {}",
        group.group_value,
        group.dense_id,
        group.summary.min,
        group.summary.max,
        group.summary.count
    )
}

fn log_summaries(summaries: &GroupedSummaries) {
    for group in summaries {
        log::info!("{}", report_line(group));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use densegroup_columnar::{ColumnSchema, TableBuilder, TableOptions};
    use pretty_assertions::assert_eq;

    fn cars() -> Table {
        let mut builder = TableBuilder::new(
            vec![
                ColumnSchema::new("cylinders", ColumnType::Int),
                ColumnSchema::new("economy", ColumnType::Float),
            ],
            TableOptions {
                partition_size_rows: 3,
            },
        );
        for (cyl, mpg) in [
            (8, 18.0),
            (4, 31.5),
            (6, 22.0),
            (8, 14.0),
            (4, 27.2),
            (3, 23.7),
        ] {
            builder
                .append_row(&[Value::Int(cyl), Value::Float(mpg)])
                .unwrap();
        }
        builder.finalize().unwrap()
    }

    #[test]
    fn prepare_adds_id_columns_once() {
        let pipeline = GroupedSummaryPipeline::new(
            Cluster::sequential(1),
            PipelineConfig::new("cylinders", "economy"),
        );
        let mut table = cars();
        let first = pipeline.prepare(&mut table).unwrap();
        assert_eq!(
            first,
            GroupColumns {
                group: 0,
                value: 1,
                sparse: 2,
                dense: 3
            }
        );
        assert_eq!(pipeline.prepare(&mut table).unwrap(), first);
        assert_eq!(table.column_count(), 4);
    }

    #[test]
    fn unknown_columns_are_reported_by_name() {
        let pipeline = GroupedSummaryPipeline::new(
            Cluster::sequential(1),
            PipelineConfig::new("cyl", "economy"),
        );
        let err = pipeline.run(&mut cars()).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownColumn(name) if name == "cyl"));
    }

    #[test]
    fn summaries_are_ordered_and_searchable() {
        let pipeline = GroupedSummaryPipeline::new(
            Cluster::sequential(2),
            PipelineConfig::new("cylinders", "economy"),
        );
        let result = pipeline.run(&mut cars()).unwrap();

        let keys: Vec<(GroupId, i64)> = result
            .iter()
            .map(|g| (g.dense_id, g.group_value))
            .collect();
        assert_eq!(keys, vec![(1, 3), (2, 4), (3, 6), (4, 8)]);

        let eight = result.by_group_value(8).unwrap();
        assert_eq!(eight.dense_id, 4);
        assert_eq!(
            eight.summary,
            Summary {
                min: 14.0,
                max: 18.0,
                count: 2
            }
        );
        assert_eq!(result.by_dense_id(2).unwrap().summary.count, 2);
        assert!(result.by_dense_id(0).is_none());
        assert!(result.by_group_value(5).is_none());
    }

    #[test]
    fn group_without_values_reports_no_values() {
        let mut builder = TableBuilder::new(
            vec![
                ColumnSchema::new("cylinders", ColumnType::Int),
                ColumnSchema::new("economy", ColumnType::Float),
            ],
            TableOptions::default(),
        );
        for (cyl, mpg) in [
            (5, Value::Null),
            (5, Value::Float(f64::NAN)),
            (4, Value::Float(30.0)),
        ] {
            builder.append_row(&[Value::Int(cyl), mpg]).unwrap();
        }
        let mut table = builder.finalize().unwrap();
        let pipeline = GroupedSummaryPipeline::new(
            Cluster::sequential(1),
            PipelineConfig::new("cylinders", "economy"),
        );
        let result = pipeline.run(&mut table).unwrap();

        let five = result.by_group_value(5).unwrap();
        assert!(five.summary.is_empty());
        assert_eq!(report_line(five), "group 5 (dense id 2): no values");
        assert_eq!(
            report_line(result.by_group_value(4).unwrap()),
            "group 4 (dense id 1): min 30 max 30 n 1"
        );
    }
}
