use crate::error::{TaskError, TaskResult};
use crate::reduce::pairwise_reduce;
use crate::task::{ChunkView, MapReduce};
use densegroup_columnar::{Partition, Table};
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::prelude::*;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Every map runs on the calling thread, partitions in order.
    Sequential,
    /// Maps run on the crate thread pool when one is available.
    #[default]
    Parallel,
}

#[derive(Debug, Clone, Copy)]
pub struct ClusterConfig {
    /// Number of nodes partitions are spread over. Partition `p` lives on node `p % nodes`.
    pub nodes: usize,
    pub mode: ExecutionMode,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: 1,
            mode: ExecutionMode::Parallel,
        }
    }
}

/// Runs tasks over the partitions of a table.
///
/// Every node maps the partitions it owns and folds their results locally; node results are then
/// combined by a pairwise tree reduction on the calling thread. Partition data is never copied
/// between nodes, only task outputs are.
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    config: ClusterConfig,
}

impl Cluster {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            config: ClusterConfig {
                nodes: config.nodes.max(1),
                ..config
            },
        }
    }

    pub fn sequential(nodes: usize) -> Self {
        Self::new(ClusterConfig {
            nodes,
            mode: ExecutionMode::Sequential,
        })
    }

    pub fn node_count(&self) -> usize {
        self.config.nodes
    }

    pub fn mode(&self) -> ExecutionMode {
        self.config.mode
    }

    /// Node that owns `partition`.
    pub fn home_node(&self, partition: usize) -> NodeId {
        partition % self.config.nodes
    }

    /// Run `task` over every partition of `table`, giving each map the chunks of `columns`.
    ///
    /// Columns are validated before anything is dispatched. The first failing map aborts the
    /// run; its error is returned and no partial output survives.
    pub fn run<T: MapReduce>(
        &self,
        table: &mut Table,
        columns: &[usize],
        task: &T,
    ) -> TaskResult<T::Output, T::Error> {
        let column_count = table.column_count();
        validate_columns::<T::Error>(columns, column_count)?;

        let mut assigned: Vec<Vec<&mut Partition>> =
            (0..self.config.nodes).map(|_| Vec::new()).collect();
        for partition in table.partitions_mut() {
            assigned[self.home_node(partition.index())].push(partition);
        }
        log::debug!(
            "dispatching task over columns {columns:?} to {} nodes ({:?})",
            assigned.len(),
            self.config.mode
        );

        let partials = self.dispatch(assigned, columns, column_count, task)?;
        Ok(pairwise_reduce(partials, |a, b| task.reduce(a, b)).unwrap_or_default())
    }

    fn dispatch<T: MapReduce>(
        &self,
        assigned: Vec<Vec<&mut Partition>>,
        columns: &[usize],
        column_count: usize,
        task: &T,
    ) -> TaskResult<Vec<T::Output>, T::Error> {
        #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
        {
            if self.config.mode == ExecutionMode::Parallel {
                if let Some(pool) = crate::parallel::task_pool() {
                    return pool.install(|| {
                        assigned
                            .into_par_iter()
                            .enumerate()
                            .map(|(node, partitions)| {
                                run_node_parallel(node, partitions, columns, column_count, task)
                            })
                            .collect()
                    });
                }
            }
        }

        assigned
            .into_iter()
            .enumerate()
            .map(|(node, partitions)| {
                run_node_sequential(node, partitions, columns, column_count, task)
            })
            .collect()
    }
}

fn validate_columns<E>(columns: &[usize], column_count: usize) -> TaskResult<(), E> {
    let out_of_range = columns.iter().any(|&c| c >= column_count);
    let repeated = columns
        .iter()
        .enumerate()
        .any(|(i, c)| columns[..i].contains(c));
    if out_of_range || repeated {
        return Err(TaskError::InconsistentState {
            columns: columns.to_vec(),
            column_count,
        });
    }
    Ok(())
}

fn map_partition<T: MapReduce>(
    node: usize,
    partition: &mut Partition,
    columns: &[usize],
    column_count: usize,
    task: &T,
) -> TaskResult<T::Output, T::Error> {
    let index = partition.index();
    let row_offset = partition.row_offset();
    let len = partition.len();
    let chunks = partition
        .chunks_mut(columns)
        .ok_or_else(|| TaskError::InconsistentState {
            columns: columns.to_vec(),
            column_count,
        })?;

    let mut view = ChunkView::new(index, row_offset, len, chunks);
    task.map(&mut view).map_err(|source| TaskError::Partition {
        partition: index,
        node,
        source,
    })
}

fn run_node_sequential<T: MapReduce>(
    node: usize,
    partitions: Vec<&mut Partition>,
    columns: &[usize],
    column_count: usize,
    task: &T,
) -> TaskResult<T::Output, T::Error> {
    let mut acc: Option<T::Output> = None;
    for partition in partitions {
        let out = map_partition(node, partition, columns, column_count, task)?;
        acc = Some(match acc.take() {
            Some(prev) => task.reduce(prev, out),
            None => out,
        });
    }
    Ok(acc.unwrap_or_default())
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn run_node_parallel<T: MapReduce>(
    node: usize,
    partitions: Vec<&mut Partition>,
    columns: &[usize],
    column_count: usize,
    task: &T,
) -> TaskResult<T::Output, T::Error> {
    partitions
        .into_par_iter()
        .map(|partition| map_partition(node, partition, columns, column_count, task))
        .try_reduce_with(|a, b| Ok(task.reduce(a, b)))
        .unwrap_or_else(|| Ok(T::Output::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use densegroup_columnar::{ColumnSchema, ColumnType, TableBuilder, TableOptions, Value};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn table(rows: i64, partition_size_rows: usize) -> Table {
        let mut builder = TableBuilder::new(
            vec![
                ColumnSchema::new("x", ColumnType::Int),
                ColumnSchema::new("y", ColumnType::Int),
            ],
            TableOptions {
                partition_size_rows,
            },
        );
        for i in 0..rows {
            builder.append_row(&[Value::Int(i), Value::Int(0)]).unwrap();
        }
        builder.finalize().unwrap()
    }

    #[derive(Debug, thiserror::Error)]
    #[error("refused row {0}")]
    struct Refused(usize);

    /// Sums a column and records which partitions ran.
    struct SumTask {
        maps: AtomicUsize,
        fail_at_row: Option<usize>,
    }

    impl MapReduce for SumTask {
        type Output = i64;
        type Error = Refused;

        fn map(&self, chunks: &mut ChunkView<'_>) -> Result<i64, Refused> {
            self.maps.fetch_add(1, Ordering::SeqCst);
            let mut sum = 0;
            for row in 0..chunks.len() {
                if self.fail_at_row == Some(chunks.row_offset() + row) {
                    return Err(Refused(chunks.row_offset() + row));
                }
                sum += chunks.get_i64(0, row).unwrap_or(0);
            }
            Ok(sum)
        }

        fn reduce(&self, left: i64, right: i64) -> i64 {
            left + right
        }
    }

    fn sum_task(fail_at_row: Option<usize>) -> SumTask {
        SumTask {
            maps: AtomicUsize::new(0),
            fail_at_row,
        }
    }

    /// Copies column slot 0 into slot 1, doubled.
    struct DoubleInto;

    impl MapReduce for DoubleInto {
        type Output = ();
        type Error = densegroup_columnar::ColumnarError;

        fn map(&self, chunks: &mut ChunkView<'_>) -> Result<(), Self::Error> {
            for row in 0..chunks.len() {
                let v = chunks.get_i64(0, row).unwrap_or(0);
                chunks.set_i64(1, row, v * 2)?;
            }
            Ok(())
        }

        fn reduce(&self, _: (), _: ()) {}
    }

    #[test]
    fn sums_every_partition_on_every_node() {
        for nodes in 1..=4 {
            for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
                let cluster = Cluster::new(ClusterConfig { nodes, mode });
                let mut t = table(1000, 64);
                let task = sum_task(None);
                let sum = cluster.run(&mut t, &[0], &task).unwrap();
                assert_eq!(sum, 999 * 1000 / 2);
                assert_eq!(task.maps.load(Ordering::SeqCst), t.partition_count());
            }
        }
    }

    #[test]
    fn map_can_write_its_own_partition() {
        let mut t = table(10, 3);
        Cluster::default()
            .run(&mut t, &[0, 1], &DoubleInto)
            .unwrap();
        let doubled: Vec<Value> = (0..10).map(|i| Value::Int(i * 2)).collect();
        assert_eq!(t.column_values(1).unwrap(), doubled);
    }

    #[test]
    fn empty_table_yields_default_output() {
        let mut t = table(0, 8);
        assert_eq!(t.partition_count(), 0);
        let sum = Cluster::new(ClusterConfig {
            nodes: 3,
            mode: ExecutionMode::Parallel,
        })
        .run(&mut t, &[0], &sum_task(None))
        .unwrap();
        assert_eq!(sum, 0);
    }

    #[test]
    fn bad_columns_are_rejected_before_dispatch() {
        let mut t = table(10, 4);
        let task = sum_task(None);
        for columns in [vec![2], vec![0, 0]] {
            let err = Cluster::sequential(2)
                .run(&mut t, &columns, &task)
                .unwrap_err();
            assert!(matches!(
                err,
                TaskError::InconsistentState { column_count: 2, .. }
            ));
        }
        assert_eq!(task.maps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_partition_fails_the_run() {
        for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
            let mut t = table(100, 10);
            let cluster = Cluster::new(ClusterConfig { nodes: 3, mode });
            let err = cluster.run(&mut t, &[0], &sum_task(Some(57))).unwrap_err();
            match err {
                TaskError::Partition {
                    partition,
                    node,
                    source,
                } => {
                    assert_eq!(partition, 5);
                    assert_eq!(node, cluster.home_node(5));
                    assert_eq!(source.0, 57);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn partitions_are_spread_round_robin() {
        let cluster = Cluster::sequential(3);
        let homes: Vec<NodeId> = (0..7).map(|p| cluster.home_node(p)).collect();
        assert_eq!(homes, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(Cluster::sequential(0).node_count(), 1);
    }
}
