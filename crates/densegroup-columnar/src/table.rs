#![forbid(unsafe_code)]

use crate::chunk::Chunk;
use crate::error::{ColumnarError, ColumnarResult};
use crate::types::{ColumnType, Value};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    /// Rows per partition when the builder cuts partitions automatically.
    pub partition_size_rows: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            partition_size_rows: 65_536,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// One row-aligned slice of the table: a chunk per column, all of the same length.
#[derive(Clone, Debug)]
pub struct Partition {
    index: usize,
    row_offset: usize,
    len: usize,
    chunks: Vec<Chunk>,
}

impl Partition {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Table row of this partition's first row.
    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk(&self, col: usize) -> Option<&Chunk> {
        self.chunks.get(col)
    }

    pub fn chunk_mut(&mut self, col: usize) -> Option<&mut Chunk> {
        self.chunks.get_mut(col)
    }

    /// Mutable chunks for `cols`, in the order given. `None` if any index is out of range or
    /// repeated.
    pub fn chunks_mut(&mut self, cols: &[usize]) -> Option<Vec<&mut Chunk>> {
        let mut slots: Vec<Option<&mut Chunk>> = self.chunks.iter_mut().map(Some).collect();
        cols.iter()
            .map(|&col| slots.get_mut(col).and_then(Option::take))
            .collect()
    }
}

/// Identity of a table's contents for the purpose of detecting writes between passes.
///
/// `table` is unique to one [`Table`] value (a clone is a different table) and `generation`
/// advances on every mutable access to it. Two equal fingerprints therefore come from the same
/// table with nothing able to write to it in between.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TableFingerprint {
    pub table: u64,
    pub generation: u64,
    pub rows: usize,
    pub partitions: usize,
    pub columns: usize,
}

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_table_id() -> u64 {
    NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A columnar table split into row-aligned partitions.
#[derive(Debug)]
pub struct Table {
    id: u64,
    schema: Vec<ColumnSchema>,
    partitions: Vec<Partition>,
    rows: usize,
    generation: u64,
}

impl Clone for Table {
    /// The copy is a new table: it gets its own id and starts at generation 0.
    fn clone(&self) -> Self {
        Self {
            id: next_table_id(),
            schema: self.schema.clone(),
            partitions: self.partitions.clone(),
            rows: self.rows,
            generation: 0,
        }
    }
}

impl Table {
    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Index of the column called `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|c| c.name == name)
    }

    pub fn column_type(&self, col: usize) -> Option<ColumnType> {
        self.schema.get(col).map(|c| c.column_type)
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Mutable access for map tasks. Counts as a write for [`Table::fingerprint`].
    pub fn partitions_mut(&mut self) -> &mut [Partition] {
        self.generation += 1;
        &mut self.partitions
    }

    pub fn fingerprint(&self) -> TableFingerprint {
        TableFingerprint {
            table: self.id,
            generation: self.generation,
            rows: self.rows,
            partitions: self.partitions.len(),
            columns: self.schema.len(),
        }
    }

    /// Materialize a new column holding `default` in every row, using the existing partition
    /// boundaries. Returns the new column's index.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        column_type: ColumnType,
        default: Value,
    ) -> ColumnarResult<usize> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(ColumnarError::DuplicateColumn(name));
        }

        let mut chunks = Vec::with_capacity(self.partitions.len());
        for partition in &self.partitions {
            chunks.push(Chunk::filled(column_type, partition.len, default)?);
        }
        for (partition, chunk) in self.partitions.iter_mut().zip(chunks) {
            partition.chunks.push(chunk);
        }

        log::debug!(
            "added column {name:?} ({column_type}) across {} partitions",
            self.partitions.len()
        );
        self.schema.push(ColumnSchema { name, column_type });
        self.generation += 1;
        Ok(self.schema.len() - 1)
    }

    fn locate(&self, row: usize) -> Option<(usize, usize)> {
        if row >= self.rows {
            return None;
        }
        let idx = self
            .partitions
            .partition_point(|p| p.row_offset + p.len <= row);
        let partition = self.partitions.get(idx)?;
        Some((idx, row - partition.row_offset))
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Value {
        let Some((idx, offset)) = self.locate(row) else {
            return Value::Null;
        };
        self.partitions[idx]
            .chunk(col)
            .map(|c| c.get(offset))
            .unwrap_or(Value::Null)
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: Value) -> ColumnarResult<()> {
        let column_count = self.column_count();
        let (idx, offset) = self.locate(row).ok_or(ColumnarError::RowOutOfRange {
            row,
            len: self.rows,
        })?;
        let chunk = self.partitions[idx]
            .chunk_mut(col)
            .ok_or(ColumnarError::ColumnOutOfRange {
                column: col,
                column_count,
            })?;
        chunk.set(offset, value)?;
        self.generation += 1;
        Ok(())
    }

    /// Every value of a column in row order.
    pub fn column_values(&self, col: usize) -> ColumnarResult<Vec<Value>> {
        if col >= self.column_count() {
            return Err(ColumnarError::ColumnOutOfRange {
                column: col,
                column_count: self.column_count(),
            });
        }
        let mut out = Vec::with_capacity(self.rows);
        for partition in &self.partitions {
            if let Some(chunk) = partition.chunk(col) {
                out.extend((0..partition.len).map(|r| chunk.get(r)));
            }
        }
        Ok(out)
    }
}

/// Builds a [`Table`] row by row, cutting a partition every `partition_size_rows` rows or when
/// [`TableBuilder::finish_partition`] is called.
pub struct TableBuilder {
    schema: Vec<ColumnSchema>,
    options: TableOptions,
    current: Vec<Vec<Value>>,
    partitions: Vec<Partition>,
    rows: usize,
}

impl TableBuilder {
    pub fn new(schema: Vec<ColumnSchema>, options: TableOptions) -> Self {
        let current = schema
            .iter()
            .map(|_| Vec::with_capacity(options.partition_size_rows.min(4096)))
            .collect();
        Self {
            schema,
            options,
            current,
            partitions: Vec::new(),
            rows: 0,
        }
    }

    pub fn append_row(&mut self, row: &[Value]) -> ColumnarResult<()> {
        if row.len() != self.schema.len() {
            return Err(ColumnarError::SchemaMismatch {
                expected: self.schema.len(),
                actual: row.len(),
            });
        }
        for (schema, value) in self.schema.iter().zip(row) {
            if let Some(actual) = value.column_type() {
                if actual != schema.column_type {
                    return Err(ColumnarError::TypeMismatch {
                        expected: schema.column_type,
                        actual,
                    });
                }
            }
        }

        for (buffer, value) in self.current.iter_mut().zip(row) {
            buffer.push(*value);
        }
        self.rows += 1;

        let pending = self.current.first().map_or(0, Vec::len);
        if pending >= self.options.partition_size_rows.max(1) {
            self.finish_partition()?;
        }
        Ok(())
    }

    /// Close the partition being filled. A no-op when no rows are pending.
    pub fn finish_partition(&mut self) -> ColumnarResult<()> {
        let len = self.current.first().map_or(0, Vec::len);
        if len == 0 {
            return Ok(());
        }

        let mut chunks = Vec::with_capacity(self.schema.len());
        for (schema, buffer) in self.schema.iter().zip(self.current.iter_mut()) {
            chunks.push(Chunk::from_values(schema.column_type, buffer)?);
            buffer.clear();
        }

        let row_offset = self.partitions.last().map_or(0, |p| p.row_offset + p.len);
        self.partitions.push(Partition {
            index: self.partitions.len(),
            row_offset,
            len,
            chunks,
        });
        Ok(())
    }

    pub fn finalize(mut self) -> ColumnarResult<Table> {
        self.finish_partition()?;
        Ok(Table {
            id: next_table_id(),
            schema: self.schema,
            partitions: self.partitions,
            rows: self.rows,
            generation: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> Vec<ColumnSchema> {
        vec![
            ColumnSchema::new("cyl", ColumnType::Int),
            ColumnSchema::new("dist", ColumnType::Float),
        ]
    }

    fn build(rows: usize, partition_size_rows: usize) -> Table {
        let mut builder = TableBuilder::new(
            schema(),
            TableOptions {
                partition_size_rows,
            },
        );
        for i in 0..rows {
            builder
                .append_row(&[Value::Int((i % 4) as i64), Value::Float(i as f64)])
                .unwrap();
        }
        builder.finalize().unwrap()
    }

    #[test]
    fn builder_cuts_row_aligned_partitions() {
        let table = build(10, 4);
        assert_eq!(table.row_count(), 10);
        assert_eq!(table.partition_count(), 3);

        let layout: Vec<(usize, usize)> = table
            .partitions()
            .iter()
            .map(|p| (p.row_offset(), p.len()))
            .collect();
        assert_eq!(layout, vec![(0, 4), (4, 4), (8, 2)]);
        assert!(table.partitions().iter().all(|p| {
            p.chunk(0).unwrap().len() == p.len() && p.chunk(1).unwrap().len() == p.len()
        }));

        assert_eq!(table.get_cell(5, 0), Value::Int(1));
        assert_eq!(table.get_cell(9, 1), Value::Float(9.0));
        assert_eq!(table.get_cell(10, 1), Value::Null);
    }

    #[test]
    fn manual_partition_cuts_allow_uneven_layouts() {
        let mut builder = TableBuilder::new(schema(), TableOptions::default());
        builder
            .append_row(&[Value::Int(1), Value::Float(1.0)])
            .unwrap();
        builder.finish_partition().unwrap();
        builder.finish_partition().unwrap();
        for _ in 0..3 {
            builder.append_row(&[Value::Int(2), Value::Null]).unwrap();
        }
        let table = builder.finalize().unwrap();

        assert_eq!(table.partition_count(), 2);
        assert_eq!(table.partitions()[1].row_offset(), 1);
        assert_eq!(table.get_cell(3, 1), Value::Null);
    }

    #[test]
    fn add_column_uses_existing_boundaries() {
        let mut table = build(9, 4);
        let before = table.fingerprint();
        let idx = table
            .add_column("sparse_group_number", ColumnType::Int, Value::Int(0))
            .unwrap();

        assert_eq!(idx, 2);
        assert_eq!(table.find("sparse_group_number"), Some(2));
        assert_eq!(table.column_values(2).unwrap(), vec![Value::Int(0); 9]);
        assert!(table
            .partitions()
            .iter()
            .all(|p| p.chunk(2).unwrap().len() == p.len()));
        assert_ne!(table.fingerprint(), before);

        assert!(matches!(
            table.add_column("cyl", ColumnType::Int, Value::Int(0)),
            Err(ColumnarError::DuplicateColumn(name)) if name == "cyl"
        ));
    }

    #[test]
    fn writes_advance_the_generation() {
        let mut table = build(6, 4);
        let f0 = table.fingerprint();
        table.set_cell(5, 0, Value::Int(42)).unwrap();
        assert_eq!(table.get_cell(5, 0), Value::Int(42));
        let f1 = table.fingerprint();
        assert_ne!(f0, f1);

        let _ = table.partitions_mut();
        assert_ne!(table.fingerprint(), f1);
        assert_eq!(table.fingerprint(), table.fingerprint());
    }

    #[test]
    fn tables_of_the_same_shape_have_distinct_fingerprints() {
        let a = build(6, 4);
        let b = build(6, 4);
        assert_ne!(a.fingerprint(), b.fingerprint());

        let copy = a.clone();
        assert_ne!(copy.fingerprint().table, a.fingerprint().table);
        assert_eq!(copy.fingerprint().generation, 0);
        assert_eq!(copy.column_values(1).unwrap(), a.column_values(1).unwrap());
    }

    #[test]
    fn chunks_mut_rejects_repeated_or_missing_columns() {
        let mut table = build(4, 4);
        let partition = &mut table.partitions_mut()[0];
        assert!(partition.chunks_mut(&[1, 0]).is_some());
        assert!(partition.chunks_mut(&[0, 0]).is_none());
        assert!(partition.chunks_mut(&[2]).is_none());
    }

    #[test]
    fn append_row_validates_shape_and_types() {
        let mut builder = TableBuilder::new(schema(), TableOptions::default());
        assert!(matches!(
            builder.append_row(&[Value::Int(1)]),
            Err(ColumnarError::SchemaMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            builder.append_row(&[Value::Float(1.0), Value::Float(1.0)]),
            Err(ColumnarError::TypeMismatch { .. })
        ));
    }
}
