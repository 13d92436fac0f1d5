use densegroup_columnar::{Chunk, ColumnarResult, Value};

/// The chunks of one partition that a task asked for.
///
/// Slot `i` is the chunk of the `i`-th column passed to [`crate::Cluster::run`], so tasks address
/// columns by their position in that list rather than by table column index.
pub struct ChunkView<'a> {
    partition: usize,
    row_offset: usize,
    len: usize,
    chunks: Vec<&'a mut Chunk>,
}

impl<'a> ChunkView<'a> {
    pub(crate) fn new(
        partition: usize,
        row_offset: usize,
        len: usize,
        chunks: Vec<&'a mut Chunk>,
    ) -> Self {
        Self {
            partition,
            row_offset,
            len,
            chunks,
        }
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    /// Table row of this partition's first row.
    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    /// Rows in the partition.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn slots(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, slot: usize) -> &Chunk {
        &*self.chunks[slot]
    }

    pub fn chunk_mut(&mut self, slot: usize) -> &mut Chunk {
        &mut *self.chunks[slot]
    }

    pub fn get(&self, slot: usize, row: usize) -> Value {
        self.chunks[slot].get(row)
    }

    pub fn get_i64(&self, slot: usize, row: usize) -> Option<i64> {
        self.chunks[slot].get_i64(row)
    }

    pub fn set_i64(&mut self, slot: usize, row: usize, value: i64) -> ColumnarResult<()> {
        self.chunks[slot].set_i64(row, value)
    }
}

/// A data-parallel pass over a partitioned table.
///
/// `map` runs once per partition, possibly concurrently with other partitions and with no
/// ordering guarantee. Partial results are combined with `reduce`, in an unspecified pairing, so
/// `reduce` must be associative and commutative. A table with no partitions yields
/// `Output::default()`.
pub trait MapReduce: Sync {
    type Output: Default + Send;
    type Error: std::error::Error + Send;

    fn map(&self, chunks: &mut ChunkView<'_>) -> Result<Self::Output, Self::Error>;

    fn reduce(&self, left: Self::Output, right: Self::Output) -> Self::Output;
}
