#![forbid(unsafe_code)]

use crate::error::{ColumnarError, ColumnarResult};
use crate::null_mask::NullMask;
use crate::types::{ColumnType, Value};

#[derive(Clone, Debug, PartialEq)]
enum ChunkData {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

/// The rows of one column that fall inside one partition.
///
/// Offsets passed to the accessors are relative to the start of the partition. `nulls` is only
/// materialized while at least one row is null.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    data: ChunkData,
    nulls: Option<NullMask>,
}

impl Chunk {
    /// A chunk of `len` rows that all hold `value`.
    pub fn filled(column_type: ColumnType, len: usize, value: Value) -> ColumnarResult<Self> {
        check_type(column_type, &value)?;
        let data = match column_type {
            ColumnType::Int => ChunkData::Int(vec![value.as_i64().unwrap_or(0); len]),
            ColumnType::Float => ChunkData::Float(vec![value.as_f64().unwrap_or(0.0); len]),
        };
        let nulls = (value.is_null() && len > 0).then(|| NullMask::all_null(len));
        Ok(Self { data, nulls })
    }

    pub fn from_values(column_type: ColumnType, values: &[Value]) -> ColumnarResult<Self> {
        let data = match column_type {
            ColumnType::Int => {
                let mut out = Vec::with_capacity(values.len());
                for value in values {
                    check_type(column_type, value)?;
                    out.push(value.as_i64().unwrap_or(0));
                }
                ChunkData::Int(out)
            }
            ColumnType::Float => {
                let mut out = Vec::with_capacity(values.len());
                for value in values {
                    check_type(column_type, value)?;
                    out.push(value.as_f64().unwrap_or(0.0));
                }
                ChunkData::Float(out)
            }
        };
        let nulls = NullMask::from_flags(values.iter().map(Value::is_null));
        Ok(Self { data, nulls })
    }

    pub fn column_type(&self) -> ColumnType {
        match self.data {
            ChunkData::Int(_) => ColumnType::Int,
            ChunkData::Float(_) => ColumnType::Float,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ChunkData::Int(v) => v.len(),
            ChunkData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        self.nulls.as_ref().map_or(0, NullMask::null_count)
    }

    fn is_valid(&self, row: usize) -> bool {
        self.nulls.as_ref().map_or(true, |n| !n.is_null(row))
    }

    pub fn get(&self, row: usize) -> Value {
        if row >= self.len() || !self.is_valid(row) {
            return Value::Null;
        }
        match &self.data {
            ChunkData::Int(v) => Value::Int(v[row]),
            ChunkData::Float(v) => Value::Float(v[row]),
        }
    }

    /// Integer read at `row`. `None` for nulls, out of range rows and float chunks.
    pub fn get_i64(&self, row: usize) -> Option<i64> {
        match &self.data {
            ChunkData::Int(v) if row < v.len() && self.is_valid(row) => Some(v[row]),
            _ => None,
        }
    }

    /// Numeric read at `row`; integer chunks widen to `f64`.
    pub fn get_f64(&self, row: usize) -> Option<f64> {
        self.get(row).as_f64()
    }

    pub fn set(&mut self, row: usize, value: Value) -> ColumnarResult<()> {
        let len = self.len();
        if row >= len {
            return Err(ColumnarError::RowOutOfRange { row, len });
        }
        check_type(self.column_type(), &value)?;

        match (&mut self.data, value) {
            (ChunkData::Int(v), Value::Int(x)) => v[row] = x,
            (ChunkData::Float(v), Value::Float(x)) => v[row] = x,
            (ChunkData::Int(v), _) => v[row] = 0,
            (ChunkData::Float(v), _) => v[row] = 0.0,
        }

        let nulls = self.nulls.get_or_insert_with(|| NullMask::none_null(len));
        nulls.mark(row, value.is_null());
        if nulls.null_count() == 0 {
            self.nulls = None;
        }
        Ok(())
    }

    pub fn set_i64(&mut self, row: usize, value: i64) -> ColumnarResult<()> {
        self.set(row, Value::Int(value))
    }
}

fn check_type(expected: ColumnType, value: &Value) -> ColumnarResult<()> {
    match value.column_type() {
        Some(actual) if actual != expected => Err(ColumnarError::TypeMismatch { expected, actual }),
        _ => Ok(()),
    }
}
