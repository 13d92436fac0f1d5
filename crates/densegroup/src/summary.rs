use densegroup_cluster::GroupBy;
use densegroup_columnar::Value;

/// Running minimum, maximum, and count of a group's values.
///
/// An empty summary has `min = f64::MAX` and `max = f64::MIN`, the identities of `min`/`max`, so
/// merging with it changes nothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub count: u64,
}

impl Summary {
    pub const EMPTY: Summary = Summary {
        min: f64::MAX,
        max: f64::MIN,
        count: 0,
    };

    pub fn new() -> Self {
        Self::EMPTY
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn fold(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.count += 1;
    }

    pub fn merge(&mut self, other: &Summary) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count += other.count;
    }

    pub fn merged(mut self, other: &Summary) -> Summary {
        self.merge(other);
        self
    }
}

impl Default for Summary {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl FromIterator<f64> for Summary {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut summary = Summary::new();
        for v in iter {
            summary.fold(v);
        }
        summary
    }
}

/// Summarizes the first value column of each row.
///
/// Missing values (nulls and NaN) are skipped: they do not move `min`/`max` and are not counted.
#[derive(Clone, Copy, Debug, Default)]
pub struct SummaryGroupBy;

impl GroupBy for SummaryGroupBy {
    type Accumulator = Summary;

    fn make(&self) -> Summary {
        Summary::new()
    }

    fn fold(&self, acc: &mut Summary, values: &[Value]) {
        if let Some(v) = values.first().and_then(Value::as_f64) {
            if !v.is_nan() {
                acc.fold(v);
            }
        }
    }

    fn merge(&self, acc: &mut Summary, other: Summary) {
        acc.merge(&other);
    }
}
