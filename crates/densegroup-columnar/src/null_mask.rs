/// Rows of a chunk that hold no value, one bit per row (set = null).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NullMask {
    words: Vec<u64>,
    rows: usize,
    nulls: usize,
}

const WORD_BITS: usize = u64::BITS as usize;

impl NullMask {
    /// Every one of `rows` rows null.
    pub(crate) fn all_null(rows: usize) -> Self {
        let mut words = vec![u64::MAX; rows.div_ceil(WORD_BITS)];
        if let Some(last) = words.last_mut() {
            let tail = rows % WORD_BITS;
            if tail != 0 {
                *last >>= WORD_BITS - tail;
            }
        }
        Self {
            words,
            rows,
            nulls: rows,
        }
    }

    /// No row null.
    pub(crate) fn none_null(rows: usize) -> Self {
        Self {
            words: vec![0; rows.div_ceil(WORD_BITS)],
            rows,
            nulls: 0,
        }
    }

    /// One row per flag, null where the flag is set. `None` when no flag is set.
    pub(crate) fn from_flags(flags: impl ExactSizeIterator<Item = bool>) -> Option<Self> {
        let mut mask = Self::none_null(flags.len());
        for (row, is_null) in flags.enumerate() {
            if is_null {
                mask.mark(row, true);
            }
        }
        (mask.nulls > 0).then_some(mask)
    }

    pub(crate) fn is_null(&self, row: usize) -> bool {
        self.words
            .get(row / WORD_BITS)
            .is_some_and(|w| *w & (1u64 << (row % WORD_BITS)) != 0)
    }

    pub(crate) fn mark(&mut self, row: usize, is_null: bool) {
        debug_assert!(row < self.rows, "null mask row out of bounds");
        if self.is_null(row) == is_null {
            return;
        }
        let bit = 1u64 << (row % WORD_BITS);
        if let Some(word) = self.words.get_mut(row / WORD_BITS) {
            *word ^= bit;
            if is_null {
                self.nulls += 1;
            } else {
                self.nulls -= 1;
            }
        }
    }

    pub(crate) fn null_count(&self) -> usize {
        self.nulls
    }
}
