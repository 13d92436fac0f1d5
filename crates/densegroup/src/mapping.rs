use ahash::AHashMap;
use densegroup_cluster::GroupId;
use densegroup_columnar::TableFingerprint;
use std::collections::BTreeSet;

/// Raw group value to dense group id, built once per run and read-only afterwards.
///
/// Dense ids are assigned in ascending order of the raw values, so the same distinct set always
/// produces the same mapping, and dense order matches raw order.
#[derive(Clone, Debug)]
pub struct GroupIdMapping {
    dense: AHashMap<i64, GroupId>,
    /// `raw[id - 1]` is the raw value behind dense id `id`.
    raw: Vec<i64>,
    fingerprint: TableFingerprint,
}

impl GroupIdMapping {
    /// Number the values of `distinct` `1..=distinct.len()`.
    ///
    /// `fingerprint` identifies the table state the set was discovered from; relabeling refuses
    /// to run against any other state.
    pub fn compact(distinct: &BTreeSet<i64>, fingerprint: TableFingerprint) -> Self {
        let mut dense = AHashMap::with_capacity(distinct.len());
        let mut raw = Vec::with_capacity(distinct.len());
        let mut next: GroupId = 1;
        for &value in distinct {
            dense.insert(value, next);
            raw.push(value);
            next += 1;
        }
        Self {
            dense,
            raw,
            fingerprint,
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn fingerprint(&self) -> TableFingerprint {
        self.fingerprint
    }

    pub fn dense_id(&self, raw: i64) -> Option<GroupId> {
        self.dense.get(&raw).copied()
    }

    pub fn raw_value(&self, dense: GroupId) -> Option<i64> {
        let idx = usize::try_from(dense).ok()?.checked_sub(1)?;
        self.raw.get(idx).copied()
    }

    /// `(raw, dense)` pairs in dense id order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, GroupId)> + '_ {
        self.raw.iter().zip(1..).map(|(&raw, dense)| (raw, dense))
    }
}
