use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Coordinate of one stored cell version.
///
/// The total order is load-bearing: (row, family, qualifier, visibility)
/// ascending byte-lexicographic, then timestamp descending (newest first),
/// then tombstones before live cells on an exact-timestamp tie. Version
/// retention and "most recent wins" resolution in the scan pipeline both
/// assume this order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub row: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub visibility: Vec<u8>,
    pub timestamp: i64,
    pub deleted: bool,
}

impl CellKey {
    pub fn new(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        visibility: impl Into<Vec<u8>>,
        timestamp: i64,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            visibility: visibility.into(),
            timestamp,
            deleted: false,
        }
    }

    pub fn new_delete(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        visibility: impl Into<Vec<u8>>,
        timestamp: i64,
    ) -> Self {
        Self {
            deleted: true,
            ..Self::new(row, family, qualifier, visibility, timestamp)
        }
    }

    /// The lowest-sorting key with the given row: every key of that row
    /// compares greater or equal, every key of an earlier row compares less.
    pub fn row_start(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            family: Vec::new(),
            qualifier: Vec::new(),
            visibility: Vec::new(),
            timestamp: i64::MAX,
            deleted: true,
        }
    }

    /// The lowest-sorting key strictly after every key of (row, family).
    pub fn following_family(row: &[u8], family: &[u8]) -> Self {
        let mut next_family = family.to_vec();
        next_family.push(0);
        Self {
            row: row.to_vec(),
            family: next_family,
            qualifier: Vec::new(),
            visibility: Vec::new(),
            timestamp: i64::MAX,
            deleted: true,
        }
    }

    /// The lowest-sorting key strictly after every key of the given row.
    pub fn following_row(row: &[u8]) -> Self {
        let mut next_row = row.to_vec();
        next_row.push(0);
        Self::row_start(next_row)
    }

    /// True when both keys address the same (row, family, qualifier,
    /// visibility) column group, ignoring timestamp and delete flag.
    pub fn same_column(&self, other: &CellKey) -> bool {
        self.row == other.row
            && self.family == other.family
            && self.qualifier == other.qualifier
            && self.visibility == other.visibility
    }
}

impl Ord for CellKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.family.cmp(&other.family))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
            .then_with(|| self.visibility.cmp(&other.visibility))
            // Newest version first.
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            // Tombstone first on an exact-timestamp tie.
            .then_with(|| other.deleted.cmp(&self.deleted))
    }
}

impl PartialOrd for CellKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One (key, value) pair produced by a scan or stored in a cell store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub key: CellKey,
    pub value: Vec<u8>,
}

impl Cell {
    pub fn new(key: CellKey, value: Vec<u8>) -> Self {
        Self { key, value }
    }
}

#[cfg(test)]
mod tests {
    use super::CellKey;

    #[test]
    fn columns_order_ascending_timestamps_descending() {
        let a = CellKey::new("r1", "cf", "q", "", 5);
        let b = CellKey::new("r1", "cf", "q", "", 9);
        let c = CellKey::new("r2", "cf", "q", "", 1);
        // Newer timestamp sorts before older within the same column.
        assert!(b < a);
        // Row order dominates everything else.
        assert!(a < c);
        assert!(b < c);
    }

    #[test]
    fn tombstone_sorts_before_put_at_equal_timestamp() {
        let put = CellKey::new("r", "cf", "q", "", 7);
        let del = CellKey::new_delete("r", "cf", "q", "", 7);
        assert!(del < put);
        assert!(del.same_column(&put));
    }

    #[test]
    fn row_start_and_following_row_bracket_the_row() {
        let low = CellKey::row_start("m");
        let high = CellKey::following_row(b"m");
        let inside = CellKey::new("m", "cf", "q", "x|y", 3);
        let before = CellKey::new("l", "zz", "zz", "", 0);
        let after = CellKey::new("m\0", "", "", "", i64::MAX);
        assert!(low <= inside && inside < high);
        assert!(before < low);
        assert!(high <= after);
    }

    #[test]
    fn following_family_skips_the_whole_family() {
        let boundary = CellKey::following_family(b"r", b"cf1");
        let in_family = CellKey::new("r", "cf1", "\u{10FFFF}", "", i64::MIN);
        let next_family = CellKey::new("r", "cf2", "", "", i64::MAX);
        assert!(in_family < boundary);
        assert!(boundary <= next_family);
    }
}
