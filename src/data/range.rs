use crate::data::key::CellKey;
use serde::{Deserialize, Serialize};

/// Key-space interval a scan is seeked to. Bounds are full cell keys so a
/// stage can reseek mid-row (or mid-family) without losing the outer limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRange {
    start: Option<CellKey>,
    start_inclusive: bool,
    end: Option<CellKey>,
    end_inclusive: bool,
}

impl ScanRange {
    /// The whole table.
    pub fn all() -> Self {
        Self::default()
    }

    /// Every version of every cell in one row.
    pub fn row(row: impl Into<Vec<u8>>) -> Self {
        let row = row.into();
        Self {
            end: Some(CellKey::following_row(&row)),
            end_inclusive: false,
            start: Some(CellKey::row_start(row)),
            start_inclusive: true,
        }
    }

    /// Half-open row interval `[start, end)`; `None` means unbounded on that
    /// side.
    pub fn rows(start: Option<&[u8]>, end: Option<&[u8]>) -> Self {
        Self {
            start: start.map(CellKey::row_start),
            start_inclusive: true,
            end: end.map(CellKey::row_start),
            end_inclusive: false,
        }
    }

    pub fn starting_at(key: CellKey, inclusive: bool) -> Self {
        Self {
            start: Some(key),
            start_inclusive: inclusive,
            ..Self::default()
        }
    }

    /// This range with its start bound replaced, keeping the end bound. Used
    /// by stages that skip forward (family skipping, reseek-after-top).
    pub fn with_start(&self, key: CellKey, inclusive: bool) -> Self {
        Self {
            start: Some(key),
            start_inclusive: inclusive,
            end: self.end.clone(),
            end_inclusive: self.end_inclusive,
        }
    }

    pub fn start(&self) -> Option<&CellKey> {
        self.start.as_ref()
    }

    pub fn start_inclusive(&self) -> bool {
        self.start_inclusive
    }

    pub fn end(&self) -> Option<&CellKey> {
        self.end.as_ref()
    }

    pub fn end_inclusive(&self) -> bool {
        self.end_inclusive
    }

    /// True when the key sits before the start bound.
    pub fn is_before_start(&self, key: &CellKey) -> bool {
        match &self.start {
            None => false,
            Some(start) if self.start_inclusive => key < start,
            Some(start) => key <= start,
        }
    }

    /// True when the key sits past the end bound.
    pub fn is_past_end(&self, key: &CellKey) -> bool {
        match &self.end {
            None => false,
            Some(end) if self.end_inclusive => key > end,
            Some(end) => key >= end,
        }
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        !self.is_before_start(key) && !self.is_past_end(key)
    }
}

#[cfg(test)]
mod tests {
    use super::ScanRange;
    use crate::data::key::CellKey;

    #[test]
    fn row_range_contains_only_that_row() {
        let range = ScanRange::row("b");
        assert!(range.contains(&CellKey::new("b", "cf", "q", "", 1)));
        assert!(!range.contains(&CellKey::new("a", "cf", "q", "", 1)));
        assert!(!range.contains(&CellKey::new("b\0", "", "", "", i64::MAX)));
        assert!(!range.contains(&CellKey::new("c", "cf", "q", "", 1)));
    }

    #[test]
    fn rows_range_is_half_open() {
        let range = ScanRange::rows(Some(b"b"), Some(b"d"));
        assert!(range.contains(&CellKey::new("b", "", "", "", 0)));
        assert!(range.contains(&CellKey::new("c", "cf", "q", "", 9)));
        assert!(!range.contains(&CellKey::new("d", "cf", "q", "", 9)));
        assert!(!range.contains(&CellKey::new("a", "cf", "q", "", 9)));
    }

    #[test]
    fn with_start_keeps_the_end_bound() {
        let range = ScanRange::rows(None, Some(b"z"));
        let narrowed = range.with_start(CellKey::row_start("m"), true);
        assert!(!narrowed.contains(&CellKey::new("a", "cf", "q", "", 1)));
        assert!(narrowed.contains(&CellKey::new("m", "cf", "q", "", 1)));
        assert!(!narrowed.contains(&CellKey::new("z", "cf", "q", "", 1)));
    }
}
