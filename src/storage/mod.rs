//! The sorted map of versioned cells backing one table, plus the live-view
//! cursor the scan pipeline reads through.

use crate::data::{Cell, CellKey, ScanRange};
use crate::error::CelldbError;
use crate::scan::CellIter;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// Sorted store of versioned cells. Deletion inserts a tombstone entry that
/// participates in ordering like any other cell; prior versions are only
/// resolved away at scan time. Structurally valid cells are never rejected.
#[derive(Debug, Default)]
pub struct CellStore {
    cells: RwLock<BTreeMap<CellKey, Vec<u8>>>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces one cell version. A key equal on all ordering
    /// fields replaces the previous value rather than duplicating it.
    pub fn put(&self, key: CellKey, value: Vec<u8>) {
        self.cells.write().insert(key, value);
    }

    /// Inserts a tombstone at the given coordinates. Nothing is physically
    /// removed.
    pub fn put_delete(&self, mut key: CellKey) {
        key.deleted = true;
        self.cells.write().insert(key, Vec::new());
    }

    pub fn clear(&self) {
        self.cells.write().clear();
    }

    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }

    /// Removes every stored cell whose row falls in the half-open interval
    /// `[start, end)`. A `None` start means from the beginning, a `None` end
    /// means through the last row; both `None` empties the table.
    pub fn delete_rows(&self, start: Option<&[u8]>, end: Option<&[u8]>) {
        let mut cells = self.cells.write();
        if start.is_none() && end.is_none() {
            cells.clear();
            return;
        }
        cells.retain(|key, _| {
            let after_start = start.is_none_or(|s| key.row.as_slice() >= s);
            let before_end = end.is_none_or(|e| key.row.as_slice() < e);
            !(after_start && before_end)
        });
    }

    /// Greatest stored row within the given row bounds, ignoring visibility
    /// and tombstones. The caller is responsible for probing the result.
    pub fn max_row_in(
        &self,
        lower: Option<(&[u8], bool)>,
        upper: Option<(&[u8], bool)>,
    ) -> Option<Vec<u8>> {
        let cells = self.cells.read();
        let upper_bound = match upper {
            None => Bound::Unbounded,
            Some((row, true)) => Bound::Excluded(CellKey::following_row(row)),
            Some((row, false)) => Bound::Excluded(CellKey::row_start(row)),
        };
        let row = cells
            .range((Bound::Unbounded, upper_bound))
            .next_back()
            .map(|(key, _)| key.row.clone())?;
        let in_lower = match lower {
            None => true,
            Some((bound, true)) => row.as_slice() >= bound,
            Some((bound, false)) => row.as_slice() > bound,
        };
        in_lower.then_some(row)
    }

    /// Greatest stored row strictly before `row`, if any.
    pub fn prev_row(&self, row: &[u8]) -> Option<Vec<u8>> {
        let cells = self.cells.read();
        cells
            .range((Bound::Unbounded, Bound::Excluded(CellKey::row_start(row))))
            .next_back()
            .map(|(key, _)| key.row.clone())
    }

    fn first_in(&self, range: &ScanRange) -> Option<Cell> {
        let cells = self.cells.read();
        let lower = match range.start() {
            None => Bound::Unbounded,
            Some(key) if range.start_inclusive() => Bound::Included(key.clone()),
            Some(key) => Bound::Excluded(key.clone()),
        };
        cells
            .range((lower, Bound::Unbounded))
            .next()
            .filter(|(key, _)| !range.is_past_end(key))
            .map(|(key, value)| Cell::new(key.clone(), value.clone()))
    }

    fn first_after(&self, key: &CellKey, range: &ScanRange) -> Option<Cell> {
        let cells = self.cells.read();
        cells
            .range((Bound::Excluded(key.clone()), Bound::Unbounded))
            .next()
            .filter(|(key, _)| !range.is_past_end(key))
            .map(|(key, value)| Cell::new(key.clone(), value.clone()))
    }
}

/// Re-seekable cursor over a shared cell store.
///
/// The cursor is a live view, not a snapshot: each `seek`/`next` re-reads
/// the store under a read lock from the position of the last returned key,
/// so a mutation committed mid-scan may or may not be observed depending on
/// where the cursor stands.
pub struct StoreCursor {
    store: Arc<CellStore>,
    range: Option<ScanRange>,
    top: Option<Cell>,
}

impl StoreCursor {
    pub fn new(store: Arc<CellStore>) -> Self {
        Self {
            store,
            range: None,
            top: None,
        }
    }
}

impl CellIter for StoreCursor {
    fn seek(&mut self, range: &ScanRange) -> Result<(), CelldbError> {
        self.top = self.store.first_in(range);
        self.range = Some(range.clone());
        Ok(())
    }

    fn next(&mut self) -> Result<(), CelldbError> {
        let range = self
            .range
            .as_ref()
            .ok_or(CelldbError::IllegalScanState("next before seek"))?;
        let Some(current) = self.top.take() else {
            return Err(CelldbError::IllegalScanState("next on exhausted cursor"));
        };
        self.top = self.store.first_after(&current.key, range);
        Ok(())
    }

    fn has_top(&self) -> bool {
        self.top.is_some()
    }

    fn top(&self) -> Result<&Cell, CelldbError> {
        self.top
            .as_ref()
            .ok_or(CelldbError::IllegalScanState("top on unseeked or exhausted cursor"))
    }
}
