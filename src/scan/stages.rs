//! The built-in pipeline stages, bottom to top: delete resolution, family
//! skipping, qualifier filtering, visibility filtering, version limiting.

use crate::data::{Cell, CellKey, ScanRange};
use crate::error::CelldbError;
use crate::scan::CellIter;
use crate::security::visibility::is_visible;
use crate::security::Authorizations;
use std::collections::BTreeSet;

/// Applies tombstones. A tombstone suppresses itself and every entry of the
/// same (row, family, qualifier, visibility) group whose timestamp is at or
/// below the tombstone's. Entries newer than the tombstone sort before it
/// and pass through untouched; on an exact-timestamp tie the tombstone sorts
/// first, so the delete wins.
pub struct DeleteResolver {
    source: Box<dyn CellIter>,
    tombstone: Option<CellKey>,
}

impl DeleteResolver {
    pub fn new(source: Box<dyn CellIter>) -> Self {
        Self {
            source,
            tombstone: None,
        }
    }

    fn skip_suppressed(&mut self) -> Result<(), CelldbError> {
        while self.source.has_top() {
            let key = self.source.top()?.key.clone();
            if key.deleted {
                self.tombstone = Some(key);
                self.source.next()?;
                continue;
            }
            let covered = self
                .tombstone
                .as_ref()
                .is_some_and(|t| t.same_column(&key) && key.timestamp <= t.timestamp);
            if !covered {
                break;
            }
            self.source.next()?;
        }
        Ok(())
    }
}

impl CellIter for DeleteResolver {
    fn seek(&mut self, range: &ScanRange) -> Result<(), CelldbError> {
        self.tombstone = None;
        self.source.seek(range)?;
        self.skip_suppressed()
    }

    fn next(&mut self) -> Result<(), CelldbError> {
        self.source.next()?;
        self.skip_suppressed()
    }

    fn has_top(&self) -> bool {
        self.source.has_top()
    }

    fn top(&self) -> Result<&Cell, CelldbError> {
        self.source.top()
    }
}

/// Restricts a scan to an allowlist of column families by seeking the source
/// past every other family in one jump. Cells of a non-fetched family are
/// never surfaced by the source beyond the single entry that triggers the
/// jump.
pub struct FamilySkipper {
    source: Box<dyn CellIter>,
    families: BTreeSet<Vec<u8>>,
    range: ScanRange,
}

impl FamilySkipper {
    pub fn new(source: Box<dyn CellIter>, families: BTreeSet<Vec<u8>>) -> Self {
        Self {
            source,
            families,
            range: ScanRange::all(),
        }
    }

    fn skip_to_fetched_family(&mut self) -> Result<(), CelldbError> {
        while self.source.has_top() {
            let key = self.source.top()?.key.clone();
            if self.families.contains(&key.family) {
                break;
            }
            let jump = CellKey::following_family(&key.row, &key.family);
            self.source.seek(&self.range.with_start(jump, true))?;
        }
        Ok(())
    }
}

impl CellIter for FamilySkipper {
    fn seek(&mut self, range: &ScanRange) -> Result<(), CelldbError> {
        self.range = range.clone();
        self.source.seek(range)?;
        self.skip_to_fetched_family()
    }

    fn next(&mut self) -> Result<(), CelldbError> {
        self.source.next()?;
        self.skip_to_fetched_family()
    }

    fn has_top(&self) -> bool {
        self.source.has_top()
    }

    fn top(&self) -> Result<&Cell, CelldbError> {
        self.source.top()
    }
}

/// Drops cells whose (family, qualifier) pair is not fetched. A family
/// fetched without a qualifier passes all of its qualifiers.
pub struct QualifierFilter {
    source: Box<dyn CellIter>,
    whole_families: BTreeSet<Vec<u8>>,
    columns: BTreeSet<(Vec<u8>, Vec<u8>)>,
}

impl QualifierFilter {
    pub fn new(
        source: Box<dyn CellIter>,
        whole_families: BTreeSet<Vec<u8>>,
        columns: BTreeSet<(Vec<u8>, Vec<u8>)>,
    ) -> Self {
        Self {
            source,
            whole_families,
            columns,
        }
    }

    fn accepts(&self, key: &CellKey) -> bool {
        self.whole_families.contains(&key.family)
            || self
                .columns
                .contains(&(key.family.clone(), key.qualifier.clone()))
    }

    fn skip_rejected(&mut self) -> Result<(), CelldbError> {
        while self.source.has_top() && !self.accepts(&self.source.top()?.key) {
            self.source.next()?;
        }
        Ok(())
    }
}

impl CellIter for QualifierFilter {
    fn seek(&mut self, range: &ScanRange) -> Result<(), CelldbError> {
        self.source.seek(range)?;
        self.skip_rejected()
    }

    fn next(&mut self) -> Result<(), CelldbError> {
        self.source.next()?;
        self.skip_rejected()
    }

    fn has_top(&self) -> bool {
        self.source.has_top()
    }

    fn top(&self) -> Result<&Cell, CelldbError> {
        self.source.top()
    }
}

/// Drops cells whose visibility label the scan authorizations do not
/// satisfy. A cell with an empty label falls back to the table's default
/// visibility, if one is configured. A malformed label aborts the scan.
pub struct VisibilityFilter {
    source: Box<dyn CellIter>,
    auths: Authorizations,
    default_visibility: Vec<u8>,
}

impl VisibilityFilter {
    pub fn new(
        source: Box<dyn CellIter>,
        auths: Authorizations,
        default_visibility: Vec<u8>,
    ) -> Self {
        Self {
            source,
            auths,
            default_visibility,
        }
    }

    fn skip_denied(&mut self) -> Result<(), CelldbError> {
        while self.source.has_top() {
            let key = &self.source.top()?.key;
            let label = if key.visibility.is_empty() {
                self.default_visibility.as_slice()
            } else {
                key.visibility.as_slice()
            };
            if is_visible(label, &self.auths)? {
                break;
            }
            self.source.next()?;
        }
        Ok(())
    }
}

impl CellIter for VisibilityFilter {
    fn seek(&mut self, range: &ScanRange) -> Result<(), CelldbError> {
        self.source.seek(range)?;
        self.skip_denied()
    }

    fn next(&mut self) -> Result<(), CelldbError> {
        self.source.next()?;
        self.skip_denied()
    }

    fn has_top(&self) -> bool {
        self.source.has_top()
    }

    fn top(&self) -> Result<&Cell, CelldbError> {
        self.source.top()
    }
}

/// Keeps only the newest surviving entry per (row, family, qualifier,
/// visibility) group. Terminal stage; skipped entirely for tables retaining
/// all versions.
pub struct VersionResolver {
    source: Box<dyn CellIter>,
    current_group: Option<CellKey>,
}

impl VersionResolver {
    pub fn new(source: Box<dyn CellIter>) -> Self {
        Self {
            source,
            current_group: None,
        }
    }

    fn skip_older_versions(&mut self) -> Result<(), CelldbError> {
        while self.source.has_top() {
            let key = self.source.top()?.key.clone();
            let same_group = self
                .current_group
                .as_ref()
                .is_some_and(|g| g.same_column(&key));
            if !same_group {
                self.current_group = Some(key);
                break;
            }
            self.source.next()?;
        }
        Ok(())
    }
}

impl CellIter for VersionResolver {
    fn seek(&mut self, range: &ScanRange) -> Result<(), CelldbError> {
        self.current_group = None;
        self.source.seek(range)?;
        self.skip_older_versions()
    }

    fn next(&mut self) -> Result<(), CelldbError> {
        self.source.next()?;
        self.skip_older_versions()
    }

    fn has_top(&self) -> bool {
        self.source.has_top()
    }

    fn top(&self) -> Result<&Cell, CelldbError> {
        self.source.top()
    }
}
