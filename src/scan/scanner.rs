//! Scanner facades: assemble the stage chain for one table and drive it as
//! a Rust iterator of `Result<Cell, _>`.

use crate::data::{Cell, ScanRange};
use crate::error::CelldbError;
use crate::scan::stages::{
    DeleteResolver, FamilySkipper, QualifierFilter, VersionResolver, VisibilityFilter,
};
use crate::scan::{CellIter, StageFactory};
use crate::security::Authorizations;
use crate::storage::StoreCursor;
use crate::table::Table;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Everything needed to build one pipeline instance. Batch scanning clones
/// this once per range so every range gets an independent chain.
#[derive(Clone)]
struct PipelineConfig {
    table: Arc<Table>,
    auths: Authorizations,
    whole_families: BTreeSet<Vec<u8>>,
    columns: BTreeSet<(Vec<u8>, Vec<u8>)>,
    injected: Vec<Arc<dyn StageFactory>>,
}

impl PipelineConfig {
    fn new(table: Arc<Table>, auths: Authorizations) -> Self {
        Self {
            table,
            auths,
            whole_families: BTreeSet::new(),
            columns: BTreeSet::new(),
            injected: Vec::new(),
        }
    }

    /// Stage order is fixed: delete resolution, family skipping, qualifier
    /// filtering, visibility filtering, injected stages in injection order,
    /// version limiting on top.
    fn build(&self) -> Box<dyn CellIter> {
        let mut families = self.whole_families.clone();
        families.extend(self.columns.iter().map(|(family, _)| family.clone()));

        let mut chain: Box<dyn CellIter> = Box::new(DeleteResolver::new(Box::new(
            StoreCursor::new(Arc::clone(self.table.store())),
        )));
        if !families.is_empty() {
            chain = Box::new(FamilySkipper::new(chain, families));
        }
        if !self.columns.is_empty() {
            chain = Box::new(QualifierFilter::new(
                chain,
                self.whole_families.clone(),
                self.columns.clone(),
            ));
        }
        chain = Box::new(VisibilityFilter::new(
            chain,
            self.auths.clone(),
            self.table.effective_default_visibility(),
        ));
        for factory in &self.injected {
            chain = factory.wrap(chain);
        }
        if self.table.versioning() {
            chain = Box::new(VersionResolver::new(chain));
        }
        debug!(
            table = %self.table.name(),
            injected = self.injected.len(),
            "scan pipeline assembled"
        );
        chain
    }

    fn open(&self, range: ScanRange) -> ScanIter {
        ScanIter {
            pipeline: self.build(),
            pending_seek: Some(range),
            done: false,
        }
    }
}

/// Single-range scanner over one table.
///
/// Configure the range, fetched columns and injected stages, then iterate.
/// Each call to [`Scanner::iter`] builds a fresh pipeline against the
/// table's current configuration.
pub struct Scanner {
    config: PipelineConfig,
    range: ScanRange,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    pub(crate) fn new(table: Arc<Table>, auths: Authorizations) -> Self {
        Self {
            config: PipelineConfig::new(table, auths),
            range: ScanRange::all(),
        }
    }

    pub fn set_range(&mut self, range: ScanRange) -> &mut Self {
        self.range = range;
        self
    }

    /// Restricts the scan to the given family (all qualifiers).
    pub fn fetch_column_family(&mut self, family: impl Into<Vec<u8>>) -> &mut Self {
        self.config.whole_families.insert(family.into());
        self
    }

    /// Restricts the scan to one (family, qualifier) column.
    pub fn fetch_column(
        &mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.config.columns.insert((family.into(), qualifier.into()));
        self
    }

    /// Adds a caller-supplied stage above the built-in filters. Stages are
    /// applied in injection order.
    pub fn inject_stage(&mut self, factory: Arc<dyn StageFactory>) -> &mut Self {
        self.config.injected.push(factory);
        self
    }

    pub fn iter(&self) -> ScanIter {
        self.config.open(self.range.clone())
    }
}

impl<'a> IntoIterator for &'a Scanner {
    type Item = Result<Cell, CelldbError>;
    type IntoIter = ScanIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Multi-range scanner: each range gets its own pipeline, results are
/// concatenated lazily in range-list order. Ordering across ranges is not
/// part of the contract; ordering within one range is.
pub struct BatchScanner {
    config: PipelineConfig,
    ranges: Vec<ScanRange>,
}

impl BatchScanner {
    pub(crate) fn new(table: Arc<Table>, auths: Authorizations, ranges: Vec<ScanRange>) -> Self {
        Self {
            config: PipelineConfig::new(table, auths),
            ranges,
        }
    }

    pub fn set_ranges(&mut self, ranges: Vec<ScanRange>) -> &mut Self {
        self.ranges = ranges;
        self
    }

    pub fn fetch_column_family(&mut self, family: impl Into<Vec<u8>>) -> &mut Self {
        self.config.whole_families.insert(family.into());
        self
    }

    pub fn fetch_column(
        &mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.config.columns.insert((family.into(), qualifier.into()));
        self
    }

    pub fn inject_stage(&mut self, factory: Arc<dyn StageFactory>) -> &mut Self {
        self.config.injected.push(factory);
        self
    }

    pub fn iter(&self) -> BatchScanIter {
        BatchScanIter {
            config: self.config.clone(),
            ranges: self.ranges.clone().into_iter(),
            current: None,
        }
    }
}

impl<'a> IntoIterator for &'a BatchScanner {
    type Item = Result<Cell, CelldbError>;
    type IntoIter = BatchScanIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over one pipeline instance. The underlying chain is seeked on
/// the first `next` call; a pipeline error ends the iteration after being
/// yielded once.
pub struct ScanIter {
    pipeline: Box<dyn CellIter>,
    pending_seek: Option<ScanRange>,
    done: bool,
}

impl Iterator for ScanIter {
    type Item = Result<Cell, CelldbError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = match self.pending_seek.take() {
            Some(range) => self.pipeline.seek(&range),
            None => self.pipeline.next(),
        };
        if let Err(err) = step {
            self.done = true;
            return Some(Err(err));
        }
        if !self.pipeline.has_top() {
            self.done = true;
            return None;
        }
        Some(self.pipeline.top().map(Cell::clone))
    }
}

pub struct BatchScanIter {
    config: PipelineConfig,
    ranges: std::vec::IntoIter<ScanRange>,
    current: Option<ScanIter>,
}

impl Iterator for BatchScanIter {
    type Item = Result<Cell, CelldbError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = &mut self.current {
                if let Some(item) = current.next() {
                    return Some(item);
                }
                self.current = None;
            }
            let range = self.ranges.next()?;
            self.current = Some(self.config.open(range));
        }
    }
}
