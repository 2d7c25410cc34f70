//! The lazy scan pipeline.
//!
//! Every stage is a [`CellIter`]: seek it to a range, then step with `next`
//! and read the current entry through `top` while `has_top` holds. Stages
//! compose by wrapping a single source iterator, so a full scan is one chain
//! of iterators pulling from a store cursor at the bottom. Nothing is
//! materialized; each entry is produced on demand.

pub mod scanner;
pub mod stages;

pub use scanner::{BatchScanner, ScanIter, Scanner};

use crate::data::{Cell, ScanRange};
use crate::error::CelldbError;

/// One stage of a scan. Implementations move strictly forward in key order
/// within the seeked range; re-seeking is first-class and cheap.
///
/// Calling `top` or `next` before a successful `seek` is an
/// `IllegalScanState` error, as is `next` once the iterator is exhausted.
pub trait CellIter: Send {
    fn seek(&mut self, range: &ScanRange) -> Result<(), CelldbError>;
    fn next(&mut self) -> Result<(), CelldbError>;
    fn has_top(&self) -> bool;
    fn top(&self) -> Result<&Cell, CelldbError>;
}

/// Builds a caller-supplied stage around its source. Injected stages sit
/// between the visibility filter and the version resolver, in injection
/// order, each wrapping the previous stage as its sole source.
pub trait StageFactory: Send + Sync {
    fn wrap(&self, source: Box<dyn CellIter>) -> Box<dyn CellIter>;
}
