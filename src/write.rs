//! Write paths: buffered mutation writers and the range deleter.

use crate::data::{Mutation, ScanRange};
use crate::error::CelldbError;
use crate::security::Authorizations;
use crate::table::Table;
use crate::Registry;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Buffers mutations for one table and applies them on `flush`. The buffer
/// flushes implicitly when it reaches the configured limit, and on drop, so
/// an abandoned writer never silently loses accepted mutations.
pub struct BatchWriter {
    table: Arc<Table>,
    buffer: Vec<Mutation>,
    max_buffered: usize,
    closed: bool,
}

impl std::fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("buffered", &self.buffer.len())
            .field("max_buffered", &self.max_buffered)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl BatchWriter {
    pub(crate) fn new(table: Arc<Table>, max_buffered: usize) -> Self {
        Self {
            table,
            buffer: Vec::new(),
            max_buffered,
            closed: false,
        }
    }

    pub fn add_mutation(&mut self, mutation: Mutation) -> Result<(), CelldbError> {
        if self.closed {
            return Err(CelldbError::WriterClosed);
        }
        self.buffer.push(mutation);
        if self.buffer.len() >= self.max_buffered {
            self.flush()?;
        }
        Ok(())
    }

    pub fn add_mutations(
        &mut self,
        mutations: impl IntoIterator<Item = Mutation>,
    ) -> Result<(), CelldbError> {
        for mutation in mutations {
            self.add_mutation(mutation)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CelldbError> {
        if self.closed {
            return Err(CelldbError::WriterClosed);
        }
        self.apply_buffered();
        Ok(())
    }

    /// Flushes remaining mutations and shuts the writer down. Idempotent;
    /// later writes fail with `WriterClosed`.
    pub fn close(&mut self) -> Result<(), CelldbError> {
        if !self.closed {
            self.apply_buffered();
            self.closed = true;
        }
        Ok(())
    }

    fn apply_buffered(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        debug!(
            table = %self.table.name(),
            mutations = self.buffer.len(),
            "flushing writer buffer"
        );
        for mutation in self.buffer.drain(..) {
            self.table.apply_mutation(&mutation);
        }
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        if !self.closed {
            self.apply_buffered();
        }
    }
}

/// One writer per table behind a single flush/close lifecycle.
pub struct MultiTableBatchWriter<'a> {
    registry: &'a Registry,
    max_buffered: usize,
    writers: HashMap<String, BatchWriter>,
    closed: bool,
}

impl<'a> MultiTableBatchWriter<'a> {
    pub(crate) fn new(registry: &'a Registry, max_buffered: usize) -> Self {
        Self {
            registry,
            max_buffered,
            writers: HashMap::new(),
            closed: false,
        }
    }

    /// The writer for the named table, created on first use.
    pub fn writer(&mut self, table: &str) -> Result<&mut BatchWriter, CelldbError> {
        if self.closed {
            return Err(CelldbError::WriterClosed);
        }
        match self.writers.entry(table.to_string()) {
            Entry::Occupied(occupied) => Ok(occupied.into_mut()),
            Entry::Vacant(vacant) => {
                let handle = self.registry.table(table)?;
                Ok(vacant.insert(BatchWriter::new(handle, self.max_buffered)))
            }
        }
    }

    pub fn flush(&mut self) -> Result<(), CelldbError> {
        if self.closed {
            return Err(CelldbError::WriterClosed);
        }
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), CelldbError> {
        if !self.closed {
            for writer in self.writers.values_mut() {
                writer.close()?;
            }
            self.closed = true;
        }
        Ok(())
    }
}

/// Scans its ranges under the given authorizations and writes a tombstone
/// for every surviving cell, at that cell's own timestamp and visibility.
/// Cells the authorizations cannot see are left alone.
pub struct BatchDeleter {
    table: Arc<Table>,
    auths: Authorizations,
    ranges: Vec<ScanRange>,
    max_buffered: usize,
}

impl BatchDeleter {
    pub(crate) fn new(
        table: Arc<Table>,
        auths: Authorizations,
        ranges: Vec<ScanRange>,
        max_buffered: usize,
    ) -> Self {
        Self {
            table,
            auths,
            ranges,
            max_buffered,
        }
    }

    pub fn set_ranges(&mut self, ranges: Vec<ScanRange>) -> &mut Self {
        self.ranges = ranges;
        self
    }

    pub fn delete(&mut self) -> Result<(), CelldbError> {
        let scanner = self
            .table
            .batch_scanner(self.auths.clone(), self.ranges.clone());
        // Collect before writing so the tombstones cannot perturb the scan.
        let mut doomed = Vec::new();
        for cell in &scanner {
            doomed.push(cell?.key);
        }
        let mut writer = BatchWriter::new(Arc::clone(&self.table), self.max_buffered);
        for key in doomed {
            let mut mutation = Mutation::new(key.row);
            mutation.put_delete_at(key.family, key.qualifier, key.visibility, key.timestamp);
            writer.add_mutation(mutation)?;
        }
        writer.close()
    }
}
