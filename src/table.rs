//! Table and namespace state: the cell store, property maps, split-point
//! metadata, locality groups, and the per-table clock that fills in
//! timestamps for updates that do not carry one.

use crate::config::TimeMode;
use crate::data::{CellKey, Mutation, ScanRange, UpdateKind};
use crate::scan::{BatchScanner, Scanner};
use crate::security::Authorizations;
use crate::storage::CellStore;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Property consulted for cells with an empty visibility label. Resolved
/// like any other property: the table map overrides the namespace map.
pub const SCAN_DEFAULT_VISIBILITY: &str = "table.security.scan.visibility.default";

/// A namespace is a property map that its member tables inherit from, plus
/// the name used to qualify those tables.
#[derive(Debug)]
pub struct Namespace {
    name: RwLock<String>,
    properties: RwLock<HashMap<String, String>>,
}

impl Namespace {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: RwLock::new(name.into()),
            properties: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.name.write() = name;
    }

    pub fn property(&self, key: &str) -> Option<String> {
        self.properties.read().get(key).cloned()
    }

    pub fn properties(&self) -> HashMap<String, String> {
        self.properties.read().clone()
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(key.into(), value.into());
    }

    pub fn remove_property(&self, key: &str) {
        self.properties.write().remove(key);
    }
}

/// Source of default timestamps for one table.
#[derive(Debug)]
enum TableClock {
    /// Wall-clock milliseconds, clamped so assigned values never decrease.
    Millis { last: i64 },
    /// Counter that ticks once per applied mutation.
    Logical { next: i64 },
}

impl TableClock {
    fn new(mode: TimeMode) -> Self {
        match mode {
            TimeMode::Millis => TableClock::Millis { last: 0 },
            TimeMode::Logical => TableClock::Logical { next: 0 },
        }
    }

    fn tick(&mut self) -> i64 {
        match self {
            TableClock::Millis { last } => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as i64)
                    .unwrap_or(0);
                *last = now.max(*last);
                *last
            }
            TableClock::Logical { next } => {
                let t = *next;
                *next += 1;
                t
            }
        }
    }
}

/// One table: a shared cell store plus its metadata. Renaming a table keeps
/// this structure (and the store behind it) intact; only the registry key
/// and the stored name change.
pub struct Table {
    name: RwLock<String>,
    id: u32,
    namespace: Arc<Namespace>,
    store: Arc<CellStore>,
    properties: RwLock<HashMap<String, String>>,
    locality_groups: RwLock<HashMap<String, BTreeSet<Vec<u8>>>>,
    splits: RwLock<BTreeSet<Vec<u8>>>,
    versioning: AtomicBool,
    clock: Mutex<TableClock>,
}

impl Table {
    pub(crate) fn new(
        name: impl Into<String>,
        id: u32,
        namespace: Arc<Namespace>,
        time_mode: TimeMode,
    ) -> Self {
        Self {
            name: RwLock::new(name.into()),
            id,
            namespace,
            store: Arc::new(CellStore::new()),
            properties: RwLock::new(HashMap::new()),
            locality_groups: RwLock::new(HashMap::new()),
            splits: RwLock::new(BTreeSet::new()),
            versioning: AtomicBool::new(true),
            clock: Mutex::new(TableClock::new(time_mode)),
        }
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.name.write() = name;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    pub fn store(&self) -> &Arc<CellStore> {
        &self.store
    }

    /// Commits one stored cell per column update. Updates without a
    /// timestamp share one default drawn from the table clock. Empty
    /// mutations are no-ops and do not tick a logical clock.
    pub fn apply_mutation(&self, mutation: &Mutation) {
        if mutation.is_empty() {
            return;
        }
        let default_ts = self.clock.lock().tick();
        for update in mutation.updates() {
            let key = CellKey::new(
                mutation.row(),
                update.family.clone(),
                update.qualifier.clone(),
                update.visibility.clone(),
                update.timestamp.unwrap_or(default_ts),
            );
            match &update.kind {
                UpdateKind::Put(value) => self.store.put(key, value.clone()),
                UpdateKind::Delete => self.store.put_delete(key),
            }
        }
    }

    pub fn scanner(self: &Arc<Self>, auths: Authorizations) -> Scanner {
        Scanner::new(Arc::clone(self), auths)
    }

    pub fn batch_scanner(
        self: &Arc<Self>,
        auths: Authorizations,
        ranges: Vec<ScanRange>,
    ) -> BatchScanner {
        BatchScanner::new(Arc::clone(self), auths, ranges)
    }

    /// Table property if set, else the namespace property of the same key.
    pub fn resolved_property(&self, key: &str) -> Option<String> {
        self.properties
            .read()
            .get(key)
            .cloned()
            .or_else(|| self.namespace.property(key))
    }

    /// Flat view of the effective properties: namespace entries overridden
    /// by table entries.
    pub fn resolved_properties(&self) -> HashMap<String, String> {
        let mut merged = self.namespace.properties();
        merged.extend(self.properties.read().clone());
        merged
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(key.into(), value.into());
    }

    pub fn remove_property(&self, key: &str) {
        self.properties.write().remove(key);
    }

    pub(crate) fn effective_default_visibility(&self) -> Vec<u8> {
        self.resolved_property(SCAN_DEFAULT_VISIBILITY)
            .map(String::into_bytes)
            .unwrap_or_default()
    }

    /// True when scans keep only the newest surviving version per column
    /// group. On by default; turn off to retain every version.
    pub fn versioning(&self) -> bool {
        self.versioning.load(Ordering::Relaxed)
    }

    pub fn set_versioning(&self, on: bool) {
        self.versioning.store(on, Ordering::Relaxed);
    }

    pub fn add_splits(&self, rows: impl IntoIterator<Item = Vec<u8>>) {
        self.splits.write().extend(rows);
    }

    pub fn splits(&self) -> Vec<Vec<u8>> {
        self.splits.read().iter().cloned().collect()
    }

    /// Removes split points in the half-open row interval `[start, end)`.
    /// Cells are untouched; splits are pure metadata.
    pub fn merge(&self, start: Option<&[u8]>, end: Option<&[u8]>) {
        self.splits.write().retain(|point| {
            let after_start = start.is_none_or(|s| point.as_slice() >= s);
            let before_end = end.is_none_or(|e| point.as_slice() < e);
            !(after_start && before_end)
        });
    }

    pub fn set_locality_groups(&self, groups: HashMap<String, BTreeSet<Vec<u8>>>) {
        *self.locality_groups.write() = groups;
    }

    pub fn locality_groups(&self) -> HashMap<String, BTreeSet<Vec<u8>>> {
        self.locality_groups.read().clone()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name())
            .field("id", &self.id)
            .field("cells", &self.store.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Namespace, Table};
    use crate::config::TimeMode;
    use crate::data::Mutation;
    use std::sync::Arc;

    fn logical_table() -> Table {
        Table::new(
            "t",
            1,
            Arc::new(Namespace::new("default")),
            TimeMode::Logical,
        )
    }

    #[test]
    fn logical_clock_ticks_once_per_mutation() {
        let table = logical_table();
        let mut first = Mutation::new("r1");
        first.put("cf", "a", "", "1");
        first.put("cf", "b", "", "2");
        let mut second = Mutation::new("r2");
        second.put("cf", "a", "", "3");
        table.apply_mutation(&first);
        table.apply_mutation(&second);
        let store = table.store();
        let mut cursor = crate::storage::StoreCursor::new(Arc::clone(store));
        use crate::scan::CellIter;
        cursor.seek(&crate::data::ScanRange::all()).unwrap();
        let mut stamps = Vec::new();
        while cursor.has_top() {
            stamps.push(cursor.top().unwrap().key.timestamp);
            cursor.next().unwrap();
        }
        // Both updates of the first mutation share tick 0, the second gets 1.
        assert_eq!(stamps, vec![0, 0, 1]);
    }

    #[test]
    fn empty_mutation_is_a_no_op() {
        let table = logical_table();
        table.apply_mutation(&Mutation::new("r"));
        assert!(table.store().is_empty());
        let mut m = Mutation::new("r");
        m.put("cf", "q", "", "v");
        table.apply_mutation(&m);
        // The empty mutation did not consume a logical tick.
        let mut cursor = crate::storage::StoreCursor::new(Arc::clone(table.store()));
        use crate::scan::CellIter;
        cursor.seek(&crate::data::ScanRange::all()).unwrap();
        assert_eq!(cursor.top().unwrap().key.timestamp, 0);
    }

    #[test]
    fn table_property_overrides_namespace_property() {
        let ns = Arc::new(Namespace::new("ns"));
        ns.set_property("shared", "from-namespace");
        ns.set_property("only-ns", "ns-value");
        let table = Table::new("ns.t", 1, ns, TimeMode::Millis);
        table.set_property("shared", "from-table");
        assert_eq!(
            table.resolved_property("shared").as_deref(),
            Some("from-table")
        );
        assert_eq!(
            table.resolved_property("only-ns").as_deref(),
            Some("ns-value")
        );
        let flat = table.resolved_properties();
        assert_eq!(flat.get("shared").map(String::as_str), Some("from-table"));
    }

    #[test]
    fn merge_removes_half_open_split_interval() {
        let table = logical_table();
        table.add_splits([b"b".to_vec(), b"d".to_vec(), b"f".to_vec()]);
        table.merge(Some(b"b"), Some(b"f"));
        assert_eq!(table.splits(), vec![b"f".to_vec()]);
    }
}
