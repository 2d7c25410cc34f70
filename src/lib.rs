//! In-process emulation of a sorted, cell-versioned key-value store with
//! label-based visibility.
//!
//! The engine models the client-facing behavior of a distributed tablet
//! store without any of its distribution: every table is a sorted in-memory
//! map of versioned cells, deletes are tombstone insertions resolved at scan
//! time, and reads run through a composable pipeline that applies deletes,
//! column restrictions, the visibility check and version limiting in a fixed
//! order. Splits and merges are pure metadata.
//!
//! ```
//! use celldb::{CelldbConfig, CelldbInstance, Mutation, ScanRange};
//!
//! let instance = CelldbInstance::open(CelldbConfig::default()).unwrap();
//! let client = instance.client("alice");
//! client.table_ops().create("demo").unwrap();
//!
//! let mut writer = client.create_batch_writer("demo").unwrap();
//! let mut m = Mutation::new("row1");
//! m.put("cf", "greeting", "", "hello");
//! writer.add_mutation(m).unwrap();
//! writer.close().unwrap();
//!
//! let mut scanner = client.create_scanner("demo").unwrap();
//! scanner.set_range(ScanRange::row("row1"));
//! let cells: Vec<_> = scanner.iter().collect::<Result<_, _>>().unwrap();
//! assert_eq!(cells[0].value, b"hello");
//! ```

pub mod admin;
pub mod config;
pub mod data;
pub mod error;
pub mod scan;
pub mod security;
pub mod storage;
pub mod table;
pub mod write;

pub use crate::admin::{NamespaceOps, TableOps};
pub use crate::config::{CelldbConfig, TimeMode};
pub use crate::data::{Cell, CellKey, ColumnUpdate, Mutation, ScanRange, UpdateKind};
pub use crate::error::{CelldbError, CelldbErrorCode, ResourceType};
pub use crate::scan::{BatchScanner, CellIter, ScanIter, Scanner, StageFactory};
pub use crate::security::SecurityOps;
pub use crate::table::{Namespace, Table, SCAN_DEFAULT_VISIBILITY};
pub use crate::write::{BatchDeleter, BatchWriter, MultiTableBatchWriter};

use crate::config::validate_config;
use crate::security::{Authorizations, SystemPermission, User};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::info;

/// Principal seeded into every fresh instance with an empty token and full
/// system permissions.
pub const ROOT_USER: &str = "root";

/// Shared registries behind one instance: tables, namespaces, users and
/// system-level properties. All access goes through the instance or the
/// borrowed ops facades; there are no ambient singletons.
pub(crate) struct Registry {
    pub(crate) tables: RwLock<HashMap<String, Arc<Table>>>,
    pub(crate) namespaces: RwLock<HashMap<String, Arc<table::Namespace>>>,
    pub(crate) users: RwLock<HashMap<String, User>>,
    pub(crate) system_properties: RwLock<HashMap<String, String>>,
    table_ids: AtomicU32,
    default_time_mode: TimeMode,
}

impl Registry {
    fn new(default_time_mode: TimeMode) -> Self {
        let mut root = User::new(ROOT_USER, Vec::new());
        root.system_permissions = [
            SystemPermission::System,
            SystemPermission::CreateTable,
            SystemPermission::DropTable,
            SystemPermission::AlterTable,
            SystemPermission::CreateUser,
            SystemPermission::DropUser,
            SystemPermission::AlterUser,
            SystemPermission::CreateNamespace,
            SystemPermission::DropNamespace,
            SystemPermission::Grant,
        ]
        .into_iter()
        .collect();

        let namespaces = HashMap::from([(
            String::new(),
            Arc::new(table::Namespace::new(String::new())),
        )]);
        Self {
            tables: RwLock::new(HashMap::new()),
            namespaces: RwLock::new(namespaces),
            users: RwLock::new(HashMap::from([(ROOT_USER.to_string(), root)])),
            system_properties: RwLock::new(HashMap::new()),
            table_ids: AtomicU32::new(0),
            default_time_mode,
        }
    }

    pub(crate) fn table(&self, name: &str) -> Result<Arc<Table>, CelldbError> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CelldbError::table_not_found(name))
    }

    pub(crate) fn namespace(&self, name: &str) -> Result<Arc<table::Namespace>, CelldbError> {
        self.namespaces
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CelldbError::namespace_not_found(name))
    }

    pub(crate) fn next_table_id(&self) -> u32 {
        self.table_ids.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn default_time_mode(&self) -> TimeMode {
        self.default_time_mode
    }

    fn ensure_user(&self, principal: &str) {
        let mut users = self.users.write();
        if !users.contains_key(principal) {
            users.insert(principal.to_string(), User::new(principal, Vec::new()));
        }
    }
}

/// One engine instance. Owns the registries; hand out [`Client`] handles to
/// interact with it.
pub struct CelldbInstance {
    config: CelldbConfig,
    registry: Registry,
}

impl CelldbInstance {
    pub fn open(config: CelldbConfig) -> Result<Self, CelldbError> {
        validate_config(&config)?;
        info!(instance = %config.instance_name, "instance opened");
        let registry = Registry::new(config.default_time_mode);
        Ok(Self { config, registry })
    }

    pub fn instance_name(&self) -> &str {
        &self.config.instance_name
    }

    /// A handle acting as `principal`. The user is created with an empty
    /// token on first contact if it does not exist yet.
    pub fn client(&self, principal: &str) -> Client<'_> {
        self.registry.ensure_user(principal);
        Client {
            instance: self,
            principal: principal.to_string(),
        }
    }

    pub fn set_system_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.registry
            .system_properties
            .write()
            .insert(key.into(), value.into());
    }

    pub fn remove_system_property(&self, key: &str) {
        self.registry.system_properties.write().remove(key);
    }

    pub fn system_properties(&self) -> HashMap<String, String> {
        self.registry.system_properties.read().clone()
    }
}

/// Per-principal facade over one instance. Scans use the principal's stored
/// authorizations unless an explicit set is given.
pub struct Client<'a> {
    instance: &'a CelldbInstance,
    principal: String,
}

impl<'a> Client<'a> {
    pub fn whoami(&self) -> &str {
        &self.principal
    }

    pub fn table_ops(&self) -> TableOps<'a> {
        TableOps::new(&self.instance.registry)
    }

    pub fn namespace_ops(&self) -> NamespaceOps<'a> {
        NamespaceOps::new(&self.instance.registry)
    }

    pub fn security_ops(&self) -> SecurityOps<'a> {
        SecurityOps::new(&self.instance.registry)
    }

    fn scan_auths(&self) -> Result<Authorizations, CelldbError> {
        self.security_ops().get_user_authorizations(&self.principal)
    }

    pub fn create_scanner(&self, table: &str) -> Result<Scanner, CelldbError> {
        let auths = self.scan_auths()?;
        self.create_scanner_with_auths(table, auths)
    }

    pub fn create_scanner_with_auths(
        &self,
        table: &str,
        auths: Authorizations,
    ) -> Result<Scanner, CelldbError> {
        Ok(self.instance.registry.table(table)?.scanner(auths))
    }

    pub fn create_batch_scanner(
        &self,
        table: &str,
        ranges: Vec<ScanRange>,
    ) -> Result<BatchScanner, CelldbError> {
        let auths = self.scan_auths()?;
        Ok(self
            .instance
            .registry
            .table(table)?
            .batch_scanner(auths, ranges))
    }

    pub fn create_batch_writer(&self, table: &str) -> Result<BatchWriter, CelldbError> {
        let handle = self.instance.registry.table(table)?;
        Ok(BatchWriter::new(
            handle,
            self.instance.config.writer_buffer_mutations,
        ))
    }

    pub fn create_multi_table_batch_writer(&self) -> MultiTableBatchWriter<'a> {
        MultiTableBatchWriter::new(
            &self.instance.registry,
            self.instance.config.writer_buffer_mutations,
        )
    }

    pub fn create_batch_deleter(
        &self,
        table: &str,
        ranges: Vec<ScanRange>,
    ) -> Result<BatchDeleter, CelldbError> {
        let auths = self.scan_auths()?;
        Ok(BatchDeleter::new(
            self.instance.registry.table(table)?,
            auths,
            ranges,
            self.instance.config.writer_buffer_mutations,
        ))
    }

    /// Conditional writes require server-side compare-and-set the emulation
    /// does not model.
    pub fn create_conditional_writer(&self, _table: &str) -> Result<(), CelldbError> {
        Err(CelldbError::Unsupported("conditional writer"))
    }

    pub fn replication_ops(&self) -> Result<(), CelldbError> {
        Err(CelldbError::Unsupported("replication operations"))
    }
}
