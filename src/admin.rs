//! Administrative surfaces for tables and namespaces.
//!
//! Both are thin borrowed views over the instance registry; nothing here
//! holds state of its own.

use crate::config::TimeMode;
use crate::data::ScanRange;
use crate::error::{CelldbError, ResourceType};
use crate::security::Authorizations;
use crate::table::{Namespace, Table};
use crate::Registry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// Namespace portion of a qualified table name; an unqualified name belongs
/// to the default (empty) namespace.
pub(crate) fn namespace_of(table_name: &str) -> &str {
    match table_name.find('.') {
        Some(index) => &table_name[..index],
        None => "",
    }
}

pub struct TableOps<'a> {
    registry: &'a Registry,
}

impl<'a> TableOps<'a> {
    pub(crate) fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    fn lookup(&self, name: &str) -> Result<Arc<Table>, CelldbError> {
        self.registry.table(name)
    }

    /// Direct handle to the table, for callers that want to hold it across
    /// renames.
    pub fn table(&self, name: &str) -> Result<Arc<Table>, CelldbError> {
        self.lookup(name)
    }

    pub fn create(&self, name: &str) -> Result<Arc<Table>, CelldbError> {
        self.create_with_time_mode(name, self.registry.default_time_mode())
    }

    pub fn create_with_time_mode(
        &self,
        name: &str,
        time_mode: TimeMode,
    ) -> Result<Arc<Table>, CelldbError> {
        if name.is_empty() {
            return Err(CelldbError::Validation("table name must not be empty".into()));
        }
        let namespace = self.registry.namespace(namespace_of(name))?;
        let mut tables = self.registry.tables.write();
        if tables.contains_key(name) {
            return Err(CelldbError::AlreadyExists {
                resource_type: ResourceType::Table,
                resource_id: name.to_string(),
            });
        }
        let id = self.registry.next_table_id();
        let table = Arc::new(Table::new(name, id, namespace, time_mode));
        tables.insert(name.to_string(), Arc::clone(&table));
        info!(table = name, id, "table created");
        Ok(table)
    }

    pub fn delete(&self, name: &str) -> Result<(), CelldbError> {
        let removed = self.registry.tables.write().remove(name);
        match removed {
            Some(table) => {
                warn!(table = name, cells = table.store().len(), "table dropped");
                Ok(())
            }
            None => Err(CelldbError::table_not_found(name)),
        }
    }

    /// Re-keys the table in the registry. The table structure and its cell
    /// store are untouched, so cursors and writers opened against the old
    /// name keep working.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<(), CelldbError> {
        self.registry.namespace(namespace_of(new_name))?;
        let mut tables = self.registry.tables.write();
        if tables.contains_key(new_name) {
            return Err(CelldbError::AlreadyExists {
                resource_type: ResourceType::Table,
                resource_id: new_name.to_string(),
            });
        }
        let table = tables
            .remove(old_name)
            .ok_or_else(|| CelldbError::table_not_found(old_name))?;
        table.set_name(new_name.to_string());
        tables.insert(new_name.to_string(), table);
        info!(from = old_name, to = new_name, "table renamed");
        Ok(())
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn exists(&self, name: &str) -> bool {
        self.registry.tables.read().contains_key(name)
    }

    pub fn set_property(&self, name: &str, key: &str, value: &str) -> Result<(), CelldbError> {
        self.lookup(name)?.set_property(key, value);
        Ok(())
    }

    pub fn remove_property(&self, name: &str, key: &str) -> Result<(), CelldbError> {
        self.lookup(name)?.remove_property(key);
        Ok(())
    }

    /// Effective properties: the namespace map overridden by the table map.
    pub fn properties(&self, name: &str) -> Result<HashMap<String, String>, CelldbError> {
        Ok(self.lookup(name)?.resolved_properties())
    }

    pub fn add_splits(
        &self,
        name: &str,
        rows: impl IntoIterator<Item = Vec<u8>>,
    ) -> Result<(), CelldbError> {
        self.lookup(name)?.add_splits(rows);
        Ok(())
    }

    pub fn list_splits(&self, name: &str) -> Result<Vec<Vec<u8>>, CelldbError> {
        Ok(self.lookup(name)?.splits())
    }

    /// Drops split points in `[start, end)`. Cells are never touched.
    pub fn merge(
        &self,
        name: &str,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<(), CelldbError> {
        self.lookup(name)?.merge(start, end);
        Ok(())
    }

    /// Physically removes every cell whose row is in `[start, end)`; both
    /// bounds `None` empties the table.
    pub fn delete_rows(
        &self,
        name: &str,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<(), CelldbError> {
        let table = self.lookup(name)?;
        warn!(table = name, "deleting row range");
        table.store().delete_rows(start, end);
        Ok(())
    }

    /// Greatest row in the bounded interval holding at least one cell
    /// visible under `auths`. Walks distinct rows downward from the top of
    /// the interval, probing each with a single-row scan.
    pub fn find_max(
        &self,
        name: &str,
        auths: &Authorizations,
        lower: Option<(&[u8], bool)>,
        upper: Option<(&[u8], bool)>,
    ) -> Result<Option<Vec<u8>>, CelldbError> {
        let table = self.lookup(name)?;
        let within_lower = |row: &Vec<u8>| match lower {
            None => true,
            Some((bound, true)) => row.as_slice() >= bound,
            Some((bound, false)) => row.as_slice() > bound,
        };
        let mut candidate = table.store().max_row_in(lower, upper);
        while let Some(row) = candidate {
            let mut scanner = table.scanner(auths.clone());
            scanner.set_range(ScanRange::row(row.clone()));
            match scanner.iter().next() {
                Some(Ok(_)) => return Ok(Some(row)),
                Some(Err(err)) => return Err(err),
                None => {}
            }
            candidate = table.store().prev_row(&row).filter(|prev| within_lower(prev));
        }
        Ok(None)
    }

    pub fn set_versioning(&self, name: &str, on: bool) -> Result<(), CelldbError> {
        self.lookup(name)?.set_versioning(on);
        Ok(())
    }

    /// Locality groups are recorded but have no effect on scan behavior in
    /// a memory-resident engine.
    pub fn set_locality_groups(
        &self,
        name: &str,
        groups: HashMap<String, BTreeSet<Vec<u8>>>,
    ) -> Result<(), CelldbError> {
        self.lookup(name)?.set_locality_groups(groups);
        Ok(())
    }

    pub fn locality_groups(
        &self,
        name: &str,
    ) -> Result<HashMap<String, BTreeSet<Vec<u8>>>, CelldbError> {
        Ok(self.lookup(name)?.locality_groups())
    }

    /// Compaction is meaningless for a memory-resident store; the plain
    /// form validates the table and returns.
    pub fn compact(&self, name: &str) -> Result<(), CelldbError> {
        self.lookup(name)?;
        Ok(())
    }

    pub fn compact_with_stages(&self, name: &str) -> Result<(), CelldbError> {
        self.lookup(name)?;
        Err(CelldbError::Unsupported("compaction with configured stages"))
    }

    pub fn clone_table(&self, _source: &str, _target: &str) -> Result<(), CelldbError> {
        Err(CelldbError::Unsupported("table clone"))
    }

    pub fn export_table(&self, _name: &str) -> Result<(), CelldbError> {
        Err(CelldbError::Unsupported("table export"))
    }

    pub fn import_table(&self, _name: &str) -> Result<(), CelldbError> {
        Err(CelldbError::Unsupported("table import"))
    }
}

pub struct NamespaceOps<'a> {
    registry: &'a Registry,
}

impl<'a> NamespaceOps<'a> {
    pub(crate) fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn create(&self, name: &str) -> Result<(), CelldbError> {
        if name.is_empty() {
            return Err(CelldbError::Validation(
                "the default namespace already exists".into(),
            ));
        }
        let mut namespaces = self.registry.namespaces.write();
        if namespaces.contains_key(name) {
            return Err(CelldbError::AlreadyExists {
                resource_type: ResourceType::Namespace,
                resource_id: name.to_string(),
            });
        }
        namespaces.insert(name.to_string(), Arc::new(Namespace::new(name)));
        info!(namespace = name, "namespace created");
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<(), CelldbError> {
        if name.is_empty() {
            return Err(CelldbError::Validation(
                "the default namespace cannot be deleted".into(),
            ));
        }
        if !self.tables_in(name).is_empty() {
            return Err(CelldbError::NamespaceNotEmpty {
                namespace: name.to_string(),
            });
        }
        match self.registry.namespaces.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(CelldbError::namespace_not_found(name)),
        }
    }

    /// Renames the namespace and re-keys every member table under the new
    /// qualifier. Table structures and stores are untouched.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<(), CelldbError> {
        if old_name.is_empty() || new_name.is_empty() {
            return Err(CelldbError::Validation(
                "the default namespace cannot be renamed".into(),
            ));
        }
        let mut namespaces = self.registry.namespaces.write();
        if namespaces.contains_key(new_name) {
            return Err(CelldbError::AlreadyExists {
                resource_type: ResourceType::Namespace,
                resource_id: new_name.to_string(),
            });
        }
        let namespace = namespaces
            .remove(old_name)
            .ok_or_else(|| CelldbError::namespace_not_found(old_name))?;
        namespace.set_name(new_name.to_string());
        namespaces.insert(new_name.to_string(), namespace);
        drop(namespaces);

        let mut tables = self.registry.tables.write();
        let member_names: Vec<String> = tables
            .keys()
            .filter(|table_name| namespace_of(table_name) == old_name)
            .cloned()
            .collect();
        for table_name in member_names {
            if let Some(table) = tables.remove(&table_name) {
                let renamed = format!(
                    "{new_name}.{}",
                    &table_name[old_name.len() + 1..]
                );
                table.set_name(renamed.clone());
                tables.insert(renamed, table);
            }
        }
        info!(from = old_name, to = new_name, "namespace renamed");
        Ok(())
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.namespaces.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn exists(&self, name: &str) -> bool {
        self.registry.namespaces.read().contains_key(name)
    }

    fn tables_in(&self, name: &str) -> Vec<String> {
        self.registry
            .tables
            .read()
            .keys()
            .filter(|table_name| namespace_of(table_name) == name)
            .cloned()
            .collect()
    }

    pub fn set_property(&self, name: &str, key: &str, value: &str) -> Result<(), CelldbError> {
        self.registry.namespace(name)?.set_property(key, value);
        Ok(())
    }

    pub fn remove_property(&self, name: &str, key: &str) -> Result<(), CelldbError> {
        self.registry.namespace(name)?.remove_property(key);
        Ok(())
    }

    pub fn properties(&self, name: &str) -> Result<HashMap<String, String>, CelldbError> {
        Ok(self.registry.namespace(name)?.properties())
    }
}
