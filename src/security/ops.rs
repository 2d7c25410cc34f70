//! User and permission bookkeeping. Grants are recorded and queryable but
//! the engine enforces nothing beyond the visibility check itself.

use crate::error::{CelldbError, ResourceType};
use crate::security::{Authorizations, SystemPermission, TablePermission, User};
use crate::Registry;
use tracing::info;

pub struct SecurityOps<'a> {
    registry: &'a Registry,
}

impl<'a> SecurityOps<'a> {
    pub(crate) fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    fn missing(principal: &str) -> CelldbError {
        CelldbError::NotFound {
            resource_type: ResourceType::User,
            resource_id: principal.to_string(),
        }
    }

    pub fn create_user(&self, principal: &str, token: impl Into<Vec<u8>>) -> Result<(), CelldbError> {
        let mut users = self.registry.users.write();
        if users.contains_key(principal) {
            return Err(CelldbError::AlreadyExists {
                resource_type: ResourceType::User,
                resource_id: principal.to_string(),
            });
        }
        users.insert(principal.to_string(), User::new(principal, token));
        info!(user = principal, "user created");
        Ok(())
    }

    pub fn drop_user(&self, principal: &str) -> Result<(), CelldbError> {
        self.registry
            .users
            .write()
            .remove(principal)
            .map(|_| ())
            .ok_or_else(|| Self::missing(principal))
    }

    pub fn list_users(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.users.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn authenticate_user(
        &self,
        principal: &str,
        token: &[u8],
    ) -> Result<bool, CelldbError> {
        let users = self.registry.users.read();
        let user = users.get(principal).ok_or_else(|| Self::missing(principal))?;
        Ok(user.token == token)
    }

    pub fn change_user_token(
        &self,
        principal: &str,
        token: impl Into<Vec<u8>>,
    ) -> Result<(), CelldbError> {
        let mut users = self.registry.users.write();
        let user = users
            .get_mut(principal)
            .ok_or_else(|| Self::missing(principal))?;
        user.token = token.into();
        Ok(())
    }

    pub fn get_user_authorizations(&self, principal: &str) -> Result<Authorizations, CelldbError> {
        let users = self.registry.users.read();
        let user = users.get(principal).ok_or_else(|| Self::missing(principal))?;
        Ok(user.authorizations.clone())
    }

    pub fn change_user_authorizations(
        &self,
        principal: &str,
        auths: Authorizations,
    ) -> Result<(), CelldbError> {
        let mut users = self.registry.users.write();
        let user = users
            .get_mut(principal)
            .ok_or_else(|| Self::missing(principal))?;
        user.authorizations = auths;
        Ok(())
    }

    pub fn grant_system_permission(
        &self,
        principal: &str,
        permission: SystemPermission,
    ) -> Result<(), CelldbError> {
        let mut users = self.registry.users.write();
        let user = users
            .get_mut(principal)
            .ok_or_else(|| Self::missing(principal))?;
        user.system_permissions.insert(permission);
        Ok(())
    }

    pub fn revoke_system_permission(
        &self,
        principal: &str,
        permission: SystemPermission,
    ) -> Result<(), CelldbError> {
        let mut users = self.registry.users.write();
        let user = users
            .get_mut(principal)
            .ok_or_else(|| Self::missing(principal))?;
        user.system_permissions.remove(&permission);
        Ok(())
    }

    pub fn has_system_permission(
        &self,
        principal: &str,
        permission: SystemPermission,
    ) -> Result<bool, CelldbError> {
        let users = self.registry.users.read();
        let user = users.get(principal).ok_or_else(|| Self::missing(principal))?;
        Ok(user.system_permissions.contains(&permission))
    }

    pub fn grant_table_permission(
        &self,
        principal: &str,
        table: &str,
        permission: TablePermission,
    ) -> Result<(), CelldbError> {
        let mut users = self.registry.users.write();
        let user = users
            .get_mut(principal)
            .ok_or_else(|| Self::missing(principal))?;
        user.table_permissions
            .entry(table.to_string())
            .or_default()
            .insert(permission);
        Ok(())
    }

    pub fn revoke_table_permission(
        &self,
        principal: &str,
        table: &str,
        permission: TablePermission,
    ) -> Result<(), CelldbError> {
        let mut users = self.registry.users.write();
        let user = users
            .get_mut(principal)
            .ok_or_else(|| Self::missing(principal))?;
        if let Some(grants) = user.table_permissions.get_mut(table) {
            grants.remove(&permission);
        }
        Ok(())
    }

    pub fn has_table_permission(
        &self,
        principal: &str,
        table: &str,
        permission: TablePermission,
    ) -> Result<bool, CelldbError> {
        let users = self.registry.users.read();
        let user = users.get(principal).ok_or_else(|| Self::missing(principal))?;
        Ok(user
            .table_permissions
            .get(table)
            .is_some_and(|grants| grants.contains(&permission)))
    }
}
