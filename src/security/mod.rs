pub mod ops;
pub mod visibility;

pub use ops::SecurityOps;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// The set of label tokens a principal is permitted to present at scan
/// time. Checked by the visibility evaluator, never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorizations {
    labels: BTreeSet<String>,
}

impl Authorizations {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Authorizations {
    fn from(labels: [S; N]) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

impl FromIterator<String> for Authorizations {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystemPermission {
    System,
    CreateTable,
    DropTable,
    AlterTable,
    CreateUser,
    DropUser,
    AlterUser,
    CreateNamespace,
    DropNamespace,
    Grant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TablePermission {
    Read,
    Write,
    AlterTable,
    DropTable,
    Grant,
}

impl TablePermission {
    pub fn all() -> BTreeSet<TablePermission> {
        [
            TablePermission::Read,
            TablePermission::Write,
            TablePermission::AlterTable,
            TablePermission::DropTable,
            TablePermission::Grant,
        ]
        .into_iter()
        .collect()
    }
}

/// A principal known to the instance: name, credential token bytes, the
/// authorization set it may present, and granted permissions. Permission
/// grants are bookkeeping only; the engine enforces nothing beyond the
/// visibility check itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub token: Vec<u8>,
    pub authorizations: Authorizations,
    pub system_permissions: BTreeSet<SystemPermission>,
    pub table_permissions: HashMap<String, BTreeSet<TablePermission>>,
}

impl User {
    pub fn new(name: impl Into<String>, token: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            authorizations: Authorizations::empty(),
            system_permissions: BTreeSet::new(),
            table_permissions: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Authorizations, TablePermission, User};

    #[test]
    fn authorizations_membership() {
        let auths = Authorizations::from(["alpha", "beta"]);
        assert!(auths.contains("alpha"));
        assert!(!auths.contains("gamma"));
        assert_eq!(auths.iter().count(), 2);
    }

    #[test]
    fn new_user_starts_with_nothing_granted() {
        let user = User::new("scout", b"secret".to_vec());
        assert!(user.authorizations.is_empty());
        assert!(user.system_permissions.is_empty());
        assert!(user.table_permissions.is_empty());
        assert_eq!(TablePermission::all().len(), 5);
    }
}
