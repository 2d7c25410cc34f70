use serde::{Deserialize, Serialize};

/// What a single column update does to its coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    Put(Vec<u8>),
    Delete,
}

/// One column edit inside a mutation. A `None` timestamp is filled in from
/// the table's time mode when the mutation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnUpdate {
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub visibility: Vec<u8>,
    pub timestamp: Option<i64>,
    pub kind: UpdateKind,
}

/// A row identifier plus an ordered list of column edits. Applying a
/// mutation commits one stored cell per edit; a mutation with no edits is a
/// no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    row: Vec<u8>,
    updates: Vec<ColumnUpdate>,
}

impl Mutation {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            updates: Vec::new(),
        }
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn updates(&self) -> &[ColumnUpdate] {
        &self.updates
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn put(
        &mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        visibility: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.push(family, qualifier, visibility, None, UpdateKind::Put(value.into()))
    }

    pub fn put_at(
        &mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        visibility: impl Into<Vec<u8>>,
        timestamp: i64,
        value: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.push(
            family,
            qualifier,
            visibility,
            Some(timestamp),
            UpdateKind::Put(value.into()),
        )
    }

    pub fn put_delete(
        &mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        visibility: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.push(family, qualifier, visibility, None, UpdateKind::Delete)
    }

    pub fn put_delete_at(
        &mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        visibility: impl Into<Vec<u8>>,
        timestamp: i64,
    ) -> &mut Self {
        self.push(family, qualifier, visibility, Some(timestamp), UpdateKind::Delete)
    }

    fn push(
        &mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        visibility: impl Into<Vec<u8>>,
        timestamp: Option<i64>,
        kind: UpdateKind,
    ) -> &mut Self {
        self.updates.push(ColumnUpdate {
            family: family.into(),
            qualifier: qualifier.into(),
            visibility: visibility.into(),
            timestamp,
            kind,
        });
        self
    }
}
