//! Old-id to new-id translation for one clone operation.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{EntityKind, Ref};

/// Per-kind mapping from source ids to the ids of their clones.
///
/// Created empty for each clone call, seeded with the root, and only ever
/// grows. It is owned by that one call and passed down by `&mut`.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    entries: HashMap<EntityKind, HashMap<Uuid, Uuid>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a map for cloning `source` of `kind` into `target`.
    pub fn seeded(kind: EntityKind, source: Uuid, target: Uuid) -> Self {
        let mut map = Self::new();
        map.record(kind, source, target);
        map
    }

    /// Record that `source` of `kind` is now represented by `target`.
    ///
    /// Rows that stay shared across the clone (e.g. the owning program of a
    /// sequence cloned in place) are recorded with `source == target`.
    pub fn record(&mut self, kind: EntityKind, source: Uuid, target: Uuid) {
        self.entries.entry(kind).or_default().insert(source, target);
    }

    pub fn get(&self, kind: EntityKind, source: Uuid) -> Option<Uuid> {
        self.entries.get(&kind).and_then(|m| m.get(&source)).copied()
    }

    pub fn contains(&self, kind: EntityKind, source: Uuid) -> bool {
        self.get(kind, source).is_some()
    }

    /// Translate the value of `field` on a row of `kind`.
    ///
    /// A miss means the referenced kind was not cloned before this row,
    /// which is an ordering error in the descriptor list.
    pub fn resolve(&self, kind: EntityKind, field: Ref, source: Uuid) -> Result<Uuid> {
        self.get(field.target(), source)
            .ok_or(Error::OrderingViolation {
                kind,
                field,
                id: source,
            })
    }

    /// Source ids recorded for `kind`, sorted for stable query parameters.
    pub fn sources(&self, kind: EntityKind) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .entries
            .get(&kind)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Number of mappings across all kinds.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
