//! Core traits for cadence persistence.
//!
//! The clone engine only needs three relational primitives inside one
//! transaction: select rows by a foreign key, insert a row, and commit.
//! Implementations are the PostgreSQL store and the in-memory test store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Entity, EntityKind, Record, Ref};

// =============================================================================
// TRANSACTION
// =============================================================================

/// One open transaction. Dropping it without [`ContentTx::commit`] rolls
/// back every write made through it.
#[async_trait]
pub trait ContentTx: Send {
    /// Rows of `kind` whose `field` holds any of `values`, oldest first.
    async fn select(&mut self, kind: EntityKind, field: Ref, values: &[Uuid])
        -> Result<Vec<Entity>>;

    /// Row of `kind` with primary key `id`, including soft-deleted rows.
    async fn find(&mut self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>>;

    /// Insert one row exactly as given.
    async fn insert(&mut self, entity: &Entity) -> Result<()>;

    /// Make every write visible. The handle is spent afterwards.
    async fn commit(&mut self) -> Result<()>;
}

/// Opens transactions.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ContentTx>>;
}

// =============================================================================
// TYPED HELPERS
// =============================================================================

/// Typed reads on top of [`ContentTx`].
#[async_trait]
pub trait ContentTxExt: ContentTx {
    /// Live (not soft-deleted) row of type `R`, or `NotFound`.
    async fn require<R: Record + Send>(&mut self, id: Uuid) -> Result<R> {
        match self.find(R::KIND, id).await? {
            Some(entity) if !entity.is_deleted() => entity.into_record(),
            _ => Err(Error::NotFound(format!("{} {}", R::KIND, id))),
        }
    }

    /// Typed rows of `R` whose `field` equals `value`.
    async fn select_by<R: Record + Send>(&mut self, field: Ref, value: Uuid) -> Result<Vec<R>> {
        self.select(R::KIND, field, &[value])
            .await?
            .into_iter()
            .map(Entity::into_record)
            .collect()
    }

    /// Walk owners from a row up to the account it belongs to.
    async fn account_of(&mut self, kind: EntityKind, id: Uuid) -> Result<Uuid> {
        let mut current = (kind, id);
        loop {
            if current.0 == EntityKind::Account {
                return Ok(current.1);
            }
            let entity = self
                .find(current.0, current.1)
                .await?
                .ok_or_else(|| Error::NotFound(format!("{} {}", current.0, current.1)))?;
            current = entity.owner().ok_or_else(|| {
                Error::Internal(format!("{} has no owning account", current.0))
            })?;
        }
    }
}

impl<T: ContentTx + ?Sized> ContentTxExt for T {}
