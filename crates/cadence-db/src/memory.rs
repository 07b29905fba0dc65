//! In-memory content store for deterministic testing.
//!
//! Mirrors the PostgreSQL store closely enough to exercise the clone engine
//! without a database: writes are staged per transaction and only become
//! visible on commit, foreign keys and live ship keys are enforced, and an
//! insert failure can be injected at a chosen position.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cadence_db::memory::MemoryContentStore;
//!
//! let store = MemoryContentStore::new().with_insert_failure_at(3);
//! store.seed(account)?;
//! // The third insert made through a transaction fails.
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use cadence_core::{ContentStore, ContentTx, Entity, EntityKind, Error, Ref, Result};

/// Content store holding committed rows in insertion order.
#[derive(Clone, Default)]
pub struct MemoryContentStore {
    rows: Arc<Mutex<Vec<Entity>>>,
    config: Arc<MemoryConfig>,
    inserts: Arc<AtomicUsize>,
}

#[derive(Debug, Clone)]
struct MemoryConfig {
    fail_on_insert: Option<usize>,
    enforce_foreign_keys: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            fail_on_insert: None,
            enforce_foreign_keys: true,
        }
    }
}

fn lock(rows: &Mutex<Vec<Entity>>) -> Result<MutexGuard<'_, Vec<Entity>>> {
    rows.lock()
        .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))
}

impl MemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th transactional insert (1-based) with a persistence error.
    pub fn with_insert_failure_at(mut self, n: usize) -> Self {
        Arc::make_mut(&mut self.config).fail_on_insert = Some(n);
        self
    }

    /// Skip foreign-key checks on insert.
    pub fn without_foreign_keys(mut self) -> Self {
        Arc::make_mut(&mut self.config).enforce_foreign_keys = false;
        self
    }

    /// Write a row directly as committed, bypassing transactions and the
    /// failure counter.
    pub fn seed(&self, entity: impl Into<Entity>) -> Result<()> {
        let entity = entity.into();
        let mut rows = lock(&self.rows)?;
        check_insert(&self.config, &rows, &[], &entity)?;
        rows.push(entity);
        Ok(())
    }

    /// Committed rows of `kind`, in insertion order.
    pub fn rows(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        Ok(lock(&self.rows)?
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect())
    }

    /// Number of committed rows of `kind`.
    pub fn count(&self, kind: EntityKind) -> Result<usize> {
        Ok(lock(&self.rows)?.iter().filter(|e| e.kind() == kind).count())
    }

    /// Number of committed rows of every kind.
    pub fn total_rows(&self) -> Result<usize> {
        Ok(lock(&self.rows)?.len())
    }

    /// Committed row with primary key `id`.
    pub fn get(&self, id: Uuid) -> Result<Option<Entity>> {
        Ok(lock(&self.rows)?.iter().find(|e| e.id() == id).cloned())
    }

    /// Inserts attempted through transactions so far, including failed ones.
    pub fn insert_attempts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn begin(&self) -> Result<Box<dyn ContentTx>> {
        Ok(Box::new(MemoryContentTx {
            store: self.clone(),
            staged: Vec::new(),
            committed: false,
        }))
    }
}

/// Staged writes over a [`MemoryContentStore`].
pub struct MemoryContentTx {
    store: MemoryContentStore,
    staged: Vec<Entity>,
    committed: bool,
}

impl MemoryContentTx {
    fn ensure_open(&self) -> Result<()> {
        if self.committed {
            return Err(Error::Internal("transaction already committed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentTx for MemoryContentTx {
    async fn select(
        &mut self,
        kind: EntityKind,
        field: Ref,
        values: &[Uuid],
    ) -> Result<Vec<Entity>> {
        self.ensure_open()?;
        let rows = lock(&self.store.rows)?;
        Ok(rows
            .iter()
            .chain(self.staged.iter())
            .filter(|e| e.kind() == kind)
            .filter(|e| e.reference(field).is_some_and(|id| values.contains(&id)))
            .cloned()
            .collect())
    }

    async fn find(&mut self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>> {
        self.ensure_open()?;
        let rows = lock(&self.store.rows)?;
        Ok(rows
            .iter()
            .chain(self.staged.iter())
            .find(|e| e.kind() == kind && e.id() == id)
            .cloned())
    }

    async fn insert(&mut self, entity: &Entity) -> Result<()> {
        self.ensure_open()?;
        let attempt = self.store.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.store.config.fail_on_insert == Some(attempt) {
            return Err(Error::Database(sqlx::Error::Protocol(format!(
                "injected failure on insert {} ({})",
                attempt,
                entity.kind()
            ))));
        }
        let rows = lock(&self.store.rows)?;
        check_insert(&self.store.config, &rows, &self.staged, entity)?;
        drop(rows);
        self.staged.push(entity.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let mut rows = lock(&self.store.rows)?;
        rows.append(&mut self.staged);
        self.committed = true;
        Ok(())
    }
}

/// Enforce the constraints the relational schema declares.
fn check_insert(
    config: &MemoryConfig,
    committed: &[Entity],
    staged: &[Entity],
    entity: &Entity,
) -> Result<()> {
    let all = || committed.iter().chain(staged.iter());

    if all().any(|e| e.id() == entity.id()) {
        return Err(Error::Conflict(format!(
            "duplicate key value violates unique constraint \"{}_pkey\"",
            entity.kind()
        )));
    }

    if config.enforce_foreign_keys {
        for (field, id) in entity.references() {
            let target = field.target();
            if !all().any(|e| e.kind() == target && e.id() == id) {
                return Err(Error::Conflict(format!(
                    "insert on table \"{}\" violates foreign key on {} ({})",
                    entity.kind(),
                    field,
                    id
                )));
            }
        }
    }

    if let Entity::Template(template) = entity {
        let taken = all().any(|e| match e {
            Entity::Template(other) => !other.is_deleted && other.ship_key == template.ship_key,
            _ => false,
        });
        if !template.is_deleted && taken {
            return Err(Error::Conflict(format!(
                "duplicate key value violates unique constraint \"uq_template_live_ship_key\" ({})",
                template.ship_key
            )));
        }
    }

    Ok(())
}
