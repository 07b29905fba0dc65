//! Clone manager: one entry point per aggregate.
//!
//! Every public method opens exactly one transaction, runs the whole clone
//! inside it, and commits only if every step succeeded. Any error drops the
//! transaction uncommitted, which rolls back every row written so far.
//!
//! Each aggregate also has a `*_tx` function that does the work on a
//! transaction owned by the caller; the library cascade uses these to clone
//! programs and instruments on the library's transaction.

use std::time::Instant;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use cadence_core::text::to_ship_key;
use cadence_core::{
    new_v7, AccessContext, AccessGate, AccessScope, AggregateKind, ChordAttributes,
    CloneRequest, CloneResult, ClonedAggregate, ContentStore, ContentTx, ContentTxExt, Entity,
    EntityKind, Error, IdentityMap, Inherit, Instrument, InstrumentAttributes, InstrumentType,
    Library, LibraryAttributes, PatternAttributes, Program, ProgramAttributes, ProgramSequence,
    ProgramSequenceChord, ProgramSequencePattern, ProgramVoice, Ref, Result, RootOverrides,
    SequenceAttributes, Template, TemplateAttributes, Validator,
};

use crate::cascade::cascade_library;
use crate::engine;
use crate::materialize::Materializer;

/// Clones aggregates through a [`ContentStore`], checking access and
/// validity with `G`.
pub struct CloneManager<S, G> {
    store: S,
    gate: G,
}

impl<S, G> CloneManager<S, G>
where
    S: ContentStore,
    G: AccessGate + Validator,
{
    pub fn new(store: S, gate: G) -> Self {
        Self { store, gate }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Clone any aggregate. `overrides` must be for `aggregate`.
    pub async fn clone(
        &self,
        ctx: &AccessContext,
        aggregate: AggregateKind,
        source_id: Uuid,
        overrides: RootOverrides,
    ) -> Result<ClonedAggregate> {
        if overrides.aggregate() != aggregate {
            return Err(Error::Validation(format!(
                "Attributes are for a {}, not a {}",
                overrides.aggregate(),
                aggregate
            )));
        }
        match overrides {
            RootOverrides::Library(attrs) => {
                self.clone_library(ctx, CloneRequest::new(source_id, attrs)).await
            }
            RootOverrides::Instrument(attrs) => {
                self.clone_instrument(ctx, CloneRequest::new(source_id, attrs))
                    .await
            }
            RootOverrides::Program(attrs) => {
                self.clone_program(ctx, CloneRequest::new(source_id, attrs)).await
            }
            RootOverrides::Template(attrs) => {
                self.clone_template(ctx, CloneRequest::new(source_id, attrs))
                    .await
            }
            RootOverrides::Sequence(attrs) => {
                self.clone_sequence(ctx, CloneRequest::new(source_id, attrs))
                    .await
            }
            RootOverrides::Pattern(attrs) => {
                self.clone_pattern(ctx, CloneRequest::new(source_id, attrs)).await
            }
            RootOverrides::Chord {
                attributes,
                voicing_types,
            } => {
                self.clone_chord(
                    ctx,
                    CloneRequest::new(source_id, attributes),
                    voicing_types.as_deref(),
                )
                .await
            }
        }
    }

    /// Clone a library with every live program and instrument in it.
    pub async fn clone_library(
        &self,
        ctx: &AccessContext,
        req: CloneRequest<LibraryAttributes>,
    ) -> Result<ClonedAggregate> {
        let started = Instant::now();
        let source_id = req.source_id;
        let mut tx = self.store.begin().await?;
        let outcome = clone_library_tx(&mut *tx, &self.gate, ctx, req).await;
        finish(tx, AggregateKind::Library, source_id, started, outcome).await
    }

    pub async fn clone_program(
        &self,
        ctx: &AccessContext,
        req: CloneRequest<ProgramAttributes>,
    ) -> Result<ClonedAggregate> {
        let started = Instant::now();
        let source_id = req.source_id;
        let mut tx = self.store.begin().await?;
        let outcome = clone_program_tx(&mut *tx, &self.gate, ctx, req).await;
        finish(tx, AggregateKind::Program, source_id, started, outcome).await
    }

    pub async fn clone_instrument(
        &self,
        ctx: &AccessContext,
        req: CloneRequest<InstrumentAttributes>,
    ) -> Result<ClonedAggregate> {
        let started = Instant::now();
        let source_id = req.source_id;
        let mut tx = self.store.begin().await?;
        let outcome = clone_instrument_tx(&mut *tx, &self.gate, ctx, req).await;
        finish(tx, AggregateKind::Instrument, source_id, started, outcome).await
    }

    /// Clone a template as a preview template.
    pub async fn clone_template(
        &self,
        ctx: &AccessContext,
        req: CloneRequest<TemplateAttributes>,
    ) -> Result<ClonedAggregate> {
        let started = Instant::now();
        let source_id = req.source_id;
        let mut tx = self.store.begin().await?;
        let outcome = clone_template_tx(&mut *tx, &self.gate, ctx, req).await;
        finish(tx, AggregateKind::Template, source_id, started, outcome).await
    }

    /// Clone a sequence, in its own program or into another one.
    pub async fn clone_sequence(
        &self,
        ctx: &AccessContext,
        req: CloneRequest<SequenceAttributes>,
    ) -> Result<ClonedAggregate> {
        let started = Instant::now();
        let source_id = req.source_id;
        let mut tx = self.store.begin().await?;
        let outcome = clone_sequence_tx(&mut *tx, &self.gate, ctx, req).await;
        finish(tx, AggregateKind::Sequence, source_id, started, outcome).await
    }

    pub async fn clone_pattern(
        &self,
        ctx: &AccessContext,
        req: CloneRequest<PatternAttributes>,
    ) -> Result<ClonedAggregate> {
        let started = Instant::now();
        let source_id = req.source_id;
        let mut tx = self.store.begin().await?;
        let outcome = clone_pattern_tx(&mut *tx, &self.gate, ctx, req).await;
        finish(tx, AggregateKind::Pattern, source_id, started, outcome).await
    }

    /// Clone a chord. With `voicing_types`, only voicings whose voice has one
    /// of those types come along.
    pub async fn clone_chord(
        &self,
        ctx: &AccessContext,
        req: CloneRequest<ChordAttributes>,
        voicing_types: Option<&[InstrumentType]>,
    ) -> Result<ClonedAggregate> {
        let started = Instant::now();
        let source_id = req.source_id;
        let mut tx = self.store.begin().await?;
        let outcome = clone_chord_tx(&mut *tx, &self.gate, ctx, req, voicing_types).await;
        finish(tx, AggregateKind::Chord, source_id, started, outcome).await
    }
}

/// Commit on success and log the outcome either way.
async fn finish(
    mut tx: Box<dyn ContentTx>,
    aggregate: AggregateKind,
    source_id: Uuid,
    started: Instant,
    outcome: Result<CloneResult>,
) -> Result<ClonedAggregate> {
    let committed = match outcome {
        Ok(result) => tx.commit().await.map(|_| result),
        Err(e) => Err(e),
    };
    let duration_ms = started.elapsed().as_millis() as u64;
    match committed {
        Ok(result) => {
            info!(
                subsystem = "clone",
                component = "manager",
                op = "clone",
                aggregate = %aggregate,
                source_id = %source_id,
                target_id = %result.root.id(),
                row_count = result.row_count(),
                duration_ms,
                "Clone completed"
            );
            Ok(result.into())
        }
        Err(e) => {
            if e.is_client_error() {
                warn!(
                    subsystem = "clone",
                    component = "manager",
                    op = "clone",
                    aggregate = %aggregate,
                    source_id = %source_id,
                    error_kind = e.kind(),
                    duration_ms,
                    error = %e,
                    "Clone rejected"
                );
            } else {
                error!(
                    subsystem = "clone",
                    component = "manager",
                    op = "clone",
                    aggregate = %aggregate,
                    source_id = %source_id,
                    error_kind = e.kind(),
                    duration_ms,
                    error = %e,
                    "Clone failed, rolling back"
                );
            }
            Err(e)
        }
    }
}

// =============================================================================
// ACCESS
// =============================================================================

async fn authorize_read<G: AccessGate>(
    tx: &mut dyn ContentTx,
    gate: &G,
    ctx: &AccessContext,
    kind: EntityKind,
    id: Uuid,
) -> Result<()> {
    let account_id = tx.account_of(kind, id).await?;
    gate.require_access(ctx, &AccessScope::read(kind, id, account_id))
}

/// The destination container must exist, be live, and be writable.
async fn authorize_write<G: AccessGate>(
    tx: &mut dyn ContentTx,
    gate: &G,
    ctx: &AccessContext,
    kind: EntityKind,
    id: Uuid,
) -> Result<()> {
    match tx.find(kind, id).await? {
        Some(row) if !row.is_deleted() => {}
        _ => return Err(Error::NotFound(format!("{} {}", kind, id))),
    }
    let account_id = tx.account_of(kind, id).await?;
    gate.require_access(ctx, &AccessScope::write(kind, id, account_id))
}

fn validate<G: Validator>(gate: &G, root: Entity) -> Result<Entity> {
    gate.validate(&root)?;
    Ok(root)
}

/// Insert the new root and record it in `map`.
async fn insert_root(
    tx: &mut dyn ContentTx,
    aggregate: AggregateKind,
    source_id: Uuid,
    root: &Entity,
    map: &mut IdentityMap,
) -> Result<()> {
    tx.insert(root).await?;
    debug!(
        subsystem = "clone",
        component = "manager",
        op = "insert_root",
        aggregate = %aggregate,
        source_id = %source_id,
        target_id = %root.id(),
        "Inserted clone root"
    );
    map.record(aggregate.root_kind(), source_id, root.id());
    Ok(())
}

// =============================================================================
// PER-AGGREGATE CLONES ON A CALLER-OWNED TRANSACTION
// =============================================================================

pub async fn clone_library_tx<G: AccessGate + Validator>(
    tx: &mut dyn ContentTx,
    gate: &G,
    ctx: &AccessContext,
    req: CloneRequest<LibraryAttributes>,
) -> Result<CloneResult> {
    let source: Library = tx.require(req.source_id).await?;
    authorize_read(tx, gate, ctx, EntityKind::Library, source.id).await?;

    let root: Library = req.overrides.inherit(&source, new_v7());
    let account_id = root.account_id;
    let root = validate(gate, root.into())?;
    authorize_write(tx, gate, ctx, EntityKind::Account, account_id).await?;

    let mut map = IdentityMap::new();
    insert_root(tx, AggregateKind::Library, source.id, &root, &mut map).await?;
    let children = engine::run(tx, AggregateKind::Library, &mut map, None, None).await?;

    let mut result = CloneResult::new(root);
    result.children = children;
    cascade_library(tx, gate, ctx, source.id, result.root.id(), &mut result).await?;
    Ok(result)
}

pub async fn clone_program_tx<G: AccessGate + Validator>(
    tx: &mut dyn ContentTx,
    gate: &G,
    ctx: &AccessContext,
    req: CloneRequest<ProgramAttributes>,
) -> Result<CloneResult> {
    let source: Program = tx.require(req.source_id).await?;
    authorize_read(tx, gate, ctx, EntityKind::Program, source.id).await?;

    let root: Program = req.overrides.inherit(&source, new_v7());
    let library_id = root.library_id;
    let root = validate(gate, root.into())?;
    authorize_write(tx, gate, ctx, EntityKind::Library, library_id).await?;

    let mut map = IdentityMap::new();
    insert_root(tx, AggregateKind::Program, source.id, &root, &mut map).await?;
    let children = engine::run(tx, AggregateKind::Program, &mut map, None, None).await?;
    Ok(CloneResult { root, children })
}

pub async fn clone_instrument_tx<G: AccessGate + Validator>(
    tx: &mut dyn ContentTx,
    gate: &G,
    ctx: &AccessContext,
    req: CloneRequest<InstrumentAttributes>,
) -> Result<CloneResult> {
    let source: Instrument = tx.require(req.source_id).await?;
    authorize_read(tx, gate, ctx, EntityKind::Instrument, source.id).await?;

    let root: Instrument = req.overrides.inherit(&source, new_v7());
    let library_id = root.library_id;
    let root = validate(gate, root.into())?;
    authorize_write(tx, gate, ctx, EntityKind::Library, library_id).await?;

    let mut map = IdentityMap::new();
    insert_root(tx, AggregateKind::Instrument, source.id, &root, &mut map).await?;
    let children = engine::run(tx, AggregateKind::Instrument, &mut map, None, None).await?;
    Ok(CloneResult { root, children })
}

pub async fn clone_template_tx<G: AccessGate + Validator>(
    tx: &mut dyn ContentTx,
    gate: &G,
    ctx: &AccessContext,
    req: CloneRequest<TemplateAttributes>,
) -> Result<CloneResult> {
    let source: Template = tx.require(req.source_id).await?;
    authorize_read(tx, gate, ctx, EntityKind::Template, source.id).await?;

    let mut root: Template = req.overrides.inherit(&source, new_v7());
    root.ship_key = to_ship_key(&root.ship_key);
    let account_id = root.account_id;
    let root = validate(gate, root.into())?;
    authorize_write(tx, gate, ctx, EntityKind::Account, account_id).await?;

    let mut map = IdentityMap::new();
    insert_root(tx, AggregateKind::Template, source.id, &root, &mut map).await?;
    let children = engine::run(tx, AggregateKind::Template, &mut map, None, None).await?;
    Ok(CloneResult { root, children })
}

pub async fn clone_sequence_tx<G: AccessGate + Validator>(
    tx: &mut dyn ContentTx,
    gate: &G,
    ctx: &AccessContext,
    req: CloneRequest<SequenceAttributes>,
) -> Result<CloneResult> {
    let source: ProgramSequence = tx.require(req.source_id).await?;
    authorize_read(tx, gate, ctx, EntityKind::ProgramSequence, source.id).await?;

    let root: ProgramSequence = req.overrides.inherit(&source, new_v7());
    let program_id = root.program_id;
    let root = validate(gate, root.into())?;
    authorize_write(tx, gate, ctx, EntityKind::Program, program_id).await?;

    let mut map = IdentityMap::new();
    insert_root(tx, AggregateKind::Sequence, source.id, &root, &mut map).await?;
    map.record(EntityKind::Program, source.program_id, program_id);
    let mut materializer = Materializer::load(tx, source.program_id, program_id).await?;
    let children = engine::run(
        tx,
        AggregateKind::Sequence,
        &mut map,
        Some(&mut materializer),
        None,
    )
    .await?;
    Ok(CloneResult { root, children })
}

pub async fn clone_pattern_tx<G: AccessGate + Validator>(
    tx: &mut dyn ContentTx,
    gate: &G,
    ctx: &AccessContext,
    req: CloneRequest<PatternAttributes>,
) -> Result<CloneResult> {
    let source: ProgramSequencePattern = tx.require(req.source_id).await?;
    authorize_read(tx, gate, ctx, EntityKind::ProgramSequencePattern, source.id).await?;

    let voice_override = req.overrides.program_voice_id;
    let mut root: ProgramSequencePattern = req.overrides.inherit(&source, new_v7());
    let sequence: ProgramSequence = tx.require(root.program_sequence_id).await?;
    root.program_id = sequence.program_id;
    validate(gate, root.clone().into())?;
    authorize_write(tx, gate, ctx, EntityKind::ProgramSequence, sequence.id).await?;

    let mut map = IdentityMap::new();
    map.record(EntityKind::Program, source.program_id, root.program_id);
    let mut materializer = Materializer::load(tx, source.program_id, root.program_id).await?;
    match voice_override {
        Some(voice_id) => {
            let voice: ProgramVoice = tx.require(voice_id).await?;
            if voice.program_id != root.program_id {
                return Err(Error::Validation(
                    "Voice must belong to the pattern's program".to_string(),
                ));
            }
            map.record(EntityKind::ProgramVoice, source.program_voice_id, voice_id);
        }
        None => {
            root.program_voice_id = materializer
                .voice(tx, &mut map, source.program_voice_id)
                .await?
                .ok_or_else(|| {
                    Error::Validation("Pattern voice is not part of its program".to_string())
                })?;
        }
    }
    let mut children = materializer.take_created();

    let root = Entity::from(root);
    insert_root(tx, AggregateKind::Pattern, source.id, &root, &mut map).await?;
    children.extend(
        engine::run(
            tx,
            AggregateKind::Pattern,
            &mut map,
            Some(&mut materializer),
            None,
        )
        .await?,
    );
    Ok(CloneResult { root, children })
}

pub async fn clone_chord_tx<G: AccessGate + Validator>(
    tx: &mut dyn ContentTx,
    gate: &G,
    ctx: &AccessContext,
    req: CloneRequest<ChordAttributes>,
    voicing_types: Option<&[InstrumentType]>,
) -> Result<CloneResult> {
    let source: ProgramSequenceChord = tx.require(req.source_id).await?;
    authorize_read(tx, gate, ctx, EntityKind::ProgramSequenceChord, source.id).await?;

    let mut root: ProgramSequenceChord = req.overrides.inherit(&source, new_v7());
    let sequence: ProgramSequence = tx.require(root.program_sequence_id).await?;
    root.program_id = sequence.program_id;
    validate(gate, root.clone().into())?;
    authorize_write(tx, gate, ctx, EntityKind::ProgramSequence, sequence.id).await?;

    let siblings: Vec<ProgramSequenceChord> =
        tx.select_by(Ref::ProgramSequenceId, sequence.id).await?;
    if siblings.iter().any(|c| c.position == root.position) {
        return Err(Error::Conflict(format!(
            "Found Chord in sequence at position {}",
            root.position
        )));
    }

    let program_id = root.program_id;
    let root = Entity::from(root);
    let mut map = IdentityMap::new();
    insert_root(tx, AggregateKind::Chord, source.id, &root, &mut map).await?;
    map.record(EntityKind::Program, source.program_id, program_id);
    let mut materializer = Materializer::load(tx, source.program_id, program_id).await?;
    let children = engine::run(
        tx,
        AggregateKind::Chord,
        &mut map,
        Some(&mut materializer),
        voicing_types,
    )
    .await?;
    Ok(CloneResult { root, children })
}
