//! Clone engine: runs the descriptor list of one aggregate.
//!
//! The caller inserts the root and seeds the identity map with it (and with
//! any rows the aggregate shares with its source, such as the owning
//! program). The engine then clones descriptor by descriptor, in registry
//! order, threading that one map through every pass.

use tracing::{debug, trace};

use cadence_core::{
    descriptors_for, AggregateKind, ContentTx, Entity, EntityDescriptor, EntityKind,
    IdentityMap, InstrumentType, Ref, Result,
};

use crate::cloner::{clone_rows, clone_scoped, select_scoped};
use crate::materialize::Materializer;

/// Clone every descendant row of `aggregate` and return them in creation order.
///
/// With a `materializer`, voices and tracks referenced by the cloned rows are
/// resolved into the target program first, and any it creates are included
/// in the returned rows ahead of the rows that need them. `voicing_types`
/// limits chord voicings to voices of the listed types.
pub async fn run(
    tx: &mut dyn ContentTx,
    aggregate: AggregateKind,
    map: &mut IdentityMap,
    mut materializer: Option<&mut Materializer>,
    voicing_types: Option<&[InstrumentType]>,
) -> Result<Vec<Entity>> {
    let descriptors = descriptors_for(aggregate);
    debug!(
        subsystem = "clone",
        component = "engine",
        op = "run",
        aggregate = %aggregate,
        descriptor_count = descriptors.len(),
        "Cloning aggregate descendants"
    );

    let mut children = Vec::new();
    for descriptor in descriptors {
        let Some(materializer) = materializer.as_deref_mut() else {
            children.extend(clone_scoped(tx, descriptor, map).await?);
            continue;
        };
        let rows = select_scoped(tx, descriptor, map).await?;
        let rows =
            resolve_externals(tx, descriptor, rows, map, materializer, voicing_types).await?;
        children.extend(materializer.take_created());
        children.extend(clone_rows(tx, descriptor, rows, map).await?);
    }
    Ok(children)
}

/// Map the voices and tracks `rows` point at, dropping voicings that are
/// filtered out or whose voice is not part of the source program.
async fn resolve_externals(
    tx: &mut dyn ContentTx,
    descriptor: &EntityDescriptor,
    rows: Vec<Entity>,
    map: &mut IdentityMap,
    materializer: &mut Materializer,
    voicing_types: Option<&[InstrumentType]>,
) -> Result<Vec<Entity>> {
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        if descriptor.kind == EntityKind::ProgramSequenceChordVoicing
            && !keep_voicing(&row, materializer, voicing_types)
        {
            trace!(
                subsystem = "clone",
                component = "engine",
                op = "skip_voicing",
                source_id = %row.id(),
                "Skipping voicing"
            );
            continue;
        }
        if let Some(voice) = row.reference(Ref::ProgramVoiceId) {
            materializer.voice(tx, map, voice).await?;
        }
        if let Some(track) = row.reference(Ref::ProgramVoiceTrackId) {
            materializer.track(tx, map, track).await?;
        }
        kept.push(row);
    }
    Ok(kept)
}

fn keep_voicing(
    row: &Entity,
    materializer: &Materializer,
    voicing_types: Option<&[InstrumentType]>,
) -> bool {
    let Some(voice) = row
        .reference(Ref::ProgramVoiceId)
        .and_then(|id| materializer.source_voice(id))
    else {
        return false;
    };
    voicing_types.map_or(true, |types| types.contains(&voice.voice_type))
}
