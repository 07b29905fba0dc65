//! Row cloner: copies every row of one entity type within one aggregate.

use tracing::{debug, trace};

use cadence_core::{new_v7, ContentTx, EntityDescriptor, Entity, IdentityMap, Result};

/// Rows of `descriptor.kind` whose scope column points at any source id
/// already recorded for the scope's kind.
pub async fn select_scoped(
    tx: &mut dyn ContentTx,
    descriptor: &EntityDescriptor,
    map: &IdentityMap,
) -> Result<Vec<Entity>> {
    let scope_ids = map.sources(descriptor.scope.target());
    if scope_ids.is_empty() {
        return Ok(Vec::new());
    }
    tx.select(descriptor.kind, descriptor.scope, &scope_ids).await
}

/// Insert a copy of each source row with a fresh id and its scope and
/// ancestor columns rewritten through `map`, recording old to new ids.
///
/// Every other column is copied verbatim. Returns the new rows in creation
/// order.
pub async fn clone_rows(
    tx: &mut dyn ContentTx,
    descriptor: &EntityDescriptor,
    rows: Vec<Entity>,
    map: &mut IdentityMap,
) -> Result<Vec<Entity>> {
    let mut created = Vec::with_capacity(rows.len());
    for source in rows {
        let clone = remap(descriptor, &source, map)?;
        trace!(
            subsystem = "clone",
            component = "cloner",
            op = "clone_row",
            entity_kind = %descriptor.kind,
            source_id = %source.id(),
            target_id = %clone.id(),
            "Cloning row"
        );
        tx.insert(&clone).await?;
        map.record(descriptor.kind, source.id(), clone.id());
        created.push(clone);
    }
    debug!(
        subsystem = "clone",
        component = "cloner",
        op = "clone_rows",
        entity_kind = %descriptor.kind,
        row_count = created.len(),
        "Cloned rows"
    );
    Ok(created)
}

/// Select and clone in one pass.
pub async fn clone_scoped(
    tx: &mut dyn ContentTx,
    descriptor: &EntityDescriptor,
    map: &mut IdentityMap,
) -> Result<Vec<Entity>> {
    let rows = select_scoped(tx, descriptor, map).await?;
    clone_rows(tx, descriptor, rows, map).await
}

/// Build the copy of one row without writing it.
pub fn remap(descriptor: &EntityDescriptor, source: &Entity, map: &IdentityMap) -> Result<Entity> {
    let mut clone = source.clone();
    clone.set_id(new_v7());
    for field in descriptor.remapped_fields() {
        if let Some(old) = source.reference(field) {
            let new = map.resolve(descriptor.kind, field, old)?;
            clone.set_reference(field, new);
        }
    }
    Ok(clone)
}
