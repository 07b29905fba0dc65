//! Library cascade: programs and instruments follow their library.

use tracing::debug;
use uuid::Uuid;

use cadence_core::{
    AccessContext, AccessGate, CloneRequest, CloneResult, ContentTx, ContentTxExt, Instrument,
    InstrumentAttributes, Program, ProgramAttributes, Ref, Result, Validator,
};

use crate::manager::{clone_instrument_tx, clone_program_tx};

/// Clone every live program and instrument of `source_library` into
/// `target_library` on the same transaction, appending each one's root and
/// rows to `result`.
pub async fn cascade_library<G: AccessGate + Validator>(
    tx: &mut dyn ContentTx,
    gate: &G,
    ctx: &AccessContext,
    source_library: Uuid,
    target_library: Uuid,
    result: &mut CloneResult,
) -> Result<()> {
    let programs: Vec<Program> = tx.select_by(Ref::LibraryId, source_library).await?;
    let instruments: Vec<Instrument> = tx.select_by(Ref::LibraryId, source_library).await?;

    let mut program_count = 0usize;
    for program in programs.into_iter().filter(|p| !p.is_deleted) {
        let req = CloneRequest::new(program.id, ProgramAttributes::in_library(target_library));
        result.absorb(clone_program_tx(tx, gate, ctx, req).await?);
        program_count += 1;
    }

    let mut instrument_count = 0usize;
    for instrument in instruments.into_iter().filter(|i| !i.is_deleted) {
        let req = CloneRequest::new(
            instrument.id,
            InstrumentAttributes::in_library(target_library),
        );
        result.absorb(clone_instrument_tx(tx, gate, ctx, req).await?);
        instrument_count += 1;
    }

    debug!(
        subsystem = "clone",
        component = "cascade",
        op = "cascade_library",
        source_id = %source_library,
        target_id = %target_library,
        program_count,
        instrument_count,
        "Cascaded library contents"
    );
    Ok(())
}
