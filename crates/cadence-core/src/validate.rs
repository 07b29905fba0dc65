//! Domain validation of clone roots.

use uuid::Uuid;

use crate::access::HubGate;
use crate::error::{Error, Result};
use crate::models::{
    Entity, Instrument, Library, Program, ProgramSequence, ProgramSequenceChord,
    ProgramSequencePattern, Template,
};

/// Checks that an inherited root is fit to persist.
pub trait Validator: Send + Sync {
    fn validate(&self, entity: &Entity) -> Result<()>;
}

fn require_id(value: Uuid, label: &str) -> Result<()> {
    if value.is_nil() {
        return Err(Error::Validation(format!("{} is required", label)));
    }
    Ok(())
}

fn require_text(value: &str, label: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} is required", label)));
    }
    Ok(())
}

fn validate_library(row: &Library) -> Result<()> {
    require_id(row.account_id, "Account ID")?;
    require_text(&row.name, "Name")
}

fn validate_program(row: &Program) -> Result<()> {
    require_id(row.library_id, "Library ID")?;
    require_text(&row.name, "Name")?;
    require_text(&row.key, "Key")?;
    if row.tempo == 0.0 || !row.tempo.is_finite() {
        return Err(Error::Validation("Tempo must be a non-zero number".to_string()));
    }
    if !(0.0..=1.0).contains(&row.density) {
        return Err(Error::Validation("Density must be between 0 and 1".to_string()));
    }
    Ok(())
}

fn validate_instrument(row: &Instrument) -> Result<()> {
    require_id(row.library_id, "Library ID")?;
    require_text(&row.name, "Name")?;
    if !(0.0..=1.0).contains(&row.density) {
        return Err(Error::Validation("Density must be between 0 and 1".to_string()));
    }
    Ok(())
}

fn validate_template(row: &Template) -> Result<()> {
    require_id(row.account_id, "Account ID")?;
    require_text(&row.name, "Name")?;
    require_text(&row.ship_key, "Ship key")
}

fn validate_sequence(row: &ProgramSequence) -> Result<()> {
    require_id(row.program_id, "Program ID")?;
    require_text(&row.name, "Name")?;
    require_text(&row.key, "Key")?;
    if row.total <= 0 {
        return Err(Error::Validation("Total must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_pattern(row: &ProgramSequencePattern) -> Result<()> {
    require_id(row.program_id, "Program ID")?;
    require_id(row.program_sequence_id, "Sequence ID")?;
    require_id(row.program_voice_id, "Voice ID")?;
    require_text(&row.name, "Name")
}

fn validate_chord(row: &ProgramSequenceChord) -> Result<()> {
    require_id(row.program_id, "Program ID")?;
    require_id(row.program_sequence_id, "Sequence ID")?;
    require_text(&row.name, "Name")?;
    if row.position < 0.0 || !row.position.is_finite() {
        return Err(Error::Validation("Position must not be negative".to_string()));
    }
    Ok(())
}

impl Validator for HubGate {
    fn validate(&self, entity: &Entity) -> Result<()> {
        match entity {
            Entity::Library(row) => validate_library(row),
            Entity::Program(row) => validate_program(row),
            Entity::Instrument(row) => validate_instrument(row),
            Entity::Template(row) => validate_template(row),
            Entity::ProgramSequence(row) => validate_sequence(row),
            Entity::ProgramSequencePattern(row) => validate_pattern(row),
            Entity::ProgramSequenceChord(row) => validate_chord(row),
            other => Err(Error::Internal(format!(
                "{} is not a clone root",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProgramState, ProgramType};

    fn program() -> Program {
        Program {
            id: Uuid::from_u128(1),
            library_id: Uuid::from_u128(2),
            state: ProgramState::Draft,
            key: "G".to_string(),
            tempo: 120.0,
            program_type: ProgramType::Beat,
            name: "Groove".to_string(),
            density: 0.5,
            config: String::new(),
            is_deleted: false,
        }
    }

    #[test]
    fn test_valid_program_passes() {
        assert!(HubGate.validate(&Entity::Program(program())).is_ok());
    }

    #[test]
    fn test_program_requires_non_zero_tempo() {
        let mut row = program();
        row.tempo = 0.0;
        let err = HubGate.validate(&Entity::Program(row)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Tempo must be a non-zero number"
        );
    }

    #[test]
    fn test_program_requires_library() {
        let mut row = program();
        row.library_id = Uuid::nil();
        let err = HubGate.validate(&Entity::Program(row)).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Library ID is required");
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let mut row = program();
        row.name = "   ".to_string();
        assert!(matches!(
            HubGate.validate(&Entity::Program(row)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_chord_position_must_not_be_negative() {
        let row = ProgramSequenceChord {
            id: Uuid::from_u128(1),
            program_id: Uuid::from_u128(2),
            program_sequence_id: Uuid::from_u128(3),
            name: "Cm7".to_string(),
            position: -1.0,
        };
        assert!(matches!(
            HubGate.validate(&Entity::ProgramSequenceChord(row)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_non_root_kind_is_internal_error() {
        let meme = Entity::ProgramMeme(crate::models::ProgramMeme {
            id: Uuid::from_u128(1),
            program_id: Uuid::from_u128(2),
            name: "dark".to_string(),
        });
        assert!(matches!(HubGate.validate(&meme), Err(Error::Internal(_))));
    }
}
