//! Attribute inheritance for clone roots.
//!
//! A caller overrides some attributes of the root it clones; every field it
//! leaves unset (`None`, or an empty string) is taken from the source.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Instrument, InstrumentMode, InstrumentState, InstrumentType, Library, Program,
    ProgramSequence, ProgramSequenceChord, ProgramSequencePattern, ProgramState, ProgramType,
    Record, Template, TemplateType,
};
use crate::text::increment_integer_suffix;

/// Produce a complete root from a partial override and its source.
pub trait Inherit {
    type Target: Record;

    /// Fill every unset field from `source` and give the result `id`.
    fn inherit(self, source: &Self::Target, id: Uuid) -> Self::Target;
}

fn pick<T: Clone>(value: Option<T>, source: &T) -> T {
    value.unwrap_or_else(|| source.clone())
}

fn pick_text(value: Option<String>, source: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => source.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryAttributes {
    pub account_id: Option<Uuid>,
    pub name: Option<String>,
}

impl Inherit for LibraryAttributes {
    type Target = Library;

    fn inherit(self, source: &Library, id: Uuid) -> Library {
        Library {
            id,
            account_id: pick(self.account_id, &source.account_id),
            name: pick_text(self.name, &source.name),
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramAttributes {
    pub library_id: Option<Uuid>,
    pub state: Option<ProgramState>,
    pub key: Option<String>,
    pub tempo: Option<f32>,
    #[serde(rename = "type")]
    pub program_type: Option<ProgramType>,
    pub name: Option<String>,
    pub density: Option<f32>,
    pub config: Option<String>,
}

impl ProgramAttributes {
    /// Override that only moves the program into another library.
    pub fn in_library(library_id: Uuid) -> Self {
        Self {
            library_id: Some(library_id),
            ..Self::default()
        }
    }
}

impl Inherit for ProgramAttributes {
    type Target = Program;

    fn inherit(self, source: &Program, id: Uuid) -> Program {
        Program {
            id,
            library_id: pick(self.library_id, &source.library_id),
            state: pick(self.state, &source.state),
            key: pick_text(self.key, &source.key),
            tempo: pick(self.tempo, &source.tempo),
            program_type: pick(self.program_type, &source.program_type),
            name: pick_text(self.name, &source.name),
            density: pick(self.density, &source.density),
            config: pick_text(self.config, &source.config),
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentAttributes {
    pub library_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub instrument_type: Option<InstrumentType>,
    pub mode: Option<InstrumentMode>,
    pub state: Option<InstrumentState>,
    pub name: Option<String>,
    pub density: Option<f32>,
    pub config: Option<String>,
}

impl InstrumentAttributes {
    pub fn in_library(library_id: Uuid) -> Self {
        Self {
            library_id: Some(library_id),
            ..Self::default()
        }
    }
}

impl Inherit for InstrumentAttributes {
    type Target = Instrument;

    fn inherit(self, source: &Instrument, id: Uuid) -> Instrument {
        Instrument {
            id,
            library_id: pick(self.library_id, &source.library_id),
            instrument_type: pick(self.instrument_type, &source.instrument_type),
            mode: pick(self.mode, &source.mode),
            state: pick(self.state, &source.state),
            name: pick_text(self.name, &source.name),
            density: pick(self.density, &source.density),
            config: pick_text(self.config, &source.config),
            is_deleted: false,
        }
    }
}

/// Template override. The clone is always a preview template, and an unset
/// ship key becomes the source key with its trailing number bumped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateAttributes {
    pub account_id: Option<Uuid>,
    pub name: Option<String>,
    pub ship_key: Option<String>,
    pub config: Option<String>,
}

impl Inherit for TemplateAttributes {
    type Target = Template;

    fn inherit(self, source: &Template, id: Uuid) -> Template {
        let ship_key = match self.ship_key {
            Some(key) if !key.is_empty() => key,
            _ => increment_integer_suffix(&source.ship_key),
        };
        Template {
            id,
            account_id: pick(self.account_id, &source.account_id),
            name: pick_text(self.name, &source.name),
            ship_key,
            template_type: TemplateType::Preview,
            config: pick_text(self.config, &source.config),
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceAttributes {
    pub program_id: Option<Uuid>,
    pub name: Option<String>,
    pub key: Option<String>,
    pub density: Option<f32>,
    pub total: Option<i16>,
}

impl Inherit for SequenceAttributes {
    type Target = ProgramSequence;

    fn inherit(self, source: &ProgramSequence, id: Uuid) -> ProgramSequence {
        ProgramSequence {
            id,
            program_id: pick(self.program_id, &source.program_id),
            name: pick_text(self.name, &source.name),
            key: pick_text(self.key, &source.key),
            density: pick(self.density, &source.density),
            total: pick(self.total, &source.total),
        }
    }
}

/// Pattern override. `total` is not overridable; the owning program follows
/// the target sequence and is set by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternAttributes {
    pub program_sequence_id: Option<Uuid>,
    pub program_voice_id: Option<Uuid>,
    pub name: Option<String>,
}

impl Inherit for PatternAttributes {
    type Target = ProgramSequencePattern;

    fn inherit(self, source: &ProgramSequencePattern, id: Uuid) -> ProgramSequencePattern {
        ProgramSequencePattern {
            id,
            program_id: source.program_id,
            program_sequence_id: pick(self.program_sequence_id, &source.program_sequence_id),
            program_voice_id: pick(self.program_voice_id, &source.program_voice_id),
            name: pick_text(self.name, &source.name),
            total: source.total,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordAttributes {
    pub program_sequence_id: Option<Uuid>,
    pub name: Option<String>,
    pub position: Option<f64>,
}

impl Inherit for ChordAttributes {
    type Target = ProgramSequenceChord;

    fn inherit(self, source: &ProgramSequenceChord, id: Uuid) -> ProgramSequenceChord {
        ProgramSequenceChord {
            id,
            program_id: source.program_id,
            program_sequence_id: pick(self.program_sequence_id, &source.program_sequence_id),
            name: pick_text(self.name, &source.name),
            position: pick(self.position, &source.position),
        }
    }
}
