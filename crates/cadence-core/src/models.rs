//! Content entity models.
//!
//! Every content table has a typed struct. [`Entity`] wraps them so rows of
//! any kind can move through the same clone pipeline, and [`Record`] exposes
//! the primary key and foreign keys of each struct by [`Ref`], which names
//! both the column and the entity kind the column points at.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// TEXT-STORED ENUMS
// =============================================================================

/// Declares an enum stored as lowercase text, with `Display` and `FromStr`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("Invalid ", $label, ": {}"), s)),
                }
            }
        }
    };
}

pub(crate) use text_enum;

text_enum! {
    /// Role of a program in composition.
    ProgramType, "program type" {
        Main => "main",
        Macro => "macro",
        Beat => "beat",
        Detail => "detail",
    }
}

text_enum! {
    /// Publication state of a program.
    ProgramState, "program state" {
        Draft => "draft",
        Published => "published",
    }
}

text_enum! {
    /// Instrument type; also the type of a program voice.
    InstrumentType, "instrument type" {
        Bass => "bass",
        Drum => "drum",
        Hook => "hook",
        Pad => "pad",
        Percussion => "percussion",
        Stab => "stab",
        Sticky => "sticky",
        Stripe => "stripe",
    }
}

text_enum! {
    InstrumentMode, "instrument mode" {
        Event => "event",
        Chord => "chord",
        Loop => "loop",
    }
}

text_enum! {
    InstrumentState, "instrument state" {
        Draft => "draft",
        Published => "published",
    }
}

text_enum! {
    /// Templates cloned by this engine are always `Preview`.
    TemplateType, "template type" {
        Preview => "preview",
        Production => "production",
    }
}

text_enum! {
    /// What a template binding points at.
    ContentBindingType, "content binding type" {
        Library => "library",
        Program => "program",
        Instrument => "instrument",
    }
}

// =============================================================================
// ENTITY KINDS AND FOREIGN KEYS
// =============================================================================

/// One content table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Library,
    Program,
    ProgramMeme,
    ProgramVoice,
    ProgramVoiceTrack,
    ProgramSequence,
    ProgramSequenceChord,
    ProgramSequenceChordVoicing,
    ProgramSequenceBinding,
    ProgramSequenceBindingMeme,
    ProgramSequencePattern,
    ProgramSequencePatternEvent,
    Instrument,
    InstrumentMeme,
    InstrumentAudio,
    Template,
    TemplateBinding,
}

impl EntityKind {
    /// Table name in the relational store.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Library => "library",
            Self::Program => "program",
            Self::ProgramMeme => "program_meme",
            Self::ProgramVoice => "program_voice",
            Self::ProgramVoiceTrack => "program_voice_track",
            Self::ProgramSequence => "program_sequence",
            Self::ProgramSequenceChord => "program_sequence_chord",
            Self::ProgramSequenceChordVoicing => "program_sequence_chord_voicing",
            Self::ProgramSequenceBinding => "program_sequence_binding",
            Self::ProgramSequenceBindingMeme => "program_sequence_binding_meme",
            Self::ProgramSequencePattern => "program_sequence_pattern",
            Self::ProgramSequencePatternEvent => "program_sequence_pattern_event",
            Self::Instrument => "instrument",
            Self::InstrumentMeme => "instrument_meme",
            Self::InstrumentAudio => "instrument_audio",
            Self::Template => "template",
            Self::TemplateBinding => "template_binding",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for EntityKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let kinds = [
            Self::Account,
            Self::Library,
            Self::Program,
            Self::ProgramMeme,
            Self::ProgramVoice,
            Self::ProgramVoiceTrack,
            Self::ProgramSequence,
            Self::ProgramSequenceChord,
            Self::ProgramSequenceChordVoicing,
            Self::ProgramSequenceBinding,
            Self::ProgramSequenceBindingMeme,
            Self::ProgramSequencePattern,
            Self::ProgramSequencePatternEvent,
            Self::Instrument,
            Self::InstrumentMeme,
            Self::InstrumentAudio,
            Self::Template,
            Self::TemplateBinding,
        ];
        let wanted = s.to_lowercase().replace('-', "_");
        kinds
            .into_iter()
            .find(|k| k.table() == wanted)
            .ok_or_else(|| format!("Invalid entity kind: {}", s))
    }
}

/// A foreign-key column, identified together with the kind it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ref {
    AccountId,
    LibraryId,
    ProgramId,
    ProgramVoiceId,
    ProgramVoiceTrackId,
    ProgramSequenceId,
    ProgramSequenceChordId,
    ProgramSequenceBindingId,
    ProgramSequencePatternId,
    InstrumentId,
    TemplateId,
}

impl Ref {
    pub const ALL: &'static [Ref] = &[
        Ref::AccountId,
        Ref::LibraryId,
        Ref::ProgramId,
        Ref::ProgramVoiceId,
        Ref::ProgramVoiceTrackId,
        Ref::ProgramSequenceId,
        Ref::ProgramSequenceChordId,
        Ref::ProgramSequenceBindingId,
        Ref::ProgramSequencePatternId,
        Ref::InstrumentId,
        Ref::TemplateId,
    ];

    /// Column name on the referencing table.
    pub fn column(&self) -> &'static str {
        match self {
            Ref::AccountId => "account_id",
            Ref::LibraryId => "library_id",
            Ref::ProgramId => "program_id",
            Ref::ProgramVoiceId => "program_voice_id",
            Ref::ProgramVoiceTrackId => "program_voice_track_id",
            Ref::ProgramSequenceId => "program_sequence_id",
            Ref::ProgramSequenceChordId => "program_sequence_chord_id",
            Ref::ProgramSequenceBindingId => "program_sequence_binding_id",
            Ref::ProgramSequencePatternId => "program_sequence_pattern_id",
            Ref::InstrumentId => "instrument_id",
            Ref::TemplateId => "template_id",
        }
    }

    /// Kind of entity the column points at.
    pub fn target(&self) -> EntityKind {
        match self {
            Ref::AccountId => EntityKind::Account,
            Ref::LibraryId => EntityKind::Library,
            Ref::ProgramId => EntityKind::Program,
            Ref::ProgramVoiceId => EntityKind::ProgramVoice,
            Ref::ProgramVoiceTrackId => EntityKind::ProgramVoiceTrack,
            Ref::ProgramSequenceId => EntityKind::ProgramSequence,
            Ref::ProgramSequenceChordId => EntityKind::ProgramSequenceChord,
            Ref::ProgramSequenceBindingId => EntityKind::ProgramSequenceBinding,
            Ref::ProgramSequencePatternId => EntityKind::ProgramSequencePattern,
            Ref::InstrumentId => EntityKind::Instrument,
            Ref::TemplateId => EntityKind::Template,
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// Explicit, per-table access to keys. Implemented for every entity struct.
pub trait Record: Clone + Into<Entity> + TryFrom<Entity, Error = Error> {
    const KIND: EntityKind;
    /// Column that points at the owning row, walked to resolve an account.
    const OWNER: Option<Ref>;

    fn id(&self) -> Uuid;
    fn set_id(&mut self, id: Uuid);
    /// Value of a foreign key, or `None` if this table has no such column.
    fn reference(&self, field: Ref) -> Option<Uuid>;
    /// Overwrite a foreign key. Returns `false` if this table has no such column.
    fn set_reference(&mut self, field: Ref, id: Uuid) -> bool;
}

macro_rules! record {
    ($ty:ident, owner: $owner:expr, { $($field:ident => $col:ident),* $(,)? }) => {
        impl Record for $ty {
            const KIND: EntityKind = EntityKind::$ty;
            const OWNER: Option<Ref> = $owner;

            fn id(&self) -> Uuid {
                self.id
            }

            fn set_id(&mut self, id: Uuid) {
                self.id = id;
            }

            #[allow(unused_variables)]
            fn reference(&self, field: Ref) -> Option<Uuid> {
                match field {
                    $(Ref::$field => Some(self.$col),)*
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }

            #[allow(unused_variables)]
            fn set_reference(&mut self, field: Ref, id: Uuid) -> bool {
                match field {
                    $(Ref::$field => {
                        self.$col = id;
                        true
                    })*
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }

        impl From<$ty> for Entity {
            fn from(value: $ty) -> Self {
                Entity::$ty(value)
            }
        }

        impl TryFrom<Entity> for $ty {
            type Error = Error;
            fn try_from(entity: Entity) -> std::result::Result<Self, Error> {
                match entity {
                    Entity::$ty(value) => Ok(value),
                    other => Err(Error::Internal(format!(
                        "expected {} row, found {}",
                        EntityKind::$ty,
                        other.kind()
                    ))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub library_id: Uuid,
    pub state: ProgramState,
    pub key: String,
    pub tempo: f32,
    #[serde(rename = "type")]
    pub program_type: ProgramType,
    pub name: String,
    pub density: f32,
    pub config: String,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramMeme {
    pub id: Uuid,
    pub program_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramVoice {
    pub id: Uuid,
    pub program_id: Uuid,
    #[serde(rename = "type")]
    pub voice_type: InstrumentType,
    pub name: String,
    pub order: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramVoiceTrack {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_voice_id: Uuid,
    pub name: String,
    pub order: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequence {
    pub id: Uuid,
    pub program_id: Uuid,
    pub name: String,
    pub key: String,
    pub density: f32,
    pub total: i16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequenceChord {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_sequence_id: Uuid,
    pub name: String,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequenceChordVoicing {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_sequence_chord_id: Uuid,
    pub program_voice_id: Uuid,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequenceBinding {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_sequence_id: Uuid,
    pub offset: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequenceBindingMeme {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_sequence_binding_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequencePattern {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_sequence_id: Uuid,
    pub program_voice_id: Uuid,
    pub name: String,
    pub total: i16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSequencePatternEvent {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_sequence_pattern_id: Uuid,
    pub program_voice_track_id: Uuid,
    pub velocity: f32,
    pub position: f32,
    pub duration: f32,
    pub tones: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: Uuid,
    pub library_id: Uuid,
    #[serde(rename = "type")]
    pub instrument_type: InstrumentType,
    pub mode: InstrumentMode,
    pub state: InstrumentState,
    pub name: String,
    pub density: f32,
    pub config: String,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMeme {
    pub id: Uuid,
    pub instrument_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentAudio {
    pub id: Uuid,
    pub instrument_id: Uuid,
    pub name: String,
    pub waveform_key: String,
    pub transient_seconds: f32,
    pub loop_beats: f32,
    pub tempo: f32,
    pub intensity: f32,
    pub volume: f32,
    pub tones: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub ship_key: String,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
    pub config: String,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Points a template at a library, program, or instrument. `target_id` is
/// polymorphic and copied verbatim on clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateBinding {
    pub id: Uuid,
    pub template_id: Uuid,
    #[serde(rename = "type")]
    pub binding_type: ContentBindingType,
    pub target_id: Uuid,
}

record!(Account, owner: None, {});
record!(Library, owner: Some(Ref::AccountId), { AccountId => account_id });
record!(Program, owner: Some(Ref::LibraryId), { LibraryId => library_id });
record!(ProgramMeme, owner: Some(Ref::ProgramId), { ProgramId => program_id });
record!(ProgramVoice, owner: Some(Ref::ProgramId), { ProgramId => program_id });
record!(ProgramVoiceTrack, owner: Some(Ref::ProgramId), {
    ProgramId => program_id,
    ProgramVoiceId => program_voice_id,
});
record!(ProgramSequence, owner: Some(Ref::ProgramId), { ProgramId => program_id });
record!(ProgramSequenceChord, owner: Some(Ref::ProgramId), {
    ProgramId => program_id,
    ProgramSequenceId => program_sequence_id,
});
record!(ProgramSequenceChordVoicing, owner: Some(Ref::ProgramId), {
    ProgramId => program_id,
    ProgramSequenceChordId => program_sequence_chord_id,
    ProgramVoiceId => program_voice_id,
});
record!(ProgramSequenceBinding, owner: Some(Ref::ProgramId), {
    ProgramId => program_id,
    ProgramSequenceId => program_sequence_id,
});
record!(ProgramSequenceBindingMeme, owner: Some(Ref::ProgramId), {
    ProgramId => program_id,
    ProgramSequenceBindingId => program_sequence_binding_id,
});
record!(ProgramSequencePattern, owner: Some(Ref::ProgramId), {
    ProgramId => program_id,
    ProgramSequenceId => program_sequence_id,
    ProgramVoiceId => program_voice_id,
});
record!(ProgramSequencePatternEvent, owner: Some(Ref::ProgramId), {
    ProgramId => program_id,
    ProgramSequencePatternId => program_sequence_pattern_id,
    ProgramVoiceTrackId => program_voice_track_id,
});
record!(Instrument, owner: Some(Ref::LibraryId), { LibraryId => library_id });
record!(InstrumentMeme, owner: Some(Ref::InstrumentId), { InstrumentId => instrument_id });
record!(InstrumentAudio, owner: Some(Ref::InstrumentId), { InstrumentId => instrument_id });
record!(Template, owner: Some(Ref::AccountId), { AccountId => account_id });
record!(TemplateBinding, owner: Some(Ref::TemplateId), { TemplateId => template_id });

// =============================================================================
// ENTITY
// =============================================================================

/// Any content row, tagged by kind for JSON:API-style inclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "attributes", rename_all = "snake_case")]
pub enum Entity {
    Account(Account),
    Library(Library),
    Program(Program),
    ProgramMeme(ProgramMeme),
    ProgramVoice(ProgramVoice),
    ProgramVoiceTrack(ProgramVoiceTrack),
    ProgramSequence(ProgramSequence),
    ProgramSequenceChord(ProgramSequenceChord),
    ProgramSequenceChordVoicing(ProgramSequenceChordVoicing),
    ProgramSequenceBinding(ProgramSequenceBinding),
    ProgramSequenceBindingMeme(ProgramSequenceBindingMeme),
    ProgramSequencePattern(ProgramSequencePattern),
    ProgramSequencePatternEvent(ProgramSequencePatternEvent),
    Instrument(Instrument),
    InstrumentMeme(InstrumentMeme),
    InstrumentAudio(InstrumentAudio),
    Template(Template),
    TemplateBinding(TemplateBinding),
}

macro_rules! dispatch {
    ($entity:expr, $row:ident => $body:expr) => {
        match $entity {
            Entity::Account($row) => $body,
            Entity::Library($row) => $body,
            Entity::Program($row) => $body,
            Entity::ProgramMeme($row) => $body,
            Entity::ProgramVoice($row) => $body,
            Entity::ProgramVoiceTrack($row) => $body,
            Entity::ProgramSequence($row) => $body,
            Entity::ProgramSequenceChord($row) => $body,
            Entity::ProgramSequenceChordVoicing($row) => $body,
            Entity::ProgramSequenceBinding($row) => $body,
            Entity::ProgramSequenceBindingMeme($row) => $body,
            Entity::ProgramSequencePattern($row) => $body,
            Entity::ProgramSequencePatternEvent($row) => $body,
            Entity::Instrument($row) => $body,
            Entity::InstrumentMeme($row) => $body,
            Entity::InstrumentAudio($row) => $body,
            Entity::Template($row) => $body,
            Entity::TemplateBinding($row) => $body,
        }
    };
}

fn kind_of<R: Record>(_: &R) -> EntityKind {
    R::KIND
}

fn owner_of<R: Record>(row: &R) -> Option<(EntityKind, Uuid)> {
    R::OWNER.and_then(|field| row.reference(field).map(|id| (field.target(), id)))
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        dispatch!(self, row => kind_of(row))
    }

    pub fn id(&self) -> Uuid {
        dispatch!(self, row => row.id())
    }

    pub fn set_id(&mut self, id: Uuid) {
        dispatch!(self, row => row.set_id(id))
    }

    pub fn reference(&self, field: Ref) -> Option<Uuid> {
        dispatch!(self, row => row.reference(field))
    }

    pub fn set_reference(&mut self, field: Ref, id: Uuid) -> bool {
        dispatch!(self, row => row.set_reference(field, id))
    }

    /// Every foreign key this row carries.
    pub fn references(&self) -> Vec<(Ref, Uuid)> {
        Ref::ALL
            .iter()
            .filter_map(|field| self.reference(*field).map(|id| (*field, id)))
            .collect()
    }

    /// Kind and id of the row that owns this one, if any.
    pub fn owner(&self) -> Option<(EntityKind, Uuid)> {
        dispatch!(self, row => owner_of(row))
    }

    /// Soft-delete flag; tables without one are never deleted.
    pub fn is_deleted(&self) -> bool {
        match self {
            Entity::Library(row) => row.is_deleted,
            Entity::Program(row) => row.is_deleted,
            Entity::Instrument(row) => row.is_deleted,
            Entity::Template(row) => row.is_deleted,
            _ => false,
        }
    }

    /// Human-readable name, where the table has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Entity::Account(row) => Some(&row.name),
            Entity::Library(row) => Some(&row.name),
            Entity::Program(row) => Some(&row.name),
            Entity::ProgramMeme(row) => Some(&row.name),
            Entity::ProgramVoice(row) => Some(&row.name),
            Entity::ProgramVoiceTrack(row) => Some(&row.name),
            Entity::ProgramSequence(row) => Some(&row.name),
            Entity::ProgramSequenceChord(row) => Some(&row.name),
            Entity::ProgramSequenceBindingMeme(row) => Some(&row.name),
            Entity::ProgramSequencePattern(row) => Some(&row.name),
            Entity::Instrument(row) => Some(&row.name),
            Entity::InstrumentMeme(row) => Some(&row.name),
            Entity::InstrumentAudio(row) => Some(&row.name),
            Entity::Template(row) => Some(&row.name),
            Entity::ProgramSequenceChordVoicing(_)
            | Entity::ProgramSequenceBinding(_)
            | Entity::ProgramSequencePatternEvent(_)
            | Entity::TemplateBinding(_) => None,
        }
    }

    /// Convert into a typed row, failing if the kind does not match.
    pub fn into_record<R: Record>(self) -> crate::Result<R> {
        R::try_from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> ProgramSequencePatternEvent {
        ProgramSequencePatternEvent {
            id: Uuid::from_u128(1),
            program_id: Uuid::from_u128(2),
            program_sequence_pattern_id: Uuid::from_u128(3),
            program_voice_track_id: Uuid::from_u128(4),
            velocity: 1.0,
            position: 0.5,
            duration: 0.25,
            tones: "C4".to_string(),
        }
    }

    #[test]
    fn test_text_enum_display_and_parse() {
        assert_eq!(InstrumentType::Bass.to_string(), "bass");
        assert_eq!("Bass".parse::<InstrumentType>(), Ok(InstrumentType::Bass));
        assert_eq!("PERCUSSION".parse::<InstrumentType>(), Ok(InstrumentType::Percussion));
        assert_eq!(
            "kazoo".parse::<InstrumentType>(),
            Err("Invalid instrument type: kazoo".to_string())
        );
        assert_eq!("preview".parse::<TemplateType>(), Ok(TemplateType::Preview));
    }

    #[test]
    fn test_entity_kind_parse_accepts_table_name() {
        assert_eq!("program_voice".parse::<EntityKind>(), Ok(EntityKind::ProgramVoice));
        assert_eq!("program-voice".parse::<EntityKind>(), Ok(EntityKind::ProgramVoice));
        assert!("voice".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_ref_targets_match_column_names() {
        for field in Ref::ALL {
            let column = field.column();
            let table = field.target().table();
            assert_eq!(column, format!("{}_id", table));
        }
    }

    #[test]
    fn test_record_exposes_every_foreign_key() {
        let entity = Entity::from(event());
        assert_eq!(entity.kind(), EntityKind::ProgramSequencePatternEvent);
        assert_eq!(
            entity.references(),
            vec![
                (Ref::ProgramId, Uuid::from_u128(2)),
                (Ref::ProgramVoiceTrackId, Uuid::from_u128(4)),
                (Ref::ProgramSequencePatternId, Uuid::from_u128(3)),
            ]
        );
        assert_eq!(entity.reference(Ref::ProgramVoiceId), None);
    }

    #[test]
    fn test_set_reference_rejects_missing_column() {
        let mut entity = Entity::from(event());
        assert!(entity.set_reference(Ref::ProgramVoiceTrackId, Uuid::from_u128(9)));
        assert!(!entity.set_reference(Ref::ProgramVoiceId, Uuid::from_u128(9)));
        assert_eq!(entity.reference(Ref::ProgramVoiceTrackId), Some(Uuid::from_u128(9)));
    }

    #[test]
    fn test_owner_walks_to_parent() {
        let entity = Entity::from(event());
        assert_eq!(entity.owner(), Some((EntityKind::Program, Uuid::from_u128(2))));
        let account = Entity::Account(Account {
            id: Uuid::nil(),
            name: "a".to_string(),
        });
        assert_eq!(account.owner(), None);
    }

    #[test]
    fn test_into_record_checks_kind() {
        let entity = Entity::from(event());
        assert!(entity.clone().into_record::<ProgramVoice>().is_err());
        let back: ProgramSequencePatternEvent = entity.into_record().unwrap();
        assert_eq!(back, event());
    }

    #[test]
    fn test_entity_serializes_with_type_tag() {
        let json = serde_json::to_value(Entity::from(event())).unwrap();
        assert_eq!(json["type"], "program_sequence_pattern_event");
        assert_eq!(json["attributes"]["tones"], "C4");
    }
}
