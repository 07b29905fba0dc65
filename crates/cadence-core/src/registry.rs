//! Entity type descriptors, ordered per aggregate.
//!
//! The order of each list is the order rows are cloned in. A descriptor may
//! only name, as scope or ancestor, a kind that is the aggregate root, one
//! that appears earlier in the same list, or one the engine maps before the
//! list runs (the owning program of a sub-aggregate and the voices and
//! tracks it materializes).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{EntityKind, Ref};

/// Static metadata for cloning one table within one aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    /// Rows are selected where this column holds an already-mapped id.
    pub scope: Ref,
    /// Other foreign keys rewritten through the identity map.
    pub ancestors: &'static [Ref],
}

impl EntityDescriptor {
    const fn new(kind: EntityKind, scope: Ref, ancestors: &'static [Ref]) -> Self {
        Self {
            kind,
            scope,
            ancestors,
        }
    }

    /// Scope column followed by the ancestor columns.
    pub fn remapped_fields(&self) -> impl Iterator<Item = Ref> + '_ {
        std::iter::once(self.scope).chain(self.ancestors.iter().copied())
    }
}

/// Root entity a clone operation is invoked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    Library,
    Instrument,
    Program,
    Template,
    Sequence,
    Pattern,
    Chord,
}

impl AggregateKind {
    pub const ALL: &'static [AggregateKind] = &[
        AggregateKind::Library,
        AggregateKind::Instrument,
        AggregateKind::Program,
        AggregateKind::Template,
        AggregateKind::Sequence,
        AggregateKind::Pattern,
        AggregateKind::Chord,
    ];

    /// Kind of the root row.
    pub fn root_kind(&self) -> EntityKind {
        match self {
            AggregateKind::Library => EntityKind::Library,
            AggregateKind::Instrument => EntityKind::Instrument,
            AggregateKind::Program => EntityKind::Program,
            AggregateKind::Template => EntityKind::Template,
            AggregateKind::Sequence => EntityKind::ProgramSequence,
            AggregateKind::Pattern => EntityKind::ProgramSequencePattern,
            AggregateKind::Chord => EntityKind::ProgramSequenceChord,
        }
    }

    /// Sub-aggregates live inside a program and may be cloned into another one.
    pub fn is_program_part(&self) -> bool {
        matches!(
            self,
            AggregateKind::Sequence | AggregateKind::Pattern | AggregateKind::Chord
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateKind::Library => "library",
            AggregateKind::Instrument => "instrument",
            AggregateKind::Program => "program",
            AggregateKind::Template => "template",
            AggregateKind::Sequence => "sequence",
            AggregateKind::Pattern => "pattern",
            AggregateKind::Chord => "chord",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "library" => Ok(Self::Library),
            "instrument" => Ok(Self::Instrument),
            "program" => Ok(Self::Program),
            "template" => Ok(Self::Template),
            "sequence" => Ok(Self::Sequence),
            "pattern" => Ok(Self::Pattern),
            "chord" => Ok(Self::Chord),
            _ => Err(format!("Invalid aggregate kind: {}", s)),
        }
    }
}

use EntityKind as K;

const PROGRAM: &[EntityDescriptor] = &[
    EntityDescriptor::new(K::ProgramMeme, Ref::ProgramId, &[]),
    EntityDescriptor::new(K::ProgramVoice, Ref::ProgramId, &[]),
    EntityDescriptor::new(K::ProgramVoiceTrack, Ref::ProgramId, &[Ref::ProgramVoiceId]),
    EntityDescriptor::new(K::ProgramSequence, Ref::ProgramId, &[]),
    EntityDescriptor::new(K::ProgramSequenceChord, Ref::ProgramId, &[Ref::ProgramSequenceId]),
    EntityDescriptor::new(
        K::ProgramSequenceChordVoicing,
        Ref::ProgramId,
        &[Ref::ProgramSequenceChordId, Ref::ProgramVoiceId],
    ),
    EntityDescriptor::new(K::ProgramSequenceBinding, Ref::ProgramId, &[Ref::ProgramSequenceId]),
    EntityDescriptor::new(
        K::ProgramSequenceBindingMeme,
        Ref::ProgramId,
        &[Ref::ProgramSequenceBindingId],
    ),
    EntityDescriptor::new(
        K::ProgramSequencePattern,
        Ref::ProgramId,
        &[Ref::ProgramSequenceId, Ref::ProgramVoiceId],
    ),
    EntityDescriptor::new(
        K::ProgramSequencePatternEvent,
        Ref::ProgramId,
        &[Ref::ProgramSequencePatternId, Ref::ProgramVoiceTrackId],
    ),
];

const INSTRUMENT: &[EntityDescriptor] = &[
    EntityDescriptor::new(K::InstrumentMeme, Ref::InstrumentId, &[]),
    EntityDescriptor::new(K::InstrumentAudio, Ref::InstrumentId, &[]),
];

// Playbacks are per-user session state and are never cloned.
const TEMPLATE: &[EntityDescriptor] = &[EntityDescriptor::new(
    K::TemplateBinding,
    Ref::TemplateId,
    &[],
)];

// Programs and instruments arrive through the cascade, not as rows.
const LIBRARY: &[EntityDescriptor] = &[];

const SEQUENCE: &[EntityDescriptor] = &[
    EntityDescriptor::new(K::ProgramSequenceChord, Ref::ProgramSequenceId, &[Ref::ProgramId]),
    EntityDescriptor::new(
        K::ProgramSequenceChordVoicing,
        Ref::ProgramSequenceChordId,
        &[Ref::ProgramId, Ref::ProgramVoiceId],
    ),
    EntityDescriptor::new(K::ProgramSequenceBinding, Ref::ProgramSequenceId, &[Ref::ProgramId]),
    EntityDescriptor::new(
        K::ProgramSequenceBindingMeme,
        Ref::ProgramSequenceBindingId,
        &[Ref::ProgramId],
    ),
    EntityDescriptor::new(
        K::ProgramSequencePattern,
        Ref::ProgramSequenceId,
        &[Ref::ProgramId, Ref::ProgramVoiceId],
    ),
    EntityDescriptor::new(
        K::ProgramSequencePatternEvent,
        Ref::ProgramSequencePatternId,
        &[Ref::ProgramId, Ref::ProgramVoiceTrackId],
    ),
];

const PATTERN: &[EntityDescriptor] = &[EntityDescriptor::new(
    K::ProgramSequencePatternEvent,
    Ref::ProgramSequencePatternId,
    &[Ref::ProgramId, Ref::ProgramVoiceTrackId],
)];

const CHORD: &[EntityDescriptor] = &[EntityDescriptor::new(
    K::ProgramSequenceChordVoicing,
    Ref::ProgramSequenceChordId,
    &[Ref::ProgramId, Ref::ProgramVoiceId],
)];

/// Ordered descendant descriptors for an aggregate.
pub fn descriptors_for(aggregate: AggregateKind) -> &'static [EntityDescriptor] {
    match aggregate {
        AggregateKind::Library => LIBRARY,
        AggregateKind::Instrument => INSTRUMENT,
        AggregateKind::Program => PROGRAM,
        AggregateKind::Template => TEMPLATE,
        AggregateKind::Sequence => SEQUENCE,
        AggregateKind::Pattern => PATTERN,
        AggregateKind::Chord => CHORD,
    }
}

/// Kinds the engine maps before running a sub-aggregate's list.
pub fn external_kinds(aggregate: AggregateKind) -> &'static [EntityKind] {
    if aggregate.is_program_part() {
        &[K::Program, K::ProgramVoice, K::ProgramVoiceTrack]
    } else {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_list_is_topologically_ordered() {
        for aggregate in AggregateKind::ALL {
            let mut known = vec![aggregate.root_kind()];
            known.extend_from_slice(external_kinds(*aggregate));
            for descriptor in descriptors_for(*aggregate) {
                for field in descriptor.remapped_fields() {
                    assert!(
                        known.contains(&field.target()),
                        "{aggregate}: {}.{field} needs {} earlier in the list",
                        descriptor.kind,
                        field.target()
                    );
                }
                known.push(descriptor.kind);
            }
        }
    }

    #[test]
    fn test_descriptor_kinds_are_unique_per_aggregate() {
        for aggregate in AggregateKind::ALL {
            let list = descriptors_for(*aggregate);
            for (i, a) in list.iter().enumerate() {
                assert!(list[i + 1..].iter().all(|b| b.kind != a.kind));
            }
        }
    }

    #[test]
    fn test_program_lists_every_program_table() {
        let kinds: Vec<EntityKind> = descriptors_for(AggregateKind::Program)
            .iter()
            .map(|d| d.kind)
            .collect();
        assert_eq!(kinds.len(), 10);
        assert!(kinds.iter().all(|k| k.table().starts_with("program_")));
    }

    #[test]
    fn test_top_level_scopes_point_at_root() {
        for aggregate in [
            AggregateKind::Program,
            AggregateKind::Instrument,
            AggregateKind::Template,
        ] {
            for descriptor in descriptors_for(aggregate) {
                assert_eq!(descriptor.scope.target(), aggregate.root_kind());
            }
        }
    }

    #[test]
    fn test_pattern_event_remaps_both_branches() {
        let event = descriptors_for(AggregateKind::Program)
            .iter()
            .find(|d| d.kind == EntityKind::ProgramSequencePatternEvent)
            .unwrap();
        assert_eq!(
            event.ancestors,
            &[Ref::ProgramSequencePatternId, Ref::ProgramVoiceTrackId]
        );
    }

    #[test]
    fn test_aggregate_kind_parse() {
        assert_eq!("Chord".parse::<AggregateKind>(), Ok(AggregateKind::Chord));
        assert!("segment".parse::<AggregateKind>().is_err());
    }
}
