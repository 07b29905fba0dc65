//! Clone requests and results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::inherit::{
    ChordAttributes, InstrumentAttributes, LibraryAttributes, PatternAttributes,
    ProgramAttributes, SequenceAttributes, TemplateAttributes,
};
use crate::models::{Entity, InstrumentType};
use crate::registry::AggregateKind;

/// Source root plus the caller's partial override for the new root.
#[derive(Debug, Clone, PartialEq)]
pub struct CloneRequest<O> {
    pub source_id: Uuid,
    pub overrides: O,
}

impl<O: Default> CloneRequest<O> {
    /// Clone with every attribute inherited.
    pub fn verbatim(source_id: Uuid) -> Self {
        Self {
            source_id,
            overrides: O::default(),
        }
    }
}

impl<O> CloneRequest<O> {
    pub fn new(source_id: Uuid, overrides: O) -> Self {
        Self {
            source_id,
            overrides,
        }
    }
}

/// Override for any aggregate, for callers that dispatch at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "aggregate", rename_all = "lowercase")]
pub enum RootOverrides {
    Library(LibraryAttributes),
    Instrument(InstrumentAttributes),
    Program(ProgramAttributes),
    Template(TemplateAttributes),
    Sequence(SequenceAttributes),
    Pattern(PatternAttributes),
    Chord {
        #[serde(default)]
        attributes: ChordAttributes,
        /// When set, only voicings whose voice has one of these types are cloned.
        #[serde(default)]
        voicing_types: Option<Vec<InstrumentType>>,
    },
}

impl RootOverrides {
    pub fn aggregate(&self) -> AggregateKind {
        match self {
            RootOverrides::Library(_) => AggregateKind::Library,
            RootOverrides::Instrument(_) => AggregateKind::Instrument,
            RootOverrides::Program(_) => AggregateKind::Program,
            RootOverrides::Template(_) => AggregateKind::Template,
            RootOverrides::Sequence(_) => AggregateKind::Sequence,
            RootOverrides::Pattern(_) => AggregateKind::Pattern,
            RootOverrides::Chord { .. } => AggregateKind::Chord,
        }
    }

    /// Empty override for `aggregate`.
    pub fn empty(aggregate: AggregateKind) -> Self {
        match aggregate {
            AggregateKind::Library => RootOverrides::Library(Default::default()),
            AggregateKind::Instrument => RootOverrides::Instrument(Default::default()),
            AggregateKind::Program => RootOverrides::Program(Default::default()),
            AggregateKind::Template => RootOverrides::Template(Default::default()),
            AggregateKind::Sequence => RootOverrides::Sequence(Default::default()),
            AggregateKind::Pattern => RootOverrides::Pattern(Default::default()),
            AggregateKind::Chord => RootOverrides::Chord {
                attributes: Default::default(),
                voicing_types: None,
            },
        }
    }
}

/// New root and every row created under it, in creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct CloneResult {
    pub root: Entity,
    pub children: Vec<Entity>,
}

impl CloneResult {
    pub fn new(root: Entity) -> Self {
        Self {
            root,
            children: Vec::new(),
        }
    }

    /// Append another aggregate's root and children after ours.
    pub fn absorb(&mut self, other: CloneResult) {
        self.children.push(other.root);
        self.children.extend(other.children);
    }

    /// Rows written, including the root.
    pub fn row_count(&self) -> usize {
        1 + self.children.len()
    }
}

/// Cloned root with its related rows, shaped for a JSON:API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClonedAggregate {
    pub root: Entity,
    pub included: Vec<Entity>,
}

impl From<CloneResult> for ClonedAggregate {
    fn from(result: CloneResult) -> Self {
        Self {
            root: result.root,
            included: result.children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_overrides_parse_chord_with_voicing_types() {
        let json = r#"{"aggregate":"chord","attributes":{"name":"Cm"},"voicing_types":["bass"]}"#;
        let parsed: RootOverrides = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.aggregate(), AggregateKind::Chord);
        match parsed {
            RootOverrides::Chord {
                attributes,
                voicing_types,
            } => {
                assert_eq!(attributes.name.as_deref(), Some("Cm"));
                assert_eq!(voicing_types, Some(vec![InstrumentType::Bass]));
            }
            other => panic!("unexpected overrides: {other:?}"),
        }
    }

    #[test]
    fn test_root_overrides_parse_program() {
        let parsed: RootOverrides =
            serde_json::from_str(r#"{"aggregate":"program","name":"copy"}"#).unwrap();
        assert_eq!(parsed.aggregate(), AggregateKind::Program);
    }

    #[test]
    fn test_empty_matches_aggregate() {
        for aggregate in AggregateKind::ALL {
            assert_eq!(RootOverrides::empty(*aggregate).aggregate(), *aggregate);
        }
    }
}
