//! # cadence-core
//!
//! Core types, descriptors, and traits for the cadence content clone engine.
//!
//! This crate holds everything the engine needs that does no I/O: the typed
//! content rows, the per-aggregate descriptor lists, the identity map,
//! attribute inheritance, the access and validation collaborators, and the
//! persistence traits implemented by `cadence-db`.

pub mod access;
pub mod clone;
pub mod defaults;
pub mod error;
pub mod identity;
pub mod inherit;
pub mod logging;
pub mod models;
pub mod registry;
pub mod text;
pub mod traits;
pub mod uuid_utils;
pub mod validate;

// Re-export commonly used types at crate root
pub use access::{AccessContext, AccessGate, AccessMode, AccessScope, HubGate, UserRole};
pub use clone::{CloneRequest, CloneResult, ClonedAggregate, RootOverrides};
pub use error::{Error, Result};
pub use identity::IdentityMap;
pub use inherit::{
    ChordAttributes, Inherit, InstrumentAttributes, LibraryAttributes, PatternAttributes,
    ProgramAttributes, SequenceAttributes, TemplateAttributes,
};
pub use models::*;
pub use registry::{descriptors_for, external_kinds, AggregateKind, EntityDescriptor};
pub use traits::{ContentStore, ContentTx, ContentTxExt};
pub use uuid_utils::{is_v7, new_v7};
pub use validate::Validator;
