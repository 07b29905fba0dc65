//! Structured logging conventions for cadence.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Clone failed for a server or storage reason |
//! | WARN  | Clone rejected for a client reason |
//! | INFO  | Lifecycle events, clone completions |
//! | DEBUG | Per-descriptor passes, materialized voices and tracks |
//! | TRACE | Per-row inserts |
//!
//! ## Field names
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `subsystem` | Originating subsystem: `clone`, `db`, `cli` |
//! | `component` | Part of the subsystem: `manager`, `engine`, `cloner`, `cascade`, `materializer`, `pool` |
//! | `op` | Operation: `clone`, `clone_rows`, `materialize_voice`, `skip_voicing`, ... |
//! | `aggregate` | Aggregate being cloned |
//! | `entity_kind` | Table of the rows being processed |
//! | `source_id` | Id of the source row or root |
//! | `target_id` | Id of the new row or root |
//! | `row_count` | Rows written by one pass or one clone |
//! | `duration_ms` | Wall-clock duration in milliseconds |
//! | `error_kind` | Error classification, see [`crate::Error::kind`] |
