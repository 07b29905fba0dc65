//! Centralized default constants for cadence.

// =============================================================================
// DATABASE
// =============================================================================

/// Database URL used when `DATABASE_URL` is unset.
pub const DATABASE_URL: &str = "postgres://localhost/cadence";

/// Maximum pooled connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Minimum idle connections kept open.
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// Seconds to wait for a connection before failing.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Seconds an idle connection is kept.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// LOGGING
// =============================================================================

/// Filter used when `RUST_LOG` is unset.
pub const LOG_FILTER: &str = "cadence_cli=info,cadence_db=info";

/// Output format used when `LOG_FORMAT` is unset.
pub const LOG_FORMAT: &str = "text";
