//! Caller access scope and the gate that authorizes a clone.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{text_enum, EntityKind};

text_enum! {
    /// Role granted to a caller. `Internal` and `Admin` are top-level.
    UserRole, "user role" {
        Internal => "internal",
        Admin => "admin",
        Engineer => "engineer",
        Artist => "artist",
        User => "user",
    }
}

/// What the caller may see and change, supplied by the request layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    pub user_id: Option<Uuid>,
    pub account_ids: Vec<Uuid>,
    pub roles: Vec<UserRole>,
}

impl AccessContext {
    /// Top-level context for operator tooling.
    pub fn internal() -> Self {
        Self {
            user_id: None,
            account_ids: Vec::new(),
            roles: vec![UserRole::Internal],
        }
    }

    pub fn for_accounts(user_id: Uuid, account_ids: Vec<Uuid>, roles: Vec<UserRole>) -> Self {
        Self {
            user_id: Some(user_id),
            account_ids,
            roles,
        }
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }

    /// Top-level callers see every account.
    pub fn is_top_level(&self) -> bool {
        self.has_role(UserRole::Internal) || self.has_role(UserRole::Admin)
    }

    pub fn has_account(&self, account_id: Uuid) -> bool {
        self.is_top_level() || self.account_ids.contains(&account_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Reading the source aggregate.
    Read,
    /// Writing into the destination container.
    Write,
}

/// One access check: the entity involved and the account that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessScope {
    pub mode: AccessMode,
    pub kind: EntityKind,
    pub id: Uuid,
    pub account_id: Uuid,
}

impl AccessScope {
    pub fn read(kind: EntityKind, id: Uuid, account_id: Uuid) -> Self {
        Self {
            mode: AccessMode::Read,
            kind,
            id,
            account_id,
        }
    }

    pub fn write(kind: EntityKind, id: Uuid, account_id: Uuid) -> Self {
        Self {
            mode: AccessMode::Write,
            kind,
            id,
            account_id,
        }
    }
}

/// Authorizes reads of the source and writes into the destination.
///
/// A denied read must surface as `Error::NotFound` so the existence of other
/// accounts' content is not revealed.
pub trait AccessGate: Send + Sync {
    fn require_access(&self, ctx: &AccessContext, scope: &AccessScope) -> Result<()>;
}

/// Default gate: account membership, plus the artist role to write.
#[derive(Debug, Clone, Copy, Default)]
pub struct HubGate;

impl HubGate {
    pub fn new() -> Self {
        Self
    }
}

impl AccessGate for HubGate {
    fn require_access(&self, ctx: &AccessContext, scope: &AccessScope) -> Result<()> {
        if ctx.is_top_level() {
            return Ok(());
        }
        match scope.mode {
            AccessMode::Read => {
                if ctx.has_account(scope.account_id) {
                    Ok(())
                } else {
                    Err(Error::NotFound(format!("{} {}", scope.kind, scope.id)))
                }
            }
            AccessMode::Write => {
                if !ctx.has_role(UserRole::Artist) && !ctx.has_role(UserRole::Engineer) {
                    return Err(Error::Forbidden("artist role required".to_string()));
                }
                if !ctx.has_account(scope.account_id) {
                    return Err(Error::Forbidden(format!(
                        "no write access to {} {}",
                        scope.kind, scope.id
                    )));
                }
                Ok(())
            }
        }
    }
}
