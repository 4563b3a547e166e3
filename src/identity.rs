//! Caller identity resolution for Sitebook commands.
//!
//! Every command acts as someone: a user id and a role, optionally with a
//! display name. Rather than requiring flags on every invocation, each field
//! is resolved through a chain, first source wins:
//!
//! 1. `--user-id`, `--role`, `--username` flags
//! 2. `SITEBOOK_USER_ID`, `SITEBOOK_ROLE`, `SITEBOOK_USERNAME` env vars
//! 3. the `[identity]` table in `~/.sitebook/config.toml`
//!
//! The resolved [`Identity`] is passed explicitly into every workflow call.

use std::env;

use crate::config::IdentityConfig;
use crate::model::{Identity, Role};
use crate::workflow::WorkflowError;

/// Error message shown when identity cannot be resolved.
pub const IDENTITY_REQUIRED: &str = "caller identity required: pass --user-id and --role, \
    set SITEBOOK_USER_ID and SITEBOOK_ROLE, or add an [identity] table to ~/.sitebook/config.toml";

/// One source's view of the caller. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialIdentity {
    pub id: Option<i64>,
    pub role: Option<String>,
    pub username: Option<String>,
}

impl PartialIdentity {
    /// Read the `SITEBOOK_*` variables. Empty values count as unset.
    pub fn from_env() -> Result<Self, WorkflowError> {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        let id = var("SITEBOOK_USER_ID")
            .map(|raw| {
                raw.trim().parse::<i64>().map_err(|_| {
                    WorkflowError::BadRequest(format!("SITEBOOK_USER_ID is not a number: {raw}"))
                })
            })
            .transpose()?;

        Ok(Self {
            id,
            role: var("SITEBOOK_ROLE"),
            username: var("SITEBOOK_USERNAME"),
        })
    }

    /// Fill every missing field from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            id: self.id.or(fallback.id),
            role: self.role.or(fallback.role),
            username: self.username.or(fallback.username),
        }
    }

    /// Finish resolution. Missing id or role is `Unauthorized`; a role off
    /// the allow-list is `BadRequest`.
    pub fn into_identity(self) -> Result<Identity, WorkflowError> {
        let (Some(id), Some(role)) = (self.id, self.role) else {
            return Err(WorkflowError::Unauthorized(IDENTITY_REQUIRED.to_string()));
        };
        let role = role
            .parse::<Role>()
            .map_err(|e| WorkflowError::BadRequest(e.to_string()))?;

        Ok(Identity {
            id,
            role,
            username: self.username.filter(|u| !u.trim().is_empty()),
        })
    }
}

impl From<&IdentityConfig> for PartialIdentity {
    fn from(config: &IdentityConfig) -> Self {
        Self {
            id: config.id,
            role: config.role.clone().filter(|r| !r.trim().is_empty()),
            username: config.username.clone(),
        }
    }
}

/// Resolve the acting identity from the tiered chain.
pub fn resolve_identity(
    explicit: PartialIdentity,
    config: &IdentityConfig,
) -> Result<Identity, WorkflowError> {
    explicit
        .or(PartialIdentity::from_env()?)
        .or(PartialIdentity::from(config))
        .into_identity()
}
