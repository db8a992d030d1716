//! Acting principal recorded on every mutation.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Who performed an operation.
///
/// Passed explicitly into every ledger operation and stamped on stock records,
/// journal entries and published events.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// Automated or unattended work (imports, compensations, schedulers).
    #[default]
    System,
    User(UserId),
}

impl Actor {
    pub fn user(id: UserId) -> Self {
        Actor::User(id)
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Actor::System => f.write_str("system"),
            Actor::User(id) => write!(f, "user:{id}"),
        }
    }
}
