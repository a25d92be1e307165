//! Per-user access scoping.
//!
//! [`Scope`] is a mandatory argument on every index query function in the
//! engine. It is deliberately not `Default` and not `Option`-wrapped
//! anywhere: there is no way to run an unscoped search, and scoping is
//! applied inside the index query before ranking and truncation, never as a
//! post-filter on already-ranked results. Post-filtering would both leak
//! information through result counts and under-fill the top-k window.
//!
//! The `user_id` inside a scope must come from an authenticated context
//! upstream. This crate treats it as trusted input.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The access scope of a single request: the requesting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    user_id: Uuid,
}

impl Scope {
    /// Create a scope for an authenticated user.
    pub fn for_user(user_id: Uuid) -> Self {
        Self { user_id }
    }

    /// The scoped user id.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Whether this scope admits rows owned by `owner`.
    pub fn admits(&self, owner: Uuid) -> bool {
        self.user_id == owner
    }
}

// ============================================================================
// Tests
// ============================================================================
