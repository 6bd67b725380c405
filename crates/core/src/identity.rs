//! Author identity attached to written documents.
//!
//! There is deliberately no ambient "current user": every write takes an
//! explicit [`Identity`], so a per-operation override is just a different
//! argument and can never leak into the next call.

use serde::{Deserialize, Serialize};

/// Who a document is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Short handle, e.g. `alice`.
    pub handle: String,
    /// Contact address, e.g. `alice@example.com`.
    pub email: String,
}

impl Identity {
    pub fn new(handle: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            email: email.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.handle, self.email)
    }
}
