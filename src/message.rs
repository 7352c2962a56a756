use std::fmt;
use uuid::Uuid;

use crate::evidence::Evidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub role: Role,
    pub evidence: Option<Evidence>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: Role::User,
            evidence: None,
        }
    }

    pub fn bot(text: impl Into<String>, evidence: Option<Evidence>) -> Self {
        Self {
            text: text.into(),
            role: Role::Bot,
            evidence,
        }
    }
}

/// Token that ties an in-flight request to its placeholder entry.
///
/// UUID v7, so tokens sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(Uuid);

impl PendingId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loading-{}", self.0)
    }
}
