//! Permission levels for gateway operations

use hyper::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission levels for proxied operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
#[derive(Default)]
pub enum PermissionLevel {
    /// Read-only operations: downloads, listings, status queries
    #[default]
    Read = 0,
    /// Mutating operations: uploads, deletes, triggers, transitions
    Write = 1,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Read => write!(f, "READ"),
            PermissionLevel::Write => write!(f, "WRITE"),
        }
    }
}

/// Permission level a request method needs. Anything that can mutate
/// backend state requires a write-scoped key.
pub fn required_permission(method: &Method) -> PermissionLevel {
    match *method {
        Method::GET | Method::HEAD => PermissionLevel::Read,
        _ => PermissionLevel::Write,
    }
}
