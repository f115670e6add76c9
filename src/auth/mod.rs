//! Authentication and authorization for the gateway
//!
//! Provides:
//! - API key validation with a TTL'd decision cache
//! - Permission levels tying HTTP methods to key scopes

pub mod keys;
pub mod permissions;

pub use keys::KeyValidator;
pub use permissions::{required_permission, PermissionLevel};
