//! WebHDFS client
//!
//! Talks to a Hadoop namenode over the WebHDFS REST protocol. Writes are a
//! two-phase exchange: the namenode answers the control request with HTTP
//! 307 naming the datanode that accepts the bytes, and the client PUTs the
//! payload there directly. Reads redirect the same way but are followed
//! transparently.
//!
//! Layering, bottom up:
//!
//! - [`error`] classifies raw backend responses into the closed
//!   [`HdfsError`] taxonomy, exactly once.
//! - [`status`] normalizes WebHDFS metadata JSON into [`PathDescriptor`]s.
//! - [`transfer`] runs the control+data protocol with explicit redirect
//!   handling and a per-upload [`TransferSession`] state machine.
//! - [`client`] is the facade the rest of the gateway sees: plain-data
//!   operations, no protocol detail crossing the boundary.

pub mod client;
pub mod error;
pub mod status;
pub mod transfer;

pub use client::{HdfsClient, HdfsConfig};
pub use error::HdfsError;
pub use status::{PathDescriptor, PathKind};
pub use transfer::{TransferPhase, TransferSession, WriteOptions};
