//! WebHDFS metadata normalization
//!
//! Raw `FileStatus` JSON from the namenode becomes a [`PathDescriptor`],
//! the only metadata shape the rest of the gateway sees.

use serde::{Deserialize, Serialize};

use crate::hdfs::error::HdfsError;

/// Raw WebHDFS FileStatus (fields we consume; the backend sends more)
#[derive(Debug, Clone, Deserialize)]
pub struct FileStatus {
    pub length: u64,
    #[serde(rename = "blockSize")]
    pub block_size: u64,
    pub replication: u16,
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Empty when describing the queried path itself, the child name in
    /// directory listings
    #[serde(rename = "pathSuffix", default)]
    pub path_suffix: String,
}

/// Wire wrapper: `{"FileStatus": {...}}`
#[derive(Debug, Deserialize)]
pub struct FileStatusBody {
    #[serde(rename = "FileStatus")]
    pub file_status: FileStatus,
}

/// Wire wrapper: `{"FileStatuses": {"FileStatus": [...]}}`
#[derive(Debug, Deserialize)]
pub struct FileStatusesBody {
    #[serde(rename = "FileStatuses")]
    pub file_statuses: FileStatuses,
}

#[derive(Debug, Deserialize)]
pub struct FileStatuses {
    #[serde(rename = "FileStatus")]
    pub file_status: Vec<FileStatus>,
}

/// Kind of a remote path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PathKind {
    File,
    Directory,
}

/// Normalized metadata for one remote path
///
/// `size_bytes` is meaningful only for files; directories report 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDescriptor {
    pub path: String,
    pub kind: PathKind,
    pub size_bytes: u64,
    pub block_size_bytes: u64,
    pub replication_factor: u16,
}

impl PathDescriptor {
    /// Build a descriptor from a raw FileStatus describing `path` itself.
    pub fn from_status(path: &str, raw: &FileStatus) -> Result<PathDescriptor, HdfsError> {
        let kind = match raw.entry_type.as_str() {
            "FILE" => PathKind::File,
            "DIRECTORY" => PathKind::Directory,
            other => {
                return Err(HdfsError::Protocol(format!(
                    "unrecognized entry type '{}' for {}",
                    other, path
                )))
            }
        };

        let full_path = if raw.path_suffix.is_empty() {
            path.to_string()
        } else {
            join_child(path, &raw.path_suffix)
        };

        Ok(PathDescriptor {
            path: full_path,
            kind,
            size_bytes: raw.length,
            block_size_bytes: raw.block_size,
            replication_factor: raw.replication,
        })
    }
}

/// Join a child name onto a parent path over the remote `/` grammar.
///
/// Tolerates the parent having or lacking a trailing slash and never
/// produces `//`.
pub fn join_child(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let child = child.trim_start_matches('/');
    if parent.is_empty() {
        format!("/{}", child)
    } else {
        format!("{}/{}", parent, child)
    }
}

/// Build descriptors for every immediate child of `parent`, preserving the
/// order the backend returned.
pub fn descriptors_from_listing(
    parent: &str,
    listing: &FileStatuses,
) -> Result<Vec<PathDescriptor>, HdfsError> {
    listing
        .file_status
        .iter()
        .map(|raw| PathDescriptor::from_status(parent, raw))
        .collect()
}
