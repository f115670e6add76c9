//! Path operation facade
//!
//! [`HdfsClient`] is the only HDFS surface the rest of the gateway calls:
//! seven uniform operations taking and returning plain data. No protocol
//! detail crosses this boundary, and classified errors pass through
//! unchanged - this layer never re-wraps or reclassifies.

use bytes::Bytes;
use reqwest::Method;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::hdfs::error::HdfsError;
use crate::hdfs::status::{
    descriptors_from_listing, FileStatusBody, FileStatusesBody, PathDescriptor,
};
use crate::hdfs::transfer::HdfsTransport;

pub use crate::hdfs::transfer::WriteOptions;

/// Wire wrapper for GETHOMEDIRECTORY: `{"Path": "/user/hadoop"}`
#[derive(Debug, Deserialize)]
struct HomeDirectoryBody {
    #[serde(rename = "Path")]
    path: String,
}

/// Wire wrapper for DELETE/MKDIRS/RENAME: `{"boolean": true}`
///
/// The backend reports some failures as a 2xx carrying `false` here, a
/// rename of an absent source being the common case.
#[derive(Debug, Deserialize)]
struct BooleanBody {
    #[serde(rename = "boolean")]
    success: bool,
}

fn boolean_result(op: &str, body: serde_json::Value) -> Result<bool, HdfsError> {
    let parsed: BooleanBody = serde_json::from_value(body)
        .map_err(|e| HdfsError::Protocol(format!("malformed {} response body: {}", op, e)))?;
    Ok(parsed.success)
}

/// Connection settings, set once at construction and immutable after.
#[derive(Debug, Clone)]
pub struct HdfsConfig {
    /// Namenode HTTP address, e.g. `http://namenode:9870`
    pub base_url: String,
    /// User sent as the identity parameter on every request
    pub identity_user: String,
    /// Applied uniformly to every protocol phase
    pub request_timeout: Duration,
}

/// HDFS facade over the WebHDFS transfer protocol
///
/// Operations on distinct paths are fully independent; concurrent calls
/// share the pooled HTTP clients inside the transport. Same-path races are
/// left to the backend's own conflict semantics - nothing is locked or
/// queued here.
pub struct HdfsClient {
    config: HdfsConfig,
    transport: HdfsTransport,
}

impl HdfsClient {
    pub fn new(config: HdfsConfig) -> Self {
        let transport = HdfsTransport::new(
            &config.base_url,
            &config.identity_user,
            config.request_timeout,
        );
        Self { config, transport }
    }

    pub fn config(&self) -> &HdfsConfig {
        &self.config
    }

    /// Upload a file.
    ///
    /// Conflicts on `overwrite=false` are delegated to the backend, never
    /// pre-checked locally. The concluding status query is mandatory:
    /// control-phase success alone does not guarantee the bytes were
    /// committed.
    pub async fn upload(
        &self,
        path: &str,
        payload: Bytes,
        opts: WriteOptions,
    ) -> Result<PathDescriptor, HdfsError> {
        let size = payload.len();
        self.transport.write(path, payload, &opts).await?;
        let descriptor = self.status(path).await?;
        debug!(path, size, "upload confirmed");
        Ok(descriptor)
    }

    /// Download a file's full contents
    pub async fn download(&self, path: &str) -> Result<Bytes, HdfsError> {
        self.transport.read(path).await
    }

    /// Delete a path. Deleting a non-empty directory with
    /// `recursive=false` is backend-defined and not special-cased here.
    /// The backend may signal an absent path as `{"boolean": false}`
    /// rather than a 404.
    pub async fn delete(&self, path: &str, recursive: bool) -> Result<(), HdfsError> {
        let body = self
            .transport
            .control_request(
                Method::DELETE,
                path,
                "DELETE",
                &[("recursive", recursive.to_string())],
            )
            .await?;
        if !boolean_result("DELETE", body)? {
            return Err(HdfsError::NotFound(format!("nothing deleted at {}", path)));
        }
        Ok(())
    }

    /// Create a directory (and any missing ancestors). Idempotent:
    /// creating an existing directory succeeds.
    pub async fn mkdir(&self, path: &str, permission: Option<u32>) -> Result<(), HdfsError> {
        let extra: Vec<(&str, String)> = permission
            .map(|bits| vec![("permission", format!("{:o}", bits))])
            .unwrap_or_default();
        let body = self
            .transport
            .control_request(Method::PUT, path, "MKDIRS", &extra)
            .await?;
        if !boolean_result("MKDIRS", body)? {
            return Err(HdfsError::Unknown(format!(
                "directory not created: {}",
                path
            )));
        }
        Ok(())
    }

    /// Rename `src` to `dst`. Overwrite behavior at `dst` is
    /// backend-defined. An absent `src` comes back as a 2xx with
    /// `{"boolean": false}` and surfaces as NotFound.
    pub async fn rename(&self, src: &str, dst: &str) -> Result<(), HdfsError> {
        let body = self
            .transport
            .control_request(
                Method::PUT,
                src,
                "RENAME",
                &[("destination", dst.to_string())],
            )
            .await?;
        if !boolean_result("RENAME", body)? {
            return Err(HdfsError::NotFound(format!(
                "rename failed, source not found: {}",
                src
            )));
        }
        Ok(())
    }

    /// List the immediate children of a directory, in backend order.
    /// Empty directories yield an empty vec.
    pub async fn list(&self, path: &str) -> Result<Vec<PathDescriptor>, HdfsError> {
        let body = self
            .transport
            .control_request(Method::GET, path, "LISTSTATUS", &[])
            .await?;
        let listing: FileStatusesBody = serde_json::from_value(body)
            .map_err(|e| HdfsError::Protocol(format!("malformed LISTSTATUS body: {}", e)))?;
        descriptors_from_listing(path, &listing.file_statuses)
    }

    /// Fetch the descriptor for one path
    pub async fn status(&self, path: &str) -> Result<PathDescriptor, HdfsError> {
        let body = self
            .transport
            .control_request(Method::GET, path, "GETFILESTATUS", &[])
            .await?;
        let status: FileStatusBody = serde_json::from_value(body).map_err(|e| {
            HdfsError::Protocol(format!("malformed GETFILESTATUS body: {}", e))
        })?;
        PathDescriptor::from_status(path, &status.file_status)
    }

    /// Home directory of the configured identity user
    pub async fn home_directory(&self) -> Result<String, HdfsError> {
        let body = self
            .transport
            .control_request(Method::GET, "/", "GETHOMEDIRECTORY", &[])
            .await?;
        let home: HomeDirectoryBody = serde_json::from_value(body).map_err(|e| {
            HdfsError::Protocol(format!("malformed GETHOMEDIRECTORY body: {}", e))
        })?;
        Ok(home.path)
    }
}
