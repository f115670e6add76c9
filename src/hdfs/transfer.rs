//! WebHDFS control+data transfer protocol
//!
//! Writes are negotiated with the namenode first: a CREATE control request
//! answered with HTTP 307 hands the byte transfer off to a datanode named
//! in the `Location` header. The client must not auto-follow that redirect
//! (the follow-up PUT carries the payload) and must not repeat the
//! identity/protocol query parameters on the datanode URL - duplicating
//! them produces inconsistent backend behavior. Reads redirect the same
//! way but are followed transparently, so two HTTP clients are held: one
//! with redirects disabled for the write path, one with the default policy
//! for everything else.
//!
//! No retries happen at this layer. A connection-level failure in any
//! phase surfaces as [`HdfsError::Transport`] and retry policy stays with
//! the caller.

use bytes::Bytes;
use reqwest::{header, Method, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::hdfs::error::HdfsError;

/// Phases of one write exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Control request in flight
    Negotiating,
    /// Namenode answered 307; datanode location is known
    Redirected,
    /// Namenode performed the write without a datanode hop (any other 2xx;
    /// backend-version-dependent)
    Immediate,
    /// Payload PUT in flight
    Transferring,
    Done,
    Failed,
}

/// Per-upload state, created at the start of one write invocation and
/// discarded at return. Never shared across calls.
#[derive(Debug)]
pub struct TransferSession {
    path: String,
    redirect_location: Option<String>,
    phase: TransferPhase,
}

impl TransferSession {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            redirect_location: None,
            phase: TransferPhase::Negotiating,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    pub fn redirect_location(&self) -> Option<&str> {
        self.redirect_location.as_deref()
    }

    /// Negotiation produced a datanode handoff
    pub fn redirected(&mut self, location: String) {
        self.redirect_location = Some(location);
        self.phase = TransferPhase::Redirected;
    }

    /// Negotiation completed the write in place
    pub fn immediate(&mut self) {
        self.phase = TransferPhase::Immediate;
    }

    /// Payload transfer to the datanode has started
    pub fn begin_transfer(&mut self) {
        self.phase = TransferPhase::Transferring;
    }

    pub fn complete(&mut self) {
        self.phase = TransferPhase::Done;
    }

    pub fn fail(&mut self) {
        self.phase = TransferPhase::Failed;
    }
}

/// Outcome of the write control phase
#[derive(Debug)]
pub enum WriteNegotiation {
    /// Datanode URL from the 307 Location header
    Redirect(String),
    /// Backend wrote in place; skip the data phase
    Immediate,
}

/// Knobs for the write control request, query-encoded onto the CREATE call
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub overwrite: bool,
    pub replication: u16,
    pub block_size: u64,
    /// Octal permission bits, omitted when None
    pub permission: Option<u32>,
    pub buffer_size: Option<u32>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            replication: 3,
            block_size: 128 * 1024 * 1024,
            permission: None,
            buffer_size: None,
        }
    }
}

/// Low-level WebHDFS transport
pub struct HdfsTransport {
    /// `{namenode}/webhdfs/v1`
    endpoint: String,
    user: String,
    /// Follows redirects; reads and control operations
    http: reqwest::Client,
    /// Never follows redirects; write negotiation and payload transfer
    no_redirect: reqwest::Client,
}

impl HdfsTransport {
    pub fn new(namenode_url: &str, user: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        let no_redirect = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            endpoint: format!("{}/webhdfs/v1", namenode_url.trim_end_matches('/')),
            user: user.to_string(),
            http,
            no_redirect,
        }
    }

    /// Absolute URL for a remote path, percent-encoding each segment
    fn url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!("{}{}", self.endpoint, encoded.join("/"))
    }

    /// Run the write control phase.
    ///
    /// Returns the datanode URL when the namenode answers 307 with a
    /// Location header. A 307 without Location is a protocol violation.
    /// Any other 2xx means the backend performed the write without a
    /// datanode hop.
    pub async fn negotiate_write(
        &self,
        path: &str,
        opts: &WriteOptions,
    ) -> Result<WriteNegotiation, HdfsError> {
        let mut params: Vec<(&str, String)> = vec![
            ("op", "CREATE".to_string()),
            ("user.name", self.user.clone()),
            ("overwrite", opts.overwrite.to_string()),
            ("replication", opts.replication.to_string()),
            ("blocksize", opts.block_size.to_string()),
            ("noredirect", "false".to_string()),
        ];
        if let Some(bits) = opts.permission {
            params.push(("permission", format!("{:o}", bits)));
        }
        if let Some(size) = opts.buffer_size {
            params.push(("buffersize", size.to_string()));
        }

        let resp = self
            .no_redirect
            .put(self.url(path))
            .query(&params)
            .send()
            .await?;
        let status = resp.status();

        if status == StatusCode::TEMPORARY_REDIRECT {
            let location = resp
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            return match location {
                Some(location) => {
                    debug!(path, %location, "write negotiated, datanode handoff");
                    Ok(WriteNegotiation::Redirect(location))
                }
                None => Err(HdfsError::Protocol(
                    "307 write response missing Location header".to_string(),
                )),
            };
        }

        if status.is_success() {
            debug!(path, %status, "write completed in control phase");
            return Ok(WriteNegotiation::Immediate);
        }

        let body = resp.bytes().await.unwrap_or_default();
        Err(HdfsError::classify(status, &body))
    }

    /// PUT the raw payload to the datanode named by the redirect.
    ///
    /// The redirect URL already carries everything the datanode needs;
    /// no query parameters are added here.
    pub async fn transfer_payload(
        &self,
        location: &str,
        payload: Bytes,
    ) -> Result<(), HdfsError> {
        let resp = self
            .no_redirect
            .put(location)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await?;
        let status = resp.status();

        if status.is_success() {
            return Ok(());
        }

        let body = resp.bytes().await.unwrap_or_default();
        Err(HdfsError::classify(status, &body))
    }

    /// Full write exchange: negotiate, then transfer when redirected.
    ///
    /// Success here only means the protocol completed; callers confirm the
    /// committed bytes with a follow-up status query.
    pub async fn write(
        &self,
        path: &str,
        payload: Bytes,
        opts: &WriteOptions,
    ) -> Result<(), HdfsError> {
        let mut session = TransferSession::new(path);

        match self.negotiate_write(path, opts).await {
            Ok(WriteNegotiation::Redirect(location)) => {
                session.redirected(location.clone());
                session.begin_transfer();
                match self.transfer_payload(&location, payload).await {
                    Ok(()) => {
                        session.complete();
                        Ok(())
                    }
                    Err(e) => {
                        session.fail();
                        Err(e)
                    }
                }
            }
            Ok(WriteNegotiation::Immediate) => {
                session.immediate();
                session.complete();
                Ok(())
            }
            Err(e) => {
                session.fail();
                Err(e)
            }
        }
    }

    /// Read a file. Reads proxy transparently: the datanode redirect is
    /// followed automatically, unlike writes.
    pub async fn read(&self, path: &str) -> Result<Bytes, HdfsError> {
        let params = [
            ("op", "OPEN".to_string()),
            ("user.name", self.user.clone()),
        ];
        let resp = self.http.get(self.url(path)).query(&params).send().await?;
        let status = resp.status();

        if status.is_success() {
            return Ok(resp.bytes().await?);
        }

        let body = resp.bytes().await.unwrap_or_default();
        Err(HdfsError::classify(status, &body))
    }

    /// Generic control request for delete/mkdir/rename/list/status.
    ///
    /// Always includes the identity parameter. Returns the parsed JSON
    /// body (Null when the backend sends no body).
    pub async fn control_request(
        &self,
        method: Method,
        path: &str,
        op: &str,
        extra: &[(&str, String)],
    ) -> Result<serde_json::Value, HdfsError> {
        let mut params: Vec<(&str, String)> = vec![
            ("op", op.to_string()),
            ("user.name", self.user.clone()),
        ];
        params.extend(extra.iter().map(|(k, v)| (*k, v.clone())));

        debug!(%method, path, op, "control request");

        let resp = self
            .http
            .request(method, self.url(path))
            .query(&params)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await.unwrap_or_default();

        if !status.is_success() {
            return Err(HdfsError::classify(status, &body));
        }

        if body.is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_slice(&body).map_err(|e| {
            HdfsError::Protocol(format!("unparseable {} response body: {}", op, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_redirect_path() {
        let mut session = TransferSession::new("/t/a.bin");
        assert_eq!(session.phase(), TransferPhase::Negotiating);
        assert!(session.redirect_location().is_none());

        session.redirected("http://dn:9864/t/a.bin".to_string());
        assert_eq!(session.phase(), TransferPhase::Redirected);
        assert_eq!(
            session.redirect_location(),
            Some("http://dn:9864/t/a.bin")
        );

        session.begin_transfer();
        assert_eq!(session.phase(), TransferPhase::Transferring);

        session.complete();
        assert_eq!(session.phase(), TransferPhase::Done);
    }

    #[test]
    fn test_session_immediate_path() {
        let mut session = TransferSession::new("/t/a.bin");
        session.immediate();
        assert_eq!(session.phase(), TransferPhase::Immediate);
        assert!(session.redirect_location().is_none());

        session.complete();
        assert_eq!(session.phase(), TransferPhase::Done);
    }

    #[test]
    fn test_session_failure() {
        let mut session = TransferSession::new("/t/a.bin");
        session.fail();
        assert_eq!(session.phase(), TransferPhase::Failed);
        assert_eq!(session.path(), "/t/a.bin");
    }

    #[test]
    fn test_write_options_defaults() {
        let opts = WriteOptions::default();
        assert!(!opts.overwrite);
        assert_eq!(opts.replication, 3);
        assert_eq!(opts.block_size, 134217728);
        assert!(opts.permission.is_none());
        assert!(opts.buffer_size.is_none());
    }

    #[test]
    fn test_url_encodes_path_segments() {
        let transport =
            HdfsTransport::new("http://nn:9870/", "hadoop", Duration::from_secs(5));
        assert_eq!(
            transport.url("/data/a b.bin"),
            "http://nn:9870/webhdfs/v1/data/a%20b.bin"
        );
        assert_eq!(transport.url("/plain"), "http://nn:9870/webhdfs/v1/plain");
    }
}
