//! File store routes
//!
//! Thin HTTP shims over [`HdfsClient`]. Error kinds map onto response
//! codes here and nowhere else: NOT_FOUND is 404, CONFLICT is 409,
//! UNAUTHORIZED is 403, everything else is 500 with the classified kind
//! and message passed through verbatim.

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::hdfs::{HdfsError, WriteOptions};
use crate::server::AppState;

type Full = http_body_util::Full<Bytes>;

/// Map a classified file store error to a gateway response
pub fn error_response(err: &HdfsError) -> Response<Full> {
    let status = match err {
        HdfsError::NotFound(_) => StatusCode::NOT_FOUND,
        HdfsError::Conflict(_) => StatusCode::CONFLICT,
        HdfsError::Unauthorized(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = serde_json::json!({
        "error": err.kind(),
        "detail": err.to_string(),
    });

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full> {
    let body = serde_json::to_string(value)
        .unwrap_or_else(|_| r#"{"error":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

pub(crate) fn bad_request(message: &str) -> Response<Full> {
    let body = serde_json::json!({
        "error": "Bad Request",
        "detail": message,
    });

    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Look up one decoded query parameter
pub(crate) fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    query?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == key {
            urlencoding::decode(v).ok().map(|s| s.into_owned())
        } else {
            None
        }
    })
}

/// PUT /hdfs/files{path} - upload the request body to the file store
pub async fn hdfs_upload(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<Full> {
    let query = req.uri().query().map(|q| q.to_string());
    let query = query.as_deref();

    let mut opts = WriteOptions::default();
    if let Some(v) = query_param(query, "overwrite") {
        opts.overwrite = v == "true";
    }
    if let Some(v) = query_param(query, "replication") {
        match v.parse() {
            Ok(n) => opts.replication = n,
            Err(_) => return bad_request("Invalid replication value"),
        }
    }
    if let Some(v) = query_param(query, "blocksize") {
        match v.parse() {
            Ok(n) => opts.block_size = n,
            Err(_) => return bad_request("Invalid blocksize value"),
        }
    }
    if let Some(v) = query_param(query, "permission") {
        match u32::from_str_radix(&v, 8) {
            Ok(bits) => opts.permission = Some(bits),
            Err(_) => return bad_request("Invalid permission value"),
        }
    }

    let payload = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Upload body read error: {}", e);
            return bad_request("Failed to read request body");
        }
    };

    match state.hdfs.upload(path, payload, opts).await {
        Ok(descriptor) => json_response(StatusCode::CREATED, &descriptor),
        Err(e) => error_response(&e),
    }
}

/// GET /hdfs/files{path} - download a file's contents
pub async fn hdfs_download(state: Arc<AppState>, path: &str) -> Response<Full> {
    match state.hdfs.download(path).await {
        Ok(payload) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/octet-stream")
            .body(Full::new(payload))
            .unwrap(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /hdfs/files{path} - delete a path, optionally recursively
pub async fn hdfs_delete(
    state: Arc<AppState>,
    path: &str,
    query: Option<&str>,
) -> Response<Full> {
    let recursive = query_param(query, "recursive").as_deref() == Some("true");

    match state.hdfs.delete(path, recursive).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &serde_json::json!({"deleted": path, "recursive": recursive}),
        ),
        Err(e) => error_response(&e),
    }
}

/// PUT /hdfs/dirs{path} - create a directory and missing ancestors
pub async fn hdfs_mkdir(
    state: Arc<AppState>,
    path: &str,
    query: Option<&str>,
) -> Response<Full> {
    let permission = match query_param(query, "permission") {
        Some(v) => match u32::from_str_radix(&v, 8) {
            Ok(bits) => Some(bits),
            Err(_) => return bad_request("Invalid permission value"),
        },
        None => None,
    };

    match state.hdfs.mkdir(path, permission).await {
        Ok(()) => json_response(StatusCode::CREATED, &serde_json::json!({"created": path})),
        Err(e) => error_response(&e),
    }
}

/// POST /hdfs/rename?src={src}&dst={dst}
pub async fn hdfs_rename(state: Arc<AppState>, query: Option<&str>) -> Response<Full> {
    let src = match query_param(query, "src") {
        Some(s) => s,
        None => return bad_request("Missing src parameter"),
    };
    let dst = match query_param(query, "dst") {
        Some(d) => d,
        None => return bad_request("Missing dst parameter"),
    };

    match state.hdfs.rename(&src, &dst).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &serde_json::json!({"src": src, "dst": dst}),
        ),
        Err(e) => error_response(&e),
    }
}

/// GET /hdfs/list{path} - list a directory's immediate children
pub async fn hdfs_list(state: Arc<AppState>, path: &str) -> Response<Full> {
    match state.hdfs.list(path).await {
        Ok(entries) => json_response(StatusCode::OK, &entries),
        Err(e) => error_response(&e),
    }
}

/// GET /hdfs/status{path} - one path's descriptor
pub async fn hdfs_status(state: Arc<AppState>, path: &str) -> Response<Full> {
    match state.hdfs.status(path).await {
        Ok(descriptor) => json_response(StatusCode::OK, &descriptor),
        Err(e) => error_response(&e),
    }
}

/// GET /hdfs/home - home directory of the configured identity user
pub async fn hdfs_home(state: Arc<AppState>) -> Response<Full> {
    match state.hdfs.home_directory().await {
        Ok(home) => json_response(StatusCode::OK, &serde_json::json!({"home": home})),
        Err(e) => error_response(&e),
    }
}
