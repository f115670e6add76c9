//! End-to-end tests for the WebHDFS client against an in-process mock
//! namenode/datanode pair.
//!
//! The mock serves both roles on one listener: control requests under
//! /webhdfs/v1 answer with 307 redirects into /data, where the byte
//! transfer happens. State is a flat path map guarded by a mutex.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use gatehouse::hdfs::{HdfsClient, HdfsConfig, HdfsError, PathKind, WriteOptions};

/// None marks a directory, Some(bytes) a file
type Tree = Arc<Mutex<HashMap<String, Option<Bytes>>>>;

struct MockHdfs {
    url: String,
    tree: Tree,
}

impl MockHdfs {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let tree: Tree = Arc::new(Mutex::new(HashMap::from([("/".to_string(), None)])));

        let accept_tree = Arc::clone(&tree);
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => continue,
                };
                let tree = Arc::clone(&accept_tree);
                let base = format!("http://{}", addr);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req| {
                        let tree = Arc::clone(&tree);
                        let base = base.clone();
                        async move { Ok::<_, hyper::Error>(handle(req, tree, base).await) }
                    });
                    let _ = http1::Builder::new().serve_connection(io, service).await;
                });
            }
        });

        Self {
            url: format!("http://{}", addr),
            tree,
        }
    }

    fn client(&self) -> HdfsClient {
        HdfsClient::new(HdfsConfig {
            base_url: self.url.clone(),
            identity_user: "hadoop".to_string(),
            request_timeout: Duration::from_secs(5),
        })
    }

    fn seed_file(&self, path: &str, payload: &[u8]) {
        self.tree
            .lock()
            .unwrap()
            .insert(path.to_string(), Some(Bytes::copy_from_slice(payload)));
    }

    fn seed_dir(&self, path: &str) {
        self.tree.lock().unwrap().insert(path.to_string(), None);
    }
}

fn query_map(query: Option<&str>) -> HashMap<String, String> {
    query
        .unwrap_or("")
        .split('&')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let v = urlencoding::decode(v).ok()?.into_owned();
            Some((k.to_string(), v))
        })
        .collect()
}

fn json(status: StatusCode, value: serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(value.to_string())))
        .unwrap()
}

fn not_found(path: &str) -> Response<Full<Bytes>> {
    json(
        StatusCode::NOT_FOUND,
        serde_json::json!({
            "RemoteException": {
                "exception": "FileNotFoundException",
                "message": format!("File does not exist: {}", path),
            }
        }),
    )
}

fn file_status(entry: &Option<Bytes>, suffix: &str) -> serde_json::Value {
    let (entry_type, length) = match entry {
        Some(bytes) => ("FILE", bytes.len() as u64),
        None => ("DIRECTORY", 0),
    };
    serde_json::json!({
        "length": length,
        "blockSize": 1048576u64,
        "replication": 1,
        "type": entry_type,
        "pathSuffix": suffix,
        "owner": "hadoop",
        "permission": "644",
    })
}

/// Immediate parent of a path, "/" for top-level entries
fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "/",
    }
}

async fn handle(req: Request<Incoming>, tree: Tree, base: String) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let params = query_map(req.uri().query());

    // Datanode role
    if let Some(remote) = path.strip_prefix("/data") {
        let remote = remote.to_string();
        return match method {
            Method::PUT => {
                let payload = req.collect().await.unwrap().to_bytes();
                tree.lock().unwrap().insert(remote, Some(payload));
                Response::builder()
                    .status(StatusCode::CREATED)
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            }
            Method::GET => match tree.lock().unwrap().get(&remote) {
                Some(Some(bytes)) => Response::builder()
                    .status(StatusCode::OK)
                    .header("Content-Type", "application/octet-stream")
                    .body(Full::new(bytes.clone()))
                    .unwrap(),
                _ => not_found(&remote),
            },
            _ => json(StatusCode::BAD_REQUEST, serde_json::json!({})),
        };
    }

    // Namenode role
    let remote = path.strip_prefix("/webhdfs/v1").unwrap_or("/").to_string();
    let remote = if remote.is_empty() { "/".to_string() } else { remote };
    let op = params.get("op").cloned().unwrap_or_default();

    match (method, op.as_str()) {
        (Method::PUT, "CREATE") => {
            if remote.starts_with("/no-location") {
                return Response::builder()
                    .status(StatusCode::TEMPORARY_REDIRECT)
                    .body(Full::new(Bytes::new()))
                    .unwrap();
            }
            if remote.starts_with("/dead-datanode") {
                // Handoff to a datanode that is not listening
                return Response::builder()
                    .status(StatusCode::TEMPORARY_REDIRECT)
                    .header("Location", format!("http://127.0.0.1:1/data{}", remote))
                    .body(Full::new(Bytes::new()))
                    .unwrap();
            }
            if remote.starts_with("/immediate") {
                tree.lock().unwrap().insert(remote, Some(Bytes::new()));
                return Response::builder()
                    .status(StatusCode::CREATED)
                    .body(Full::new(Bytes::new()))
                    .unwrap();
            }
            let exists = tree.lock().unwrap().contains_key(&remote);
            let overwrite = params.get("overwrite").map(|s| s.as_str()) == Some("true");
            if exists && !overwrite {
                return json(
                    StatusCode::CONFLICT,
                    serde_json::json!({
                        "RemoteException": {
                            "exception": "FileAlreadyExistsException",
                            "message": format!("{} already exists", remote),
                        }
                    }),
                );
            }
            Response::builder()
                .status(StatusCode::TEMPORARY_REDIRECT)
                .header("Location", format!("{}/data{}", base, remote))
                .body(Full::new(Bytes::new()))
                .unwrap()
        }
        (Method::GET, "OPEN") => match tree.lock().unwrap().get(&remote) {
            Some(Some(_)) => Response::builder()
                .status(StatusCode::TEMPORARY_REDIRECT)
                .header("Location", format!("{}/data{}", base, remote))
                .body(Full::new(Bytes::new()))
                .unwrap(),
            _ => not_found(&remote),
        },
        (Method::GET, "GETFILESTATUS") => match tree.lock().unwrap().get(&remote) {
            Some(entry) => json(
                StatusCode::OK,
                serde_json::json!({"FileStatus": file_status(entry, "")}),
            ),
            None => not_found(&remote),
        },
        (Method::GET, "LISTSTATUS") => {
            let tree = tree.lock().unwrap();
            if !tree.contains_key(&remote) {
                return not_found(&remote);
            }
            let mut children: Vec<(&String, &Option<Bytes>)> = tree
                .iter()
                .filter(|(k, _)| k.as_str() != "/" && parent_of(k) == remote)
                .collect();
            children.sort_by_key(|(k, _)| k.to_string());
            let statuses: Vec<serde_json::Value> = children
                .iter()
                .map(|(k, entry)| {
                    let suffix = k.rsplit('/').next().unwrap_or("");
                    file_status(entry, suffix)
                })
                .collect();
            json(
                StatusCode::OK,
                serde_json::json!({"FileStatuses": {"FileStatus": statuses}}),
            )
        }
        (Method::PUT, "MKDIRS") => {
            let mut tree = tree.lock().unwrap();
            let mut prefix = String::new();
            for segment in remote.split('/').filter(|s| !s.is_empty()) {
                prefix.push('/');
                prefix.push_str(segment);
                tree.entry(prefix.clone()).or_insert(None);
            }
            json(StatusCode::OK, serde_json::json!({"boolean": true}))
        }
        (Method::PUT, "RENAME") => {
            let dst = params.get("destination").cloned().unwrap_or_default();
            let mut tree = tree.lock().unwrap();
            match tree.remove(&remote) {
                Some(entry) => {
                    tree.insert(dst, entry);
                    json(StatusCode::OK, serde_json::json!({"boolean": true}))
                }
                // Hadoop reports an absent source as a 2xx false, not a 404
                None => json(StatusCode::OK, serde_json::json!({"boolean": false})),
            }
        }
        (Method::DELETE, "DELETE") => {
            let recursive = params.get("recursive").map(|s| s.as_str()) == Some("true");
            let mut tree = tree.lock().unwrap();
            if !tree.contains_key(&remote) {
                return json(StatusCode::OK, serde_json::json!({"boolean": false}));
            }
            tree.remove(&remote);
            if recursive {
                let prefix = format!("{}/", remote);
                tree.retain(|k, _| !k.starts_with(&prefix));
            }
            json(StatusCode::OK, serde_json::json!({"boolean": true}))
        }
        (Method::GET, "GETHOMEDIRECTORY") => {
            json(StatusCode::OK, serde_json::json!({"Path": "/user/hadoop"}))
        }
        _ => json(StatusCode::BAD_REQUEST, serde_json::json!({})),
    }
}

#[tokio::test]
async fn test_upload_download_round_trip() {
    let mock = MockHdfs::start().await;
    let client = mock.client();

    let payload = Bytes::from_static(b"model weights v1");
    let descriptor = client
        .upload("/t/a.bin", payload.clone(), WriteOptions::default())
        .await
        .unwrap();

    assert_eq!(descriptor.path, "/t/a.bin");
    assert_eq!(descriptor.kind, PathKind::File);
    assert_eq!(descriptor.size_bytes, payload.len() as u64);

    let downloaded = client.download("/t/a.bin").await.unwrap();
    assert_eq!(downloaded, payload);
}

#[tokio::test]
async fn test_absent_path_is_not_found_everywhere() {
    let mock = MockHdfs::start().await;
    let client = mock.client();

    let err = client.download("/missing.bin").await.unwrap_err();
    assert!(matches!(err, HdfsError::NotFound(_)));

    let err = client.status("/missing.bin").await.unwrap_err();
    assert!(matches!(err, HdfsError::NotFound(_)));

    let err = client.list("/missing-dir").await.unwrap_err();
    assert!(matches!(err, HdfsError::NotFound(_)));

    let err = client.delete("/missing.bin", false).await.unwrap_err();
    assert!(matches!(err, HdfsError::NotFound(_)));

    let err = client.rename("/missing.bin", "/elsewhere.bin").await.unwrap_err();
    assert!(matches!(err, HdfsError::NotFound(_)));
}

#[tokio::test]
async fn test_overwrite_false_conflicts_on_existing_path() {
    let mock = MockHdfs::start().await;
    mock.seed_file("/t/a.bin", b"original");
    let client = mock.client();

    let err = client
        .upload("/t/a.bin", Bytes::from_static(b"new"), WriteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HdfsError::Conflict(_)));
    assert_eq!(err.kind(), "CONFLICT");

    // Original bytes untouched
    assert_eq!(client.download("/t/a.bin").await.unwrap().as_ref(), b"original");

    // overwrite=true replaces them
    let opts = WriteOptions {
        overwrite: true,
        ..WriteOptions::default()
    };
    let descriptor = client
        .upload("/t/a.bin", Bytes::from_static(b"new"), opts)
        .await
        .unwrap();
    assert_eq!(descriptor.size_bytes, 3);
    assert_eq!(client.download("/t/a.bin").await.unwrap().as_ref(), b"new");
}

#[tokio::test]
async fn test_immediate_write_skips_data_phase() {
    let mock = MockHdfs::start().await;
    let client = mock.client();

    // Backend that writes in the control phase never sees the payload PUT
    let descriptor = client
        .upload(
            "/immediate/x.bin",
            Bytes::from_static(b"ignored"),
            WriteOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(descriptor.kind, PathKind::File);
    assert_eq!(descriptor.size_bytes, 0);
}

#[tokio::test]
async fn test_mkdir_is_idempotent_and_creates_ancestors() {
    let mock = MockHdfs::start().await;
    let client = mock.client();

    client.mkdir("/a/b/c", None).await.unwrap();
    client.mkdir("/a/b/c", None).await.unwrap();

    let descriptor = client.status("/a/b/c").await.unwrap();
    assert_eq!(descriptor.kind, PathKind::Directory);
    assert_eq!(descriptor.size_bytes, 0);

    // Ancestors exist too
    assert_eq!(client.status("/a").await.unwrap().kind, PathKind::Directory);
}

#[tokio::test]
async fn test_list_empty_directory_yields_empty_vec() {
    let mock = MockHdfs::start().await;
    mock.seed_dir("/empty");
    let client = mock.client();

    let entries = client.list("/empty").await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_list_returns_full_child_paths() {
    let mock = MockHdfs::start().await;
    mock.seed_dir("/data");
    mock.seed_file("/data/a.bin", b"aa");
    mock.seed_dir("/data/sub");
    let client = mock.client();

    let entries = client.list("/data").await.unwrap();
    assert_eq!(entries.len(), 2);

    let file = entries.iter().find(|e| e.kind == PathKind::File).unwrap();
    assert_eq!(file.path, "/data/a.bin");
    assert_eq!(file.size_bytes, 2);

    let dir = entries
        .iter()
        .find(|e| e.kind == PathKind::Directory)
        .unwrap();
    assert_eq!(dir.path, "/data/sub");
}

#[tokio::test]
async fn test_rename_preserves_contents_and_size() {
    let mock = MockHdfs::start().await;
    mock.seed_file("/src.bin", b"payload bytes");
    let client = mock.client();

    client.rename("/src.bin", "/dst.bin").await.unwrap();

    let err = client.status("/src.bin").await.unwrap_err();
    assert!(matches!(err, HdfsError::NotFound(_)));

    let descriptor = client.status("/dst.bin").await.unwrap();
    assert_eq!(descriptor.size_bytes, 13);
    assert_eq!(client.download("/dst.bin").await.unwrap().as_ref(), b"payload bytes");
}

#[tokio::test]
async fn test_rename_reported_false_is_not_found() {
    let mock = MockHdfs::start().await;
    let client = mock.client();

    // The backend answers 200 {"boolean": false} for an absent source;
    // that must not pass as success
    let err = client.rename("/missing.bin", "/dst.bin").await.unwrap_err();
    assert!(matches!(err, HdfsError::NotFound(_)));
    assert_eq!(err.kind(), "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_reported_false_is_not_found() {
    let mock = MockHdfs::start().await;
    let client = mock.client();

    let err = client.delete("/missing.bin", false).await.unwrap_err();
    assert!(matches!(err, HdfsError::NotFound(_)));
}

#[tokio::test]
async fn test_recursive_delete_removes_children() {
    let mock = MockHdfs::start().await;
    mock.seed_dir("/tree");
    mock.seed_file("/tree/leaf.bin", b"x");
    let client = mock.client();

    client.delete("/tree", true).await.unwrap();

    let err = client.status("/tree/leaf.bin").await.unwrap_err();
    assert!(matches!(err, HdfsError::NotFound(_)));
}

#[tokio::test]
async fn test_redirect_without_location_is_protocol_error() {
    let mock = MockHdfs::start().await;
    let client = mock.client();

    let err = client
        .upload(
            "/no-location/x.bin",
            Bytes::from_static(b"data"),
            WriteOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HdfsError::Protocol(ref m) if m.contains("Location")));
    assert_eq!(err.kind(), "PROTOCOL");
}

#[tokio::test]
async fn test_datanode_failure_during_transfer_is_transport_error() {
    let mock = MockHdfs::start().await;
    let client = mock.client();

    // Negotiation succeeds but the payload PUT cannot connect
    let err = client
        .upload(
            "/dead-datanode/x.bin",
            Bytes::from_static(b"data"),
            WriteOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HdfsError::Transport(_)));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HdfsClient::new(HdfsConfig {
        base_url: format!("http://{}", addr),
        identity_user: "hadoop".to_string(),
        request_timeout: Duration::from_secs(2),
    });

    let err = client.status("/anything").await.unwrap_err();
    assert!(matches!(err, HdfsError::Transport(_)));
    assert_eq!(err.kind(), "TRANSPORT");
}

#[tokio::test]
async fn test_home_directory() {
    let mock = MockHdfs::start().await;
    let client = mock.client();

    assert_eq!(client.home_directory().await.unwrap(), "/user/hadoop");
}
