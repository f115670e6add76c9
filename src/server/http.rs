//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Every request is
//! routed through a single match on method and path; backend-bound routes
//! pass the API key gate first.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{required_permission, KeyValidator};
use crate::config::Args;
use crate::hdfs::{HdfsClient, HdfsConfig};
use crate::routes;
use crate::services::{
    AirflowClient, AirflowConfig, MlflowClient, MlflowConfig,
};
use crate::types::GatewayError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Distributed file store client
    pub hdfs: HdfsClient,
    /// Experiment tracker client
    pub mlflow: MlflowClient,
    /// Workflow scheduler client
    pub airflow: AirflowClient,
    /// API key gate for proxied routes
    pub keys: KeyValidator,
}

impl AppState {
    pub fn new(args: Args) -> Self {
        let timeout = args.request_timeout();

        let hdfs = HdfsClient::new(HdfsConfig {
            base_url: args.namenode_url.clone(),
            identity_user: args.hdfs_user.clone(),
            request_timeout: timeout,
        });
        let mlflow = MlflowClient::new(MlflowConfig {
            base_url: args.mlflow_url.clone(),
            token: args.mlflow_token.clone(),
            request_timeout: timeout,
        });
        let airflow = AirflowClient::new(AirflowConfig {
            base_url: args.airflow_url.clone(),
            username: args.airflow_user.clone().unwrap_or_default(),
            password: args.airflow_password.clone().unwrap_or_default(),
            request_timeout: timeout,
        });
        let keys = KeyValidator::new(
            args.api_key_read.clone(),
            args.api_key_write.clone(),
            std::time::Duration::from_secs(args.key_cache_ttl_secs),
        );

        Self {
            args,
            hdfs,
            mlflow,
            airflow,
            keys,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Gatehouse listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - authentication disabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Probes and CORS preflight stay outside the key gate
    let response = match (&method, path.as_str()) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return Ok(to_boxed(routes::health_check(Arc::clone(&state))));
        }
        (&Method::GET, "/ready") | (&Method::GET, "/readyz") => {
            return Ok(to_boxed(routes::readiness_check(Arc::clone(&state)).await));
        }
        (&Method::GET, "/version") => {
            return Ok(to_boxed(routes::version_info()));
        }
        (&Method::OPTIONS, _) => return Ok(to_boxed(preflight_response())),
        _ => authorize(&state, &req),
    };
    if let Err(denied) = response {
        return Ok(to_boxed(denied));
    }

    let response = match (method, path.as_str()) {
        // ====================================================================
        // Distributed file store
        // ====================================================================
        (Method::PUT, p) if p.starts_with("/hdfs/files/") => {
            let remote = p.strip_prefix("/hdfs/files").unwrap_or("/").to_string();
            routes::hdfs_upload(req, Arc::clone(&state), &remote).await
        }
        (Method::GET, p) if p.starts_with("/hdfs/files/") => {
            let remote = p.strip_prefix("/hdfs/files").unwrap_or("/");
            routes::hdfs_download(Arc::clone(&state), remote).await
        }
        (Method::DELETE, p) if p.starts_with("/hdfs/files/") => {
            let remote = p.strip_prefix("/hdfs/files").unwrap_or("/");
            routes::hdfs_delete(Arc::clone(&state), remote, req.uri().query()).await
        }
        (Method::PUT, p) if p.starts_with("/hdfs/dirs/") => {
            let remote = p.strip_prefix("/hdfs/dirs").unwrap_or("/");
            routes::hdfs_mkdir(Arc::clone(&state), remote, req.uri().query()).await
        }
        (Method::POST, "/hdfs/rename") => {
            routes::hdfs_rename(Arc::clone(&state), req.uri().query()).await
        }
        (Method::GET, p) if is_exact_or_child(p, "/hdfs/list") => {
            let remote = non_empty_suffix(p, "/hdfs/list");
            routes::hdfs_list(Arc::clone(&state), remote).await
        }
        (Method::GET, p) if p.starts_with("/hdfs/status/") => {
            let remote = p.strip_prefix("/hdfs/status").unwrap_or("/");
            routes::hdfs_status(Arc::clone(&state), remote).await
        }
        (Method::GET, "/hdfs/home") => routes::hdfs_home(Arc::clone(&state)).await,

        // ====================================================================
        // Experiment tracker
        // ====================================================================
        (Method::POST, "/mlflow/experiments") => {
            routes::mlflow_create_experiment(req, Arc::clone(&state)).await
        }
        (Method::POST, "/mlflow/models/register") => {
            routes::mlflow_register_model(req, Arc::clone(&state)).await
        }
        (Method::POST, "/mlflow/models/transition") => {
            routes::mlflow_transition_stage(req, Arc::clone(&state)).await
        }
        (Method::GET, p) if p.starts_with("/mlflow/models/") && p.ends_with("/versions") => {
            let name = p
                .strip_prefix("/mlflow/models/")
                .and_then(|s| s.strip_suffix("/versions"))
                .unwrap_or("");
            routes::mlflow_model_versions(Arc::clone(&state), name).await
        }

        // ====================================================================
        // Workflow scheduler
        // ====================================================================
        (Method::GET, "/airflow/dags") => routes::airflow_list_dags(Arc::clone(&state)).await,
        (Method::POST, p) if p.starts_with("/airflow/dags/") && p.ends_with("/runs") => {
            let dag_id = p
                .strip_prefix("/airflow/dags/")
                .and_then(|s| s.strip_suffix("/runs"))
                .unwrap_or("")
                .to_string();
            routes::airflow_trigger_dag(req, Arc::clone(&state), &dag_id).await
        }
        (Method::GET, p) if p.starts_with("/airflow/dags/") && p.ends_with("/runs") => {
            let dag_id = p
                .strip_prefix("/airflow/dags/")
                .and_then(|s| s.strip_suffix("/runs"))
                .unwrap_or("");
            routes::airflow_list_dag_runs(Arc::clone(&state), dag_id).await
        }
        (Method::GET, p) if p.starts_with("/airflow/dags/") && p.contains("/runs/") => {
            let (dag_id, run_id) = split_dag_run(p);
            routes::airflow_get_dag_run(Arc::clone(&state), dag_id, run_id).await
        }
        (Method::DELETE, p) if p.starts_with("/airflow/dags/") && p.contains("/runs/") => {
            let (dag_id, run_id) = split_dag_run(p);
            routes::airflow_delete_dag_run(Arc::clone(&state), dag_id, run_id).await
        }
        (Method::GET, p) if p.starts_with("/airflow/dags/") => {
            let dag_id = p.strip_prefix("/airflow/dags/").unwrap_or("");
            routes::airflow_get_dag(Arc::clone(&state), dag_id).await
        }
        (Method::PATCH, p) if p.starts_with("/airflow/dags/") => {
            let dag_id = p.strip_prefix("/airflow/dags/").unwrap_or("").to_string();
            routes::airflow_set_paused(req, Arc::clone(&state), &dag_id).await
        }

        _ => not_found_response(&path),
    };

    Ok(to_boxed(response))
}

/// API key gate for backend-bound routes. Probes never reach this point.
///
/// Missing key is 401, unknown key or insufficient scope is 403. Dev mode
/// waves everything through.
fn authorize(
    state: &AppState,
    req: &Request<Incoming>,
) -> Result<(), Response<Full<Bytes>>> {
    if state.args.dev_mode {
        return Ok(());
    }

    let key = req
        .headers()
        .get(state.args.api_key_header.as_str())
        .and_then(|v| v.to_str().ok());

    let key = match key {
        Some(k) if !k.is_empty() => k,
        _ => {
            return Err(auth_error_response(
                StatusCode::UNAUTHORIZED,
                "Missing API key",
            ))
        }
    };

    match state.keys.validate(key) {
        Some(granted) if granted >= required_permission(req.method()) => Ok(()),
        Some(_) => Err(auth_error_response(
            StatusCode::FORBIDDEN,
            "API key does not allow write operations",
        )),
        None => Err(auth_error_response(StatusCode::FORBIDDEN, "Invalid API key")),
    }
}

/// True for the prefix itself or a path nested under it. A plain
/// starts_with would also catch sibling routes like `/hdfs/listings`.
fn is_exact_or_child(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Path suffix after a prefix, defaulting to "/" when absent or empty
fn non_empty_suffix<'a>(path: &'a str, prefix: &str) -> &'a str {
    match path.strip_prefix(prefix) {
        Some(rest) if !rest.is_empty() => rest,
        _ => "/",
    }
}

/// Split `/airflow/dags/{dag_id}/runs/{run_id}` into its two ids
fn split_dag_run(path: &str) -> (&str, &str) {
    let rest = path.strip_prefix("/airflow/dags/").unwrap_or("");
    match rest.split_once("/runs/") {
        Some((dag_id, run_id)) => (dag_id, run_id),
        None => (rest, ""),
    }
}

/// Convert a Full<Bytes> body to BoxBody
pub fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header(
            "Access-Control-Allow-Methods",
            "GET, PUT, POST, PATCH, DELETE, OPTIONS",
        )
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn auth_error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "UNAUTHORIZED",
        "detail": message,
    });

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
