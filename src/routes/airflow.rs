//! Workflow scheduler routes

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::routes::hdfs::{bad_request, json_response};
use crate::server::AppState;
use crate::services::AirflowError;

type Full = http_body_util::Full<Bytes>;

fn error_response(err: &AirflowError) -> Response<Full> {
    let status = match err {
        AirflowError::NotFound(_) => StatusCode::NOT_FOUND,
        AirflowError::AlreadyRunning(_) => StatusCode::CONFLICT,
        AirflowError::Unauthorized(_) => StatusCode::FORBIDDEN,
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

#[derive(Deserialize, Default)]
struct TriggerDagRequest {
    #[serde(default)]
    conf: Value,
}

/// POST /airflow/dags/{dag_id}/runs
pub async fn airflow_trigger_dag(
    req: Request<Incoming>,
    state: Arc<AppState>,
    dag_id: &str,
) -> Response<Full> {
    if dag_id.is_empty() {
        return bad_request("Missing DAG id");
    }

    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Trigger body read error: {}", e);
            return bad_request("Failed to read request body");
        }
    };

    // Empty body triggers with an empty conf
    let request: TriggerDagRequest = if body.is_empty() {
        TriggerDagRequest {
            conf: serde_json::json!({}),
        }
    } else {
        match serde_json::from_slice(&body) {
            Ok(r) => r,
            Err(e) => return bad_request(&format!("Invalid JSON: {}", e)),
        }
    };

    match state.airflow.trigger_dag(dag_id, request.conf).await {
        Ok(result) => json_response(StatusCode::CREATED, &result),
        Err(e) => error_response(&e),
    }
}

/// GET /airflow/dags
pub async fn airflow_list_dags(state: Arc<AppState>) -> Response<Full> {
    match state.airflow.list_dags().await {
        Ok(dags) => json_response(StatusCode::OK, &dags),
        Err(e) => error_response(&e),
    }
}

/// GET /airflow/dags/{dag_id}
pub async fn airflow_get_dag(state: Arc<AppState>, dag_id: &str) -> Response<Full> {
    match state.airflow.get_dag(dag_id).await {
        Ok(dag) => json_response(StatusCode::OK, &dag),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct SetPausedRequest {
    is_paused: bool,
}

/// PATCH /airflow/dags/{dag_id}
pub async fn airflow_set_paused(
    req: Request<Incoming>,
    state: Arc<AppState>,
    dag_id: &str,
) -> Response<Full> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Patch body read error: {}", e);
            return bad_request("Failed to read request body");
        }
    };

    let request: SetPausedRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return bad_request(&format!("Invalid JSON: {}", e)),
    };

    match state.airflow.set_paused(dag_id, request.is_paused).await {
        Ok(dag) => json_response(StatusCode::OK, &dag),
        Err(e) => error_response(&e),
    }
}

/// GET /airflow/dags/{dag_id}/runs
pub async fn airflow_list_dag_runs(state: Arc<AppState>, dag_id: &str) -> Response<Full> {
    match state.airflow.list_dag_runs(dag_id).await {
        Ok(runs) => json_response(StatusCode::OK, &runs),
        Err(e) => error_response(&e),
    }
}

/// GET /airflow/dags/{dag_id}/runs/{run_id}
pub async fn airflow_get_dag_run(
    state: Arc<AppState>,
    dag_id: &str,
    run_id: &str,
) -> Response<Full> {
    match state.airflow.get_dag_run(dag_id, run_id).await {
        Ok(run) => json_response(StatusCode::OK, &run),
        Err(e) => error_response(&e),
    }
}

/// DELETE /airflow/dags/{dag_id}/runs/{run_id}
pub async fn airflow_delete_dag_run(
    state: Arc<AppState>,
    dag_id: &str,
    run_id: &str,
) -> Response<Full> {
    match state.airflow.delete_dag_run(dag_id, run_id).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &serde_json::json!({"deleted": run_id, "dag_id": dag_id}),
        ),
        Err(e) => error_response(&e),
    }
}
