//! Experiment tracker routes

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::routes::hdfs::{bad_request, json_response};
use crate::server::AppState;
use crate::services::MlflowError;

type Full = http_body_util::Full<Bytes>;

fn error_response(err: &MlflowError) -> Response<Full> {
    let status = match err {
        MlflowError::NotFound(_) => StatusCode::NOT_FOUND,
        MlflowError::Unauthorized(_) => StatusCode::FORBIDDEN,
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

async fn read_json<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, Response<Full>> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Request body read error: {}", e);
            return Err(bad_request("Failed to read request body"));
        }
    };

    serde_json::from_slice(&body).map_err(|e| bad_request(&format!("Invalid JSON: {}", e)))
}

#[derive(Deserialize)]
struct CreateExperimentRequest {
    name: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// POST /mlflow/experiments
pub async fn mlflow_create_experiment(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full> {
    let body: CreateExperimentRequest = match read_json(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let tags: Vec<(String, String)> = body.tags.into_iter().collect();
    match state.mlflow.create_experiment(&body.name, &tags).await {
        Ok(result) => json_response(StatusCode::CREATED, &result),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct RegisterModelRequest {
    run_id: String,
    name: String,
}

/// POST /mlflow/models/register
pub async fn mlflow_register_model(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full> {
    let body: RegisterModelRequest = match read_json(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match state.mlflow.register_model(&body.run_id, &body.name).await {
        Ok(result) => json_response(StatusCode::CREATED, &result),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct TransitionStageRequest {
    name: String,
    version: i64,
    stage: String,
}

/// POST /mlflow/models/transition
pub async fn mlflow_transition_stage(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full> {
    let body: TransitionStageRequest = match read_json(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match state
        .mlflow
        .transition_model_stage(&body.name, body.version, &body.stage)
        .await
    {
        Ok(result) => json_response(StatusCode::OK, &result),
        Err(e) => error_response(&e),
    }
}

/// GET /mlflow/models/{name}/versions
pub async fn mlflow_model_versions(state: Arc<AppState>, name: &str) -> Response<Full> {
    if name.is_empty() {
        return bad_request("Missing model name");
    }

    match state.mlflow.model_versions(name, None).await {
        Ok(versions) => json_response(StatusCode::OK, &versions),
        Err(e) => error_response(&e),
    }
}
