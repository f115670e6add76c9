//! MLflow tracking server client
//!
//! Thin proxy over the MLflow REST API (api/2.0). The gateway relays the
//! backend's JSON payloads as-is; only errors are normalized.

use reqwest::{header, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// MLflow error body: `{"error_code": ..., "message": ...}`
#[derive(Debug, Deserialize)]
struct MlflowErrorBody {
    error_code: Option<String>,
    message: Option<String>,
}

/// Errors surfaced by the MLflow client
#[derive(Debug, Error)]
pub enum MlflowError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("invalid credentials: {0}")]
    Unauthorized(String),

    #[error("MLflow API error [{code}]: {message}")]
    Api { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl MlflowError {
    fn classify(status: StatusCode, body: &[u8]) -> MlflowError {
        let parsed: Option<MlflowErrorBody> = serde_json::from_slice(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|b| b.message.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

        match status {
            StatusCode::NOT_FOUND => MlflowError::NotFound(message),
            StatusCode::UNAUTHORIZED => MlflowError::Unauthorized(message),
            _ => MlflowError::Api {
                code: parsed
                    .and_then(|b| b.error_code)
                    .unwrap_or_else(|| status.to_string()),
                message,
            },
        }
    }

    /// Stable kind name for the REST boundary
    pub fn kind(&self) -> &'static str {
        match self {
            MlflowError::NotFound(_) => "NOT_FOUND",
            MlflowError::Unauthorized(_) => "UNAUTHORIZED",
            MlflowError::Api { .. } => "API_ERROR",
            MlflowError::Transport(_) => "TRANSPORT",
        }
    }
}

impl From<reqwest::Error> for MlflowError {
    fn from(e: reqwest::Error) -> Self {
        MlflowError::Transport(e.to_string())
    }
}

/// MLflow connection settings
#[derive(Debug, Clone)]
pub struct MlflowConfig {
    /// Tracking server base URL, e.g. `http://mlflow:5000`
    pub base_url: String,
    /// Optional bearer token
    pub token: Option<String>,
    pub request_timeout: Duration,
}

/// MLflow REST API client
pub struct MlflowClient {
    endpoint: String,
    http: reqwest::Client,
}

impl MlflowClient {
    pub fn new(config: MlflowConfig) -> Self {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = config.token {
            if let Ok(value) = header::HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(header::AUTHORIZATION, value);
            }
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            endpoint: format!(
                "{}/api/2.0/mlflow",
                config.base_url.trim_end_matches('/')
            ),
            http,
        }
    }

    /// Create a new experiment
    pub async fn create_experiment(
        &self,
        name: &str,
        tags: &[(String, String)],
    ) -> Result<Value, MlflowError> {
        let payload = json!({
            "name": name,
            "tags": tags
                .iter()
                .map(|(k, v)| json!({"key": k, "value": v}))
                .collect::<Vec<_>>(),
        });

        let result = self.post("/experiments/create", &payload).await?;
        info!(experiment = name, "experiment created");
        Ok(result)
    }

    /// Register a run's model in the model registry
    pub async fn register_model(
        &self,
        run_id: &str,
        model_name: &str,
    ) -> Result<Value, MlflowError> {
        let payload = json!({
            "name": model_name,
            "source": format!("runs:/{}/model", run_id),
            "run_id": run_id,
        });

        let result = self.post("/model-versions/create", &payload).await?;
        info!(model = model_name, run_id, "model registered");
        Ok(result)
    }

    /// Move a model version to a new stage (Staging/Production/Archived).
    /// MLflow expects the stage name lowercased.
    pub async fn transition_model_stage(
        &self,
        model_name: &str,
        version: i64,
        stage: &str,
    ) -> Result<Value, MlflowError> {
        let payload = json!({
            "name": model_name,
            "version": version,
            "stage": stage.to_lowercase(),
        });

        let result = self.post("/model-versions/transition-stage", &payload).await?;
        info!(model = model_name, version, stage, "model stage transitioned");
        Ok(result)
    }

    /// Search model versions, defaulting the filter to the model name
    pub async fn model_versions(
        &self,
        model_name: &str,
        filter: Option<&str>,
    ) -> Result<Value, MlflowError> {
        let payload = json!({
            "filter": filter
                .map(|f| f.to_string())
                .unwrap_or_else(|| format!("name='{}'", model_name)),
            "max_results": 100,
        });

        let body = self.post("/model-versions/search", &payload).await?;
        Ok(body
            .get("model_versions")
            .cloned()
            .unwrap_or_else(|| json!([])))
    }

    async fn post(&self, endpoint: &str, payload: &Value) -> Result<Value, MlflowError> {
        debug!(endpoint, "MLflow request");

        let resp = self
            .http
            .post(format!("{}{}", self.endpoint, endpoint))
            .header(header::CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await.unwrap_or_default();

        if !status.is_success() {
            return Err(MlflowError::classify(status, &body));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body).map_err(|e| MlflowError::Api {
            code: "MALFORMED_RESPONSE".to_string(),
            message: e.to_string(),
        })
    }
}
