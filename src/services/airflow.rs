//! Airflow scheduler client
//!
//! Proxy over the Airflow stable REST API (api/v1) with basic auth. DAG
//! run payloads are relayed as-is; errors are normalized into a small
//! taxonomy so the routes can map them to response codes.

use reqwest::{header, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Airflow error body: `{"detail": ..., "title": ...}`
#[derive(Debug, Deserialize)]
struct AirflowErrorBody {
    detail: Option<String>,
    title: Option<String>,
}

/// Errors surfaced by the Airflow client
#[derive(Debug, Error)]
pub enum AirflowError {
    #[error("DAG or run not found: {0}")]
    NotFound(String),

    #[error("invalid credentials: {0}")]
    Unauthorized(String),

    #[error("DAG run already exists: {0}")]
    AlreadyRunning(String),

    #[error("Airflow API error: {0}")]
    Api(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl AirflowError {
    fn classify(status: StatusCode, body: &[u8]) -> AirflowError {
        let parsed: Option<AirflowErrorBody> = serde_json::from_slice(body).ok();
        let message = parsed
            .and_then(|b| b.detail.or(b.title))
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

        match status {
            StatusCode::NOT_FOUND => AirflowError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AirflowError::Unauthorized(message)
            }
            StatusCode::CONFLICT => AirflowError::AlreadyRunning(message),
            _ => AirflowError::Api(message),
        }
    }

    /// Stable kind name for the REST boundary
    pub fn kind(&self) -> &'static str {
        match self {
            AirflowError::NotFound(_) => "NOT_FOUND",
            AirflowError::Unauthorized(_) => "UNAUTHORIZED",
            AirflowError::AlreadyRunning(_) => "CONFLICT",
            AirflowError::Api(_) => "API_ERROR",
            AirflowError::Transport(_) => "TRANSPORT",
        }
    }
}

impl From<reqwest::Error> for AirflowError {
    fn from(e: reqwest::Error) -> Self {
        AirflowError::Transport(e.to_string())
    }
}

/// Airflow connection settings
#[derive(Debug, Clone)]
pub struct AirflowConfig {
    /// Webserver base URL, e.g. `http://airflow:8080`
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub request_timeout: Duration,
}

/// Airflow REST API client
pub struct AirflowClient {
    endpoint: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl AirflowClient {
    pub fn new(config: AirflowConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            endpoint: format!("{}/api/v1", config.base_url.trim_end_matches('/')),
            username: config.username,
            password: config.password,
            http,
        }
    }

    /// Trigger a new run of a DAG. A 409 from the scheduler means a run
    /// with the same logical date already exists.
    pub async fn trigger_dag(
        &self,
        dag_id: &str,
        conf: Value,
    ) -> Result<Value, AirflowError> {
        let payload = json!({
            "conf": conf,
            "note": "Triggered via gateway",
        });

        let result = self
            .request(
                Method::POST,
                &format!("/dags/{}/dagRuns", dag_id),
                Some(&payload),
            )
            .await?;
        info!(dag_id, "DAG run triggered");
        Ok(result)
    }

    /// List all DAGs known to the scheduler
    pub async fn list_dags(&self) -> Result<Value, AirflowError> {
        self.request(Method::GET, "/dags", None).await
    }

    /// Fetch one DAG's metadata
    pub async fn get_dag(&self, dag_id: &str) -> Result<Value, AirflowError> {
        self.request(Method::GET, &format!("/dags/{}", dag_id), None)
            .await
    }

    /// Pause or unpause a DAG
    pub async fn set_paused(&self, dag_id: &str, paused: bool) -> Result<Value, AirflowError> {
        let payload = json!({"is_paused": paused});
        let result = self
            .request(Method::PATCH, &format!("/dags/{}", dag_id), Some(&payload))
            .await?;
        info!(dag_id, paused, "DAG pause state updated");
        Ok(result)
    }

    /// List runs of a DAG, newest first
    pub async fn list_dag_runs(&self, dag_id: &str) -> Result<Value, AirflowError> {
        self.request(
            Method::GET,
            &format!("/dags/{}/dagRuns?order_by=-execution_date", dag_id),
            None,
        )
        .await
    }

    /// Fetch one DAG run
    pub async fn get_dag_run(
        &self,
        dag_id: &str,
        run_id: &str,
    ) -> Result<Value, AirflowError> {
        self.request(
            Method::GET,
            &format!("/dags/{}/dagRuns/{}", dag_id, run_id),
            None,
        )
        .await
    }

    /// Delete one DAG run
    pub async fn delete_dag_run(&self, dag_id: &str, run_id: &str) -> Result<(), AirflowError> {
        self.request(
            Method::DELETE,
            &format!("/dags/{}/dagRuns/{}", dag_id, run_id),
            None,
        )
        .await?;
        info!(dag_id, run_id, "DAG run deleted");
        Ok(())
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&Value>,
    ) -> Result<Value, AirflowError> {
        debug!(%method, endpoint, "Airflow request");

        let mut builder = self
            .http
            .request(method, format!("{}{}", self.endpoint, endpoint))
            .basic_auth(&self.username, Some(&self.password));
        if let Some(payload) = payload {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .json(payload);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AirflowError::classify(status, &body));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body)
            .map_err(|e| AirflowError::Api(format!("malformed response body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_404_is_not_found() {
        let body = br#"{"detail": "DAG with dag_id: 'etl' not found", "title": "DAG not found"}"#;
        let err = AirflowError::classify(StatusCode::NOT_FOUND, body);
        assert!(matches!(err, AirflowError::NotFound(ref m) if m.contains("etl")));
    }

    #[test]
    fn test_409_is_already_running() {
        let body = br#"{"detail": "DAGRun already exists"}"#;
        let err = AirflowError::classify(StatusCode::CONFLICT, body);
        assert!(matches!(err, AirflowError::AlreadyRunning(_)));
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[test]
    fn test_401_and_403_are_unauthorized() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = AirflowError::classify(status, b"{}");
            assert!(matches!(err, AirflowError::Unauthorized(_)));
        }
    }

    #[test]
    fn test_title_used_when_detail_absent() {
        let body = br#"{"title": "Bad Request"}"#;
        let err = AirflowError::classify(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, AirflowError::Api(ref m) if m == "Bad Request"));
    }
}
