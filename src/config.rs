//! Configuration for Gatehouse
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use uuid::Uuid;

/// Gatehouse - authenticated HTTP gateway for Hadoop, MLflow and Airflow
#[derive(Parser, Debug, Clone)]
#[command(name = "gatehouse")]
#[command(about = "HTTP gateway proxying HDFS, MLflow and Airflow clusters")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Hadoop namenode HTTP address (WebHDFS endpoint lives under /webhdfs/v1)
    #[arg(long, env = "NAMENODE_URL", default_value = "http://localhost:9870")]
    pub namenode_url: String,

    /// Identity user sent with every WebHDFS request (user.name parameter)
    #[arg(long, env = "HDFS_USER", default_value = "hadoop")]
    pub hdfs_user: String,

    /// MLflow tracking server base URL
    #[arg(long, env = "MLFLOW_URL", default_value = "http://localhost:5000")]
    pub mlflow_url: String,

    /// MLflow API bearer token (optional)
    #[arg(long, env = "MLFLOW_TOKEN")]
    pub mlflow_token: Option<String>,

    /// Airflow webserver base URL
    #[arg(long, env = "AIRFLOW_URL", default_value = "http://localhost:8080")]
    pub airflow_url: String,

    /// Airflow basic-auth username
    #[arg(long, env = "AIRFLOW_USER")]
    pub airflow_user: Option<String>,

    /// Airflow basic-auth password
    #[arg(long, env = "AIRFLOW_PASSWORD")]
    pub airflow_password: Option<String>,

    /// Request timeout in milliseconds, applied to every backend round trip
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Header carrying the inbound API key
    #[arg(long, env = "API_KEY_HEADER", default_value = "x-api-key")]
    pub api_key_header: String,

    /// API key granting read-only access (optional)
    #[arg(long, env = "API_KEY_READ")]
    pub api_key_read: Option<String>,

    /// API key granting read-write access (optional)
    #[arg(long, env = "API_KEY_WRITE")]
    pub api_key_write: Option<String>,

    /// How long validated keys stay cached, in seconds
    #[arg(long, env = "KEY_CACHE_TTL_SECS", default_value = "300")]
    pub key_cache_ttl_secs: u64,

    /// Enable development mode (disables API-key authentication)
    #[arg(long, env = "DEV_MODE", default_value = "false", action = clap::ArgAction::Set)]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Per-request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.api_key_read.is_none() && self.api_key_write.is_none() {
            return Err(
                "at least one of API_KEY_READ / API_KEY_WRITE is required in production mode"
                    .to_string(),
            );
        }

        for (name, url) in [
            ("NAMENODE_URL", &self.namenode_url),
            ("MLFLOW_URL", &self.mlflow_url),
            ("AIRFLOW_URL", &self.airflow_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("{} must be an http(s) URL, got '{}'", name, url));
            }
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }
}
