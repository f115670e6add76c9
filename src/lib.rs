//! Gatehouse - authenticated HTTP gateway for cluster services
//!
//! Gatehouse fronts three cluster backends behind one REST facade:
//!
//! - **HDFS**: file operations over the WebHDFS two-phase transfer protocol
//! - **MLflow**: experiment and model registry proxying
//! - **Airflow**: DAG management and run triggering
//!
//! The HDFS client is the heart of the crate: a namenode negotiates each
//! write and hands the byte transfer off to a datanode via HTTP 307, and
//! every backend status is folded into one closed error taxonomy before it
//! crosses the facade boundary.

pub mod auth;
pub mod config;
pub mod hdfs;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatewayError, Result};
