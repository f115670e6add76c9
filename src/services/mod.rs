//! Proxy clients for the non-HDFS cluster backends

pub mod airflow;
pub mod mlflow;

pub use airflow::{AirflowClient, AirflowConfig, AirflowError};
pub use mlflow::{MlflowClient, MlflowConfig, MlflowError};
