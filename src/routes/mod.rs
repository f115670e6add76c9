//! HTTP routes for the gateway

pub mod airflow;
pub mod hdfs;
pub mod health;
pub mod mlflow;

pub use airflow::{
    airflow_delete_dag_run, airflow_get_dag, airflow_get_dag_run, airflow_list_dag_runs,
    airflow_list_dags, airflow_set_paused, airflow_trigger_dag,
};
pub use hdfs::{
    hdfs_delete, hdfs_download, hdfs_home, hdfs_list, hdfs_mkdir, hdfs_rename, hdfs_status,
    hdfs_upload,
};
pub use health::{health_check, readiness_check, version_info};
pub use mlflow::{
    mlflow_create_experiment, mlflow_model_versions, mlflow_register_model,
    mlflow_transition_stage,
};
