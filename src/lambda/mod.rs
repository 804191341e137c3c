// src/lambda/mod.rs

//! AWS Lambda handler for scheduled monitor runs.
//!
//! Each invocation:
//! 1. Loads the configuration from S3 (or a bundled file)
//! 2. Applies environment overrides
//! 3. Checks every job, or the subset named in the payload
//! 4. Returns the run summary

use std::path::Path;

use lambda_runtime::{Error as LambdaError, LambdaEvent};

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::pipeline::{self, JobReport, Monitor};
use crate::storage::S3StateStore;

/// Lambda invocation payload.
#[derive(Debug, Default, Deserialize)]
pub struct MonitorRequest {
    /// Only check these jobs (optional, checks all if not specified)
    #[serde(default)]
    pub jobs: Option<Vec<String>>,
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct MonitorResponse {
    /// Whether the run started and finished
    pub success: bool,

    pub total_jobs: usize,
    pub changes_detected: usize,
    pub first_observations: usize,
    pub errors: usize,

    /// Per-job outcomes in configuration order
    pub jobs: Vec<JobReport>,

    /// Error message if the run could not start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<MonitorRequest>,
) -> std::result::Result<MonitorResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (request, _context) = event.into_parts();

    info!("Starting run: jobs={:?}", request.jobs);

    match run_monitor(&request).await {
        Ok(mut response) => {
            response.execution_time_ms = start.elapsed().as_millis() as u64;
            info!(
                "Run completed: {} jobs, {} changes, {} errors in {}ms",
                response.total_jobs,
                response.changes_detected,
                response.errors,
                response.execution_time_ms
            );
            Ok(response)
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Ok(MonitorResponse {
                success: false,
                error: Some(e.to_string()),
                execution_time_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            })
        }
    }
}

/// Internal run logic.
async fn run_monitor(request: &MonitorRequest) -> Result<MonitorResponse> {
    let mut config = load_lambda_config().await?;
    config.apply_env();

    let names = request.jobs.as_deref().unwrap_or_default();
    let specs = pipeline::select_jobs(&config.jobs, names)?;

    let monitor = Monitor::from_config(&config).await?;
    let summary = monitor.run(&specs).await;

    Ok(MonitorResponse {
        success: true,
        total_jobs: summary.jobs.len(),
        changes_detected: summary.change_count(),
        first_observations: summary.first_observation_count(),
        errors: summary.error_count(),
        jobs: summary.jobs,
        error: None,
        execution_time_ms: 0,
    })
}

/// Load configuration from S3 when `CONFIG_S3_BUCKET` is set, otherwise from
/// the bundled file at `CONFIG_PATH`.
async fn load_lambda_config() -> Result<Config> {
    if let Ok(bucket) = std::env::var("CONFIG_S3_BUCKET") {
        let key =
            std::env::var("CONFIG_S3_KEY").unwrap_or_else(|_| "sitewatch/config.toml".to_string());
        let source = S3StateStore::from_env(&bucket, "").await;
        let bytes = source
            .read_bytes_optional(&key)
            .await?
            .ok_or_else(|| AppError::config(format!("config not found at s3://{bucket}/{key}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| AppError::config(format!("config at s3://{bucket}/{key}: {e}")))?;
        info!("Loaded configuration from s3://{}/{}", bucket, key);
        return Config::from_toml(&text);
    }

    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    info!("Loading configuration from {}", path);
    Config::load(Path::new(&path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_request_defaults() {
        let req: MonitorRequest = serde_json::from_str("{}").unwrap();
        assert!(req.jobs.is_none());
    }

    #[test]
    fn test_monitor_request_with_jobs() {
        let json = r#"{"jobs": ["home", "tickets"]}"#;
        let req: MonitorRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.jobs, Some(vec!["home".to_string(), "tickets".to_string()]));
    }

    #[test]
    fn test_error_response_shape() {
        let response = MonitorResponse {
            error: Some("boom".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "boom");
        assert_eq!(value["jobs"].as_array().unwrap().len(), 0);
    }
}
