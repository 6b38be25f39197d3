//! Route handlers for task execution, system info and health.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::Method;
use serde::Serialize;

use super::AppState;
use super::response::{ApiError, ApiResponse};
use crate::system::MemoryUsage;
use crate::task::{TaskKind, TaskOutcome, TaskRequest};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// `/api/task/execute`
pub async fn execute_task(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }
    let body = body?;

    let request: TaskRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequestBody(e.to_string()))?;

    let kind = match TaskKind::from_code(&request.task_type) {
        Ok(kind) => kind,
        Err(err) => return Ok(Json(ApiResponse::failure(err.to_string()))),
    };

    tracing::info!(
        kind = kind.display_name(),
        code = kind.code(),
        command = %state.log.format_command_for_log(&request.command),
        "executing task"
    );

    match kind.run(&state.engine, &request.command).await {
        Ok(TaskOutcome::Completed(result)) => Ok(Json(ApiResponse::data(result.body))),
        Ok(TaskOutcome::NotImplemented(kind)) => Ok(Json(ApiResponse::failure(format!(
            "{} execution not implemented",
            kind.display_name()
        )))),
        Err(err) => {
            if err.is_validation() {
                tracing::info!("task rejected: {err}");
            } else {
                tracing::warn!("task failed: {err}");
            }
            Err(ApiError::Execution(err))
        }
    }
}

/// Host resource usage reported by `/api/system/info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    pub total_memory_mb: u64,
    pub used_memory_mb: u64,
    pub memory_usage_perc: f64,
    pub cpu_usage_perc: f64,
}

impl SystemInfo {
    pub fn from_samples(memory: MemoryUsage, cpu_percent: f64) -> Self {
        let memory_usage_perc = if memory.total_bytes == 0 {
            0.0
        } else {
            round2(memory.used_bytes as f64 / memory.total_bytes as f64 * 100.0)
        };
        Self {
            total_memory_mb: (memory.total_bytes as f64 / BYTES_PER_MB).round() as u64,
            used_memory_mb: (memory.used_bytes as f64 / BYTES_PER_MB).round() as u64,
            memory_usage_perc,
            cpu_usage_perc: round2(cpu_percent),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `/api/system/info`
pub async fn system_info(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SystemInfo>>, ApiError> {
    let memory = state
        .metrics
        .memory()
        .await
        .map_err(|e| ApiError::Metrics(format!("failed to read memory info: {e}")))?;
    let cpu = state
        .metrics
        .cpu_percent()
        .await
        .map_err(|e| ApiError::Metrics(format!("failed to read cpu usage: {e}")))?;

    Ok(Json(ApiResponse::data(SystemInfo::from_samples(memory, cpu))))
}

/// `/api/health`
pub async fn health() -> Json<ApiResponse> {
    Json(ApiResponse::done("done"))
}
