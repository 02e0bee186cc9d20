//! Device monitoring endpoints

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
};
use futures::future::join_all;

use crate::actors::messages::{MonitorStatus, PollOutcome, StartOutcome, StopOutcome};
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{DevicesResponse, PingRequest, StartRequest, TracerouteRequest, TracerouteResponse},
};
use crate::device::PingResult;
use crate::snapshot::MonitoringSnapshot;
use crate::thresholds::{ThresholdSet, ThresholdUpdate};

/// GET /api/v1/devices
pub async fn list_devices(State(state): State<ApiState>) -> Json<DevicesResponse> {
    let devices = join_all(state.monitors.iter().map(|monitor| monitor.status())).await;
    let count = devices.len();
    Json(DevicesResponse { devices, count })
}

/// POST /api/v1/devices/:id/start
///
/// The body is optional; `{"intervalSeconds": n}` overrides the persisted
/// polling interval. A body that is present but not a valid request is a 400.
pub async fn start_monitoring(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<StartOutcome>> {
    let monitor = state.monitor(&device_id)?;
    let request = parse_start_request(&body)?;
    let interval = request.interval_seconds.map(Duration::from_secs);

    Ok(Json(monitor.start(interval).await?))
}

fn parse_start_request(body: &[u8]) -> ApiResult<StartRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidRequest(format!("invalid start request: {e}")))
}

/// POST /api/v1/devices/:id/stop
pub async fn stop_monitoring(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
) -> ApiResult<Json<StopOutcome>> {
    let monitor = state.monitor(&device_id)?;
    Ok(Json(monitor.stop().await?))
}

/// GET /api/v1/devices/:id/status
pub async fn get_status(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
) -> ApiResult<Json<MonitorStatus>> {
    let monitor = state.monitor(&device_id)?;
    Ok(Json(monitor.status().await))
}

/// GET /api/v1/devices/:id/data
pub async fn get_latest_data(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
) -> ApiResult<Json<Arc<MonitoringSnapshot>>> {
    let monitor = state.monitor(&device_id)?;
    monitor
        .latest_snapshot()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no data yet".to_string()))
}

/// POST /api/v1/devices/:id/poll
pub async fn poll_now(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
) -> ApiResult<Json<Arc<MonitoringSnapshot>>> {
    let monitor = state.monitor(&device_id)?;
    match monitor.poll_now().await? {
        PollOutcome::Captured(snapshot) => Ok(Json(snapshot)),
        PollOutcome::Failed(error) => Err(ApiError::BadGateway(error)),
    }
}

/// POST /api/v1/devices/:id/ping
pub async fn ping(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
    payload: Result<Json<PingRequest>, JsonRejection>,
) -> ApiResult<Json<PingResult>> {
    let monitor = state.monitor(&device_id)?;
    let Json(request) = payload?;
    Ok(Json(monitor.ping(&request.host, request.count).await?))
}

/// POST /api/v1/devices/:id/traceroute
pub async fn traceroute(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
    payload: Result<Json<TracerouteRequest>, JsonRejection>,
) -> ApiResult<Json<TracerouteResponse>> {
    let monitor = state.monitor(&device_id)?;
    let Json(request) = payload?;
    let hops = monitor.traceroute(&request.host).await?;

    Ok(Json(TracerouteResponse {
        host: request.host.trim().to_string(),
        hops,
    }))
}

/// GET /api/v1/devices/:id/thresholds
pub async fn get_thresholds(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
) -> ApiResult<Json<ThresholdSet>> {
    let monitor = state.monitor(&device_id)?;
    Ok(Json(monitor.thresholds()))
}

/// POST /api/v1/devices/:id/thresholds
///
/// Partial update; answers with the full resulting set.
pub async fn update_thresholds(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
    payload: Result<Json<ThresholdUpdate>, JsonRejection>,
) -> ApiResult<Json<ThresholdSet>> {
    let monitor = state.monitor(&device_id)?;
    let Json(update) = payload?;
    Ok(Json(monitor.update_thresholds(&update)?))
}
