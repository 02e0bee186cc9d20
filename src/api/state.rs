//! API shared state containing monitor handles

use std::sync::Arc;

use crate::actors::monitor::MonitorHandle;
use crate::api::error::{ApiError, ApiResult};
use crate::events::EventGateway;
use crate::storage::StorageBackend;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// One handle per monitored device, in configuration order
    pub monitors: Arc<Vec<MonitorHandle>>,

    /// Ticket and settings storage
    pub storage: Arc<dyn StorageBackend>,

    /// Event fan-out (for WebSocket streaming)
    pub gateway: EventGateway,
}

impl ApiState {
    pub fn new(
        monitors: Vec<MonitorHandle>,
        storage: Arc<dyn StorageBackend>,
        gateway: EventGateway,
    ) -> Self {
        Self {
            monitors: Arc::new(monitors),
            storage,
            gateway,
        }
    }

    pub fn monitor(&self, device_id: &str) -> ApiResult<&MonitorHandle> {
        self.monitors
            .iter()
            .find(|monitor| monitor.device_id() == device_id)
            .ok_or_else(|| ApiError::NotFound(format!("unknown device: {device_id}")))
    }
}
