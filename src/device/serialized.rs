//! Serialised, time-bounded access to a single device
//!
//! RouterOS handles one API session poorly when several requests interleave,
//! so every call (scheduled poll or ad hoc command) goes through one async
//! mutex. Each call is bounded by a timeout; hitting it yields
//! [`DeviceError::Timeout`] and releases the lock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{trace, warn};

use crate::{ActiveSession, InterfaceStats, SystemResources, WirelessOverview};

use super::{DeviceClient, DeviceError, DeviceResult, PingResult, TracerouteHop, ping_budget};

pub struct SerializedDevice {
    inner: Arc<dyn DeviceClient>,
    lock: Mutex<()>,
    timeout: Duration,
}

impl SerializedDevice {
    pub fn new(inner: Arc<dyn DeviceClient>, timeout: Duration) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
            timeout,
        }
    }

    async fn guarded<T, F>(&self, operation: &str, budget: Duration, call: F) -> DeviceResult<T>
    where
        F: Future<Output = DeviceResult<T>> + Send,
    {
        let _guard = self.lock.lock().await;
        trace!("{operation}: acquired device lock");

        match tokio::time::timeout(budget, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{operation} timed out after {budget:?}");
                Err(DeviceError::Timeout(budget))
            }
        }
    }
}

#[async_trait]
impl DeviceClient for SerializedDevice {
    async fn get_resources(&self) -> DeviceResult<SystemResources> {
        self.guarded("get_resources", self.timeout, self.inner.get_resources())
            .await
    }

    async fn get_interfaces(&self) -> DeviceResult<Vec<InterfaceStats>> {
        self.guarded("get_interfaces", self.timeout, self.inner.get_interfaces())
            .await
    }

    async fn get_active_sessions(&self) -> DeviceResult<Vec<ActiveSession>> {
        self.guarded(
            "get_active_sessions",
            self.timeout,
            self.inner.get_active_sessions(),
        )
        .await
    }

    async fn get_wireless(&self) -> DeviceResult<WirelessOverview> {
        self.guarded("get_wireless", self.timeout, self.inner.get_wireless())
            .await
    }

    async fn ping(&self, host: &str, count: u32) -> DeviceResult<PingResult> {
        let budget = ping_budget(self.timeout, count);
        self.guarded("ping", budget, self.inner.ping(host, count))
            .await
    }

    async fn traceroute(&self, host: &str) -> DeviceResult<Vec<TracerouteHop>> {
        self.guarded("traceroute", self.timeout, self.inner.traceroute(host))
            .await
    }
}
