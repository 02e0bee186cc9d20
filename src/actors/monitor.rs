//! MonitorActor - Owns the poll schedule for one device
//!
//! ## State Machine
//!
//! ```text
//!            start()                     stop()
//! Stopped ──────────► poll ─► Running ──────────► Stopped
//!    ▲                          │  ▲
//!    │                     tick │  │ poll
//!    │                          └──┘
//!    └── start() while Running answers AlreadyRunning, timer untouched
//! ```
//!
//! The timer lives inside the actor loop, so a tick and a command are never
//! handled at the same time and two polls never overlap.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → gather 4 categories → detect → MonitoringData
//!                                          └─► CriticalIssue → TicketDeduplicator
//!     ↑
//!     └─── Commands (Start, Stop, PollNow, Shutdown)
//! ```

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::DeviceConfig;
use crate::device::serialized::SerializedDevice;
use crate::device::{DeviceClient, PingResult, TracerouteHop};
use crate::error::{MonitorError, MonitorResult};
use crate::events::{EventGateway, MonitorEvent};
use crate::snapshot::{DeviceReadings, MonitoringSnapshot};
use crate::storage::{MonitorSettings, StorageBackend};
use crate::thresholds::{ThresholdSet, ThresholdStore, ThresholdUpdate};
use crate::tickets::TicketDeduplicator;
use crate::util::is_plausible_host;

use super::messages::{
    MonitorCommand, MonitorStatus, PollOutcome, SessionView, StartOutcome, StopOutcome,
};

/// Interval used when neither the caller nor the settings record provide one
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Longest accepted poll interval
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub const DEFAULT_PING_COUNT: u32 = 4;

pub const MAX_PING_COUNT: u32 = 50;

/// Identity and call budget of a monitored device
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub device_id: String,
    pub display_name: String,
    /// Per-call device timeout
    pub call_timeout: Duration,
}

impl From<&DeviceConfig> for MonitorConfig {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            device_id: config.id.clone(),
            display_name: config.display_name(),
            call_timeout: Duration::from_secs(config.timeout),
        }
    }
}

pub struct MonitorActor {
    device_id: String,
    device: Arc<SerializedDevice>,
    storage: Arc<dyn StorageBackend>,
    thresholds: Arc<ThresholdStore>,
    tickets: TicketDeduplicator,
    gateway: EventGateway,
    session: Arc<RwLock<SessionView>>,
    command_rx: mpsc::Receiver<MonitorCommand>,
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}

impl MonitorActor {
    /// Run the actor's main loop until Shutdown or until every handle is gone
    #[instrument(skip(self), fields(device = %self.device_id))]
    pub async fn run(mut self) {
        debug!("starting monitor actor");

        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                _ = next_tick(&mut ticker), if ticker.is_some() => {
                    trace!("scheduled poll");
                    self.poll().await;
                }

                command = self.command_rx.recv() => {
                    match command {
                        Some(MonitorCommand::Start { interval, respond_to }) => {
                            let outcome = self.start(&mut ticker, interval).await;
                            let _ = respond_to.send(outcome);
                        }

                        Some(MonitorCommand::Stop { respond_to }) => {
                            let outcome = self.stop(&mut ticker).await;
                            let _ = respond_to.send(outcome);
                        }

                        Some(MonitorCommand::PollNow { respond_to }) => {
                            debug!("received PollNow command");
                            let outcome = self.poll().await;
                            let _ = respond_to.send(outcome);
                        }

                        Some(MonitorCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            debug!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        self.session.write().await.running = false;
        debug!("monitor actor stopped");
    }

    async fn start(
        &mut self,
        ticker: &mut Option<Interval>,
        requested: Option<Duration>,
    ) -> MonitorResult<StartOutcome> {
        if ticker.is_some() {
            debug!("start requested while already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        if let Some(interval) = requested {
            validate_interval(interval)?;
        }

        let settings = match self.storage.load_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("could not load settings, using defaults: {e}");
                None
            }
        };

        let period = requested
            .or_else(|| persisted_interval(settings.as_ref()))
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        self.thresholds.load(settings.as_ref());

        {
            let mut session = self.session.write().await;
            session.running = true;
            session.poll_interval = Some(period);
        }

        info!("monitoring started, polling every {period:?}");
        self.poll().await;

        let mut schedule = interval_at(Instant::now() + period, period);
        schedule.set_missed_tick_behavior(MissedTickBehavior::Skip);
        *ticker = Some(schedule);

        Ok(StartOutcome::Started {
            poll_interval_ms: period.as_millis() as u64,
        })
    }

    async fn stop(&mut self, ticker: &mut Option<Interval>) -> StopOutcome {
        if ticker.take().is_none() {
            return StopOutcome::NotRunning;
        }

        let mut session = self.session.write().await;
        session.running = false;
        session.poll_interval = None;
        info!("monitoring stopped");
        StopOutcome::Stopped
    }

    /// Gather, detect, publish, file tickets
    #[instrument(skip(self), fields(device = %self.device_id))]
    async fn poll(&self) -> PollOutcome {
        let device = &self.device;
        let (resources, interfaces, active_sessions, wireless) = tokio::join!(
            device.get_resources(),
            device.get_interfaces(),
            device.get_active_sessions(),
            device.get_wireless(),
        );

        let readings = DeviceReadings {
            resources: resources.into(),
            interfaces: interfaces.into(),
            active_sessions: active_sessions.into(),
            wireless: wireless.into(),
        };

        if readings.all_failed() {
            let error = readings.failures().join("; ");
            warn!("poll failed: {error}");

            self.session.write().await.last_error = Some(error.clone());
            self.gateway.publish(MonitorEvent::MonitoringError {
                device_id: self.device_id.clone(),
                timestamp: Utc::now(),
                error: error.clone(),
            });
            return PollOutcome::Failed(error);
        }

        for failure in readings.failures() {
            debug!("partial data: {failure}");
        }

        let thresholds = self.thresholds.get();
        let snapshot = Arc::new(MonitoringSnapshot::capture(
            self.device_id.clone(),
            readings,
            &thresholds,
        ));

        {
            let mut session = self.session.write().await;
            session.last_snapshot = Some(snapshot.clone());
            session.last_error = None;
        }

        self.gateway.publish(MonitorEvent::MonitoringData {
            device_id: self.device_id.clone(),
            snapshot: snapshot.clone(),
        });

        let critical = &snapshot.issues().critical;
        if !critical.is_empty() {
            info!("{} critical issue(s) detected", critical.len());
            self.gateway.publish(MonitorEvent::CriticalIssue {
                device_id: self.device_id.clone(),
                timestamp: snapshot.timestamp(),
                issues: critical.clone(),
            });

            for finding in critical {
                if let Err(e) = self.tickets.ensure_ticket_for(&self.device_id, finding).await {
                    warn!("could not file ticket for {:?}: {e}", finding.message);
                }
            }
        }

        PollOutcome::Captured(snapshot)
    }
}

fn validate_interval(interval: Duration) -> MonitorResult<()> {
    if interval.is_zero() {
        return Err(MonitorError::configuration("poll interval must be greater than zero"));
    }
    if interval > MAX_POLL_INTERVAL {
        return Err(MonitorError::configuration(format!(
            "poll interval must not exceed {}s",
            MAX_POLL_INTERVAL.as_secs()
        )));
    }
    Ok(())
}

fn persisted_interval(settings: Option<&MonitorSettings>) -> Option<Duration> {
    let secs = settings?.monitoring_interval?;
    let interval = Duration::from_secs(secs);
    match validate_interval(interval) {
        Ok(()) => Some(interval),
        Err(e) => {
            warn!("ignoring persisted monitoringInterval={secs}: {e}");
            None
        }
    }
}

/// Handle for controlling a MonitorActor
///
/// Cheap to clone. Status, snapshot and threshold reads go straight to shared
/// state; start, stop and polls are serialised through the actor.
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
    device_id: String,
    display_name: String,
    device: Arc<SerializedDevice>,
    thresholds: Arc<ThresholdStore>,
    session: Arc<RwLock<SessionView>>,
}

impl MonitorHandle {
    /// Spawn a monitor actor for one device
    ///
    /// Every call to `client`, scheduled or ad hoc, goes through one
    /// [`SerializedDevice`].
    pub fn spawn(
        config: MonitorConfig,
        client: Arc<dyn DeviceClient>,
        storage: Arc<dyn StorageBackend>,
        gateway: EventGateway,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let device = Arc::new(SerializedDevice::new(client, config.call_timeout));
        let thresholds = Arc::new(ThresholdStore::default());
        let session = Arc::new(RwLock::new(SessionView::default()));

        let actor = MonitorActor {
            device_id: config.device_id.clone(),
            device: device.clone(),
            tickets: TicketDeduplicator::new(storage.clone()),
            storage,
            thresholds: thresholds.clone(),
            gateway,
            session: session.clone(),
            command_rx: cmd_rx,
        };

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            device_id: config.device_id,
            display_name: config.display_name,
            device,
            thresholds,
            session,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> MonitorCommand,
    ) -> MonitorResult<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(command(tx))
            .await
            .map_err(|_| MonitorError::Unavailable(format!("monitor {} has shut down", self.device_id)))?;

        rx.await
            .map_err(|_| MonitorError::Unavailable(format!("monitor {} dropped the request", self.device_id)))
    }

    /// Begin polling; `interval` overrides the persisted setting
    pub async fn start(&self, interval: Option<Duration>) -> MonitorResult<StartOutcome> {
        self.request(|respond_to| MonitorCommand::Start {
            interval,
            respond_to,
        })
        .await?
    }

    pub async fn stop(&self) -> MonitorResult<StopOutcome> {
        self.request(|respond_to| MonitorCommand::Stop { respond_to })
            .await
    }

    pub async fn poll_now(&self) -> MonitorResult<PollOutcome> {
        self.request(|respond_to| MonitorCommand::PollNow { respond_to })
            .await
    }

    pub async fn shutdown(&self) -> MonitorResult<()> {
        self.sender
            .send(MonitorCommand::Shutdown)
            .await
            .map_err(|_| MonitorError::Unavailable(format!("monitor {} has shut down", self.device_id)))
    }

    pub async fn status(&self) -> MonitorStatus {
        let session = self.session.read().await;
        MonitorStatus {
            device_id: self.device_id.clone(),
            display_name: self.display_name.clone(),
            is_running: session.running,
            poll_interval_ms: session.poll_interval.map(|d| d.as_millis() as u64),
            last_snapshot_timestamp: session.last_snapshot.as_ref().map(|s| s.timestamp()),
            last_error: session.last_error.clone(),
            thresholds: self.thresholds.get(),
        }
    }

    pub async fn latest_snapshot(&self) -> Option<Arc<MonitoringSnapshot>> {
        self.session.read().await.last_snapshot.clone()
    }

    pub fn thresholds(&self) -> ThresholdSet {
        self.thresholds.get()
    }

    /// Takes effect from the next comparison on
    pub fn update_thresholds(&self, update: &ThresholdUpdate) -> MonitorResult<ThresholdSet> {
        self.thresholds.update(update)
    }

    /// Ping `host` from the device, `count` defaults to 4
    #[instrument(skip(self), fields(device = %self.device_id))]
    pub async fn ping(&self, host: &str, count: Option<u32>) -> MonitorResult<PingResult> {
        let host = validate_host(host)?;
        let count = count.unwrap_or(DEFAULT_PING_COUNT);
        if !(1..=MAX_PING_COUNT).contains(&count) {
            return Err(MonitorError::configuration(format!(
                "ping count must be between 1 and {MAX_PING_COUNT}, got {count}"
            )));
        }

        Ok(self.device.ping(host, count).await?)
    }

    #[instrument(skip(self), fields(device = %self.device_id))]
    pub async fn traceroute(&self, host: &str) -> MonitorResult<Vec<TracerouteHop>> {
        let host = validate_host(host)?;
        Ok(self.device.traceroute(host).await?)
    }
}

fn validate_host(host: &str) -> MonitorResult<&str> {
    let host = host.trim();
    if is_plausible_host(host) {
        Ok(host)
    } else {
        Err(MonitorError::configuration(format!("invalid host: {host:?}")))
    }
}
