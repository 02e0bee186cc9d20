use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use network_monitor::{
    actors::{MonitorConfig, MonitorHandle},
    config::{Config, read_config_file},
    device::{DeviceClient, routeros::RouterOsClient},
    events::{EventGateway, MonitorEvent},
    storage::{self, StorageBackend},
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("network_monitor", level),
        ("netmon", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let storage = storage::open_backend(&config.storage.clone().unwrap_or_default()).await?;
    let gateway = EventGateway::default();

    let _log_listener = gateway.spawn_listener("event-log", log_event);

    let monitors = dispatch_monitors(&config, storage.clone(), gateway.clone()).await?;

    if let Some(section) = &config.api {
        start_api(section, &monitors, storage.clone(), gateway.clone()).await?;
    }

    tokio::signal::ctrl_c().await?;
    info!("received shutdown signal");

    for monitor in &monitors {
        if let Err(e) = monitor.stop().await {
            warn!("failed to stop {}: {e}", monitor.device_id());
        }
        if let Err(e) = monitor.shutdown().await {
            debug!("monitor {} already gone: {e}", monitor.device_id());
        }
    }

    if let Err(e) = storage.close().await {
        error!("failed to close storage: {e}");
    }

    Ok(())
}

async fn dispatch_monitors(
    config: &Config,
    storage: Arc<dyn StorageBackend>,
    gateway: EventGateway,
) -> anyhow::Result<Vec<MonitorHandle>> {
    let mut monitors = vec![];
    let Some(devices) = &config.devices else {
        warn!("no devices configured");
        return Ok(monitors);
    };

    for device in devices {
        let client: Arc<dyn DeviceClient> = Arc::new(RouterOsClient::new(device)?);
        let monitor = MonitorHandle::spawn(
            MonitorConfig::from(device),
            client,
            storage.clone(),
            gateway.clone(),
        );
        debug!(
            "spawned monitor for {} ({})",
            monitor.display_name(),
            device.base_url()
        );

        if device.auto_start {
            let interval = device.interval.map(Duration::from_secs);
            match monitor.start(interval).await {
                Ok(outcome) => info!("{}: {outcome:?}", monitor.device_id()),
                Err(e) => error!("{}: failed to start monitoring: {e}", monitor.device_id()),
            }
        }

        monitors.push(monitor);
    }

    Ok(monitors)
}

#[cfg(feature = "api")]
async fn start_api(
    section: &network_monitor::config::ApiSection,
    monitors: &[MonitorHandle],
    storage: Arc<dyn StorageBackend>,
    gateway: EventGateway,
) -> anyhow::Result<()> {
    use network_monitor::api::{ApiConfig, ApiState, spawn_api_server};

    let api_config = ApiConfig::from(section);
    if api_config.auth_token.is_none() {
        warn!("API is running without authentication");
    }

    let state = ApiState::new(monitors.to_vec(), storage, gateway);
    spawn_api_server(api_config, state).await?;
    Ok(())
}

#[cfg(not(feature = "api"))]
async fn start_api(
    _section: &network_monitor::config::ApiSection,
    _monitors: &[MonitorHandle],
    _storage: Arc<dyn StorageBackend>,
    _gateway: EventGateway,
) -> anyhow::Result<()> {
    warn!("API section configured but the binary was built without the api feature");
    Ok(())
}

fn log_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::MonitoringData { device_id, snapshot } => {
            debug!(
                "{device_id}: snapshot with {} issues",
                snapshot.issues().len()
            );
        }
        MonitorEvent::CriticalIssue {
            device_id, issues, ..
        } => {
            for finding in issues {
                warn!("{device_id}: CRITICAL {}", finding.message);
            }
        }
        MonitorEvent::MonitoringError {
            device_id, error, ..
        } => {
            error!("{device_id}: monitoring failed: {error}");
        }
    }
}
