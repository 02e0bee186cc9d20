//! Mikrotik RouterOS REST API client
//!
//! RouterOS v7 exposes its console tree under `/rest`. Every value comes back
//! as a string, so responses are decoded into raw DTOs first and converted to
//! the crate's typed model afterwards.
//!
//! ## Endpoint Mapping
//!
//! | Operation             | Request                                          |
//! |-----------------------|--------------------------------------------------|
//! | `get_resources`       | `GET system/resource` (+ `GET system/health`)    |
//! | `get_interfaces`      | `GET interface`                                  |
//! | `get_active_sessions` | `GET ppp/active`                                 |
//! | `get_wireless`        | `GET interface/wireless` + `registration-table`  |
//! | `ping`                | `POST ping`                                      |
//! | `traceroute`          | `POST tool/traceroute`                           |

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, trace, warn};

use crate::config::DeviceConfig;
use crate::{
    ActiveSession, InterfaceStats, LinkStatus, SystemResources, WirelessClient, WirelessOverview,
    WirelessRadio,
};

use super::{
    DeviceClient, DeviceError, DeviceResult, EchoStatus, PingEcho, PingResult, TracerouteHop,
    ping_budget,
};

/// RouterOS duration syntax, e.g. `1w2d3h4m5s` or `12ms345us`
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?(?:(\d+(?:\.\d+)?)ms)?(?:(\d+)us)?$",
    )
    .expect("duration pattern is valid")
});

/// Clock-style durations some firmware versions emit, e.g. `2d03:04:05`
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)w)?(?:(\d+)d)?(\d{1,2}):(\d{2}):(\d{2})$").expect("clock pattern is valid")
});

/// RouterOS REST client for a single router
pub struct RouterOsClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
}

impl RouterOsClient {
    pub fn new(config: &DeviceConfig) -> DeviceResult<Self> {
        let timeout = Duration::from_secs(config.timeout);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| DeviceError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        let password = config.resolve_password().unwrap_or_else(|| {
            warn!(
                "no password configured for device {}, authenticating with an empty password",
                config.id
            );
            String::new()
        });

        Ok(Self {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> DeviceResult<T> {
        trace!("GET {path}");
        let request = self.client.get(self.url(path));
        self.send(request, path, self.timeout).await
    }

    /// POST a command; `budget` replaces the client timeout for this request
    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        budget: Duration,
    ) -> DeviceResult<T> {
        trace!("POST {path}");
        let request = self.client.post(self.url(path)).json(body);
        self.send(request, path, budget).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
        budget: Duration,
    ) -> DeviceResult<T> {
        let response = request
            .timeout(budget)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| classify(e, budget))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DeviceError::AuthenticationFailed);
        }

        if status == StatusCode::NOT_FOUND || status == StatusCode::NOT_IMPLEMENTED {
            return Err(DeviceError::Unavailable(format!(
                "{path} is not supported by the device"
            )));
        }

        let body = response.text().await.map_err(|e| classify(e, budget))?;

        if !status.is_success() {
            let detail = error_detail(&body);
            if status == StatusCode::BAD_REQUEST && detail.contains("no such command") {
                return Err(DeviceError::Unavailable(format!("{path}: {detail}")));
            }
            return Err(DeviceError::CommandFailed(format!("{status}: {detail}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| DeviceError::MalformedResponse(format!("{path}: {e}")))
    }

    /// Board temperature; absent sensors and old firmware yield `None`
    async fn get_temperature(&self) -> Option<f64> {
        match self.get::<Value>("system/health").await {
            Ok(health) => parse_temperature(&health),
            Err(e) => {
                debug!("no temperature reading: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl DeviceClient for RouterOsClient {
    #[instrument(skip(self), fields(device = %self.base_url))]
    async fn get_resources(&self) -> DeviceResult<SystemResources> {
        let raw: RawResource = self.get("system/resource").await?;
        let mut resources = raw.into_resources()?;
        resources.temperature = self.get_temperature().await;
        Ok(resources)
    }

    #[instrument(skip(self), fields(device = %self.base_url))]
    async fn get_interfaces(&self) -> DeviceResult<Vec<InterfaceStats>> {
        let raw: Vec<RawInterface> = self.get("interface").await?;
        raw.into_iter().map(RawInterface::into_stats).collect()
    }

    #[instrument(skip(self), fields(device = %self.base_url))]
    async fn get_active_sessions(&self) -> DeviceResult<Vec<ActiveSession>> {
        let raw: Vec<RawSession> = self.get("ppp/active").await?;
        raw.into_iter().map(RawSession::into_session).collect()
    }

    #[instrument(skip(self), fields(device = %self.base_url))]
    async fn get_wireless(&self) -> DeviceResult<WirelessOverview> {
        let radios: Vec<RawRadio> = self.get("interface/wireless").await?;
        let clients: Vec<RawRegistration> =
            self.get("interface/wireless/registration-table").await?;

        Ok(WirelessOverview {
            radios: radios.into_iter().map(RawRadio::into_radio).collect::<DeviceResult<_>>()?,
            clients: clients
                .into_iter()
                .map(RawRegistration::into_client)
                .collect::<DeviceResult<_>>()?,
        })
    }

    #[instrument(skip(self), fields(device = %self.base_url))]
    async fn ping(&self, host: &str, count: u32) -> DeviceResult<PingResult> {
        let body = json!({ "address": host, "count": count.to_string() });
        let budget = ping_budget(self.timeout, count);
        let raw: Vec<RawEcho> = self.post("ping", &body, budget).await?;
        let echoes = raw
            .into_iter()
            .enumerate()
            .map(|(index, echo)| echo.into_echo(index as u32))
            .collect::<DeviceResult<Vec<_>>>()?;
        Ok(PingResult::from_echoes(host, echoes))
    }

    #[instrument(skip(self), fields(device = %self.base_url))]
    async fn traceroute(&self, host: &str) -> DeviceResult<Vec<TracerouteHop>> {
        let body = json!({ "address": host, "count": "1" });
        let raw: Vec<RawHop> = self.post("tool/traceroute", &body, self.timeout).await?;
        raw.into_iter()
            .enumerate()
            .map(|(index, hop)| hop.into_hop(index as u32 + 1))
            .collect()
    }
}

fn classify(error: reqwest::Error, budget: Duration) -> DeviceError {
    if error.is_timeout() {
        DeviceError::Timeout(budget)
    } else if error.is_decode() {
        DeviceError::MalformedResponse(error.to_string())
    } else {
        DeviceError::Unreachable(error.to_string())
    }
}

/// `detail` (or `message`) of a RouterOS error body, else the trimmed body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|error| {
            error
                .get("detail")
                .or_else(|| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

// ============================================================================
// Raw RouterOS payloads
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawResource {
    cpu_load: Option<String>,
    free_memory: Option<String>,
    total_memory: Option<String>,
    free_hdd_space: Option<String>,
    total_hdd_space: Option<String>,
    uptime: Option<String>,
    version: Option<String>,
    board_name: Option<String>,
}

impl RawResource {
    fn into_resources(self) -> DeviceResult<SystemResources> {
        let cpu_load = required::<f64>("cpu-load", self.cpu_load.as_deref())?;
        let memory_usage_percent = usage_percent(
            "memory",
            self.free_memory.as_deref(),
            self.total_memory.as_deref(),
        )?;
        let disk_usage_percent = usage_percent(
            "hdd",
            self.free_hdd_space.as_deref(),
            self.total_hdd_space.as_deref(),
        )?;

        Ok(SystemResources {
            cpu_load,
            memory_usage_percent,
            disk_usage_percent,
            uptime_secs: duration_secs(self.uptime.as_deref())?,
            firmware_version: self.version.unwrap_or_default(),
            board_name: self.board_name.unwrap_or_default(),
            temperature: None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawInterface {
    name: String,
    #[serde(rename = "type")]
    interface_type: Option<String>,
    running: Option<String>,
    disabled: Option<String>,
    mac_address: Option<String>,
    rx_byte: Option<String>,
    tx_byte: Option<String>,
    rx_packet: Option<String>,
    tx_packet: Option<String>,
    rx_error: Option<String>,
    tx_error: Option<String>,
    rx_drop: Option<String>,
    tx_drop: Option<String>,
}

impl RawInterface {
    fn into_stats(self) -> DeviceResult<InterfaceStats> {
        let link_status = if flag(self.disabled.as_deref()) {
            LinkStatus::Disabled
        } else if flag(self.running.as_deref()) {
            LinkStatus::Up
        } else {
            LinkStatus::Down
        };

        Ok(InterfaceStats {
            interface_type: self.interface_type.unwrap_or_else(|| String::from("unknown")),
            link_status,
            mac_address: self.mac_address,
            rx_bytes: counter("rx-byte", self.rx_byte.as_deref())?,
            tx_bytes: counter("tx-byte", self.tx_byte.as_deref())?,
            rx_packets: counter("rx-packet", self.rx_packet.as_deref())?,
            tx_packets: counter("tx-packet", self.tx_packet.as_deref())?,
            rx_errors: counter("rx-error", self.rx_error.as_deref())?,
            tx_errors: counter("tx-error", self.tx_error.as_deref())?,
            rx_drops: counter("rx-drop", self.rx_drop.as_deref())?,
            tx_drops: counter("tx-drop", self.tx_drop.as_deref())?,
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawSession {
    name: String,
    service: Option<String>,
    address: Option<String>,
    uptime: Option<String>,
    encoding: Option<String>,
}

impl RawSession {
    fn into_session(self) -> DeviceResult<ActiveSession> {
        Ok(ActiveSession {
            session_name: self.name,
            service_type: self.service.unwrap_or_else(|| String::from("unknown")),
            remote_address: self.address,
            uptime_secs: duration_secs(self.uptime.as_deref())?,
            encoding: self.encoding.filter(|e| !e.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawRadio {
    name: String,
    mac_address: Option<String>,
    ssid: Option<String>,
    band: Option<String>,
    channel: Option<String>,
    frequency: Option<String>,
    disabled: Option<String>,
}

impl RawRadio {
    fn into_radio(self) -> DeviceResult<WirelessRadio> {
        // "auto" is a legal frequency setting
        let frequency = self
            .frequency
            .as_deref()
            .and_then(|f| f.parse::<u32>().ok());

        Ok(WirelessRadio {
            enabled: !flag(self.disabled.as_deref()),
            name: self.name,
            mac_address: self.mac_address,
            ssid: self.ssid,
            band: self.band,
            channel: self.channel,
            frequency,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawRegistration {
    interface: String,
    mac_address: String,
    signal_strength: Option<String>,
    tx_rate: Option<String>,
    rx_rate: Option<String>,
    uptime: Option<String>,
}

impl RawRegistration {
    fn into_client(self) -> DeviceResult<WirelessClient> {
        let signal = self.signal_strength.as_deref().unwrap_or_default();
        Ok(WirelessClient {
            signal_strength_dbm: parse_signal(signal)?,
            radio_interface: self.interface,
            mac_address: self.mac_address,
            tx_rate: self.tx_rate,
            rx_rate: self.rx_rate,
            uptime_secs: duration_secs(self.uptime.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawEcho {
    seq: Option<String>,
    time: Option<String>,
    ttl: Option<String>,
}

impl RawEcho {
    fn into_echo(self, index: u32) -> DeviceResult<PingEcho> {
        let seq = match self.seq.as_deref() {
            Some(seq) => required::<u32>("seq", Some(seq))?,
            None => index,
        };
        let response_time_ms = self.time.as_deref().map(parse_millis).transpose()?;
        let ttl = self.ttl.as_deref().and_then(|t| t.parse().ok());

        Ok(PingEcho {
            seq,
            status: if response_time_ms.is_some() {
                EchoStatus::Reply
            } else {
                EchoStatus::Timeout
            },
            response_time_ms,
            ttl,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawHop {
    address: Option<String>,
    loss: Option<String>,
    sent: Option<String>,
    last: Option<String>,
    avg: Option<String>,
    best: Option<String>,
    worst: Option<String>,
    status: Option<String>,
}

impl RawHop {
    fn into_hop(self, hop: u32) -> DeviceResult<TracerouteHop> {
        // unanswered hops report "timeout" in place of a time
        let optional_millis = |value: Option<String>| -> Option<f64> {
            value.as_deref().and_then(|v| parse_millis(v).ok())
        };

        Ok(TracerouteHop {
            hop,
            address: self.address.filter(|a| !a.is_empty()),
            loss_percent: match self.loss.as_deref() {
                Some(loss) => required::<f64>("loss", Some(loss.trim_end_matches('%')))?,
                None => 0.0,
            },
            sent: counter("sent", self.sent.as_deref())? as u32,
            last_ms: optional_millis(self.last),
            avg_ms: optional_millis(self.avg),
            best_ms: optional_millis(self.best),
            worst_ms: optional_millis(self.worst),
            status: self.status.filter(|s| !s.is_empty()),
        })
    }
}

// ============================================================================
// Value parsing
// ============================================================================

fn required<T: std::str::FromStr>(field: &str, value: Option<&str>) -> DeviceResult<T> {
    let value =
        value.ok_or_else(|| DeviceError::MalformedResponse(format!("missing field {field}")))?;
    value
        .trim()
        .parse()
        .map_err(|_| DeviceError::MalformedResponse(format!("invalid {field}: {value:?}")))
}

/// Absent counters read as zero
fn counter(field: &str, value: Option<&str>) -> DeviceResult<u64> {
    match value {
        None => Ok(0),
        Some(value) => required(field, Some(value)),
    }
}

fn flag(value: Option<&str>) -> bool {
    matches!(value, Some("true") | Some("yes"))
}

fn usage_percent(field: &str, free: Option<&str>, total: Option<&str>) -> DeviceResult<f64> {
    let free = counter(field, free)?;
    let total = counter(field, total)?;
    if total == 0 {
        return Ok(0.0);
    }
    Ok(total.saturating_sub(free) as f64 / total as f64 * 100.0)
}

/// Parse a RouterOS duration into milliseconds
pub fn parse_duration_millis(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let number = |caps: &regex::Captures, index: usize| -> f64 {
        caps.get(index)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    if let Some(caps) = DURATION_RE.captures(value) {
        return Some(
            number(&caps, 1) * 604_800_000.0
                + number(&caps, 2) * 86_400_000.0
                + number(&caps, 3) * 3_600_000.0
                + number(&caps, 4) * 60_000.0
                + number(&caps, 5) * 1_000.0
                + number(&caps, 6)
                + number(&caps, 7) / 1_000.0,
        );
    }

    CLOCK_RE.captures(value).map(|caps| {
        number(&caps, 1) * 604_800_000.0
            + number(&caps, 2) * 86_400_000.0
            + number(&caps, 3) * 3_600_000.0
            + number(&caps, 4) * 60_000.0
            + number(&caps, 5) * 1_000.0
    })
}

fn duration_secs(value: Option<&str>) -> DeviceResult<u64> {
    match value {
        None => Ok(0),
        Some(raw) => parse_duration_millis(raw)
            .map(|ms| (ms / 1_000.0) as u64)
            .ok_or_else(|| DeviceError::MalformedResponse(format!("invalid duration: {raw:?}"))),
    }
}

/// Round-trip times come either as bare numbers (ms) or as durations
fn parse_millis(value: &str) -> DeviceResult<f64> {
    let value = value.trim();
    value
        .parse::<f64>()
        .ok()
        .or_else(|| parse_duration_millis(value))
        .ok_or_else(|| DeviceError::MalformedResponse(format!("invalid time: {value:?}")))
}

/// `-65@6Mbps` or `-65`
fn parse_signal(value: &str) -> DeviceResult<i32> {
    let dbm = value.split('@').next().unwrap_or_default().trim();
    dbm.trim_end_matches("dBm")
        .parse()
        .map_err(|_| DeviceError::MalformedResponse(format!("invalid signal strength: {value:?}")))
}

/// v7 answers with a list of sensors, v6 with a flat object
fn parse_temperature(health: &Value) -> Option<f64> {
    let as_number = |value: &Value| -> Option<f64> {
        match value {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    };

    match health {
        Value::Array(sensors) => sensors
            .iter()
            .filter(|sensor| {
                sensor
                    .get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|name| name.contains("temperature"))
            })
            .find_map(|sensor| sensor.get("value").and_then(as_number)),
        Value::Object(fields) => fields
            .get("temperature")
            .or_else(|| fields.get("cpu-temperature"))
            .and_then(as_number),
        _ => {
            warn!("unexpected system/health payload");
            None
        }
    }
}
