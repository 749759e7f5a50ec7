//! Core application state and helpers.
//!
//! Holds the connection form, the per-channel plot series and the two text
//! logs. Everything here is owned and mutated by the UI thread only.
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::display::{DisplaySink, LogView};
use super::link::{LinkConfig, LinkTarget};
use super::telemetry::CHANNELS;

/// Which kind of link the connection bar opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    Serial,
    Tcp,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKind::Serial => write!(f, "Serial"),
            LinkKind::Tcp => write!(f, "TCP"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting(String),
    Connected(String),
    /// Open or read failure, shown until the next connect attempt.
    Failed(String),
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting(target) => write!(f, "Connecting to {}...", target),
            ConnectionStatus::Connected(target) => write!(f, "Connected: {}", target),
            ConnectionStatus::Failed(reason) => write!(f, "Error: {}", reason),
        }
    }
}

/// Top-level state for the running app.
pub struct AppState {
    pub link_kind: LinkKind,
    /// Serial device path (e.g. `COM3`, `/dev/ttyACM0`).
    pub port_input: String,
    pub baud_input: String,
    /// Assert DTR after opening; the flight computer waits for it.
    pub dtr: bool,
    pub tcp_address_input: String,
    pub read_timeout: Duration,
    /// Ports found by the last refresh.
    pub known_ports: Vec<String>,

    pub status: ConnectionStatus,

    /// `[sample index, value]` points per channel.
    pub series: HashMap<&'static str, Vec<[f64; 2]>>,
    pub max_points: usize,

    pub telemetry_log: String,
    pub message_log: String,
    pub max_log_chars: usize,
}

impl Default for AppState {
    fn default() -> Self {
        let default_port = if cfg!(windows) { "COM3" } else { "/dev/ttyACM0" };
        Self {
            link_kind: LinkKind::Serial,
            port_input: default_port.to_string(),
            baud_input: "2000000".to_string(),
            dtr: true,
            tcp_address_input: "127.0.0.1:9000".to_string(),
            read_timeout: Duration::from_millis(100),
            known_ports: Vec::new(),
            status: ConnectionStatus::Disconnected,
            series: CHANNELS.iter().map(|&c| (c, Vec::new())).collect(),
            max_points: 5000,
            telemetry_log: String::new(),
            message_log: String::new(),
            max_log_chars: 64 * 1024,
        }
    }
}

impl AppState {
    /// Build a link config from the connection form.
    pub fn link_config(&self) -> Result<LinkConfig, String> {
        let target = match self.link_kind {
            LinkKind::Serial => {
                let path = self.port_input.trim();
                if path.is_empty() {
                    return Err("no serial port given".to_string());
                }
                let baud = self
                    .baud_input
                    .trim()
                    .parse::<u32>()
                    .map_err(|e| format!("invalid baud rate '{}': {}", self.baud_input, e))?;
                LinkTarget::Serial {
                    path: path.to_string(),
                    baud,
                    dtr: self.dtr,
                }
            }
            LinkKind::Tcp => {
                let address = self.tcp_address_input.trim();
                if address.is_empty() {
                    return Err("no address given".to_string());
                }
                LinkTarget::Tcp {
                    address: address.to_string(),
                }
            }
        };
        Ok(LinkConfig {
            target,
            read_timeout: self.read_timeout,
        })
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.status,
            ConnectionStatus::Connecting(_) | ConnectionStatus::Connected(_)
        )
    }

    pub fn series(&self, channel: &str) -> &[[f64; 2]] {
        self.series.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop plots and logs, e.g. before a fresh flight.
    pub fn clear_data(&mut self) {
        for points in self.series.values_mut() {
            points.clear();
        }
        self.telemetry_log.clear();
        self.message_log.clear();
    }
}

impl DisplaySink for AppState {
    fn append_log(&mut self, view: LogView, text: &str) {
        let max = self.max_log_chars;
        let log = match view {
            LogView::Telemetry => &mut self.telemetry_log,
            LogView::Messages => &mut self.message_log,
        };
        log.push_str(text);
        trim_leading_lines(log, max);
    }

    fn plot_sample(&mut self, channel: &'static str, value: f64, index: u64) {
        let points = self.series.entry(channel).or_default();
        points.push([index as f64, value]);
        if points.len() > self.max_points {
            let overflow = points.len() - self.max_points;
            points.drain(0..overflow);
        }
    }
}

/// Drop whole lines from the front of `log` until it fits in `max` bytes.
fn trim_leading_lines(log: &mut String, max: usize) {
    if log.len() <= max {
        return;
    }
    let mut excess = log.len() - max;
    while !log.is_char_boundary(excess) {
        excess += 1;
    }
    let cut = match log[excess..].find('\n') {
        Some(pos) => excess + pos + 1,
        None => log.len(),
    };
    log.drain(..cut);
}
