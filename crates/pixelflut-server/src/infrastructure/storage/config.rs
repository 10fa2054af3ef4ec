//! TOML configuration for the pixelflut server.
//!
//! The file is looked up in this order:
//! 1. the path given with `--config` (or `PIXELFLUT_CONFIG`),
//! 2. the platform config directory:
//!    - Linux:   `~/.config/pixelflut/config.toml`
//!    - macOS:   `~/Library/Application Support/Pixelflut/config.toml`
//!    - Windows: `%APPDATA%\Pixelflut\config.toml`
//!
//! A missing file is not an error: every field has a default, so the server
//! runs out of the box with a 64×64 in-memory canvas.
//!
//! ```toml
//! [server]
//! binary_port = 1337
//! text_port = 1234          # 0 disables the text dialect
//!
//! [canvas]
//! width = 32
//! height = 16
//! wiring = "serpentine-columns"
//!
//! [display]
//! surface = "udp-strip"
//! strip_target = "10.0.0.20:21324"
//! brightness = 100
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, and whole sections marked
//! `#[serde(default)]` may be left out entirely.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pixelflut_core::{Origin, Topology, WiringOrder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parsed but do not make sense together.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ListenConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

/// Listener and loop settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListenConfig {
    /// IP address every socket binds to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port of the binary dialect.  `0` disables it.
    #[serde(default = "default_binary_port")]
    pub binary_port: u16,
    /// TCP port of the text dialect.  `0` disables it.
    #[serde(default = "default_text_port")]
    pub text_port: u16,
    /// How long a half-received binary command may sit before it is
    /// discarded as malformed.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Sleep between drain passes that found no input.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
    /// Prefix of every telemetry and control topic.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Canvas size and physical wiring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_side")]
    pub width: u16,
    #[serde(default = "default_canvas_side")]
    pub height: u16,
    #[serde(default)]
    pub wiring: WiringOrder,
    #[serde(default)]
    pub origin: Origin,
}

/// Which pixel surface back-end renders the canvas.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceKind {
    /// Keep frames in memory only.
    #[default]
    Memory,
    /// Log a digest of every frame.
    Log,
    /// Stream frames to a UDP LED controller.
    UdpStrip,
}

impl std::str::FromStr for SurfaceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(SurfaceKind::Memory),
            "log" => Ok(SurfaceKind::Log),
            "udp-strip" => Ok(SurfaceKind::UdpStrip),
            other => Err(ConfigError::Invalid(format!(
                "unknown surface {other:?}, expected memory, log or udp-strip"
            ))),
        }
    }
}

/// Display output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default)]
    pub surface: SurfaceKind,
    /// Destination of `udp-strip` frames.
    #[serde(default = "default_strip_target")]
    pub strip_target: String,
    /// Initial brightness, 1..=255.  `0` is raised to 1.
    #[serde(default = "default_brightness")]
    pub brightness: u8,
    /// Initial power state.
    #[serde(default = "default_true")]
    pub power: bool,
    /// Flushes per second.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Cycle through red, green, blue, white and black before serving.
    #[serde(default)]
    pub startup_test: bool,
}

/// Metrics sampling and publishing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default = "default_interval_secs")]
    pub rates_interval_secs: u64,
    #[serde(default = "default_interval_secs")]
    pub signal_interval_secs: u64,
    /// Publish the smoothed rates every N samples.
    #[serde(default = "default_rates_publish_every")]
    pub rates_publish_every: u32,
    /// Publish the smoothed signal strength every N samples.
    #[serde(default = "default_signal_publish_every")]
    pub signal_publish_every: u32,
    /// Measurement error of the smoothing filter.  Larger is smoother.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    /// UDP destination for JSON telemetry.  Values are always logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_target: Option<String>,
    #[serde(default = "default_wireless_interface")]
    pub wireless_interface: String,
}

/// Remote configuration listener.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ControlConfig {
    /// UDP port accepting JSON `{topic, payload}` settings.  Absent disables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_binary_port() -> u16 {
    1337
}
fn default_text_port() -> u16 {
    1234
}
fn default_read_timeout_ms() -> u64 {
    100
}
fn default_idle_backoff_ms() -> u64 {
    1
}
fn default_client_name() -> String {
    "pixelflut".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_canvas_side() -> u16 {
    64
}
fn default_strip_target() -> String {
    "127.0.0.1:21324".to_string()
}
fn default_brightness() -> u8 {
    100
}
fn default_true() -> bool {
    true
}
fn default_frame_rate() -> u32 {
    30
}
fn default_interval_secs() -> u64 {
    5
}
fn default_rates_publish_every() -> u32 {
    12
}
fn default_signal_publish_every() -> u32 {
    60
}
fn default_sensitivity() -> f64 {
    10.0
}
fn default_wireless_interface() -> String {
    "wlan0".to_string()
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            binary_port: default_binary_port(),
            text_port: default_text_port(),
            read_timeout_ms: default_read_timeout_ms(),
            idle_backoff_ms: default_idle_backoff_ms(),
            client_name: default_client_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_side(),
            height: default_canvas_side(),
            wiring: WiringOrder::default(),
            origin: Origin::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceKind::default(),
            strip_target: default_strip_target(),
            brightness: default_brightness(),
            power: default_true(),
            frame_rate: default_frame_rate(),
            startup_test: false,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            rates_interval_secs: default_interval_secs(),
            signal_interval_secs: default_interval_secs(),
            rates_publish_every: default_rates_publish_every(),
            signal_publish_every: default_signal_publish_every(),
            sensitivity: default_sensitivity(),
            publish_target: None,
            wireless_interface: default_wireless_interface(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl ListenConfig {
    pub fn binary_port(&self) -> Option<u16> {
        (self.binary_port != 0).then_some(self.binary_port)
    }

    pub fn text_port(&self) -> Option<u16> {
        (self.text_port != 0).then_some(self.text_port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// Socket address for `port` on the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `bind_address` is not an IP address.
    pub fn socket_addr(&self, port: u16) -> Result<SocketAddr, ConfigError> {
        let ip = self.bind_address.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "bind_address {:?} is not an IP address",
                self.bind_address
            ))
        })?;
        Ok(SocketAddr::new(ip, port))
    }
}

impl CanvasConfig {
    /// Wiring table for the configured canvas.
    pub fn topology(&self) -> Topology {
        Topology::new(self.width, self.height, self.wiring, self.origin)
    }
}

impl DisplayConfig {
    /// Destination of `udp-strip` frames.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `strip_target` is not `ip:port`.
    pub fn strip_target_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_target("display.strip_target", &self.strip_target)
    }

    /// Initial brightness with `0` raised to the minimum of 1.
    pub fn initial_brightness(&self) -> u8 {
        self.brightness.max(1)
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

impl TelemetryConfig {
    pub fn rates_interval(&self) -> Duration {
        Duration::from_secs(self.rates_interval_secs)
    }

    pub fn signal_interval(&self) -> Duration {
        Duration::from_secs(self.signal_interval_secs)
    }

    /// UDP destination for JSON telemetry, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `publish_target` is not `ip:port`.
    pub fn publish_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.publish_target
            .as_deref()
            .map(|target| parse_target("telemetry.publish_target", target))
            .transpose()
    }
}

fn parse_target(field: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{field} {value:?} is not an ip:port address")))
}

impl ServerConfig {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        if self.canvas.width == 0 || self.canvas.height == 0 {
            return invalid(format!(
                "canvas must be at least 1x1, got {}x{}",
                self.canvas.width, self.canvas.height
            ));
        }
        // The binary handshake advertises the size in single bytes.
        if self.server.binary_port().is_some()
            && (self.canvas.width > 255 || self.canvas.height > 255)
        {
            return invalid(format!(
                "canvas {}x{} exceeds 255x255, which the binary dialect cannot advertise; \
                 set server.binary_port = 0 to serve text only",
                self.canvas.width, self.canvas.height
            ));
        }
        if self.server.binary_port().is_none() && self.server.text_port().is_none() {
            return invalid("both binary_port and text_port are disabled".to_string());
        }
        if self.display.frame_rate == 0 {
            return invalid("display.frame_rate must be at least 1".to_string());
        }
        if self.telemetry.rates_interval_secs == 0 || self.telemetry.signal_interval_secs == 0 {
            return invalid("telemetry intervals must be at least 1 second".to_string());
        }
        if self.telemetry.rates_publish_every == 0 || self.telemetry.signal_publish_every == 0 {
            return invalid("telemetry publish_every values must be at least 1".to_string());
        }
        if self.telemetry.sensitivity.is_nan() || self.telemetry.sensitivity <= 0.0 {
            return invalid("telemetry.sensitivity must be positive".to_string());
        }
        self.server.socket_addr(0)?;
        if self.display.surface == SurfaceKind::UdpStrip {
            self.display.strip_target_addr()?;
        }
        self.telemetry.publish_addr()?;
        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default path of the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config at `path`, returning the defaults if the file does not
/// exist.
///
/// The result is not validated: command-line overrides may still change it,
/// so callers run [`ServerConfig::validate`] once everything is applied.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found"
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ServerConfig, ConfigError> {
    let cfg = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ServerConfig::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    Ok(cfg)
}

/// Loads the config from `path` if given, otherwise from the platform path.
///
/// Without a platform config directory the defaults are used.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    match path {
        Some(path) => load_config_from(path),
        None => match config_file_path() {
            Ok(path) => load_config_from(&path),
            Err(ConfigError::NoPlatformConfigDir) => Ok(ServerConfig::default()),
            Err(e) => Err(e),
        },
    }
}

/// Resolves the platform config base directory including the `Pixelflut`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Pixelflut"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("pixelflut"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Pixelflut")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
