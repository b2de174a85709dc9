//! Typed control-document configuration.
//!
//! Mirrors the dataclass hierarchy in `config.py` (`DeviceInfo`,
//! `MqttConfig`, `ModbusConfig`, `HomeAssistantConfig`, `LoggingConfig`,
//! `FeatureConfig`, `CoverConfig`, `Config`) using plain `serde` derives
//! instead of the original's `ConfigLoaderMixin.update` dynamic-attribute
//! pattern (see DESIGN NOTES on dynamic attribute assignment).

use std::collections::BTreeMap;

use serde::Deserialize;

fn default_mqtt_port() -> u16 {
    1883
}
fn default_mqtt_keepalive() -> u64 {
    15
}
fn default_retry_limit() -> u32 {
    30
}
fn default_reconnect_interval() -> u64 {
    10
}
fn default_baud_rate() -> u32 {
    9600
}
fn default_parity() -> Parity {
    Parity::Even
}
fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}
fn default_log_level() -> LogLevel {
    LogLevel::Info
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceInfo {
    pub name: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_mqtt_keepalive")]
    pub keepalive: u64,
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval: u64,
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            keepalive: default_mqtt_keepalive(),
            retry_limit: default_retry_limit(),
            reconnect_interval: default_reconnect_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Parity {
    Even,
    Odd,
    None,
}

pub const VALID_BAUD_RATES: [u32; 7] = [2400, 4800, 9600, 19200, 38400, 57600, 115200];

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModbusUnitConfig {
    pub unit: u8,
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModbusConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_parity")]
    pub parity: Parity,
    #[serde(default)]
    pub units: Vec<ModbusUnitConfig>,
}

fn default_serial_port() -> String {
    "/dev/extcomm/0/0".to_string()
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            parity: default_parity(),
            units: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HomeAssistantConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
}

fn default_true() -> bool {
    true
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self { enabled: true, discovery_prefix: default_discovery_prefix() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

/// Per-feature_id overrides layered over the hardware-derived defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureConfig {
    pub object_id: Option<String>,
    pub friendly_name: Option<String>,
    pub suggested_area: Option<String>,
    pub icon: Option<String>,
    pub device_class: Option<String>,
    pub state_class: Option<String>,
    pub unit_of_measurement: Option<String>,
    #[serde(default)]
    pub invert_state: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverDeviceClass {
    Blind,
    RollerShutter,
    GarageDoor,
}

impl CoverDeviceClass {
    /// Segment used in MQTT topic paths and position-file names.
    pub fn as_topic_str(self) -> &'static str {
        match self {
            CoverDeviceClass::Blind => "blind",
            CoverDeviceClass::RollerShutter => "roller_shutter",
            CoverDeviceClass::GarageDoor => "garage_door",
        }
    }

    /// §3 capability flags: whether `set_position` is meaningful.
    pub fn supports_set_position(self) -> bool {
        !matches!(self, CoverDeviceClass::RollerShutter)
    }

    /// §3 capability flags: whether `set_tilt` is meaningful.
    pub fn supports_set_tilt(self) -> bool {
        matches!(self, CoverDeviceClass::Blind)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoverConfig {
    pub object_id: String,
    pub friendly_name: String,
    pub suggested_area: Option<String>,
    pub device_class: CoverDeviceClass,
    pub cover_up: String,
    pub cover_down: String,
    pub cover_run_time: Option<f64>,
    pub tilt_change_time: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub device_info: DeviceInfo,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub modbus: ModbusConfig,
    #[serde(default)]
    pub homeassistant: HomeAssistantConfig,
    #[serde(default)]
    pub features: BTreeMap<String, FeatureConfig>,
    #[serde(default)]
    pub covers: Vec<CoverConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}
