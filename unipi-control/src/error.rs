//! Top-level error type wrapping each component crate's own (§7, layered
//! error pattern also used by `virtual-plc`'s config crate).

use thiserror::Error;
use unipi_config::{ConfigError, HardwareError};
use unipi_mqtt::MqttError;

#[derive(Debug, Error)]
pub enum UnexpectedError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error(transparent)]
    Mqtt(#[from] MqttError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

impl UnexpectedError {
    /// Prefix used when logging the fatal error at the top level, matching
    /// the taxonomy's per-class prefix (§7).
    pub fn log_prefix(&self) -> &'static str {
        match self {
            UnexpectedError::Config(_) => ConfigError::LOG_PREFIX,
            UnexpectedError::Hardware(_) => HardwareError::LOG_PREFIX,
            UnexpectedError::Mqtt(_) => MqttError::LOG_PREFIX,
            UnexpectedError::Signal(_) => "[CONTROL]",
        }
    }
}
