use thiserror::Error;

/// Classified outcome of the MQTT engine. Transient broker errors are
/// handled internally by the reconnect loop (§4.6) and never surface
/// here; only the fatal conditions the loop itself gives up on do.
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("reconnect attempts exceeded retry_limit")]
    RetryLimitExceeded,
}

impl MqttError {
    pub const LOG_PREFIX: &'static str = "[MQTT]";
}
