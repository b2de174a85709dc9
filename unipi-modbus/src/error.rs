use thiserror::Error;

/// Classified outcome of a Modbus request. All errors are non-fatal;
/// callers log and skip (scanner) or abort the in-progress command
/// (cover) rather than aborting the process.
#[derive(Debug, Error)]
pub enum ModbusError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("modbus exception response: {0:?}")]
    Exception(tokio_modbus::ExceptionCode),
    #[error("transport is disconnected")]
    Disconnected,
}

impl ModbusError {
    pub const LOG_PREFIX: &'static str = "[MODBUS]";
}
