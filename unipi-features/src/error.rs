use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("feature {0:?} is read-only")]
    ReadOnly(String),
    #[error(transparent)]
    Modbus(#[from] unipi_modbus::ModbusError),
}
