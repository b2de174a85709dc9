//! Modbus driver facade (C2) and register cache (C3) for Unipi Control.

pub mod cache;
pub mod error;
pub mod fake;
pub mod facade;
pub mod transport;

pub use cache::RegisterCache;
pub use error::ModbusError;
pub use facade::{rtu_silent_interval, Facade, DEFAULT_RTU_TIMEOUT, DEFAULT_TCP_TIMEOUT};
pub use transport::{RtuTransport, TcpTransport, Transport};
