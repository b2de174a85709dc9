//! Transport abstraction over the two Modbus links the facade owns.
//!
//! Isolating the `tokio-modbus` context behind this trait keeps the
//! facade and the cache testable against an in-memory fake, matching the
//! teacher's `lorawan-device` pattern of driving its state machine against
//! a fake `Radio` rather than real hardware in tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

use crate::error::ModbusError;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn read_input_registers(&self, unit: u8, address: u16, count: u16) -> Result<Vec<u16>, ModbusError>;
    async fn read_holding_registers(&self, unit: u8, address: u16, count: u16) -> Result<Vec<u16>, ModbusError>;
    async fn write_coil(&self, unit: u8, address: u16, value: bool) -> Result<(), ModbusError>;
    async fn write_register(&self, unit: u8, address: u16, value: u16) -> Result<(), ModbusError>;
}

fn classify(error: tokio_modbus::Error) -> ModbusError {
    match error {
        tokio_modbus::Error::Transport(io_error) => ModbusError::Transport(io_error),
        tokio_modbus::Error::Protocol(exception) => ModbusError::Exception(exception),
    }
}

/// TCP transport to the on-board PLC, `localhost:502` by default. Owns a
/// lazily (re)established connection guarded by a mutex since the
/// underlying client is not safe for overlapping in-flight requests.
pub struct TcpTransport {
    addr: std::net::SocketAddr,
    timeout: Duration,
    ctx: Mutex<Option<Context>>,
}

impl TcpTransport {
    pub fn new(addr: std::net::SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout, ctx: Mutex::new(None) }
    }

    async fn with_ctx<F, Fut, T>(&self, f: F) -> Result<T, ModbusError>
    where
        F: FnOnce(&mut Context) -> Fut,
        Fut: std::future::Future<Output = Result<T, tokio_modbus::Error>>,
    {
        let mut guard = self.ctx.lock().await;
        if guard.is_none() {
            let new_ctx = tokio_modbus::client::tcp::connect(self.addr).await.map_err(ModbusError::Transport)?;
            *guard = Some(new_ctx);
        }

        let ctx = guard.as_mut().ok_or(ModbusError::Disconnected)?;
        match timeout(self.timeout, f(ctx)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => {
                *guard = None;
                Err(classify(error))
            }
            Err(_elapsed) => Err(ModbusError::Timeout),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_input_registers(&self, _unit: u8, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        self.with_ctx(|ctx| ctx.read_input_registers(address, count)).await
    }

    async fn read_holding_registers(&self, _unit: u8, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        self.with_ctx(|ctx| ctx.read_holding_registers(address, count)).await
    }

    async fn write_coil(&self, _unit: u8, address: u16, value: bool) -> Result<(), ModbusError> {
        self.with_ctx(|ctx| ctx.write_single_coil(address, value)).await
    }

    async fn write_register(&self, _unit: u8, address: u16, value: u16) -> Result<(), ModbusError> {
        self.with_ctx(|ctx| ctx.write_single_register(address, value)).await
    }
}

/// RTU transport to the extension bus. A single serial line is shared by
/// up to 247 units, selected per-request with `set_slave`, and every
/// request is followed by the T3.5 silent interval before the facade
/// allows the next one to start (see [`crate::facade::Facade`]).
pub struct RtuTransport {
    port: String,
    baud_rate: u32,
    parity: tokio_serial::Parity,
    timeout: Duration,
    ctx: Mutex<Option<Context>>,
}

impl RtuTransport {
    pub fn new(port: String, baud_rate: u32, parity: tokio_serial::Parity, timeout: Duration) -> Self {
        Self { port, baud_rate, parity, timeout, ctx: Mutex::new(None) }
    }

    async fn with_ctx<F, Fut, T>(&self, unit: u8, f: F) -> Result<T, ModbusError>
    where
        F: FnOnce(&mut Context) -> Fut,
        Fut: std::future::Future<Output = Result<T, tokio_modbus::Error>>,
    {
        let mut guard = self.ctx.lock().await;
        if guard.is_none() {
            let builder = tokio_serial::new(&self.port, self.baud_rate).parity(self.parity);
            let stream = tokio_serial::SerialStream::open(&builder).map_err(ModbusError::Transport)?;
            *guard = Some(tokio_modbus::client::rtu::attach(stream));
        }

        let ctx = guard.as_mut().ok_or(ModbusError::Disconnected)?;
        ctx.set_slave(Slave(unit));

        match timeout(self.timeout, f(ctx)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => {
                *guard = None;
                Err(classify(error))
            }
            Err(_elapsed) => Err(ModbusError::Timeout),
        }
    }
}

#[async_trait]
impl Transport for RtuTransport {
    async fn read_input_registers(&self, unit: u8, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        self.with_ctx(unit, |ctx| ctx.read_input_registers(address, count)).await
    }

    async fn read_holding_registers(&self, unit: u8, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        self.with_ctx(unit, |ctx| ctx.read_holding_registers(address, count)).await
    }

    async fn write_coil(&self, unit: u8, address: u16, value: bool) -> Result<(), ModbusError> {
        self.with_ctx(unit, |ctx| ctx.write_single_coil(address, value)).await
    }

    async fn write_register(&self, unit: u8, address: u16, value: u16) -> Result<(), ModbusError> {
        self.with_ctx(unit, |ctx| ctx.write_single_register(address, value)).await
    }
}
