//! Uniform access to the TCP and RTU links (C2).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::ModbusError;
use crate::transport::Transport;

pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_RTU_TIMEOUT: Duration = Duration::from_secs(1);

/// T3.5 silent interval: `3.5 * 11 / baud_rate` seconds, rounded the same
/// way `modbus/helpers.py` rounds it (4 decimal places).
pub fn rtu_silent_interval(baud_rate: u32) -> Duration {
    let seconds = 3.5 * 11.0 / baud_rate as f64;
    let rounded = (seconds * 10_000.0).round() / 10_000.0;
    Duration::from_secs_f64(rounded)
}

/// Owns the TCP transport (unit 0, on-board PLC) and the RTU transport
/// (units 1..247, extension meters), and enforces the RTU inter-request
/// silent interval between consecutive RTU requests.
pub struct Facade {
    tcp: Arc<dyn Transport>,
    rtu: Arc<dyn Transport>,
    rtu_silent_interval: Duration,
}

impl Facade {
    pub fn new(tcp: Arc<dyn Transport>, rtu: Arc<dyn Transport>, baud_rate: u32) -> Self {
        Self { tcp, rtu, rtu_silent_interval: rtu_silent_interval(baud_rate) }
    }

    fn transport_for(&self, unit: u8) -> &Arc<dyn Transport> {
        if unit == 0 {
            &self.tcp
        } else {
            &self.rtu
        }
    }

    async fn settle_if_rtu(&self, unit: u8) {
        if unit != 0 {
            sleep(self.rtu_silent_interval).await;
        }
    }

    pub async fn read_input_registers(&self, address: u16, count: u16, unit: u8) -> Result<Vec<u16>, ModbusError> {
        let result = self.transport_for(unit).read_input_registers(unit, address, count).await;
        self.settle_if_rtu(unit).await;
        result
    }

    pub async fn read_holding_registers(&self, address: u16, count: u16, unit: u8) -> Result<Vec<u16>, ModbusError> {
        let result = self.transport_for(unit).read_holding_registers(unit, address, count).await;
        self.settle_if_rtu(unit).await;
        result
    }

    pub async fn write_coil(&self, address: u16, value: bool, unit: u8) -> Result<(), ModbusError> {
        let result = self.transport_for(unit).write_coil(unit, address, value).await;
        self.settle_if_rtu(unit).await;
        result
    }

    pub async fn write_register(&self, address: u16, value: u16, unit: u8) -> Result<(), ModbusError> {
        let result = self.transport_for(unit).write_register(unit, address, value).await;
        self.settle_if_rtu(unit).await;
        result
    }

    /// Reads a register on the TCP link using an explicit board/slave id
    /// rather than the usual unit-0 routing. PLC boards answer firmware
    /// queries (register 1000) as distinct slave ids 1..3 on the same
    /// on-board link that ordinary I/O register reads address as unit 0;
    /// this bypasses [`Self::transport_for`]'s unit-0-is-TCP routing for
    /// that one case.
    pub async fn read_tcp_input_registers(&self, address: u16, count: u16, board_unit: u8) -> Result<Vec<u16>, ModbusError> {
        self.tcp.read_input_registers(board_unit, address, count).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_interval_matches_9600_baud() {
        // 3.5 * 11 / 9600 = 0.0040104..., rounds to 0.004
        let interval = rtu_silent_interval(9600);
        assert_eq!(interval, Duration::from_secs_f64(0.004));
    }

    #[test]
    fn silent_interval_matches_2400_baud() {
        let interval = rtu_silent_interval(2400);
        assert_eq!(interval, Duration::from_secs_f64(0.0160));
    }
}
