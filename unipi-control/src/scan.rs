//! Scan loops (C2/C8): two dedicated periodic tasks, one per transport
//! lane, filling the register cache from the hardware map's register
//! blocks. Grounded on `modbus.py`'s `ModbusCacheData.scan` and
//! `unipi_control.py`'s `UnipiControl.run`'s TCP/RTU task split.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use unipi_config::{HardwareMap, HardwareType};
use unipi_modbus::{Facade, RegisterCache};

/// PLC boards are scanned at a fixed cadence; this matches
/// [`unipi_covers::FAST_SCAN_INTERVAL`], the rate the rest of the system
/// assumes fresh register data arrives at.
const TCP_SCAN_INTERVAL: Duration = Duration::from_millis(20);

async fn scan_once(facade: &Facade, cache: &RegisterCache, hardware_map: &HardwareMap, hardware_type: HardwareType) {
    for definition in hardware_map.by_hardware_type(hardware_type) {
        for block in &definition.modbus_register_blocks {
            let unit = block.unit.unwrap_or(definition.unit);
            match facade.read_input_registers(block.start_reg, block.count, unit).await {
                Ok(values) => cache.set_block(unit, block.start_reg, &values),
                Err(err) => log::error!(
                    "[MODBUS] scan failed for unit {unit}, registers {}..{}: {err}",
                    block.start_reg,
                    block.start_reg + block.count
                ),
            }
        }
    }
}

/// Scans the on-board PLC's registers every [`TCP_SCAN_INTERVAL`] until
/// `cancel` fires.
pub async fn run_tcp_scan_loop(facade: Arc<Facade>, cache: Arc<RegisterCache>, hardware_map: Arc<HardwareMap>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(TCP_SCAN_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => scan_once(&facade, &cache, &hardware_map, HardwareType::Plc).await,
        }
    }
}

/// Scans every configured RTU extension back-to-back, with no fixed
/// timer: `Facade::read_input_registers` already awaits the T3.5 silent
/// interval after each RTU request, which is this loop's only yield
/// point. Returns immediately if no extensions are configured, so the
/// task never busy-loops on an empty hardware map.
pub async fn run_rtu_scan_loop(facade: Arc<Facade>, cache: Arc<RegisterCache>, hardware_map: Arc<HardwareMap>, cancel: CancellationToken) {
    if hardware_map.by_hardware_type(HardwareType::Extension).next().is_none() {
        return;
    }

    loop {
        if cancel.is_cancelled() {
            return;
        }
        scan_once(&facade, &cache, &hardware_map, HardwareType::Extension).await;
    }
}
