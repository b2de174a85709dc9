//! Firmware-version reads performed once at startup (§4.4).

use unipi_modbus::Facade;

/// Firmware version for one PLC board, read from register 1000 on that
/// board's slave id. A non-response means the board is unpopulated and is
/// skipped silently by the caller — this returns `None`, not an error.
pub async fn read_board_firmware(facade: &Facade, board_index: u8) -> Option<String> {
    let registers = facade.read_tcp_input_registers(1000, 1, board_index).await.ok()?;
    let reg = *registers.first()?;
    let hi = (reg >> 8) & 0xff;
    let lo = reg & 0xff;
    Some(format!("{hi}.{lo}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use unipi_modbus::fake::FakeTransport;

    use super::*;

    #[tokio::test]
    async fn decodes_hi_lo_firmware_string() {
        let tcp = Arc::new(FakeTransport::new());
        let rtu = Arc::new(FakeTransport::new());
        tcp.set_input_register(1, 1000, 0x0102);
        let facade = Facade::new(tcp, rtu, 9600);

        let version = read_board_firmware(&facade, 1).await;
        assert_eq!(version.as_deref(), Some("1.2"));
    }

    #[tokio::test]
    async fn unpopulated_board_yields_none() {
        let tcp = Arc::new(FakeTransport::new());
        let rtu = Arc::new(FakeTransport::new());
        tcp.fail_next.lock().unwrap().replace(unipi_modbus::ModbusError::Timeout);
        let facade = Facade::new(tcp, rtu, 9600);

        assert_eq!(read_board_firmware(&facade, 2).await, None);
    }
}
