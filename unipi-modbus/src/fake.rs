//! In-memory `Transport` double used by this crate's and downstream
//! crates' tests. Not a mock framework — a hand-written fake, in the
//! style of the teacher's test `Radio`/`Timer` doubles.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ModbusError;
use crate::transport::Transport;

#[derive(Default)]
pub struct FakeTransport {
    input_registers: Mutex<HashMap<(u8, u16), u16>>,
    holding_registers: Mutex<HashMap<(u8, u16), u16>>,
    coils: Mutex<HashMap<(u8, u16), bool>>,
    pub fail_next: Mutex<Option<ModbusError>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_register(&self, unit: u8, address: u16, value: u16) {
        self.input_registers.lock().unwrap().insert((unit, address), value);
    }

    pub fn set_holding_register(&self, unit: u8, address: u16, value: u16) {
        self.holding_registers.lock().unwrap().insert((unit, address), value);
    }

    pub fn coil(&self, unit: u8, address: u16) -> Option<bool> {
        self.coils.lock().unwrap().get(&(unit, address)).copied()
    }

    fn take_failure(&self) -> Option<ModbusError> {
        self.fail_next.lock().unwrap().take()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn read_input_registers(&self, unit: u8, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let registers = self.input_registers.lock().unwrap();
        Ok((address..address + count).map(|a| *registers.get(&(unit, a)).unwrap_or(&0)).collect())
    }

    async fn read_holding_registers(&self, unit: u8, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let registers = self.holding_registers.lock().unwrap();
        Ok((address..address + count).map(|a| *registers.get(&(unit, a)).unwrap_or(&0)).collect())
    }

    async fn write_coil(&self, unit: u8, address: u16, value: bool) -> Result<(), ModbusError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.coils.lock().unwrap().insert((unit, address), value);
        Ok(())
    }

    async fn write_register(&self, unit: u8, address: u16, value: u16) -> Result<(), ModbusError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.holding_registers.lock().unwrap().insert((unit, address), value);
        Ok(())
    }
}
