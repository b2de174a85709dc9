//! Per-unit dense register store (C3).
//!
//! A plain map behind an `RwLock`: readers never await while holding the
//! lock, so a blocking `std::sync::RwLock` is correct even though the
//! process otherwise runs entirely on one cooperative executor (see
//! SPEC_FULL.md §3 representation notes).

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct RegisterCache {
    data: RwLock<HashMap<u8, HashMap<u16, u16>>>,
}

impl RegisterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached values for `address..address+count` on `unit`.
    /// Missing addresses are logged and simply omitted from the result —
    /// this never panics and never fabricates a zero.
    pub fn get_register(&self, address: u16, count: u16, unit: u8) -> Vec<u16> {
        let data = self.data.read().expect("register cache lock poisoned");

        let Some(unit_data) = data.get(&unit) else {
            log::error!("[MODBUS] Cached data for unit {unit} not found!");
            return Vec::new();
        };

        let mut result = Vec::with_capacity(count as usize);
        for addr in address..address.saturating_add(count) {
            match unit_data.get(&addr) {
                Some(value) => result.push(*value),
                None => log::error!("[MODBUS] Error on address {addr} (unit: {unit})"),
            }
        }
        result
    }

    /// Writes one contiguous block read in a single scan pass. Only the
    /// scanner calls this.
    pub fn set_block(&self, unit: u8, start_address: u16, values: &[u16]) {
        let mut data = self.data.write().expect("register cache lock poisoned");
        let unit_data = data.entry(unit).or_default();
        for (offset, value) in values.iter().enumerate() {
            unit_data.insert(start_address + offset as u16, *value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_unit_returns_empty_without_panicking() {
        let cache = RegisterCache::new();
        assert_eq!(cache.get_register(0, 2, 5), Vec::<u16>::new());
    }

    #[test]
    fn missing_address_is_omitted_not_zeroed() {
        let cache = RegisterCache::new();
        cache.set_block(0, 100, &[42]);
        // address 101 was never written
        assert_eq!(cache.get_register(100, 2, 0), vec![42]);
    }

    #[test]
    fn set_block_then_get_round_trips() {
        let cache = RegisterCache::new();
        cache.set_block(1, 10, &[1, 2, 3]);
        assert_eq!(cache.get_register(10, 3, 1), vec![1, 2, 3]);
    }

    #[test]
    fn readers_see_post_scan_values_after_set_block() {
        let cache = RegisterCache::new();
        cache.set_block(0, 0, &[0]);
        assert_eq!(cache.get_register(0, 1, 0), vec![0]);
        cache.set_block(0, 0, &[1]);
        assert_eq!(cache.get_register(0, 1, 0), vec![1]);
    }
}
