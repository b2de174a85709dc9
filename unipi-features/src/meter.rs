//! Eastron Modbus energy meter feature (extension RTU units).
//!
//! Grounded on `features/extensions.py`'s `EastronMeter`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use unipi_modbus::{Facade, RegisterCache};

pub struct MeterFeature {
    pub feature_id: String,
    pub object_id: Option<String>,
    pub friendly_name: String,
    pub suggested_area: Option<String>,
    pub icon: Option<String>,
    pub device_class: Option<String>,
    pub state_class: Option<String>,
    pub unit_of_measurement: Option<String>,
    pub val_reg: u16,
    pub unit: u8,
    saved_value: Mutex<Option<i64>>,
    cache: Arc<RegisterCache>,
    facade: Arc<Facade>,
}

/// `value` is rounded to 2 decimals before being compared for change
/// detection; the comparison is done on the fixed-point (value * 100)
/// representation so that `Option<f64>` is never compared for equality
/// directly.
fn fixed_point(value: f32) -> i64 {
    (value * 100.0).round() as i64
}

/// Inserts a decimal point two digits from the end of a concatenated hex
/// digit string, e.g. `"14223" -> "142.23"`.
fn format_sw_version(digits: &str) -> String {
    if digits.len() <= 2 {
        return format!("0.{digits:0>2}");
    }
    let split = digits.len() - 2;
    format!("{}.{}", &digits[..split], &digits[split..])
}

impl MeterFeature {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feature_id: String,
        object_id: Option<String>,
        friendly_name: String,
        suggested_area: Option<String>,
        icon: Option<String>,
        device_class: Option<String>,
        state_class: Option<String>,
        unit_of_measurement: Option<String>,
        val_reg: u16,
        unit: u8,
        cache: Arc<RegisterCache>,
        facade: Arc<Facade>,
    ) -> Self {
        Self {
            feature_id,
            object_id,
            friendly_name,
            suggested_area,
            icon,
            device_class,
            state_class,
            unit_of_measurement,
            val_reg,
            unit,
            saved_value: Mutex::new(None),
            cache,
            facade,
        }
    }

    /// Decoded IEEE-754 big-endian 32-bit float, rounded to 2 decimals, or
    /// `None` if the register pair isn't in the cache this tick.
    pub fn value(&self) -> Option<f32> {
        let registers = self.cache.get_register(self.val_reg, 2, self.unit);
        if registers.len() < 2 {
            return None;
        }
        let bytes = [
            (registers[0] >> 8) as u8,
            (registers[0] & 0xff) as u8,
            (registers[1] >> 8) as u8,
            (registers[1] & 0xff) as u8,
        ];
        let raw = f32::from_be_bytes(bytes);
        Some((raw * 100.0).round() / 100.0)
    }

    pub fn payload(&self) -> Option<String> {
        self.value().map(|v| v.to_string())
    }

    pub fn changed(&self) -> bool {
        let current = self.value().map(fixed_point);
        let mut saved = self.saved_value.lock().unwrap();
        if current != *saved {
            *saved = current;
            true
        } else {
            false
        }
    }

    pub fn topic(&self, device_slug: &str) -> String {
        format!("{device_slug}/meter/{}", self.feature_id)
    }

    /// Retry loop preserved verbatim from the original's firmware read
    /// quirk (see SPEC_FULL.md §9): up to 5 attempts, 1s apart, returning
    /// on the first success. Decodes as `hex(r0)[2:] + hex(r1)[2:]` and
    /// reformats the digit string as `xxx.yy` (decimal point two digits
    /// from the end), matching §4.4's meter firmware rule verbatim.
    pub async fn read_sw_version(&self) -> Option<String> {
        for _attempt in 0..5 {
            let registers = self.facade.read_holding_registers(64514, 2, self.unit).await;
            if let Ok(registers) = registers {
                if registers.len() == 2 {
                    let digits = format!("{:x}{:x}", registers[0], registers[1]);
                    return Some(format_sw_version(&digits));
                }
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facade_with_fakes() -> (Arc<Facade>, Arc<unipi_modbus::fake::FakeTransport>) {
        let tcp = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let rtu = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let facade = Arc::new(Facade::new(tcp, rtu.clone(), 9600));
        (facade, rtu)
    }

    #[test]
    fn decodes_big_endian_float_from_two_registers() {
        let cache = Arc::new(RegisterCache::new());
        cache.set_block(1, 0, &[0x4347, 0x3333]);
        let (facade, _rtu) = facade_with_fakes();
        let meter = MeterFeature::new(
            "voltage_1".into(),
            None,
            "Voltage".into(),
            None,
            None,
            None,
            None,
            None,
            0,
            1,
            cache,
            facade,
        );
        assert_eq!(meter.value(), Some(199.2));
        assert_eq!(meter.payload().as_deref(), Some("199.2"));
    }

    #[test]
    fn missing_register_pair_yields_no_value() {
        let cache = Arc::new(RegisterCache::new());
        let (facade, _rtu) = facade_with_fakes();
        let meter = MeterFeature::new(
            "voltage_1".into(),
            None,
            "Voltage".into(),
            None,
            None,
            None,
            None,
            None,
            0,
            1,
            cache,
            facade,
        );
        assert_eq!(meter.value(), None);
    }

    #[test]
    fn sw_version_digits_get_a_decimal_point_two_from_the_end() {
        assert_eq!(format_sw_version("14223"), "142.23");
        assert_eq!(format_sw_version("1"), "0.01");
    }
}
