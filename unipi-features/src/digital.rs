//! Digital Input / Digital Output / Relay Output / LED features.
//!
//! All four share one representation: a single bit in a status register,
//! optionally a coil to write. Grounded on `features/neuron.py`'s
//! `NeuronFeature` base class and its `Relay`/`DigitalOutput`/
//! `DigitalInput`/`Led` subclasses — those subclasses differ only in
//! writability and topic segment, so they are one struct tagged by
//! [`FeatureKind`] rather than four near-identical types.

use std::sync::{Arc, Mutex};

use unipi_config::FeatureType as FeatureKind;
use unipi_modbus::{Facade, ModbusError, RegisterCache};

use crate::error::FeatureError;

pub struct DigitalFeature {
    pub feature_id: String,
    pub object_id: Option<String>,
    pub friendly_name: String,
    pub suggested_area: Option<String>,
    pub icon: Option<String>,
    pub device_class: Option<String>,
    pub invert_state: bool,
    pub kind: FeatureKind,
    pub val_reg: u16,
    pub val_coil: Option<u16>,
    pub feature_index: u16,
    pub sw_version: Option<String>,
    saved_value: Mutex<Option<u8>>,
    cache: Arc<RegisterCache>,
    facade: Arc<Facade>,
}

impl DigitalFeature {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feature_id: String,
        object_id: Option<String>,
        friendly_name: String,
        suggested_area: Option<String>,
        icon: Option<String>,
        device_class: Option<String>,
        invert_state: bool,
        kind: FeatureKind,
        val_reg: u16,
        val_coil: Option<u16>,
        feature_index: u16,
        sw_version: Option<String>,
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
            invert_state,
            kind,
            val_reg,
            val_coil,
            feature_index,
            sw_version,
            saved_value: Mutex::new(None),
            cache,
            facade,
        }
    }

    fn mask(&self) -> u16 {
        1 << (self.feature_index % 16)
    }

    /// `value ∈ {0,1}`, or `None` if the backing register is not yet
    /// cached (never fabricated as 0).
    pub fn value(&self) -> Option<u8> {
        let register = self.cache.get_register(self.val_reg, 1, 0);
        let value = *register.first()?;
        Some(if value & self.mask() != 0 { 1 } else { 0 })
    }

    pub fn payload(&self) -> Option<&'static str> {
        self.value().map(|v| if v == 1 { "ON" } else { "OFF" })
    }

    /// True iff `value != saved_value`; clears on read. First call is
    /// always true because `saved_value` starts unset.
    pub fn changed(&self) -> bool {
        let current = self.value();
        let mut saved = self.saved_value.lock().unwrap();
        if current != *saved {
            *saved = current;
            true
        } else {
            false
        }
    }

    pub fn is_writable(&self) -> bool {
        self.val_coil.is_some()
    }

    pub async fn set_state(&self, value: bool) -> Result<(), FeatureError> {
        let Some(val_coil) = self.val_coil else {
            return Err(FeatureError::ReadOnly(self.feature_id.clone()));
        };
        let address = val_coil + self.feature_index;
        self.facade.write_coil(address, value, 0).await.map_err(ModbusError::from).map_err(FeatureError::from)
    }

    pub fn topic(&self, device_slug: &str) -> String {
        format!("{device_slug}/{}/{}", self.kind.topic_name(), self.feature_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(kind: FeatureKind, val_coil: Option<u16>, cache: Arc<RegisterCache>, facade: Arc<Facade>) -> DigitalFeature {
        DigitalFeature::new(
            "ro_2_01".into(),
            None,
            "Relay 1".into(),
            None,
            None,
            None,
            false,
            kind,
            101,
            val_coil,
            0,
            None,
            cache,
            facade,
        )
    }

    fn facade_with_fakes() -> (Arc<Facade>, Arc<unipi_modbus::fake::FakeTransport>, Arc<unipi_modbus::fake::FakeTransport>) {
        let tcp = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let rtu = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let facade = Arc::new(Facade::new(tcp.clone(), rtu.clone(), 9600));
        (facade, tcp, rtu)
    }

    #[test]
    fn value_reads_masked_bit() {
        let cache = Arc::new(RegisterCache::new());
        cache.set_block(0, 101, &[0b0000_0001]);
        let (facade, _tcp, _rtu) = facade_with_fakes();
        let feature = feature(FeatureKind::Ro, Some(100), cache, facade);
        assert_eq!(feature.value(), Some(1));
        assert_eq!(feature.payload(), Some("ON"));
    }

    #[test]
    fn missing_register_yields_no_value() {
        let cache = Arc::new(RegisterCache::new());
        let (facade, _tcp, _rtu) = facade_with_fakes();
        let feature = feature(FeatureKind::Di, None, cache, facade);
        assert_eq!(feature.value(), None);
    }

    #[test]
    fn first_read_is_always_changed() {
        let cache = Arc::new(RegisterCache::new());
        cache.set_block(0, 101, &[0]);
        let (facade, _tcp, _rtu) = facade_with_fakes();
        let feature = feature(FeatureKind::Di, None, cache, facade);
        assert!(feature.changed());
        assert!(!feature.changed());
    }

    #[tokio::test]
    async fn set_state_on_read_only_feature_is_rejected() {
        let cache = Arc::new(RegisterCache::new());
        let (facade, _tcp, _rtu) = facade_with_fakes();
        let feature = feature(FeatureKind::Di, None, cache, facade);
        let err = feature.set_state(true).await.unwrap_err();
        assert!(matches!(err, FeatureError::ReadOnly(_)));
    }

    #[tokio::test]
    async fn set_state_writes_coil_at_offset_index() {
        let cache = Arc::new(RegisterCache::new());
        let (facade, tcp, _rtu) = facade_with_fakes();
        let feature = feature(FeatureKind::Ro, Some(100), cache, facade);
        feature.set_state(true).await.unwrap();
        assert_eq!(tcp.coil(0, 100), Some(true));
    }
}
