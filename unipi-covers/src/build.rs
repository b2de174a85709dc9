//! Constructs covers from [`CoverConfig`] entries plus the already-built
//! [`FeatureMap`] (C4 runs first; see SPEC_FULL.md §2 data flow).

use std::path::Path;
use std::sync::Arc;

use unipi_config::{Config, ConfigError};
use unipi_features::FeatureMap;

use crate::cover::Cover;
use crate::position_file::position_file_path;

/// Builds one [`Cover`] per `covers[]` entry, resolving `cover_up`/
/// `cover_down` against the feature map and loading each cover's
/// persisted position from `temp_dir`.
pub async fn build_covers(
    config: &Config,
    feature_map: &FeatureMap,
    device_slug: &str,
    temp_dir: &Path,
) -> Result<Vec<Arc<Cover>>, ConfigError> {
    let mut covers = Vec::with_capacity(config.covers.len());

    for cover_config in &config.covers {
        let up = feature_map.by_feature_id(&cover_config.cover_up)?;
        let up = up.as_digital().ok_or_else(|| ConfigError::CoverCircuitNotDigital(cover_config.cover_up.clone()))?;

        let down = feature_map.by_feature_id(&cover_config.cover_down)?;
        let down =
            down.as_digital().ok_or_else(|| ConfigError::CoverCircuitNotDigital(cover_config.cover_down.clone()))?;

        let position_file =
            position_file_path(temp_dir, device_slug, &cover_config.object_id, cover_config.device_class.as_topic_str());

        let cover = Cover::load(
            cover_config.object_id.clone(),
            cover_config.friendly_name.clone(),
            cover_config.suggested_area.clone(),
            cover_config.device_class,
            cover_config.cover_run_time,
            cover_config.tilt_change_time,
            up,
            down,
            position_file,
        )
        .await;

        covers.push(cover);
    }

    Ok(covers)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use unipi_config::{CoverConfig, CoverDeviceClass, DeviceInfo, FeatureType, HomeAssistantConfig, LoggingConfig, ModbusConfig, MqttConfig};
    use unipi_features::{DigitalFeature, Feature};
    use unipi_modbus::{Facade, RegisterCache};

    use super::*;

    fn digital_feature(id: &str, val_coil: u16, facade: Arc<Facade>, cache: Arc<RegisterCache>) -> Feature {
        Feature::Digital(Arc::new(DigitalFeature::new(
            id.to_string(),
            None,
            id.to_string(),
            None,
            None,
            None,
            false,
            FeatureType::Ro,
            0,
            Some(val_coil),
            0,
            None,
            cache,
            facade,
        )))
    }

    #[tokio::test]
    async fn builds_cover_from_config_and_feature_map() {
        let tcp = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let rtu = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let facade = Arc::new(Facade::new(tcp, rtu, 9600));
        let cache = Arc::new(RegisterCache::new());

        let mut feature_map = FeatureMap::new();
        feature_map.register(digital_feature("ro_2_01", 100, facade.clone(), cache.clone()));
        feature_map.register(digital_feature("ro_2_02", 101, facade, cache));

        let config = Config {
            device_info: DeviceInfo { name: "My PLC".into(), manufacturer: None },
            mqtt: MqttConfig::default(),
            modbus: ModbusConfig::default(),
            homeassistant: HomeAssistantConfig::default(),
            features: Default::default(),
            covers: vec![CoverConfig {
                object_id: "blind1".into(),
                friendly_name: "Blind 1".into(),
                suggested_area: None,
                device_class: CoverDeviceClass::Blind,
                cover_up: "ro_2_01".into(),
                cover_down: "ro_2_02".into(),
                cover_run_time: Some(30.0),
                tilt_change_time: Some(1.5),
            }],
            logging: LoggingConfig::default(),
        };

        let dir = tempfile::tempdir().unwrap();
        let covers = build_covers(&config, &feature_map, "my_plc", dir.path()).await.unwrap();
        assert_eq!(covers.len(), 1);
        assert_eq!(covers[0].object_id, "blind1");
    }

    #[tokio::test]
    async fn missing_circuit_feature_is_a_config_error() {
        let feature_map = FeatureMap::new();
        let config = Config {
            device_info: DeviceInfo { name: "My PLC".into(), manufacturer: None },
            mqtt: MqttConfig::default(),
            modbus: ModbusConfig::default(),
            homeassistant: HomeAssistantConfig::default(),
            features: Default::default(),
            covers: vec![CoverConfig {
                object_id: "blind1".into(),
                friendly_name: "Blind 1".into(),
                suggested_area: None,
                device_class: CoverDeviceClass::Blind,
                cover_up: "ro_2_01".into(),
                cover_down: "ro_2_02".into(),
                cover_run_time: Some(30.0),
                tilt_change_time: Some(1.5),
            }],
            logging: LoggingConfig::default(),
        };

        let dir = tempfile::tempdir().unwrap();
        let err = build_covers(&config, &feature_map, "my_plc", dir.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::FeatureNotFound(_)));
    }
}
