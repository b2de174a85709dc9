//! Constructs a [`FeatureMap`] from a loaded [`HardwareMap`] plus user
//! config overrides. This is the boundary where C1's hardware model
//! becomes C4's typed feature objects (SPEC_FULL.md §2 data flow).

use std::sync::Arc;

use unipi_config::{Config, FeatureType, HardwareMap, HardwareType};
use unipi_modbus::{Facade, RegisterCache};

use crate::digital::DigitalFeature;
use crate::feature::Feature;
use crate::firmware::read_board_firmware;
use crate::map::FeatureMap;
use crate::meter::MeterFeature;

fn type_segment(kind: FeatureType) -> &'static str {
    match kind {
        FeatureType::Di => "di",
        FeatureType::Do => "do",
        FeatureType::Ro => "ro",
        FeatureType::Led => "led",
        FeatureType::Meter => "meter",
    }
}

pub async fn build_feature_map(hardware_map: &HardwareMap, config: &Config, cache: Arc<RegisterCache>, facade: Arc<Facade>) -> FeatureMap {
    let mut map = FeatureMap::new();

    if let Some(plc) = hardware_map.plc() {
        let mut board_firmware = [None, None, None];
        for (slot, board_index) in [1u8, 2, 3].into_iter().enumerate() {
            board_firmware[slot] = read_board_firmware(&facade, board_index).await;
        }

        for def in &plc.modbus_features {
            if def.feature_type == FeatureType::Meter {
                continue;
            }

            let sw_version = board_firmware.get((def.major_group as usize).saturating_sub(1)).cloned().flatten();

            // No board answered at register 1000 for this major group: per
            // §4.4, an absent firmware read means the board isn't
            // populated, so it contributes no features (neuron.py's
            // read_boards skips parse_features() in that case).
            if sw_version.is_none() {
                continue;
            }

            for index in 0..def.count {
                let feature_id = format!("{}_{}_{:02}", type_segment(def.feature_type), def.major_group, index + 1);
                let overrides = config.features.get(&feature_id);

                let feature = DigitalFeature::new(
                    feature_id,
                    overrides.and_then(|o| o.object_id.clone()),
                    overrides
                        .and_then(|o| o.friendly_name.clone())
                        .unwrap_or_else(|| format!("{} {}", type_segment(def.feature_type), index + 1)),
                    overrides.and_then(|o| o.suggested_area.clone()),
                    overrides.and_then(|o| o.icon.clone()),
                    overrides.and_then(|o| o.device_class.clone()),
                    overrides.map(|o| o.invert_state).unwrap_or(false),
                    def.feature_type,
                    def.val_reg,
                    def.val_coil,
                    index,
                    sw_version.clone(),
                    cache.clone(),
                    facade.clone(),
                );

                map.register(Feature::Digital(Arc::new(feature)));
            }
        }
    }

    for extension in hardware_map.by_hardware_type(HardwareType::Extension) {
        for def in &extension.modbus_features {
            if def.feature_type != FeatureType::Meter {
                continue;
            }

            let friendly_name = def.friendly_name.clone().unwrap_or_else(|| "Meter".to_string());
            let feature_id = format!("{}_{}", unipi_config::text::slugify(&friendly_name), extension.unit);
            let overrides = config.features.get(&feature_id);

            let meter = MeterFeature::new(
                feature_id,
                overrides.and_then(|o| o.object_id.clone()),
                overrides.and_then(|o| o.friendly_name.clone()).unwrap_or(friendly_name),
                overrides.and_then(|o| o.suggested_area.clone()),
                overrides.and_then(|o| o.icon.clone()),
                overrides.and_then(|o| o.device_class.clone()).or_else(|| def.device_class.clone()),
                overrides.and_then(|o| o.state_class.clone()).or_else(|| def.state_class.clone()),
                overrides.and_then(|o| o.unit_of_measurement.clone()).or_else(|| def.unit_of_measurement.clone()),
                def.val_reg,
                extension.unit,
                cache.clone(),
                facade.clone(),
            );

            map.register(Feature::Meter(Arc::new(meter)));
        }
    }

    map
}
