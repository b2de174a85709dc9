//! YAML loading and cross-reference validation.
//!
//! The control document is parsed with `serde_yaml` into [`Config`], then
//! passed through [`verify`] for the whole-document checks that can't be
//! expressed as field-level validators (duplicate object ids, duplicate
//! RTU units, shared cover circuits) — mirroring `ConfigLoaderMixin.validate`'s
//! single post-parse pass in the original.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use unipi_hardware::HardwareIdentity;

use crate::error::{ConfigError, HardwareError};
use crate::hardware::{HardwareDefinition, HardwareDefinitionFile, HardwareMap, HardwareType};
use crate::model::{Config, VALID_BAUD_RATES};
use crate::validation::{ID, NAME};

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let config: Config =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml { path: path.to_path_buf(), source })?;
    verify(&config)?;
    Ok(config)
}

/// Whole-document cross-reference validation. See §4.1's bullet list.
pub fn verify(config: &Config) -> Result<(), ConfigError> {
    if !NAME.is_match(&config.device_info.name) {
        return Err(ConfigError::InvalidDeviceName(config.device_info.name.clone()));
    }

    if !ID.is_match(&config.homeassistant.discovery_prefix) {
        return Err(ConfigError::InvalidId {
            field: "discovery_prefix",
            value: config.homeassistant.discovery_prefix.clone(),
        });
    }

    if !VALID_BAUD_RATES.contains(&config.modbus.baud_rate) {
        return Err(ConfigError::InvalidBaudRate(config.modbus.baud_rate));
    }

    let mut seen_rtu_units: HashSet<u8> = HashSet::new();
    for unit in &config.modbus.units {
        if !seen_rtu_units.insert(unit.unit) {
            return Err(ConfigError::DuplicateRtuUnit(unit.unit));
        }
        if unit.device_name.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::RtuUnitMissingDeviceName(unit.unit));
        }
    }

    let mut object_ids: HashSet<String> = HashSet::new();
    let mut circuits: HashMap<String, String> = HashMap::new();

    for cover in &config.covers {
        if cover.object_id.is_empty() {
            return Err(ConfigError::CoverMissingField(cover.friendly_name.clone(), "object_id"));
        }
        if cover.friendly_name.is_empty() {
            return Err(ConfigError::CoverMissingField(cover.object_id.clone(), "friendly_name"));
        }
        if cover.cover_up.is_empty() {
            return Err(ConfigError::CoverMissingField(cover.object_id.clone(), "cover_up"));
        }
        if cover.cover_down.is_empty() {
            return Err(ConfigError::CoverMissingField(cover.object_id.clone(), "cover_down"));
        }
        if !ID.is_match(&cover.object_id) {
            return Err(ConfigError::InvalidId { field: "object_id", value: cover.object_id.clone() });
        }

        if !object_ids.insert(cover.object_id.clone()) {
            return Err(ConfigError::DuplicateObjectId(cover.object_id.clone()));
        }

        // (I5) cover_run_time / tilt_change_time are strictly positive when
        // the corresponding capability flag is set.
        if cover.device_class.supports_set_position() && !cover.cover_run_time.is_some_and(|t| t > 0.0) {
            return Err(ConfigError::CoverMissingRunTime(cover.object_id.clone(), "cover_run_time"));
        }
        if cover.device_class.supports_set_tilt() && !cover.tilt_change_time.is_some_and(|t| t > 0.0) {
            return Err(ConfigError::CoverMissingRunTime(cover.object_id.clone(), "tilt_change_time"));
        }

        for circuit in [&cover.cover_up, &cover.cover_down] {
            if let Some(existing) = circuits.insert(circuit.clone(), cover.object_id.clone()) {
                if existing != cover.object_id {
                    return Err(ConfigError::DuplicateCoverCircuit(
                        existing,
                        cover.object_id.clone(),
                        circuit.clone(),
                    ));
                }
            }
        }
    }

    for feature_config in config.features.values() {
        if let Some(object_id) = &feature_config.object_id {
            if !ID.is_match(object_id) {
                return Err(ConfigError::InvalidId { field: "object_id", value: object_id.clone() });
            }
            if !object_ids.insert(object_id.clone()) {
                return Err(ConfigError::DuplicateObjectId(object_id.clone()));
            }
        }
    }

    Ok(())
}

/// Resolves the PLC definition file by the identified model string and
/// discovers extension definitions by filename stem, matching each stem
/// against the configured RTU units.
pub fn load_hardware_map(
    config: &Config,
    identity: &dyn HardwareIdentity,
    hardware_dir: &Path,
) -> Result<HardwareMap, HardwareError> {
    let mut map = HardwareMap::new();

    let board = identity.identify()?;
    let plc_path = hardware_dir.join("neuron").join(format!("{}.yaml", board.model));
    if !plc_path.is_file() {
        return Err(HardwareError::UnknownPlcModel(board.model.clone()));
    }
    let plc_file = read_definition_file(&plc_path)?;
    map.insert(
        "PLC",
        HardwareDefinition {
            unit: 0,
            hardware_type: HardwareType::Plc,
            device_name: Some(board.name.clone()),
            suggested_area: plc_file.suggested_area,
            manufacturer: plc_file.manufacturer,
            model: Some(board.model),
            modbus_register_blocks: plc_file.modbus_register_blocks,
            modbus_features: plc_file.modbus_features,
        },
    );

    let extensions_dir = hardware_dir.join("extensions");
    if extensions_dir.is_dir() {
        for entry in
            std::fs::read_dir(&extensions_dir).map_err(|source| HardwareError::Io { path: extensions_dir.clone(), source })?
        {
            let entry = entry.map_err(|source| HardwareError::Io { path: extensions_dir.clone(), source })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();

            let matching_units: Vec<_> =
                config.modbus.units.iter().filter(|u| u.device_name.as_deref() == Some(stem.as_str())).collect();

            if matching_units.is_empty() {
                continue;
            }

            let file = read_definition_file(&path)?;

            for unit in matching_units {
                map.insert(
                    HardwareMap::extension_key(unit.unit),
                    HardwareDefinition {
                        unit: unit.unit,
                        hardware_type: HardwareType::Extension,
                        device_name: unit.device_name.clone(),
                        suggested_area: file.suggested_area.clone(),
                        manufacturer: file.manufacturer.clone(),
                        model: Some(stem.clone()),
                        modbus_register_blocks: file.modbus_register_blocks.clone(),
                        modbus_features: file.modbus_features.clone(),
                    },
                );
            }
        }
    }

    Ok(map)
}

fn read_definition_file(path: &Path) -> Result<HardwareDefinitionFile, HardwareError> {
    let raw = std::fs::read_to_string(path).map_err(|source| HardwareError::Io { path: path.to_path_buf(), source })?;
    serde_yaml::from_str(&raw).map_err(|source| HardwareError::Yaml { path: path.to_path_buf(), source })
}
