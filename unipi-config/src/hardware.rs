//! Hardware-definition data model (`HardwareDefinition`, `RegisterBlock`,
//! `ModbusFeatureDef`) and the `HardwareMap` built from them.
//!
//! Grounded on `hardware/map.py`'s `HardwareMap`/`ModbusRegisterBlock`/
//! `ModbusFeature`/`EastronModbusFeature` TypedDicts.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareType {
    Plc,
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeatureType {
    Di,
    Do,
    Ro,
    Led,
    Meter,
}

impl FeatureType {
    /// Segment used in MQTT topics for this feature type.
    pub fn topic_name(self) -> &'static str {
        match self {
            FeatureType::Di => "input",
            FeatureType::Do | FeatureType::Ro => "relay",
            FeatureType::Led => "led",
            FeatureType::Meter => "meter",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterBlock {
    pub start_reg: u16,
    pub count: u16,
    pub unit: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModbusFeatureDef {
    pub feature_type: FeatureType,
    pub count: u16,
    pub major_group: u8,
    pub val_reg: u16,
    pub val_coil: Option<u16>,
    // Meter-specific fields, present only for FeatureType::Meter entries.
    pub friendly_name: Option<String>,
    pub device_class: Option<String>,
    pub state_class: Option<String>,
    pub unit_of_measurement: Option<String>,
}

/// One per PLC board or RTU unit. Immutable after load.
#[derive(Debug, Clone)]
pub struct HardwareDefinition {
    pub unit: u8,
    pub hardware_type: HardwareType,
    pub device_name: Option<String>,
    pub suggested_area: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub modbus_register_blocks: Vec<RegisterBlock>,
    pub modbus_features: Vec<ModbusFeatureDef>,
}

/// Raw on-disk shape of a hardware-definition YAML document.
#[derive(Debug, Clone, Deserialize)]
pub struct HardwareDefinitionFile {
    #[serde(default)]
    pub suggested_area: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub modbus_register_blocks: Vec<RegisterBlock>,
    #[serde(default)]
    pub modbus_features: Vec<ModbusFeatureDef>,
}

/// Keyed by `"PLC"` and `"Extension_<unit>"`, matching `HardwareMap`'s key
/// scheme in the original.
#[derive(Debug, Clone, Default)]
pub struct HardwareMap {
    definitions: BTreeMap<String, HardwareDefinition>,
}

impl HardwareMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, definition: HardwareDefinition) {
        self.definitions.insert(key.into(), definition);
    }

    pub fn get(&self, key: &str) -> Option<&HardwareDefinition> {
        self.definitions.get(key)
    }

    pub fn plc(&self) -> Option<&HardwareDefinition> {
        self.definitions.get("PLC")
    }

    pub fn extension_key(unit: u8) -> String {
        format!("Extension_{unit}")
    }

    pub fn by_hardware_type(&self, hardware_type: HardwareType) -> impl Iterator<Item = &HardwareDefinition> {
        self.definitions.values().filter(move |d| d.hardware_type == hardware_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HardwareDefinition)> {
        self.definitions.iter()
    }
}
