//! Home Assistant MQTT discovery payloads (C7).
//!
//! Grounded on `mqtt/discovery/*.py`'s per-kind dataclasses and
//! `HassDiscoveryMixin`'s device-block helpers, re-expressed as
//! `serde::Serialize` structs published once per feature/cover on first
//! connect.

use std::collections::HashMap;

use serde::Serialize;
use unipi_config::{DeviceInfo, HardwareDefinition, HardwareMap, HardwareType};
use unipi_covers::Cover;
use unipi_features::Feature;

use crate::topics;

/// Identity and ownership info for the physical unit (PLC board set, or
/// one RTU extension) an entity's `device` block describes. Keyed the
/// same way [`HardwareMap`] itself is keyed (`"PLC"` / `"Extension_<n>"`).
#[derive(Debug, Clone, Default)]
pub struct DeviceContext {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub suggested_area: Option<String>,
    pub via_device: Option<String>,
}

impl DeviceContext {
    fn plc(device_info: &DeviceInfo, hardware: Option<&HardwareDefinition>, device_slug: &str) -> Self {
        Self {
            identifiers: vec![device_slug.to_string()],
            name: device_info.name.clone(),
            manufacturer: device_info.manufacturer.clone().or_else(|| hardware.and_then(|h| h.manufacturer.clone())),
            model: hardware.and_then(|h| h.model.clone()),
            suggested_area: hardware.and_then(|h| h.suggested_area.clone()),
            via_device: None,
        }
    }

    fn extension(hardware: &HardwareDefinition, device_slug: &str) -> Self {
        Self {
            identifiers: vec![format!("{device_slug}_ext_{}", hardware.unit)],
            name: hardware.device_name.clone().unwrap_or_else(|| format!("Extension {}", hardware.unit)),
            manufacturer: hardware.manufacturer.clone(),
            model: hardware.model.clone(),
            suggested_area: hardware.suggested_area.clone(),
            via_device: Some(device_slug.to_string()),
        }
    }

    /// One context for the PLC hub plus one per RTU extension, keyed by
    /// `"PLC"`/`HardwareMap::extension_key(unit)` so callers can look one
    /// up by [`Feature::unit`].
    pub fn build_all(device_info: &DeviceInfo, hardware_map: &HardwareMap, device_slug: &str) -> HashMap<String, DeviceContext> {
        let mut contexts = HashMap::new();
        contexts.insert("PLC".to_string(), DeviceContext::plc(device_info, hardware_map.plc(), device_slug));
        for def in hardware_map.by_hardware_type(HardwareType::Extension) {
            contexts.insert(HardwareMap::extension_key(def.unit), DeviceContext::extension(def, device_slug));
        }
        contexts
    }

    pub fn key_for_unit(unit: u8) -> String {
        if unit == 0 { "PLC".to_string() } else { HardwareMap::extension_key(unit) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceBlock {
    pub name: String,
    pub identifiers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
}

impl DeviceBlock {
    pub fn new(ctx: &DeviceContext, sw_version: Option<String>) -> Self {
        Self {
            name: ctx.name.clone(),
            identifiers: ctx.identifiers.clone(),
            manufacturer: ctx.manufacturer.clone(),
            model: ctx.model.clone(),
            sw_version,
            suggested_area: ctx.suggested_area.clone(),
            via_device: ctx.via_device.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchDiscovery {
    pub name: String,
    pub unique_id: String,
    pub qos: u8,
    pub command_topic: String,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<&'static str>,
    pub device: DeviceBlock,
}

#[derive(Debug, Clone, Serialize)]
pub struct BinarySensorDiscovery {
    pub name: String,
    pub unique_id: String,
    pub qos: u8,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<&'static str>,
    pub device: DeviceBlock,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorDiscovery {
    pub name: String,
    pub unique_id: String,
    pub qos: u8,
    pub state_topic: String,
    pub force_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    pub device: DeviceBlock,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverDiscovery {
    pub name: String,
    pub unique_id: String,
    pub qos: u8,
    pub command_topic: String,
    pub state_topic: String,
    pub optimistic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_position_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tilt_status_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tilt_command_topic: Option<String>,
    pub device: DeviceBlock,
}

/// `slug(device_name) + "_" + (object_id or feature_id)`.
pub fn unique_id(device_slug: &str, feature: &Feature) -> String {
    format!("{device_slug}_{}", feature.unique_id_suffix())
}

fn invert_payloads(invert_state: bool) -> (Option<&'static str>, Option<&'static str>) {
    if invert_state { (Some("OFF"), Some("ON")) } else { (None, None) }
}

pub fn switch_discovery(device_slug: &str, feature: &Feature, device: DeviceBlock) -> SwitchDiscovery {
    let base = feature.topic(device_slug);
    let (payload_on, payload_off) = invert_payloads(feature.invert_state());
    SwitchDiscovery {
        name: feature.friendly_name().to_string(),
        unique_id: unique_id(device_slug, feature),
        qos: 2,
        command_topic: topics::set_topic(&base),
        state_topic: topics::get_topic(&base),
        payload_on,
        payload_off,
        device,
    }
}

pub fn binary_sensor_discovery(device_slug: &str, feature: &Feature, device: DeviceBlock) -> BinarySensorDiscovery {
    let base = feature.topic(device_slug);
    let (payload_on, payload_off) = invert_payloads(feature.invert_state());
    BinarySensorDiscovery {
        name: feature.friendly_name().to_string(),
        unique_id: unique_id(device_slug, feature),
        qos: 2,
        state_topic: topics::get_topic(&base),
        payload_on,
        payload_off,
        device,
    }
}

pub fn sensor_discovery(device_slug: &str, feature: &Feature, device: DeviceBlock) -> SensorDiscovery {
    let base = feature.topic(device_slug);
    SensorDiscovery {
        name: feature.friendly_name().to_string(),
        unique_id: unique_id(device_slug, feature),
        qos: 2,
        state_topic: topics::get_topic(&base),
        force_update: true,
        device_class: feature.device_class().map(str::to_string),
        state_class: feature.state_class().map(str::to_string),
        unit_of_measurement: feature.unit_of_measurement().map(str::to_string),
        device,
    }
}

pub fn cover_discovery(device_slug: &str, cover: &Cover, device: DeviceBlock) -> CoverDiscovery {
    let base = cover.topic(device_slug);

    let (position_topic, set_position_topic) = if cover.supports_set_position() && cover.cover_run_time.is_some() {
        (Some(topics::position_topic(&base)), Some(topics::position_set_topic(&base)))
    } else {
        (None, None)
    };

    let (tilt_status_topic, tilt_command_topic) = if cover.supports_set_tilt() && cover.tilt_change_time.is_some() {
        (Some(topics::tilt_topic(&base)), Some(topics::tilt_set_topic(&base)))
    } else {
        (None, None)
    };

    CoverDiscovery {
        name: cover.friendly_name.clone(),
        unique_id: format!("{device_slug}_{}", cover.object_id),
        qos: 2,
        command_topic: topics::set_topic(&base),
        state_topic: topics::state_topic(&base),
        optimistic: false,
        position_topic,
        set_position_topic,
        tilt_status_topic,
        tilt_command_topic,
        device,
    }
}

/// Home Assistant component used in the discovery topic for this feature
/// type, or `None` for LED (not part of discovery; §4.7).
pub fn hass_kind(feature: &Feature) -> Option<&'static str> {
    use unipi_config::FeatureType;
    match feature.feature_type() {
        FeatureType::Di => Some("binary_sensor"),
        FeatureType::Do | FeatureType::Ro => Some("switch"),
        FeatureType::Meter => Some("sensor"),
        FeatureType::Led => None,
    }
}

/// `{discovery_prefix}/<hass_kind>/{unique_id}/config`.
pub fn config_topic(discovery_prefix: &str, hass_kind: &str, unique_id: &str) -> String {
    format!("{discovery_prefix}/{hass_kind}/{unique_id}/config")
}
