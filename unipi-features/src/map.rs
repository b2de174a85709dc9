//! `FeatureMap` — registration and lookup (§4.4).

use std::collections::HashMap;

use unipi_config::{ConfigError, FeatureType};

use crate::feature::Feature;

#[derive(Default)]
pub struct FeatureMap {
    by_id: HashMap<String, Feature>,
    insertion_order: Vec<String>,
}

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// (I2) `feature_id` is unique within a FeatureMap. Registering a
    /// duplicate id overwrites the insertion-order bookkeeping silently
    /// is never expected to happen: hardware definitions are constructed
    /// with unique ids by `build::from_hardware_map`, so this is an
    /// internal invariant, not a user-facing validation path.
    pub fn register(&mut self, feature: Feature) {
        let id = feature.feature_id().to_string();
        if !self.by_id.contains_key(&id) {
            self.insertion_order.push(id.clone());
        }
        self.by_id.insert(id, feature);
    }

    pub fn by_feature_id(&self, id: &str) -> Result<&Feature, ConfigError> {
        self.by_id.get(id).ok_or_else(|| ConfigError::FeatureNotFound(id.to_string()))
    }

    pub fn by_feature_types<'a>(&'a self, types: &'a [FeatureType]) -> impl Iterator<Item = &'a Feature> + 'a {
        self.insertion_order
            .iter()
            .map(move |id| self.by_id.get(id).expect("insertion_order is kept in sync with by_id"))
            .filter(move |f| types.contains(&f.feature_type()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.insertion_order.iter().map(move |id| self.by_id.get(id).expect("insertion_order in sync"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use unipi_modbus::{Facade, RegisterCache};

    use super::*;
    use crate::digital::DigitalFeature;

    fn digital_feature(id: &str) -> Feature {
        let cache = Arc::new(RegisterCache::new());
        let tcp = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let rtu = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let facade = Arc::new(Facade::new(tcp, rtu, 9600));
        Feature::Digital(Arc::new(DigitalFeature::new(
            id.to_string(),
            None,
            "Relay".into(),
            None,
            None,
            None,
            false,
            FeatureType::Ro,
            0,
            Some(0),
            0,
            None,
            cache,
            facade,
        )))
    }

    #[test]
    fn by_feature_id_finds_registered_feature() {
        let mut map = FeatureMap::new();
        map.register(digital_feature("ro_2_01"));
        assert_eq!(map.by_feature_id("ro_2_01").unwrap().feature_id(), "ro_2_01");
    }

    #[test]
    fn unknown_feature_id_is_a_config_error() {
        let map = FeatureMap::new();
        assert!(matches!(map.by_feature_id("missing"), Err(ConfigError::FeatureNotFound(_))));
    }

    #[test]
    fn by_feature_types_preserves_insertion_order() {
        let mut map = FeatureMap::new();
        map.register(digital_feature("ro_2_01"));
        map.register(digital_feature("ro_2_02"));
        let ids: Vec<_> = map.by_feature_types(&[FeatureType::Ro]).map(Feature::feature_id).collect();
        assert_eq!(ids, vec!["ro_2_01", "ro_2_02"]);
    }
}
