//! Matches incoming `Publish` packets to the feature or cover they target
//! (§4.6 "Subscribe" responsibility and command-semantics table).

use std::collections::HashMap;
use std::sync::Arc;

use unipi_covers::{Cover, CoverQueue, QueuedCommand};
use unipi_features::{Feature, FeatureMap};

use crate::topics;

enum CoverRoute {
    /// `{base}/set`: `OPEN`/`CLOSE`/`STOP`, purging the queue first.
    Command(Arc<Cover>, Arc<CoverQueue>),
    Position(Arc<CoverQueue>),
    Tilt(Arc<CoverQueue>),
}

/// Pre-computed topic → handler table, built once after the feature map
/// and cover list exist and re-used for the lifetime of the MQTT session.
pub struct Router {
    feature_routes: HashMap<String, Feature>,
    cover_routes: HashMap<String, CoverRoute>,
}

impl Router {
    pub fn build(feature_map: &FeatureMap, covers: &[(Arc<Cover>, Arc<CoverQueue>)], device_slug: &str) -> Self {
        let mut feature_routes = HashMap::new();
        for feature in feature_map.iter() {
            if !feature.is_writable() {
                continue;
            }
            let base = feature.topic(device_slug);
            feature_routes.insert(topics::set_topic(&base), feature.clone());
        }

        let mut cover_routes = HashMap::new();
        for (cover, queue) in covers {
            let base = cover.topic(device_slug);
            cover_routes.insert(topics::set_topic(&base), CoverRoute::Command(cover.clone(), queue.clone()));
            if cover.supports_set_position() {
                cover_routes.insert(topics::position_set_topic(&base), CoverRoute::Position(queue.clone()));
            }
            if cover.supports_set_tilt() {
                cover_routes.insert(topics::tilt_set_topic(&base), CoverRoute::Tilt(queue.clone()));
            }
        }

        Self { feature_routes, cover_routes }
    }

    /// Dispatches one incoming `(topic, payload)` pair. Unknown topics and
    /// unrecognised payloads are logged and dropped, never propagated as
    /// an error — a malformed command from a stray MQTT client must not
    /// take the engine down.
    pub async fn dispatch(&self, topic: &str, payload: &str) {
        if let Some(feature) = self.feature_routes.get(topic) {
            match payload {
                "ON" => {
                    if let Err(err) = feature.set_state(true).await {
                        log::error!("[MQTT] failed to set {topic} ON: {err}");
                    }
                }
                "OFF" => {
                    if let Err(err) = feature.set_state(false).await {
                        log::error!("[MQTT] failed to set {topic} OFF: {err}");
                    }
                }
                other => log::warn!("[MQTT] dropping unrecognised payload {other:?} on {topic}"),
            }
            return;
        }

        match self.cover_routes.get(topic) {
            Some(CoverRoute::Command(cover, queue)) => match payload {
                "OPEN" => {
                    queue.purge();
                    cover.open_cover().await;
                }
                "CLOSE" => {
                    queue.purge();
                    cover.close_cover().await;
                }
                "STOP" => {
                    queue.purge();
                    cover.stop_cover().await;
                }
                other => log::warn!("[MQTT] dropping unrecognised payload {other:?} on {topic}"),
            },
            Some(CoverRoute::Position(queue)) => match topics::parse_signed_int(payload) {
                Some(value) => queue.enqueue(QueuedCommand::SetPosition(value)),
                None => log::warn!("[MQTT] dropping non-integer payload {payload:?} on {topic}"),
            },
            Some(CoverRoute::Tilt(queue)) => match topics::parse_signed_int(payload) {
                Some(value) => queue.enqueue(QueuedCommand::SetTilt(value)),
                None => log::warn!("[MQTT] dropping non-integer payload {payload:?} on {topic}"),
            },
            None => log::debug!("[MQTT] no route for topic {topic}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use unipi_config::{CoverDeviceClass, FeatureType};
    use unipi_features::DigitalFeature;
    use unipi_modbus::{Facade, RegisterCache};

    use super::*;

    async fn facade_feature(id: &str, val_coil: Option<u16>) -> (Feature, Arc<unipi_modbus::fake::FakeTransport>) {
        let tcp = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let rtu = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let facade = Arc::new(Facade::new(tcp.clone(), rtu, 9600));
        let cache = Arc::new(RegisterCache::new());
        let feature = Feature::Digital(Arc::new(DigitalFeature::new(
            id.to_string(),
            None,
            id.to_string(),
            None,
            None,
            None,
            false,
            FeatureType::Ro,
            0,
            val_coil,
            0,
            None,
            cache,
            facade,
        )));
        (feature, tcp)
    }

    #[tokio::test]
    async fn on_off_payload_writes_coil() {
        let (feature, tcp) = facade_feature("ro_1_01", Some(100)).await;
        let mut map = FeatureMap::new();
        map.register(feature);

        let router = Router::build(&map, &[], "my_plc");
        router.dispatch("my_plc/relay/ro_1_01/set", "ON").await;
        assert_eq!(tcp.coil(0, 100), Some(true));

        router.dispatch("my_plc/relay/ro_1_01/set", "OFF").await;
        assert_eq!(tcp.coil(0, 100), Some(false));
    }

    #[tokio::test]
    async fn read_only_feature_has_no_set_route() {
        let (feature, _tcp) = facade_feature("di_1_01", None).await;
        let mut map = FeatureMap::new();
        map.register(feature);

        let router = Router::build(&map, &[], "my_plc");
        // A DI has no coil to write, so is_writable() is false and no
        // route is registered; dispatching is a silent no-op.
        router.dispatch("my_plc/input/di_1_01/set", "ON").await;
    }

    #[tokio::test]
    async fn cover_position_set_enqueues_parsed_value() {
        let (up, _tcp) = facade_feature("ro_2_01", Some(100)).await;
        let (down, _tcp2) = facade_feature("ro_2_02", Some(101)).await;

        let dir = tempfile::tempdir().unwrap();
        let cover = Cover::load(
            "blind1".into(),
            "Blind 1".into(),
            None,
            CoverDeviceClass::Blind,
            Some(30.0),
            Some(1.5),
            up.as_digital().unwrap(),
            down.as_digital().unwrap(),
            dir.path().join("pos"),
        )
        .await;
        let queue = CoverQueue::new(cover.clone(), Duration::from_millis(5));

        let router = Router::build(&FeatureMap::new(), &[(cover, queue.clone())], "my_plc");
        router.dispatch("my_plc/blind1/cover/blind/position/set", "42").await;

        assert_eq!(queue.len(), 1);
    }
}
