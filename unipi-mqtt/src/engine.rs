//! MQTT engine (C6): one persistent session, reconnect/retry bookkeeping,
//! and the fast/slow/covers publisher tasks.
//!
//! Grounded on `unipi_control.py`'s static `mqtt_connect` retry loop and
//! `mqtt/unipi.py`'s three-task fan-out, re-expressed over rumqttc's
//! `AsyncClient`/`EventLoop` pair (SPEC_FULL.md §4.6 implementation note).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use unipi_config::{Config, FeatureType, HardwareMap};
use unipi_covers::{Cover, CoverQueue, FAST_SCAN_INTERVAL};
use unipi_features::FeatureMap;
use uuid::Uuid;

use crate::discovery::{self, DeviceContext};
use crate::error::MqttError;
use crate::routing::Router;
use crate::topics;

const SLOW_PUBLISH_INTERVAL: Duration = Duration::from_secs(20);

/// Owns the feature map, the covers (each paired with its own command
/// queue), and the discovery device contexts for one MQTT session's
/// lifetime. One `Engine` is built per process run.
pub struct Engine {
    device_slug: String,
    config: Config,
    feature_map: Arc<FeatureMap>,
    covers: Vec<(Arc<Cover>, Arc<CoverQueue>)>,
    device_contexts: HashMap<String, DeviceContext>,
}

impl Engine {
    pub fn new(device_slug: String, config: Config, feature_map: FeatureMap, covers: Vec<Arc<Cover>>, hardware_map: &HardwareMap) -> Self {
        let device_contexts = DeviceContext::build_all(&config.device_info, hardware_map, &device_slug);
        let covers = covers.into_iter().map(|cover| (cover.clone(), CoverQueue::new(cover, FAST_SCAN_INTERVAL))).collect();

        Self { device_slug, config, feature_map: Arc::new(feature_map), covers, device_contexts }
    }

    /// Runs until `cancel` fires (clean shutdown) or a fatal
    /// [`MqttError`] is returned (retry limit exceeded).
    pub async fn run(self, cancel: CancellationToken) -> Result<(), MqttError> {
        let client_id = format!("{}-{}", self.device_slug, Uuid::new_v4());
        let mut mqtt_options = MqttOptions::new(client_id, self.config.mqtt.host.clone(), self.config.mqtt.port);
        mqtt_options.set_keep_alive(Duration::from_secs(self.config.mqtt.keepalive));

        let (client, mut event_loop) = AsyncClient::new(mqtt_options, 64);

        let router = Router::build(&self.feature_map, &self.covers, &self.device_slug);
        let queue_handles: Vec<JoinHandle<()>> = self.covers.iter().map(|(_, queue)| queue.spawn()).collect();

        let mut publisher_handles: Vec<JoinHandle<()>> = Vec::new();
        let mut discovery_done = false;
        let mut retry_count: u32 = 0;

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break Ok(());
                }
                event = event_loop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            log::info!("{} connected", MqttError::LOG_PREFIX);
                            retry_count = 0;

                            if let Err(err) = client.subscribe(format!("{}/#", self.device_slug), QoS::AtLeastOnce).await {
                                log::error!("{} subscribe failed: {err}", MqttError::LOG_PREFIX);
                            }

                            if !discovery_done && self.config.homeassistant.enabled {
                                match self.publish_discovery(&client).await {
                                    Ok(()) => discovery_done = true,
                                    Err(err) => log::error!("{} discovery publish failed: {err}", MqttError::LOG_PREFIX),
                                }
                            }

                            if publisher_handles.is_empty() {
                                publisher_handles = self.spawn_publishers(client.clone(), cancel.clone());
                            }
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                            router.dispatch(&publish.topic, &payload).await;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            log::warn!("{} connection error: {err}", MqttError::LOG_PREFIX);
                            retry_count += 1;
                            if retry_count > self.config.mqtt.retry_limit {
                                break Err(MqttError::RetryLimitExceeded);
                            }
                            tokio::time::sleep(Duration::from_secs(self.config.mqtt.reconnect_interval)).await;
                        }
                    }
                }
            }
        };

        for handle in publisher_handles {
            handle.abort();
        }
        for handle in queue_handles {
            handle.abort();
        }
        let _ = client.disconnect().await;

        result
    }

    /// Publishes one retained config message per {DI, DO, RO, METER}
    /// feature and per cover, skipping features that back a cover's
    /// up/down circuit (§4.7).
    async fn publish_discovery(&self, client: &AsyncClient) -> Result<(), MqttError> {
        let prefix = &self.config.homeassistant.discovery_prefix;

        let cover_circuit_ids: HashSet<&str> =
            self.covers.iter().flat_map(|(c, _)| [c.cover_up.feature_id.as_str(), c.cover_down.feature_id.as_str()]).collect();

        for feature in self.feature_map.iter() {
            let Some(kind) = discovery::hass_kind(feature) else { continue };
            if matches!(feature.feature_type(), FeatureType::Do | FeatureType::Ro) && cover_circuit_ids.contains(feature.feature_id()) {
                continue;
            }

            let ctx_key = DeviceContext::key_for_unit(feature.unit());
            let ctx = self.device_contexts.get(&ctx_key).cloned().unwrap_or_default();

            let sw_version = match feature.as_meter() {
                Some(meter) => meter.read_sw_version().await,
                None => feature.sw_version().map(str::to_string),
            };
            let device = discovery::DeviceBlock::new(&ctx, sw_version);

            let (topic, body) = match kind {
                "binary_sensor" => {
                    let payload = discovery::binary_sensor_discovery(&self.device_slug, feature, device);
                    let topic = discovery::config_topic(prefix, kind, &payload.unique_id);
                    (topic, serde_json::to_vec(&payload))
                }
                "switch" => {
                    let payload = discovery::switch_discovery(&self.device_slug, feature, device);
                    let topic = discovery::config_topic(prefix, kind, &payload.unique_id);
                    (topic, serde_json::to_vec(&payload))
                }
                "sensor" => {
                    let payload = discovery::sensor_discovery(&self.device_slug, feature, device);
                    let topic = discovery::config_topic(prefix, kind, &payload.unique_id);
                    (topic, serde_json::to_vec(&payload))
                }
                _ => unreachable!("hass_kind only returns binary_sensor/switch/sensor"),
            };
            let body = body.expect("discovery payloads are always serialisable");
            client.publish(topic, QoS::ExactlyOnce, true, body).await?;
        }

        for (cover, _queue) in &self.covers {
            let ctx = self.device_contexts.get("PLC").cloned().unwrap_or_default();
            let device = discovery::DeviceBlock::new(&ctx, cover.cover_up.sw_version.clone());
            let payload = discovery::cover_discovery(&self.device_slug, cover, device);
            let topic = discovery::config_topic(prefix, "cover", &payload.unique_id);
            let body = serde_json::to_vec(&payload).expect("discovery payloads are always serialisable");
            client.publish(topic, QoS::ExactlyOnce, true, body).await?;
        }

        Ok(())
    }

    fn spawn_publishers(&self, client: AsyncClient, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let covers: Vec<Arc<Cover>> = self.covers.iter().map(|(cover, _)| cover.clone()).collect();
        vec![
            tokio::spawn(fast_publisher(client.clone(), self.feature_map.clone(), self.device_slug.clone(), cancel.clone())),
            tokio::spawn(slow_publisher(client.clone(), self.feature_map.clone(), self.device_slug.clone(), cancel.clone())),
            tokio::spawn(covers_publisher(client, covers, self.device_slug.clone(), cancel)),
        ]
    }
}

async fn fast_publisher(client: AsyncClient, feature_map: Arc<FeatureMap>, device_slug: String, cancel: CancellationToken) {
    const TYPES: [FeatureType; 4] = [FeatureType::Di, FeatureType::Do, FeatureType::Ro, FeatureType::Led];
    let mut interval = tokio::time::interval(FAST_SCAN_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => publish_changed(&client, feature_map.by_feature_types(&TYPES), &device_slug).await,
        }
    }
}

async fn slow_publisher(client: AsyncClient, feature_map: Arc<FeatureMap>, device_slug: String, cancel: CancellationToken) {
    const TYPES: [FeatureType; 1] = [FeatureType::Meter];
    let mut interval = tokio::time::interval(SLOW_PUBLISH_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => publish_changed(&client, feature_map.by_feature_types(&TYPES), &device_slug).await,
        }
    }
}

async fn publish_changed<'a>(client: &AsyncClient, features: impl Iterator<Item = &'a unipi_features::Feature>, device_slug: &str) {
    for feature in features {
        if !feature.changed() {
            continue;
        }
        let Some(payload) = feature.payload() else { continue };
        let topic = topics::get_topic(&feature.topic(device_slug));
        if let Err(err) = client.publish(topic, QoS::AtLeastOnce, true, payload).await {
            log::error!("{} publish failed: {err}", MqttError::LOG_PREFIX);
        }
    }
}

async fn covers_publisher(client: AsyncClient, covers: Vec<Arc<Cover>>, device_slug: String, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(FAST_SCAN_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {
                for cover in &covers {
                    cover.calibrate().await;
                    let base = cover.topic(&device_slug);

                    if cover.state_changed().await {
                        publish_retained(&client, topics::state_topic(&base), cover.state().await.as_str()).await;
                    }
                    if cover.position_changed().await {
                        if let Some(position) = cover.position().await {
                            publish_retained(&client, topics::position_topic(&base), position.to_string()).await;
                        }
                    }
                    if cover.tilt_changed().await {
                        if let Some(tilt) = cover.tilt().await {
                            publish_retained(&client, topics::tilt_topic(&base), tilt.to_string()).await;
                        }
                    }
                }
            }
        }
    }
}

async fn publish_retained(client: &AsyncClient, topic: String, payload: impl Into<Vec<u8>>) {
    if let Err(err) = client.publish(topic, QoS::AtLeastOnce, true, payload).await {
        log::error!("{} publish failed: {err}", MqttError::LOG_PREFIX);
    }
}
