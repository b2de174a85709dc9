//! MQTT engine, Home Assistant discovery publisher, and command router
//! (C6/C7) for Unipi Control.

pub mod discovery;
pub mod engine;
pub mod error;
pub mod routing;
pub mod topics;

pub use engine::Engine;
pub use error::MqttError;
