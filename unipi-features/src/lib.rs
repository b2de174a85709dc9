//! Typed feature model (C4) for Unipi Control.

pub mod build;
pub mod digital;
pub mod error;
pub mod feature;
pub mod firmware;
pub mod map;
pub mod meter;

pub use build::build_feature_map;
pub use digital::DigitalFeature;
pub use error::FeatureError;
pub use feature::Feature;
pub use map::FeatureMap;
pub use meter::MeterFeature;
