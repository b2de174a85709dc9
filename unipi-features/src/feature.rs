use std::sync::Arc;

use unipi_config::FeatureType;

use crate::digital::DigitalFeature;
use crate::error::FeatureError;
use crate::meter::MeterFeature;

/// Polymorphic over {DI, DO, RO, LED, Meter}. An enum rather than a trait
/// object: the variant set is closed and `by_feature_types` needs the
/// discriminant anyway.
#[derive(Clone)]
pub enum Feature {
    Digital(Arc<DigitalFeature>),
    Meter(Arc<MeterFeature>),
}

impl Feature {
    pub fn feature_id(&self) -> &str {
        match self {
            Feature::Digital(f) => &f.feature_id,
            Feature::Meter(f) => &f.feature_id,
        }
    }

    pub fn object_id(&self) -> Option<&str> {
        match self {
            Feature::Digital(f) => f.object_id.as_deref(),
            Feature::Meter(f) => f.object_id.as_deref(),
        }
    }

    pub fn feature_type(&self) -> FeatureType {
        match self {
            Feature::Digital(f) => f.kind,
            Feature::Meter(_) => FeatureType::Meter,
        }
    }

    pub fn topic(&self, device_slug: &str) -> String {
        match self {
            Feature::Digital(f) => f.topic(device_slug),
            Feature::Meter(f) => f.topic(device_slug),
        }
    }

    /// Side-effecting: clears the change flag on read, as specified.
    pub fn changed(&self) -> bool {
        match self {
            Feature::Digital(f) => f.changed(),
            Feature::Meter(f) => f.changed(),
        }
    }

    pub fn payload(&self) -> Option<String> {
        match self {
            Feature::Digital(f) => f.payload().map(str::to_string),
            Feature::Meter(f) => f.payload(),
        }
    }

    pub fn is_writable(&self) -> bool {
        match self {
            Feature::Digital(f) => f.is_writable(),
            Feature::Meter(_) => false,
        }
    }

    pub fn friendly_name(&self) -> &str {
        match self {
            Feature::Digital(f) => &f.friendly_name,
            Feature::Meter(f) => &f.friendly_name,
        }
    }

    pub fn suggested_area(&self) -> Option<&str> {
        match self {
            Feature::Digital(f) => f.suggested_area.as_deref(),
            Feature::Meter(f) => f.suggested_area.as_deref(),
        }
    }

    pub fn icon(&self) -> Option<&str> {
        match self {
            Feature::Digital(f) => f.icon.as_deref(),
            Feature::Meter(f) => f.icon.as_deref(),
        }
    }

    pub fn device_class(&self) -> Option<&str> {
        match self {
            Feature::Digital(f) => f.device_class.as_deref(),
            Feature::Meter(f) => f.device_class.as_deref(),
        }
    }

    pub fn invert_state(&self) -> bool {
        match self {
            Feature::Digital(f) => f.invert_state,
            Feature::Meter(_) => false,
        }
    }

    pub fn state_class(&self) -> Option<&str> {
        match self {
            Feature::Digital(_) => None,
            Feature::Meter(f) => f.state_class.as_deref(),
        }
    }

    pub fn unit_of_measurement(&self) -> Option<&str> {
        match self {
            Feature::Digital(_) => None,
            Feature::Meter(f) => f.unit_of_measurement.as_deref(),
        }
    }

    pub fn sw_version(&self) -> Option<&str> {
        match self {
            Feature::Digital(f) => f.sw_version.as_deref(),
            Feature::Meter(_) => None,
        }
    }

    /// `unique_id` suffix: `object_id` if overridden, else `feature_id`.
    pub fn unique_id_suffix(&self) -> &str {
        self.object_id().unwrap_or_else(|| self.feature_id())
    }

    /// Downcasts to the shared digital-output handle, for callers (the
    /// cover state machine) that need to drive a specific writable output
    /// rather than go through the generic [`Feature::set_state`].
    pub fn as_digital(&self) -> Option<Arc<DigitalFeature>> {
        match self {
            Feature::Digital(f) => Some(f.clone()),
            Feature::Meter(_) => None,
        }
    }

    /// Downcasts to the shared meter handle, for callers (the discovery
    /// publisher) that need the extension unit or a firmware-version read
    /// not exposed through the generic [`Feature`] surface.
    pub fn as_meter(&self) -> Option<Arc<MeterFeature>> {
        match self {
            Feature::Digital(_) => None,
            Feature::Meter(f) => Some(f.clone()),
        }
    }

    /// Modbus unit id this feature is read from: `0` for PLC-resident
    /// digital features, the extension's RTU unit for meters.
    pub fn unit(&self) -> u8 {
        match self {
            Feature::Digital(_) => 0,
            Feature::Meter(f) => f.unit,
        }
    }

    pub async fn set_state(&self, value: bool) -> Result<(), FeatureError> {
        match self {
            Feature::Digital(f) => f.set_state(value).await,
            Feature::Meter(f) => Err(FeatureError::ReadOnly(f.feature_id.clone())),
        }
    }
}
