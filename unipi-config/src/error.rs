use std::path::PathBuf;

use thiserror::Error;

/// Schema, cross-reference, or duplicate violations in user/hardware YAML.
/// Fatal at startup; logged with the `[CONFIG]` prefix by callers.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse yaml in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("device_info.name {0:?} does not match the allowed name pattern")]
    InvalidDeviceName(String),
    #[error("{field} {value:?} does not match the allowed id pattern")]
    InvalidId { field: &'static str, value: String },
    #[error("cover {0:?} is missing required field {1}")]
    CoverMissingField(String, &'static str),
    #[error("cover {0:?} has unknown device_class {1:?}")]
    InvalidDeviceClass(String, String),
    #[error("covers {0:?} and {1:?} both drive circuit {2:?}")]
    DuplicateCoverCircuit(String, String, String),
    #[error("duplicate object_id {0:?} used by more than one cover or feature override")]
    DuplicateObjectId(String),
    #[error("modbus baud_rate {0} is not one of the supported rates")]
    InvalidBaudRate(u32),
    #[error("modbus parity {0:?} is not one of E, O, N")]
    InvalidParity(String),
    #[error("two RTU units are both configured with unit number {0}")]
    DuplicateRtuUnit(u8),
    #[error("RTU unit {0} is missing device_name")]
    RtuUnitMissingDeviceName(u8),
    #[error("feature_id {0:?} was not found in the feature map")]
    FeatureNotFound(String),
    #[error("cover circuit {0:?} is not a writable digital output feature")]
    CoverCircuitNotDigital(String),
    #[error("cover {0:?} has device_class {1:?} but no cover_run_time, though its capability requires one")]
    CoverMissingRunTime(String, &'static str),
}

impl ConfigError {
    pub const LOG_PREFIX: &'static str = "[CONFIG]";
}

/// Unsupported device or missing PLC hardware-definition YAML.
/// Fatal at startup.
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("failed to identify PLC hardware: {0}")]
    Identity(#[from] unipi_hardware::IdentityError),
    #[error("no hardware definition found for PLC model {0:?}")]
    UnknownPlcModel(String),
    #[error("failed to read hardware definition directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse hardware definition {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("extension definition {0:?} does not match any configured RTU unit")]
    UnmatchedExtensionDefinition(String),
}

impl HardwareError {
    pub const LOG_PREFIX: &'static str = "[HARDWARE]";
}
