//! Hardware identification for Unipi Neuron-family PLCs.
//!
//! The control core only ever needs a model string to resolve the right
//! hardware-definition YAML file; everything below [`HardwareIdentity`] is
//! an external collaborator the core treats as a narrow, injectable
//! dependency (see `unipi-config`'s hardware map loader).

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no EEPROM found under {0}")]
    NotFound(PathBuf),
    #[error("failed to read EEPROM at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("EEPROM model bytes are not valid UTF-8")]
    InvalidModel,
}

/// Identity information read from a PLC's onboard EEPROM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardIdentity {
    pub name: String,
    pub model: String,
    pub version: String,
    pub serial: i32,
}

/// Narrow interface the config/hardware-map loader depends on. The core
/// never reads `/sys/bus/...` directly; it asks for a [`BoardIdentity`].
pub trait HardwareIdentity {
    fn identify(&self) -> Result<BoardIdentity, IdentityError>;
}

/// Real implementation: reads the known EEPROM locations under a sysfs
/// bus directory, mirroring `hardware/info.py`'s four candidate paths.
pub struct EepromIdentity {
    sys_bus_dir: PathBuf,
}

impl EepromIdentity {
    pub fn new(sys_bus_dir: impl Into<PathBuf>) -> Self {
        Self { sys_bus_dir: sys_bus_dir.into() }
    }

    fn read(path: &Path, len: usize) -> Result<Vec<u8>, IdentityError> {
        let mut file = std::fs::File::open(path).map_err(|source| IdentityError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).map_err(|source| IdentityError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(buf)
    }
}

impl HardwareIdentity for EepromIdentity {
    fn identify(&self) -> Result<BoardIdentity, IdentityError> {
        let unipi_1 = self.sys_bus_dir.join("1-0050/eeprom");
        let unipi_patron = self.sys_bus_dir.join("2-0057/eeprom");
        let unipi_neuron_1 = self.sys_bus_dir.join("1-0057/eeprom");
        let unipi_neuron_0 = self.sys_bus_dir.join("0-0057/eeprom");

        if unipi_1.is_file() {
            let bytes = Self::read(&unipi_1, 256)?;
            let (name, version) = match (bytes[226], bytes[227]) {
                (1, 1) => ("Unipi", "1.1"),
                (11, 1) => ("Unipi Lite", "1.1"),
                _ => ("Unipi", "1.0"),
            };
            let serial = i32::from_ne_bytes(bytes[228..232].try_into().unwrap());
            return Ok(BoardIdentity {
                name: name.to_string(),
                model: "unknown".to_string(),
                version: version.to_string(),
                serial,
            });
        }

        for candidate in [&unipi_patron, &unipi_neuron_1, &unipi_neuron_0] {
            if candidate.is_file() {
                let bytes = Self::read(candidate, 128)?;
                let model = std::str::from_utf8(&bytes[106..110])
                    .map_err(|_| IdentityError::InvalidModel)?
                    .to_string();
                let name = if candidate == &unipi_patron { "Unipi Patron" } else { "Unipi Neuron" };
                let version = format!("{}.{}", bytes[99], bytes[98]);
                let serial = i32::from_ne_bytes(bytes[100..104].try_into().unwrap());
                return Ok(BoardIdentity { name: name.to_string(), model, version, serial });
            }
        }

        Err(IdentityError::NotFound(self.sys_bus_dir.clone()))
    }
}

/// Test double used by config-loading tests; never touches the filesystem.
pub struct FakeIdentity(pub BoardIdentity);

impl HardwareIdentity for FakeIdentity {
    fn identify(&self) -> Result<BoardIdentity, IdentityError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_identity_returns_configured_model() {
        let identity = FakeIdentity(BoardIdentity {
            name: "Unipi Neuron".into(),
            model: "M503".into(),
            version: "1.0".into(),
            serial: 42,
        });
        let info = identity.identify().unwrap();
        assert_eq!(info.model, "M503");
    }

    #[test]
    fn missing_eeprom_is_not_found() {
        let identity = EepromIdentity::new("/nonexistent/sys/bus/path");
        assert!(matches!(identity.identify(), Err(IdentityError::NotFound(_))));
    }
}
