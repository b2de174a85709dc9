use std::io::Write;

use unipi_config::{load_config, ConfigError};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_minimal_config_with_defaults() {
    let file = write_config(
        r#"
device_info:
  name: "My PLC"
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.device_info.name, "My PLC");
    assert_eq!(config.mqtt.port, 1883);
    assert_eq!(config.modbus.baud_rate, 9600);
    assert!(config.homeassistant.enabled);
}

#[test]
fn rejects_invalid_device_name() {
    let file = write_config(
        r#"
device_info:
  name: "Bad!Name"
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDeviceName(_)));
}

#[test]
fn rejects_unsupported_baud_rate() {
    let file = write_config(
        r#"
device_info:
  name: "My PLC"
modbus:
  baud_rate: 1200
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBaudRate(1200)));
}

#[test]
fn rejects_duplicate_cover_circuits() {
    let file = write_config(
        r#"
device_info:
  name: "My PLC"
covers:
  - object_id: blind1
    friendly_name: Blind 1
    device_class: blind
    cover_up: ro_2_01
    cover_down: ro_2_02
    cover_run_time: 30
    tilt_change_time: 1.5
  - object_id: blind2
    friendly_name: Blind 2
    device_class: blind
    cover_up: ro_2_01
    cover_down: ro_2_03
    cover_run_time: 30
    tilt_change_time: 1.5
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateCoverCircuit(..)));
}

#[test]
fn rejects_duplicate_rtu_unit() {
    let file = write_config(
        r#"
device_info:
  name: "My PLC"
modbus:
  units:
    - unit: 1
      device_name: eastron_1
    - unit: 1
      device_name: eastron_2
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateRtuUnit(1)));
}

#[test]
fn rejects_blind_without_cover_run_time() {
    let file = write_config(
        r#"
device_info:
  name: "My PLC"
covers:
  - object_id: blind1
    friendly_name: Blind 1
    device_class: blind
    cover_up: ro_2_01
    cover_down: ro_2_02
    tilt_change_time: 1.5
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::CoverMissingRunTime(_, "cover_run_time")));
}

#[test]
fn rejects_garage_door_without_cover_run_time() {
    let file = write_config(
        r#"
device_info:
  name: "My PLC"
covers:
  - object_id: garage1
    friendly_name: Garage
    device_class: garage_door
    cover_up: ro_2_01
    cover_down: ro_2_02
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::CoverMissingRunTime(_, "cover_run_time")));
}
