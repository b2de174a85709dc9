//! Startup sequence and shutdown coordination (C8).
//!
//! Grounded on `unipi_control.py`'s `UnipiControl.run`: load config, build
//! the hardware map, build the Modbus façade, build the feature map and
//! cover list, start the MQTT engine and scan loops, then wait on signals.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use unipi_config::{load_config, load_hardware_map, Parity};
use unipi_hardware::EepromIdentity;
use unipi_modbus::{Facade, RegisterCache, RtuTransport, TcpTransport, DEFAULT_RTU_TIMEOUT, DEFAULT_TCP_TIMEOUT};
use unipi_mqtt::Engine;

use crate::cli::Cli;
use crate::error::UnexpectedError;
use crate::{logging, scan};

const SYS_BUS_DIR: &str = "/sys/bus/i2c/devices";
const PLC_TCP_ADDR: &str = "127.0.0.1:502";

fn to_tokio_serial_parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::Even => tokio_serial::Parity::Even,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::None => tokio_serial::Parity::None,
    }
}

/// Runs the daemon to completion: returns `Ok(())` on a clean shutdown
/// (one of SIGHUP/SIGTERM/SIGINT), `Err` on a fatal startup or MQTT
/// retry-limit failure.
pub async fn run(cli: Cli) -> Result<(), UnexpectedError> {
    let config_path = cli.config.join("control.yaml");
    let config = load_config(&config_path)?;
    logging::set_level(config.logging.level, cli.verbose);

    let device_slug = unipi_config::text::slugify(&config.device_info.name);

    let identity = EepromIdentity::new(SYS_BUS_DIR);
    let hardware_dir = cli.config.join("hardware");
    let hardware_map = Arc::new(load_hardware_map(&config, &identity, &hardware_dir)?);

    let tcp_addr: SocketAddr = PLC_TCP_ADDR.parse().expect("PLC_TCP_ADDR is a valid socket address");
    let tcp_transport = Arc::new(TcpTransport::new(tcp_addr, DEFAULT_TCP_TIMEOUT));
    let rtu_transport = Arc::new(RtuTransport::new(
        config.modbus.port.clone(),
        config.modbus.baud_rate,
        to_tokio_serial_parity(config.modbus.parity),
        DEFAULT_RTU_TIMEOUT,
    ));
    let facade = Arc::new(Facade::new(tcp_transport, rtu_transport, config.modbus.baud_rate));
    let cache = Arc::new(RegisterCache::new());

    let feature_map = unipi_features::build_feature_map(&hardware_map, &config, cache.clone(), facade.clone()).await;

    let temp_dir = std::env::temp_dir();
    let covers = unipi_covers::build_covers(&config, &feature_map, &device_slug, &temp_dir).await?;

    let cancel = CancellationToken::new();

    let scan_handles: Vec<JoinHandle<()>> = vec![
        tokio::spawn(scan::run_tcp_scan_loop(facade.clone(), cache.clone(), hardware_map.clone(), cancel.clone())),
        tokio::spawn(scan::run_rtu_scan_loop(facade, cache, hardware_map.clone(), cancel.clone())),
    ];

    let engine = Engine::new(device_slug, config, feature_map, covers, &hardware_map);

    let result = tokio::select! {
        result = engine.run(cancel.clone()) => result.map_err(UnexpectedError::from),
        signal_result = wait_for_shutdown_signal() => {
            cancel.cancel();
            signal_result
        }
    };

    for handle in scan_handles {
        handle.abort();
    }

    result
}

/// Resolves once SIGHUP, SIGTERM, or SIGINT is received, or immediately
/// with an error if a handler can't be installed.
async fn wait_for_shutdown_signal() -> Result<(), UnexpectedError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).map_err(UnexpectedError::Signal)?;
    let mut terminate = signal(SignalKind::terminate()).map_err(UnexpectedError::Signal)?;
    let mut interrupt = signal(SignalKind::interrupt()).map_err(UnexpectedError::Signal)?;

    tokio::select! {
        _ = hangup.recv() => log::info!("[CONTROL] received SIGHUP, shutting down"),
        _ = terminate.recv() => log::info!("[CONTROL] received SIGTERM, shutting down"),
        _ = interrupt.recv() => log::info!("[CONTROL] received SIGINT, shutting down"),
    }

    Ok(())
}
