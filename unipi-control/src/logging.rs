//! Stdout and systemd-journal log sinks (§6, §7).
//!
//! Grounded on `unipi_control/logging.py` / `helpers/log.py`'s
//! `SystemdHandler`: journald priority codes (`<N>`) prefixed onto each
//! line so `systemd-cat`/`journalctl` can bucket severity without a
//! structured logging library in the mix.

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::cli::LogTarget;

struct StdoutLogger;

impl Log for StdoutLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{} | {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

struct SystemdLogger;

impl SystemdLogger {
    // https://www.freedesktop.org/software/systemd/man/sd-daemon.html
    fn prefix(level: Level) -> &'static str {
        match level {
            Level::Error => "<3>",
            Level::Warn => "<4>",
            Level::Info => "<6>",
            Level::Debug | Level::Trace => "<7>",
        }
    }
}

impl Log for SystemdLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{}{} | {}", Self::prefix(record.level()), record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static STDOUT_LOGGER: StdoutLogger = StdoutLogger;
static SYSTEMD_LOGGER: SystemdLogger = SystemdLogger;

/// Installs the process-wide logger. Must be called exactly once, before
/// the config file (which may itself fail to load) is read, so that
/// startup failures are logged through the same sink as everything else.
pub fn init(target: LogTarget) {
    let logger: &'static dyn Log = match target {
        LogTarget::Stdout => &STDOUT_LOGGER,
        LogTarget::Systemd => &SYSTEMD_LOGGER,
    };
    log::set_logger(logger).expect("logger already initialised");
    log::set_max_level(LevelFilter::Info);
}

/// Refines the log level once the control document is loaded: the
/// configured `logging.level` raised by each repeated `-v`.
pub fn set_level(base: unipi_config::LogLevel, verbosity: u8) {
    let mut level = match base {
        unipi_config::LogLevel::Error => LevelFilter::Error,
        unipi_config::LogLevel::Warning => LevelFilter::Warn,
        unipi_config::LogLevel::Info => LevelFilter::Info,
        unipi_config::LogLevel::Debug => LevelFilter::Debug,
    };
    for _ in 0..verbosity {
        level = bump(level);
    }
    log::set_max_level(level);
}

fn bump(level: LevelFilter) -> LevelFilter {
    match level {
        LevelFilter::Off => LevelFilter::Error,
        LevelFilter::Error => LevelFilter::Warn,
        LevelFilter::Warn => LevelFilter::Info,
        LevelFilter::Info => LevelFilter::Debug,
        LevelFilter::Debug | LevelFilter::Trace => LevelFilter::Trace,
    }
}
