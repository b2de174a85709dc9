//! Cover state machine (C5) for Unipi Control.

use std::time::Duration;

pub mod build;
pub mod cover;
pub mod position_file;
pub mod queue;
pub mod state;

pub use build::build_covers;
pub use cover::{Cover, MoveOutcome};
pub use queue::{CoverQueue, QueuedCommand};
pub use state::{CoverState, DeviceState, Direction};

/// Cadence shared with the TCP scanner (C2/C8) and re-used here as the
/// poll interval the command-queue worker waits on for physical
/// completion (§4.5).
pub const FAST_SCAN_INTERVAL: Duration = Duration::from_millis(20);
