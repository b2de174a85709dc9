//! Per-cover command queue (§4.5's queue paragraph).
//!
//! Grounded on `mqtt/integrations/covers.py`'s `CoversMqttHelper`: one
//! `asyncio.Queue` plus one worker task per cover. `set_position` and
//! `set_tilt` are enqueued and processed in FIFO order; `OPEN`/`CLOSE`/
//! `STOP` are interactive overrides that run immediately and purge
//! whatever is still queued.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::cover::Cover;

#[derive(Debug, Clone, Copy)]
pub enum QueuedCommand {
    SetPosition(f64),
    SetTilt(f64),
}

/// Owns the in-memory FIFO for one cover and the worker task that drains
/// it. The worker pulls one command at a time and waits for the physical
/// move to finish (`is_opening() || is_closing()` polled at
/// [`crate::FAST_SCAN_INTERVAL`]) before dequeuing the next (I7).
pub struct CoverQueue {
    cover: Arc<Cover>,
    pending: Mutex<VecDeque<QueuedCommand>>,
    notify: Notify,
    scan_interval: Duration,
}

impl CoverQueue {
    pub fn new(cover: Arc<Cover>, scan_interval: Duration) -> Arc<Self> {
        Arc::new(Self { cover, pending: Mutex::new(VecDeque::new()), notify: Notify::new(), scan_interval })
    }

    /// Appends a command to the back of the queue and wakes the worker.
    pub fn enqueue(&self, command: QueuedCommand) {
        self.pending.lock().unwrap().push_back(command);
        self.notify.notify_one();
    }

    /// Number of commands currently queued, not counting one in flight.
    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Drops every pending command without running it — the interactive
    /// override used by `OPEN`/`CLOSE`/`STOP` (§4.5).
    pub fn purge(&self) {
        let mut pending = self.pending.lock().unwrap();
        let dropped = pending.len();
        pending.clear();
        if dropped > 0 {
            log::info!("[COVERS] cleared {dropped} queued command(s) for {}", self.cover.object_id);
        }
    }

    /// Spawns the worker loop. The returned handle is owned by the
    /// caller (the MQTT engine's task set) so it can be cancelled on
    /// shutdown along with everything else.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move { queue.run().await })
    }

    async fn run(self: Arc<Self>) {
        loop {
            let command = loop {
                if let Some(command) = self.pending.lock().unwrap().pop_front() {
                    break command;
                }
                self.notify.notified().await;
            };

            match command {
                QueuedCommand::SetPosition(target) => {
                    self.cover.set_position(target).await;
                }
                QueuedCommand::SetTilt(target) => {
                    self.cover.set_tilt(target).await;
                }
            }

            while self.cover.is_opening().await || self.cover.is_closing().await {
                tokio::time::sleep(self.scan_interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use unipi_config::{CoverDeviceClass, FeatureType};
    use unipi_features::DigitalFeature;
    use unipi_modbus::{Facade, RegisterCache};

    use super::*;
    use crate::cover::MoveOutcome;

    async fn cover_with_run_time(dir: &tempfile::TempDir) -> Arc<Cover> {
        let tcp = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let rtu = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let facade = Arc::new(Facade::new(tcp, rtu, 9600));
        let cache = Arc::new(RegisterCache::new());

        let up = Arc::new(DigitalFeature::new(
            "ro_2_01".into(),
            None,
            "Up".into(),
            None,
            None,
            None,
            false,
            FeatureType::Ro,
            0,
            Some(100),
            0,
            None,
            cache.clone(),
            facade.clone(),
        ));
        let down = Arc::new(DigitalFeature::new(
            "ro_2_02".into(),
            None,
            "Down".into(),
            None,
            None,
            None,
            false,
            FeatureType::Ro,
            0,
            Some(101),
            0,
            None,
            cache,
            facade,
        ));

        Cover::load(
            "blind1".into(),
            "Blind 1".into(),
            None,
            CoverDeviceClass::Blind,
            Some(0.05),
            Some(0.02),
            up,
            down,
            PathBuf::from(dir.path()).join("pos"),
        )
        .await
    }

    #[tokio::test]
    async fn purge_drops_pending_commands_without_running_them() {
        let dir = tempfile::tempdir().unwrap();
        let cover = cover_with_run_time(&dir).await;
        cover.calibrate().await;
        cover.stop_cover().await; // leaves calibration incomplete, position at 0

        let queue = CoverQueue::new(cover.clone(), Duration::from_millis(1));
        queue.enqueue(QueuedCommand::SetPosition(50.0));
        queue.enqueue(QueuedCommand::SetTilt(50.0));
        assert_eq!(queue.pending.lock().unwrap().len(), 2);

        queue.purge();
        assert_eq!(queue.pending.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn worker_processes_commands_in_order_and_waits_for_completion() {
        let dir = tempfile::tempdir().unwrap();
        let cover = cover_with_run_time(&dir).await;

        // Finish calibration so set_position is meaningful.
        let outcome = cover.calibrate().await;
        assert!(matches!(outcome, MoveOutcome::Started(_)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cover.position().await, Some(100.0));

        let queue = CoverQueue::new(cover.clone(), Duration::from_millis(5));
        let handle = queue.spawn();

        queue.enqueue(QueuedCommand::SetPosition(0.0));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cover.position().await, Some(0.0));
        handle.abort();
    }
}
