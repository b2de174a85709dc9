//! Per-cover position/tilt state machine (C5).
//!
//! Grounded on `integrations/covers.py`'s `Cover` class: `open_cover`,
//! `close_cover`, `stop_cover`, `set_position`, `set_tilt`, `calibrate`,
//! and the `_update_position` extrapolation step shared by all of them.
//! The per-cover command queue (`CoversMqttHelper`'s `asyncio.Queue` plus
//! worker task) is a separate module, [`crate::queue`], matching the
//! original's split between `integrations/covers.py` (state machine) and
//! `mqtt/integrations/covers.py` (queue).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use unipi_config::CoverDeviceClass;
use unipi_features::DigitalFeature;

use crate::position_file;
use crate::state::{CoverState, Direction, DeviceState};

/// Outcome of a command that may or may not start a physical move,
/// mirroring §4.5's "return the estimated run-time, or nothing if no
/// movement will occur".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// Preconditions weren't met (calibrating, or already at the target).
    NoOp,
    /// A relay write failed; the command was abandoned mid-sequence
    /// without changing `device_state` (§7 user-visible failures).
    Aborted,
    /// The move was started; the estimated run-time in seconds.
    Started(f64),
}

struct CoverInner {
    state: CoverState,
    device_state: DeviceState,
    position: Option<f64>,
    tilt: Option<f64>,
    direction: Option<Direction>,
    timer_start: Option<Instant>,
    calibration_mode: bool,
    calibration_started: bool,
    active_timer: Option<JoinHandle<()>>,
    saved_state: Option<CoverState>,
    saved_position: Option<f64>,
    saved_tilt: Option<f64>,
}

pub struct Cover {
    pub object_id: String,
    pub friendly_name: String,
    pub suggested_area: Option<String>,
    pub device_class: CoverDeviceClass,
    pub cover_run_time: Option<f64>,
    pub tilt_change_time: Option<f64>,
    pub cover_up: Arc<DigitalFeature>,
    pub cover_down: Arc<DigitalFeature>,
    position_file: PathBuf,
    inner: Mutex<CoverInner>,
}

impl Cover {
    /// Constructs a cover and loads its persisted position. A missing or
    /// invalid position file forces calibration mode (§3 lifecycle).
    pub async fn load(
        object_id: String,
        friendly_name: String,
        suggested_area: Option<String>,
        device_class: CoverDeviceClass,
        cover_run_time: Option<f64>,
        tilt_change_time: Option<f64>,
        cover_up: Arc<DigitalFeature>,
        cover_down: Arc<DigitalFeature>,
        position_file: PathBuf,
    ) -> Arc<Self> {
        let loaded = position_file::read_position(&position_file).await;

        let (position, tilt, calibration_mode, state) = match loaded {
            Some((position, tilt)) => (Some(position), Some(tilt), false, CoverState::from_position(position)),
            None => (None, None, true, CoverState::Closed),
        };

        Arc::new(Self {
            object_id,
            friendly_name,
            suggested_area,
            device_class,
            cover_run_time,
            tilt_change_time,
            cover_up,
            cover_down,
            position_file,
            inner: Mutex::new(CoverInner {
                state,
                device_state: DeviceState::Idle,
                position,
                tilt,
                direction: None,
                timer_start: None,
                calibration_mode,
                calibration_started: false,
                active_timer: None,
                saved_state: None,
                saved_position: None,
                saved_tilt: None,
            }),
        })
    }

    pub fn supports_set_position(&self) -> bool {
        self.device_class.supports_set_position()
    }

    pub fn supports_set_tilt(&self) -> bool {
        self.device_class.supports_set_tilt()
    }

    pub fn topic(&self, device_slug: &str) -> String {
        format!("{device_slug}/{}/cover/{}", self.object_id, self.device_class.as_topic_str())
    }

    pub async fn state(&self) -> CoverState {
        self.inner.lock().await.state
    }

    pub async fn position(&self) -> Option<f64> {
        self.inner.lock().await.position
    }

    pub async fn tilt(&self) -> Option<f64> {
        self.inner.lock().await.tilt
    }

    pub async fn is_opening(&self) -> bool {
        self.inner.lock().await.device_state == DeviceState::Open
    }

    pub async fn is_closing(&self) -> bool {
        self.inner.lock().await.device_state == DeviceState::Close
    }

    pub async fn is_calibrating(&self) -> bool {
        self.inner.lock().await.calibration_mode
    }

    /// True at most once per physical transition; reading clears it.
    pub async fn state_changed(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.saved_state != Some(inner.state) {
            inner.saved_state = Some(inner.state);
            true
        } else {
            false
        }
    }

    /// Only ever true while `device_state` is idle — the publisher emits
    /// a final position, never an intermediate one (§4.5).
    pub async fn position_changed(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.device_state != DeviceState::Idle {
            return false;
        }
        if inner.saved_position != inner.position {
            inner.saved_position = inner.position;
            true
        } else {
            false
        }
    }

    pub async fn tilt_changed(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.device_state != DeviceState::Idle {
            return false;
        }
        if inner.saved_tilt != inner.tilt {
            inner.saved_tilt = inner.tilt;
            true
        } else {
            false
        }
    }

    pub async fn open_cover(self: &Arc<Self>) -> MoveOutcome {
        self.open_cover_inner(false).await
    }

    pub async fn close_cover(self: &Arc<Self>) -> MoveOutcome {
        let target_tilt = self.supports_set_tilt().then_some(0.0);
        self.start_move(Direction::Down, Some(0.0), target_tilt, false).await
    }

    /// `open_cover(100, calibrate=true)` bypasses the calibration-mode
    /// no-op guard; the public [`Self::open_cover`] never does.
    async fn open_cover_inner(self: &Arc<Self>, calibrate: bool) -> MoveOutcome {
        let target_tilt = self.supports_set_tilt().then_some(100.0);
        self.start_move(Direction::Up, Some(100.0), target_tilt, calibrate).await
    }

    pub async fn set_position(self: &Arc<Self>, target: f64) -> MoveOutcome {
        if !self.supports_set_position() {
            return MoveOutcome::NoOp;
        }
        let target = target.clamp(0.0, 100.0);
        let current = self.inner.lock().await.position.unwrap_or(0.0);
        if target > current {
            let target_tilt = self.supports_set_tilt().then_some(100.0);
            self.start_move(Direction::Up, Some(target), target_tilt, false).await
        } else if target < current {
            let target_tilt = self.supports_set_tilt().then_some(0.0);
            self.start_move(Direction::Down, Some(target), target_tilt, false).await
        } else {
            MoveOutcome::NoOp
        }
    }

    pub async fn set_tilt(self: &Arc<Self>, target: f64) -> MoveOutcome {
        if !self.supports_set_tilt() {
            return MoveOutcome::NoOp;
        }
        let target = target.clamp(0.0, 100.0);
        let current = self.inner.lock().await.tilt.unwrap_or(0.0);
        if target > current {
            self.start_move(Direction::Up, None, Some(target), false).await
        } else if target < current {
            self.start_move(Direction::Down, None, Some(target), false).await
        } else {
            MoveOutcome::NoOp
        }
    }

    /// If calibrating and not already in progress, forces a full open.
    pub async fn calibrate(self: &Arc<Self>) -> MoveOutcome {
        {
            let mut inner = self.inner.lock().await;
            if !inner.calibration_mode || inner.calibration_started {
                return MoveOutcome::NoOp;
            }
            inner.calibration_started = true;
        }
        self.open_cover_inner(true).await
    }

    /// §4.5 sequencing steps 1-7, shared by every command that starts a
    /// physical move.
    async fn start_move(
        self: &Arc<Self>,
        direction: Direction,
        target_position: Option<f64>,
        target_tilt: Option<f64>,
        calibrate: bool,
    ) -> MoveOutcome {
        if target_position.is_some() && self.cover_run_time.is_none() {
            return MoveOutcome::NoOp;
        }
        if target_position.is_none() && target_tilt.is_some() && self.tilt_change_time.is_none() {
            return MoveOutcome::NoOp;
        }

        let mut inner = self.inner.lock().await;

        if inner.calibration_mode && !calibrate {
            return MoveOutcome::NoOp;
        }

        // Step 1: finalise any move already in progress before starting a
        // new one.
        self.extrapolate_locked(&mut inner);

        if let Some(target) = target_position {
            let current = inner.position.unwrap_or(0.0);
            if (target == 0.0 || target == 100.0) && (current - target).abs() < f64::EPSILON {
                return MoveOutcome::NoOp;
            }
        }

        // Step 2: de-energise the opposite-direction output.
        let opposite = match direction {
            Direction::Up => &self.cover_down,
            Direction::Down => &self.cover_up,
        };
        if let Err(err) = opposite.set_state(false).await {
            log::error!("[COVERS] failed to de-energise {} for {}: {err}", opposite.feature_id, self.object_id);
            return MoveOutcome::Aborted;
        }

        // Step 3: cancel any pending stop timer.
        if let Some(handle) = inner.active_timer.take() {
            handle.abort();
        }

        // Step 4: energise the target-direction output.
        let active = match direction {
            Direction::Up => &self.cover_up,
            Direction::Down => &self.cover_down,
        };
        if let Err(err) = active.set_state(true).await {
            log::error!("[COVERS] failed to energise {} for {}: {err}", active.feature_id, self.object_id);
            return MoveOutcome::Aborted;
        }

        // Step 5.
        inner.device_state = match direction {
            Direction::Up => DeviceState::Open,
            Direction::Down => DeviceState::Close,
        };
        inner.state = match direction {
            Direction::Up => CoverState::Opening,
            Direction::Down => CoverState::Closing,
        };
        inner.direction = Some(direction);
        inner.timer_start = Some(Instant::now());

        // Step 6: compute run-time and schedule the stop timer.
        let run_time = self.compute_run_time(&inner, target_position, target_tilt);
        let Some(run_time) = run_time else {
            return MoveOutcome::NoOp;
        };

        let cover = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(run_time.max(0.0))).await;
            cover.stop_cover().await;
        });
        inner.active_timer = Some(handle);

        drop(inner);

        // Step 7: the file's absence means "in motion".
        position_file::delete_position(&self.position_file).await;

        MoveOutcome::Started(run_time)
    }

    /// `run_time = |target − current| × cover_run_time / 100`, biased by
    /// 5% of `cover_run_time` for a full-travel target so the motor
    /// reaches the physical end-stop, then raised to `tilt_change_time` if
    /// a tilt change is also in flight. Driven purely by tilt when this
    /// move has no position target (`set_tilt`).
    fn compute_run_time(&self, inner: &CoverInner, target_position: Option<f64>, target_tilt: Option<f64>) -> Option<f64> {
        if let Some(target) = target_position {
            let cover_run_time = self.cover_run_time?;
            let current = inner.position.unwrap_or(0.0);
            let mut run_time = (target - current).abs() * cover_run_time / 100.0;
            if target == 0.0 || target == 100.0 {
                run_time += 0.05 * cover_run_time;
            }
            if let (Some(tilt_change_time), Some(_)) = (self.tilt_change_time, target_tilt) {
                run_time = run_time.max(tilt_change_time);
            }
            Some(run_time)
        } else {
            let target = target_tilt?;
            let tilt_change_time = self.tilt_change_time?;
            let current = inner.tilt.unwrap_or(0.0);
            Some((target - current).abs() * tilt_change_time / 100.0)
        }
    }

    /// De-energises both outputs (down first, then up), finalises
    /// position/tilt, and persists them. When calibrating, only finalises
    /// calibration if position reached 100; otherwise resets to 0 and
    /// keeps calibration mode on for a retry.
    pub async fn stop_cover(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;

        self.extrapolate_locked(&mut inner);

        if let Some(handle) = inner.active_timer.take() {
            handle.abort();
        }

        if let Err(err) = self.cover_down.set_state(false).await {
            log::error!("[COVERS] failed to de-energise {} for {}: {err}", self.cover_down.feature_id, self.object_id);
        }
        if let Err(err) = self.cover_up.set_state(false).await {
            log::error!("[COVERS] failed to de-energise {} for {}: {err}", self.cover_up.feature_id, self.object_id);
        }

        if inner.calibration_mode {
            let position = inner.position.unwrap_or(0.0);
            if position >= 100.0 {
                inner.calibration_mode = false;
                inner.calibration_started = false;
                inner.position = Some(100.0);
                if self.supports_set_tilt() {
                    inner.tilt = Some(100.0);
                }
            } else {
                inner.position = Some(0.0);
                if self.supports_set_tilt() {
                    inner.tilt = Some(0.0);
                }
                inner.calibration_started = false;
            }
        }

        let position = inner.position.unwrap_or(0.0);
        inner.state = CoverState::from_position(position);
        inner.device_state = DeviceState::Idle;
        inner.direction = None;

        let tilt = inner.tilt.unwrap_or(0.0);
        drop(inner);

        position_file::write_position(&self.position_file, position, tilt).await;
    }

    /// §4.5 step 1: extrapolates position/tilt from the elapsed time
    /// since the current move started, clamps to [0,100], and consumes
    /// `timer_start` so a repeated call is a no-op rather than
    /// double-applying the same elapsed interval.
    fn extrapolate_locked(&self, inner: &mut CoverInner) {
        let Some(timer_start) = inner.timer_start.take() else {
            return;
        };
        let Some(direction) = inner.direction else {
            return;
        };

        let elapsed = timer_start.elapsed().as_secs_f64();
        let sign = match direction {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        };

        if let Some(cover_run_time) = self.cover_run_time.filter(|t| *t > 0.0) {
            let fraction = (elapsed / cover_run_time).clamp(0.0, 1.0);
            let current = inner.position.unwrap_or(0.0);
            inner.position = Some((current + sign * fraction * 100.0).clamp(0.0, 100.0));
        }

        if self.supports_set_tilt() {
            if let Some(tilt_change_time) = self.tilt_change_time.filter(|t| *t > 0.0) {
                let fraction = (elapsed / tilt_change_time).clamp(0.0, 1.0);
                let current = inner.tilt.unwrap_or(0.0);
                inner.tilt = Some((current + sign * fraction * 100.0).clamp(0.0, 100.0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use unipi_config::FeatureType;
    use unipi_modbus::{Facade, RegisterCache};

    use super::*;

    async fn digital(id: &str, val_coil: u16, facade: Arc<Facade>, cache: Arc<RegisterCache>) -> Arc<DigitalFeature> {
        Arc::new(DigitalFeature::new(
            id.to_string(),
            None,
            id.to_string(),
            None,
            None,
            None,
            false,
            FeatureType::Ro,
            0,
            Some(val_coil),
            0,
            None,
            cache,
            facade,
        ))
    }

    async fn fresh_cover(device_class: CoverDeviceClass, temp: &tempfile::TempDir) -> (Arc<Cover>, Arc<unipi_modbus::fake::FakeTransport>) {
        let tcp = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let rtu = Arc::new(unipi_modbus::fake::FakeTransport::new());
        let facade = Arc::new(Facade::new(tcp.clone(), rtu, 9600));
        let cache = Arc::new(RegisterCache::new());

        let up = digital("ro_2_01", 100, facade.clone(), cache.clone()).await;
        let down = digital("ro_2_02", 101, facade.clone(), cache.clone()).await;

        let cover = Cover::load(
            "blind1".into(),
            "Blind 1".into(),
            None,
            device_class,
            Some(30.0),
            Some(1.5),
            up,
            down,
            temp.path().join("pos"),
        )
        .await;
        (cover, tcp)
    }

    #[tokio::test]
    async fn missing_position_file_forces_calibration_mode() {
        let temp = tempfile::tempdir().unwrap();
        let (cover, _tcp) = fresh_cover(CoverDeviceClass::Blind, &temp).await;
        assert!(cover.is_calibrating().await);
        assert_eq!(cover.position().await, None);
    }

    #[tokio::test]
    async fn open_cover_energises_up_and_not_down() {
        let temp = tempfile::tempdir().unwrap();
        let (cover, tcp) = fresh_cover(CoverDeviceClass::Blind, &temp).await;

        // calibrate() first so we're out of calibration mode's no-op guard.
        let outcome = cover.calibrate().await;
        assert!(matches!(outcome, MoveOutcome::Started(_)));
        assert_eq!(tcp.coil(0, 100), Some(true));
        assert_eq!(tcp.coil(0, 101), Some(false));
        assert!(cover.is_opening().await);
    }

    #[tokio::test]
    async fn stop_cover_deenergises_both_outputs() {
        let temp = tempfile::tempdir().unwrap();
        let (cover, tcp) = fresh_cover(CoverDeviceClass::Blind, &temp).await;
        cover.calibrate().await;
        cover.stop_cover().await;
        assert_eq!(tcp.coil(0, 100), Some(false));
        assert_eq!(tcp.coil(0, 101), Some(false));
        assert!(!cover.is_opening().await);
        assert!(!cover.is_closing().await);
    }

    #[tokio::test]
    async fn calibration_stop_below_100_keeps_calibration_mode_for_retry() {
        let temp = tempfile::tempdir().unwrap();
        let (cover, _tcp) = fresh_cover(CoverDeviceClass::Blind, &temp).await;
        cover.calibrate().await;
        // Stop immediately: elapsed time is effectively zero, so position
        // never reaches 100 and calibration must retry.
        cover.stop_cover().await;
        assert!(cover.is_calibrating().await);
        assert_eq!(cover.position().await, Some(0.0));

        let retried = cover.calibrate().await;
        assert!(matches!(retried, MoveOutcome::Started(_)));
    }

    #[tokio::test]
    async fn set_position_is_noop_when_already_at_target() {
        let temp = tempfile::tempdir().unwrap();
        let (cover, _tcp) = fresh_cover(CoverDeviceClass::Blind, &temp).await;

        tokio::time::pause();
        let outcome = cover.calibrate().await;
        assert!(matches!(outcome, MoveOutcome::Started(_)));
        tokio::time::advance(Duration::from_secs(32)).await;
        tokio::task::yield_now().await;
        assert_eq!(cover.position().await, Some(100.0));

        let outcome = cover.set_position(100.0).await;
        assert_eq!(outcome, MoveOutcome::NoOp);
    }

    #[tokio::test]
    async fn roller_shutter_rejects_set_position_and_set_tilt() {
        let temp = tempfile::tempdir().unwrap();
        let (cover, _tcp) = fresh_cover(CoverDeviceClass::RollerShutter, &temp).await;
        assert_eq!(cover.set_position(50.0).await, MoveOutcome::NoOp);
        assert_eq!(cover.set_tilt(50.0).await, MoveOutcome::NoOp);
    }

    #[tokio::test]
    async fn state_changed_is_true_once_per_transition() {
        let temp = tempfile::tempdir().unwrap();
        let (cover, _tcp) = fresh_cover(CoverDeviceClass::Blind, &temp).await;
        assert!(cover.state_changed().await);
        assert!(!cover.state_changed().await);
        cover.calibrate().await;
        assert!(cover.state_changed().await);
        assert!(!cover.state_changed().await);
    }

    #[tokio::test]
    async fn position_changed_is_suppressed_while_moving() {
        let temp = tempfile::tempdir().unwrap();
        let (cover, _tcp) = fresh_cover(CoverDeviceClass::Blind, &temp).await;
        cover.position_changed().await; // clear the initial unset->None transition
        cover.calibrate().await;
        assert!(!cover.position_changed().await, "still moving, shouldn't report a change yet");
    }
}
