//! Cursor pinning: hold the cursor at a fixed point and keep real pointer
//! input from fighting the pin.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use config::{ConfigStore, Point};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};
use win_pointer::PointerOps;

struct PinnerInner {
    ops: Arc<dyn PointerOps>,
    config: Arc<ConfigStore>,
    frozen: AtomicBool,
    frozen_point: Mutex<Point>,
    unfrozen_point: Mutex<Point>,
    interval: Mutex<Duration>,
}

/// Owns the freeze state of the cursor.
///
/// While frozen, pointer input is suppressed system-wide and a background
/// loop re-asserts the pinned position every `position_poll`, guarding
/// against anything (including the OS itself) nudging the cursor between
/// suppressed-event windows. `freeze` and `unfreeze` are idempotent and may
/// be called from the hook-callback thread: both are a flag flip, one
/// cursor move, and one suppression-hook transition.
#[derive(Clone)]
pub struct CursorPinner {
    inner: Arc<PinnerInner>,
}

impl CursorPinner {
    /// Create an unfrozen pinner reading its coordinates from the store.
    pub fn new(config: Arc<ConfigStore>, ops: Arc<dyn PointerOps>) -> Self {
        let frozen_point = config.frozen_point();
        let unfrozen_point = config.unfrozen_point();
        let interval = config.position_poll();
        Self {
            inner: Arc::new(PinnerInner {
                ops,
                config,
                frozen: AtomicBool::new(false),
                frozen_point: Mutex::new(frozen_point),
                unfrozen_point: Mutex::new(unfrozen_point),
                interval: Mutex::new(interval),
            }),
        }
    }

    /// Whether the cursor is currently pinned.
    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::SeqCst)
    }

    /// Pin the cursor: move it to the frozen point and suppress pointer
    /// input. No-op when already frozen.
    pub fn freeze(&self) {
        if self.inner.frozen.swap(true, Ordering::SeqCst) {
            return;
        }
        let point = *self.inner.frozen_point.lock();
        if let Err(err) = self.inner.ops.set_cursor_pos(point.x, point.y) {
            warn!(%err, "failed to move cursor to frozen point");
        }
        if let Err(err) = self.inner.ops.set_suppressed(true) {
            warn!(%err, "pointer suppression unavailable; pin is position-only");
        }
        info!(%point, "cursor pinned");
    }

    /// Release the pin: lift suppression, then park the cursor at the
    /// unfrozen point. No-op when not frozen.
    pub fn unfreeze(&self) {
        if !self.inner.frozen.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.inner.ops.set_suppressed(false) {
            warn!(%err, "failed to lift pointer suppression");
        }
        let point = *self.inner.unfrozen_point.lock();
        if let Err(err) = self.inner.ops.set_cursor_pos(point.x, point.y) {
            warn!(%err, "failed to move cursor to unfrozen point");
        }
        info!(%point, "cursor released");
    }

    /// Freeze when unfrozen, unfreeze when frozen.
    pub fn toggle(&self) {
        if self.is_frozen() {
            self.unfreeze();
        } else {
            self.freeze();
        }
    }

    /// Re-read both coordinate pairs and the re-assert interval.
    ///
    /// Never changes the freeze state; a live pin follows the new frozen
    /// point from the next re-assert tick.
    pub fn update_config(&self) {
        *self.inner.frozen_point.lock() = self.inner.config.frozen_point();
        *self.inner.unfrozen_point.lock() = self.inner.config.unfrozen_point();
        *self.inner.interval.lock() = self.inner.config.position_poll();
    }

    /// Spawn the position re-assert loop on the current tokio runtime. The
    /// loop exits within one interval of `stop` being cancelled.
    pub fn start(&self, stop: CancellationToken) {
        let pinner = self.clone();
        tokio::spawn(async move {
            loop {
                let interval = *pinner.inner.interval.lock();
                tokio::select! {
                    _ = stop.cancelled() => {
                        trace!("pinner loop stopped");
                        return;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if pinner.inner.frozen.load(Ordering::SeqCst) {
                            let point = *pinner.inner.frozen_point.lock();
                            if let Err(err) = pinner.inner.ops.set_cursor_pos(point.x, point.y) {
                                warn!(%err, "position re-assert failed");
                            }
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use config::Settings;
    use win_pointer::MockPointerOps;

    use super::*;

    fn pinner() -> (CursorPinner, MockPointerOps, Arc<ConfigStore>) {
        let config = Arc::new(ConfigStore::new(Settings::default()));
        let ops = MockPointerOps::new();
        let pinner = CursorPinner::new(config.clone(), Arc::new(ops.clone()));
        (pinner, ops, config)
    }

    #[test]
    fn freeze_is_idempotent() {
        let (pinner, ops, config) = pinner();
        pinner.freeze();
        pinner.freeze();

        let frozen = config.frozen_point();
        assert!(pinner.is_frozen());
        assert_eq!(ops.moves(), vec![(frozen.x, frozen.y)]);
        assert_eq!(ops.suppression_calls(), vec![true]);
    }

    #[test]
    fn unfreeze_is_idempotent() {
        let (pinner, ops, config) = pinner();
        pinner.unfreeze();
        assert!(ops.moves().is_empty());

        pinner.freeze();
        ops.clear_recorded();
        pinner.unfreeze();
        pinner.unfreeze();

        let unfrozen = config.unfrozen_point();
        assert_eq!(ops.moves(), vec![(unfrozen.x, unfrozen.y)]);
        assert_eq!(ops.suppression_calls(), vec![false]);
        assert!(!ops.suppressed());
    }

    #[test]
    fn toggle_alternates() {
        let (pinner, _ops, _config) = pinner();
        pinner.toggle();
        assert!(pinner.is_frozen());
        pinner.toggle();
        assert!(!pinner.is_frozen());
    }

    #[test]
    fn suppression_failure_still_tracks_freeze_state() {
        let (pinner, ops, _config) = pinner();
        ops.set_fail_suppression(true);
        pinner.freeze();
        assert!(pinner.is_frozen());
        assert!(!ops.suppressed());
    }

    #[test]
    fn reconfig_updates_points_without_touching_state() {
        let (pinner, ops, config) = pinner();
        pinner.freeze();
        ops.clear_recorded();

        config.set_frozen_point(Point::new(11, 22));
        config.set_unfrozen_point(Point::new(33, 44));
        pinner.update_config();
        assert!(pinner.is_frozen());

        pinner.unfreeze();
        assert_eq!(ops.moves(), vec![(33, 44)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reassert_loop_holds_position_while_frozen() {
        let (pinner, ops, config) = pinner();
        config.set_position_poll(Duration::from_millis(5));
        pinner.update_config();

        let stop = CancellationToken::new();
        pinner.start(stop.clone());

        // Unfrozen: the loop leaves the cursor alone.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(ops.moves().is_empty());

        pinner.freeze();
        ops.clear_recorded();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let frozen = config.frozen_point();
        let moves = ops.moves();
        assert!(moves.len() >= 2, "expected repeated re-asserts, got {moves:?}");
        assert!(moves.iter().all(|&m| m == (frozen.x, frozen.y)));

        stop.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        ops.clear_recorded();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(ops.moves().is_empty(), "loop kept running after stop");
    }
}
