//! The polling watcher and its edge-callback plumbing.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use config::ConfigStore;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::ops::ForegroundOps;

/// Edge callback. Runs on the watcher's poll task and must not block.
pub type FocusCallback = Arc<dyn Fn() + Send + Sync>;

struct WatcherInner {
    ops: Arc<dyn ForegroundOps>,
    config: Arc<ConfigStore>,
    /// Cached target name; swapped by `update_config`.
    target: Mutex<String>,
    interval: Mutex<Duration>,
    focused: AtomicBool,
    on_gain: FocusCallback,
    on_loss: FocusCallback,
}

/// Polls the foreground process and reports focus edges for the configured
/// target executable.
#[derive(Clone)]
pub struct FocusWatcher {
    inner: Arc<WatcherInner>,
}

impl FocusWatcher {
    /// Create a watcher. `on_gain`/`on_loss` fire once per transition.
    pub fn new(
        config: Arc<ConfigStore>,
        ops: Arc<dyn ForegroundOps>,
        on_gain: FocusCallback,
        on_loss: FocusCallback,
    ) -> Self {
        let target = config.target_exe();
        let interval = config.focus_poll();
        Self {
            inner: Arc::new(WatcherInner {
                ops,
                config,
                target: Mutex::new(target),
                interval: Mutex::new(interval),
                focused: AtomicBool::new(false),
                on_gain,
                on_loss,
            }),
        }
    }

    /// Whether the target process currently has foreground focus, as of the
    /// last poll.
    pub fn is_focused(&self) -> bool {
        self.inner.focused.load(Ordering::SeqCst)
    }

    /// Re-read the target name and poll interval from the store.
    ///
    /// The reported focus state is deliberately left alone: the next poll
    /// re-evaluates against the new name and only emits an edge if the
    /// comparison result genuinely changed.
    pub fn update_config(&self) {
        let target = self.inner.config.target_exe();
        let interval = self.inner.config.focus_poll();
        debug!(%target, ?interval, "focus watcher reconfigured");
        *self.inner.target.lock() = target;
        *self.inner.interval.lock() = interval;
    }

    /// Run one poll: query, compare, and fire an edge if the state changed.
    pub fn poll_once(&self) {
        let target = self.inner.target.lock().clone();
        let focused_now = match self.inner.ops.foreground_exe() {
            Some(name) => !target.is_empty() && name.eq_ignore_ascii_case(&target),
            // Failed queries count as unfocused, never as errors.
            None => false,
        };
        let was = self.inner.focused.swap(focused_now, Ordering::SeqCst);
        if was == focused_now {
            return;
        }
        if focused_now {
            debug!(%target, "focus gained");
            (self.inner.on_gain)();
        } else {
            debug!(%target, "focus lost");
            (self.inner.on_loss)();
        }
    }

    /// Spawn the poll loop on the current tokio runtime. The loop exits
    /// within one interval of `stop` being cancelled.
    pub fn start(&self, stop: CancellationToken) {
        let watcher = self.clone();
        tokio::spawn(async move {
            loop {
                let interval = *watcher.inner.interval.lock();
                tokio::select! {
                    _ = stop.cancelled() => {
                        trace!("focus watcher stopped");
                        return;
                    }
                    _ = tokio::time::sleep(interval) => watcher.poll_once(),
                }
            }
        });
    }
}
