//! keyedge: edge-triggered hotkey channels.
//!
//! A [`Channel`] turns the raw, repeat-prone key-down/key-up stream for one
//! scan code into two clean edge events. A press is reported once per
//! physical hold (OS auto-repeat downs are swallowed at this layer and
//! never reach the caller), and a release is always reported and always
//! clears the held flag, even when no matching press was ever seen.
//!
//! Each channel binds to the scan code the Configuration Store holds for
//! its [`HotkeyRole`]. Rebinding on reconfiguration discards the previous
//! hook registration; a scan code of [`config::UNBOUND`] disables the
//! channel instead of erroring, and a failed registration is logged and
//! leaves the channel inactive until the next reconfiguration attempt.
//!
//! Edge callbacks return a [`Decision`] for the physical event. A channel
//! constructed with `force_suppress` (the cam-mode translate key) requests
//! OS-level suppression of both its down and up events regardless of the
//! callback outcome; all other channels pass events through unless the
//! callback says otherwise.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use config::{ConfigStore, HotkeyRole, UNBOUND};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use win_hotkey::{Decision, EventKind, HookApi, Registration};

/// Edge callback: invoked once per press or release edge, on the hook
/// thread. Must return promptly.
pub type EdgeCallback = Arc<dyn Fn() -> Decision + Send + Sync>;

struct ChannelInner {
    role: HotkeyRole,
    force_suppress: bool,
    config: Arc<ConfigStore>,
    api: Arc<dyn HookApi>,
    held: AtomicBool,
    on_press: EdgeCallback,
    on_release: EdgeCallback,
    /// Live hook registration as (scan code, registration id).
    binding: Mutex<Option<(u32, u32)>>,
}

impl ChannelInner {
    /// Fold the channel's static suppression policy into a callback verdict.
    fn effective(&self, decision: Decision) -> Decision {
        if self.force_suppress {
            Decision::Suppress
        } else {
            decision
        }
    }

    /// Edge logic for one raw event from the hook.
    fn dispatch(&self, kind: EventKind) -> Decision {
        match kind {
            EventKind::KeyDown => {
                if self.held.swap(true, Ordering::SeqCst) {
                    // Auto-repeat while held: swallowed at this layer.
                    trace!(role = %self.role, "repeat down ignored");
                    return self.effective(Decision::Pass);
                }
                self.effective((self.on_press)())
            }
            EventKind::KeyUp => {
                // Defensive reset: a release always clears the hold and is
                // always reported, matched press or not.
                self.held.store(false, Ordering::SeqCst);
                self.effective((self.on_release)())
            }
        }
    }
}

/// One edge-triggered hotkey, bound by role to a scan code in the store.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl Channel {
    /// Create an unbound channel; call [`Channel::bind`] to register it.
    pub fn new(
        role: HotkeyRole,
        force_suppress: bool,
        config: Arc<ConfigStore>,
        api: Arc<dyn HookApi>,
        on_press: EdgeCallback,
        on_release: EdgeCallback,
    ) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                role,
                force_suppress,
                config,
                api,
                held: AtomicBool::new(false),
                on_press,
                on_release,
                binding: Mutex::new(None),
            }),
        }
    }

    /// The role this channel serves.
    pub fn role(&self) -> HotkeyRole {
        self.inner.role
    }

    /// Whether a hook registration is currently live.
    pub fn is_bound(&self) -> bool {
        self.inner.binding.lock().is_some()
    }

    /// Register with the hook for the store's current scan code.
    ///
    /// An unbound code disables the channel; a registration failure is
    /// logged and leaves it inactive until the next reconfiguration.
    pub fn bind(&self) {
        self.rebind_to(self.inner.config.scan_code(self.inner.role));
    }

    /// Re-read the scan code for this channel's role and rebind.
    ///
    /// A registration whose code is unchanged is kept rather than churned;
    /// otherwise the old registration is discarded before the new one is
    /// installed.
    pub fn update_config(&self) {
        let code = self.inner.config.scan_code(self.inner.role);
        if self.inner.binding.lock().is_some_and(|(c, _)| c == code) {
            return;
        }
        self.rebind_to(code);
    }

    /// Discard the hook registration, leaving the channel inert.
    pub fn unbind(&self) {
        let mut binding = self.inner.binding.lock();
        if let Some((_, id)) = binding.take()
            && let Err(err) = self.inner.api.unregister(id)
        {
            warn!(role = %self.inner.role, %err, "unregister failed");
        }
        self.inner.held.store(false, Ordering::SeqCst);
    }

    fn rebind_to(&self, code: u32) {
        let mut binding = self.inner.binding.lock();
        if let Some((_, id)) = binding.take()
            && let Err(err) = self.inner.api.unregister(id)
        {
            warn!(role = %self.inner.role, %err, "unregister failed");
        }
        // The physical key backing the old code may still be down; the new
        // binding starts from a clean hold state.
        self.inner.held.store(false, Ordering::SeqCst);

        if code == UNBOUND {
            debug!(role = %self.inner.role, "channel unbound; disabled");
            return;
        }

        let dispatcher = self.inner.clone();
        let handler: win_hotkey::Handler = Arc::new(move |kind| dispatcher.dispatch(kind));
        let reg = Registration {
            scan_code: code,
            label: format!("hotkey:{}", self.inner.role),
        };
        match self.inner.api.register(reg, handler) {
            Ok(id) => {
                debug!(role = %self.inner.role, scan_code = code, "channel bound");
                *binding = Some((code, id));
            }
            Err(err) => {
                warn!(role = %self.inner.role, scan_code = code, %err,
                    "hook registration failed; channel inactive until reconfigured");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use config::Settings;
    use win_hotkey::MockHookApi;

    use super::*;

    struct Harness {
        channel: Channel,
        api: MockHookApi,
        config: Arc<ConfigStore>,
        presses: Arc<AtomicUsize>,
        releases: Arc<AtomicUsize>,
    }

    fn harness(role: HotkeyRole, force_suppress: bool, callback_decision: Decision) -> Harness {
        let config = Arc::new(ConfigStore::new(Settings::default()));
        let api = MockHookApi::new();
        let presses = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let p = presses.clone();
        let r = releases.clone();
        let channel = Channel::new(
            role,
            force_suppress,
            config.clone(),
            Arc::new(api.clone()),
            Arc::new(move || {
                p.fetch_add(1, Ordering::SeqCst);
                callback_decision
            }),
            Arc::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
                callback_decision
            }),
        );
        channel.bind();
        Harness {
            channel,
            api,
            config,
            presses,
            releases,
        }
    }

    #[test]
    fn one_press_per_hold_under_auto_repeat() {
        let h = harness(HotkeyRole::Activate, false, Decision::Pass);
        let code = h.config.scan_code(HotkeyRole::Activate);

        h.api.send(code, EventKind::KeyDown);
        h.api.send(code, EventKind::KeyDown);
        h.api.send(code, EventKind::KeyDown);
        assert_eq!(h.presses.load(Ordering::SeqCst), 1);

        h.api.send(code, EventKind::KeyUp);
        assert_eq!(h.releases.load(Ordering::SeqCst), 1);

        // A fresh hold reports a fresh press.
        h.api.send(code, EventKind::KeyDown);
        assert_eq!(h.presses.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn release_without_press_is_still_reported() {
        let h = harness(HotkeyRole::CancelA, false, Decision::Pass);
        let code = h.config.scan_code(HotkeyRole::CancelA);

        h.api.send(code, EventKind::KeyUp);
        assert_eq!(h.releases.load(Ordering::SeqCst), 1);
        assert_eq!(h.presses.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn force_suppress_swallows_both_edges_and_repeats() {
        let h = harness(HotkeyRole::Translate, true, Decision::Pass);
        let code = h.config.scan_code(HotkeyRole::Translate);

        assert_eq!(h.api.send(code, EventKind::KeyDown), Decision::Suppress);
        // Repeats are not forwarded but are still hidden from other apps.
        assert_eq!(h.api.send(code, EventKind::KeyDown), Decision::Suppress);
        assert_eq!(h.api.send(code, EventKind::KeyUp), Decision::Suppress);
        assert_eq!(h.presses.load(Ordering::SeqCst), 1);
        assert_eq!(h.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pass_through_channel_honors_callback_decision() {
        let h = harness(HotkeyRole::Deactivate, false, Decision::Suppress);
        let code = h.config.scan_code(HotkeyRole::Deactivate);
        assert_eq!(h.api.send(code, EventKind::KeyDown), Decision::Suppress);

        let h2 = harness(HotkeyRole::Deactivate, false, Decision::Pass);
        let code2 = h2.config.scan_code(HotkeyRole::Deactivate);
        assert_eq!(h2.api.send(code2, EventKind::KeyDown), Decision::Pass);
    }

    #[test]
    fn unbound_code_disables_channel() {
        let h = harness(HotkeyRole::CancelB, false, Decision::Pass);
        h.config.set_scan_code(HotkeyRole::CancelB, UNBOUND);
        h.channel.update_config();
        assert!(!h.channel.is_bound());
        assert!(h.api.registered_codes().is_empty());
    }

    #[test]
    fn rebind_moves_registration_to_new_code() {
        let h = harness(HotkeyRole::Activate, false, Decision::Pass);
        let old = h.config.scan_code(HotkeyRole::Activate);

        h.config.set_scan_code(HotkeyRole::Activate, 75);
        h.channel.update_config();

        // Old code is dead, new code is live.
        h.api.send(old, EventKind::KeyDown);
        assert_eq!(h.presses.load(Ordering::SeqCst), 0);
        h.api.send(75, EventKind::KeyDown);
        assert_eq!(h.presses.load(Ordering::SeqCst), 1);
        assert_eq!(h.api.registered_codes(), vec![75]);
    }

    #[test]
    fn unchanged_code_keeps_registration() {
        let h = harness(HotkeyRole::Activate, false, Decision::Pass);
        let code = h.config.scan_code(HotkeyRole::Activate);
        h.channel.update_config();
        h.channel.update_config();
        assert_eq!(h.api.registered_codes(), vec![code]);
        h.api.send(code, EventKind::KeyDown);
        assert_eq!(h.presses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registration_failure_degrades_and_recovers() {
        let config = Arc::new(ConfigStore::new(Settings::default()));
        let api = MockHookApi::new();
        api.set_fail_register(true);
        let channel = Channel::new(
            HotkeyRole::Activate,
            false,
            config.clone(),
            Arc::new(api.clone()),
            Arc::new(|| Decision::Pass),
            Arc::new(|| Decision::Pass),
        );
        channel.bind();
        assert!(!channel.is_bound());

        // The next reconfiguration attempt re-registers.
        api.set_fail_register(false);
        config.set_scan_code(HotkeyRole::Activate, 80);
        channel.update_config();
        assert!(channel.is_bound());
        assert_eq!(api.registered_codes(), vec![80]);
    }

    #[test]
    fn rebind_resets_hold_state() {
        let h = harness(HotkeyRole::Activate, false, Decision::Pass);
        let old = h.config.scan_code(HotkeyRole::Activate);
        h.api.send(old, EventKind::KeyDown);

        h.config.set_scan_code(HotkeyRole::Activate, 75);
        h.channel.update_config();

        // First press of the new code is a fresh edge, not a repeat.
        h.api.send(75, EventKind::KeyDown);
        assert_eq!(h.presses.load(Ordering::SeqCst), 2);
    }
}
