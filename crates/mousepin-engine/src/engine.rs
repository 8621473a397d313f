//! The input orchestrator: five hotkey channels, the focus watcher, and the
//! cursor pinner wired into one mode state machine.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use config::{ConfigStore, HotkeyRole};
use focus_watcher::{ForegroundOps, FocusWatcher};
use keyedge::Channel;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use win_hotkey::{Decision, HookApi};
use win_pointer::{MouseButton, PointerOps};

use crate::pinner::CursorPinner;

/// The orchestrator's private mode state.
///
/// `cam_mode` selects whether the translate key is reinterpreted as a mouse
/// button; the two hold flags track one in-flight translated hold. All three
/// are written from the hook-callback thread and read from other threads,
/// hence atomics.
#[derive(Default)]
struct ModeState {
    cam_mode: AtomicBool,
    translated_down: AtomicBool,
    physically_down: AtomicBool,
}

/// Everything a key-edge handler needs, in one shareable bundle.
///
/// Centralizing the cross-key interaction here keeps each channel oblivious
/// of the others: this is the only place that reads more than one channel's
/// output.
struct Actions {
    watcher: FocusWatcher,
    pinner: CursorPinner,
    pointer: Arc<dyn PointerOps>,
    mode: ModeState,
}

impl Actions {
    /// Emit the simulated button release, logging on failure.
    fn release_button(&self) {
        if let Err(err) = self.pointer.button_up(MouseButton::Right) {
            warn!(%err, "simulated button release failed");
        }
    }

    /// Activate press: toggle the pin and drop out of cam mode. Focus-gated.
    fn activate_press(&self) -> Decision {
        if !self.watcher.is_focused() {
            debug!("activate ignored; target not focused");
            return Decision::Pass;
        }
        self.pinner.toggle();
        self.mode.cam_mode.store(false, Ordering::SeqCst);
        if self.mode.translated_down.swap(false, Ordering::SeqCst) {
            self.release_button();
        }
        Decision::Pass
    }

    /// Deactivate press: force the pin off and enter cam mode. Focus-gated.
    fn deactivate_press(&self) -> Decision {
        if !self.watcher.is_focused() {
            return Decision::Pass;
        }
        self.pinner.unfreeze();
        self.mode.cam_mode.store(true, Ordering::SeqCst);
        debug!("cam mode on");
        Decision::Pass
    }

    /// Translate press: becomes a simulated button press only while focused
    /// in cam mode; otherwise the key is left untouched.
    fn translate_press(&self) -> Decision {
        if !(self.watcher.is_focused() && self.mode.cam_mode.load(Ordering::SeqCst)) {
            return Decision::Pass;
        }
        self.mode.physically_down.store(true, Ordering::SeqCst);
        if let Err(err) = self.pointer.button_down(MouseButton::Right) {
            warn!(%err, "simulated button press failed");
        }
        self.mode.translated_down.store(true, Ordering::SeqCst);
        Decision::Suppress
    }

    /// Translate release: always clears the physical hold; releases the
    /// simulated button iff one is in flight.
    fn translate_release(&self) -> Decision {
        self.mode.physically_down.store(false, Ordering::SeqCst);
        if self.mode.translated_down.swap(false, Ordering::SeqCst) {
            self.release_button();
            Decision::Suppress
        } else {
            Decision::Pass
        }
    }

    /// Cancel press: force the pin on, leave cam mode, and settle any
    /// in-flight translated hold with at most one simulated release.
    fn cancel_press(&self) -> Decision {
        if !self.watcher.is_focused() {
            return Decision::Pass;
        }
        self.pinner.freeze();
        self.mode.cam_mode.store(false, Ordering::SeqCst);
        let translated = self.mode.translated_down.swap(false, Ordering::SeqCst);
        let physical = self.mode.physically_down.swap(false, Ordering::SeqCst);
        if translated || physical {
            self.release_button();
        }
        debug!("cancelled; cam mode off, pin forced on");
        Decision::Pass
    }
}

/// Coordinates hotkeys, focus, and the cursor pin.
///
/// Construct with [`Engine::new`], then drive with [`Engine::run`]. All
/// platform access is injected (hook, pointer, foreground query), so the
/// engine runs against mocks in tests and against Win32 in production.
pub struct Engine {
    config: Arc<ConfigStore>,
    actions: Arc<Actions>,
    channels: Vec<Channel>,
}

impl Engine {
    /// Wire up the full subsystem. No hooks are registered and no loops are
    /// started until [`Engine::run`].
    pub fn new(
        config: Arc<ConfigStore>,
        hook: Arc<dyn HookApi>,
        pointer: Arc<dyn PointerOps>,
        foreground: Arc<dyn ForegroundOps>,
    ) -> Self {
        let pinner = CursorPinner::new(config.clone(), pointer.clone());

        // Focus loss force-unfreezes unconditionally. Cam mode and the hold
        // flags are deliberately left alone so a refocus resumes where the
        // user left off.
        let pinner_on_loss = pinner.clone();
        let watcher = FocusWatcher::new(
            config.clone(),
            foreground,
            Arc::new(|| {}),
            Arc::new(move || pinner_on_loss.unfreeze()),
        );

        let actions = Arc::new(Actions {
            watcher,
            pinner,
            pointer,
            mode: ModeState::default(),
        });

        let channels = Self::build_channels(&config, &hook, &actions);

        // One broadcast reaches every dependent component; a channel whose
        // binding is unchanged keeps its registration.
        {
            let watcher = actions.watcher.clone();
            let pinner = actions.pinner.clone();
            let channels = channels.clone();
            config.subscribe(move |change| {
                debug!(field = change.field(), "reconfiguring components");
                watcher.update_config();
                pinner.update_config();
                for channel in &channels {
                    channel.update_config();
                }
            });
        }

        Self {
            config,
            actions,
            channels,
        }
    }

    /// Create the five channels, each forwarding its edges into `actions`.
    fn build_channels(
        config: &Arc<ConfigStore>,
        hook: &Arc<dyn HookApi>,
        actions: &Arc<Actions>,
    ) -> Vec<Channel> {
        let pass: keyedge::EdgeCallback = Arc::new(|| Decision::Pass);
        let mut channels = Vec::with_capacity(HotkeyRole::ALL.len());
        for role in HotkeyRole::ALL {
            let (force_suppress, on_press, on_release): (
                bool,
                keyedge::EdgeCallback,
                keyedge::EdgeCallback,
            ) = match role {
                HotkeyRole::Activate => {
                    let a = actions.clone();
                    (false, Arc::new(move || a.activate_press()), pass.clone())
                }
                HotkeyRole::Deactivate => {
                    let a = actions.clone();
                    (false, Arc::new(move || a.deactivate_press()), pass.clone())
                }
                // The translate key exists to be intercepted: both its edges
                // are swallowed at the OS level regardless of mode.
                HotkeyRole::Translate => {
                    let press = actions.clone();
                    let release = actions.clone();
                    (
                        true,
                        Arc::new(move || press.translate_press()),
                        Arc::new(move || release.translate_release()),
                    )
                }
                HotkeyRole::CancelA | HotkeyRole::CancelB => {
                    let a = actions.clone();
                    (false, Arc::new(move || a.cancel_press()), pass.clone())
                }
            };
            channels.push(Channel::new(
                role,
                force_suppress,
                config.clone(),
                hook.clone(),
                on_press,
                on_release,
            ));
        }
        channels
    }

    /// Register every hotkey channel with the hook.
    ///
    /// Called by [`Engine::run`]; exposed for tests that drive the state
    /// machine without the background loops.
    pub fn bind_channels(&self) {
        for channel in &self.channels {
            channel.bind();
        }
    }

    /// The cursor pinner, also exposed to the configuration surface for
    /// manual freeze/unfreeze/toggle.
    pub fn pinner(&self) -> &CursorPinner {
        &self.actions.pinner
    }

    /// The focus watcher.
    pub fn focus(&self) -> &FocusWatcher {
        &self.actions.watcher
    }

    /// Whether the translate key is currently reinterpreted as a button.
    pub fn cam_mode(&self) -> bool {
        self.actions.mode.cam_mode.load(Ordering::SeqCst)
    }

    /// Whether a simulated button press is currently in flight.
    pub fn translated_down(&self) -> bool {
        self.actions.mode.translated_down.load(Ordering::SeqCst)
    }

    /// Whether the translate key is physically held.
    pub fn physically_down(&self) -> bool {
        self.actions.mode.physically_down.load(Ordering::SeqCst)
    }

    /// Start every loop and hook, then idle until `stop` fires.
    ///
    /// On the way out the channels are unbound, the loops wind down within
    /// one poll interval, and the cursor is unconditionally unpinned.
    pub async fn run(&self, stop: CancellationToken) {
        self.actions.pinner.start(stop.child_token());
        self.actions.watcher.start(stop.child_token());
        self.bind_channels();

        let snapshot = self.config.snapshot();
        info!(
            target_exe = %snapshot.target_exe,
            frozen = %self.config.frozen_point(),
            unfrozen = %self.config.unfrozen_point(),
            "ready; activate toggles the pin while the target is focused"
        );

        stop.cancelled().await;

        for channel in &self.channels {
            channel.unbind();
        }
        // Always clean up: never leave the cursor pinned behind a stopped
        // engine.
        self.actions.pinner.unfreeze();
        info!("stopped");
    }
}
