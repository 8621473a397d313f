use std::{sync::Arc, time::Duration};

use config::{ConfigStore, HotkeyRole, Settings};
use focus_watcher::MockForegroundOps;
use mousepin_engine::Engine;
use tokio_util::sync::CancellationToken;
use win_hotkey::{Decision, EventKind, MockHookApi};
use win_pointer::{MockPointerOps, MouseButton};

/// Test rig: an engine wired entirely to mocks, with channels bound.
struct Rig {
    engine: Engine,
    hook: MockHookApi,
    pointer: MockPointerOps,
    foreground: MockForegroundOps,
    config: Arc<ConfigStore>,
}

fn rig() -> Rig {
    let config = Arc::new(ConfigStore::new(Settings::default()));
    let hook = MockHookApi::new();
    let pointer = MockPointerOps::new();
    let foreground = MockForegroundOps::new();
    let engine = Engine::new(
        config.clone(),
        Arc::new(hook.clone()),
        Arc::new(pointer.clone()),
        Arc::new(foreground.clone()),
    );
    engine.bind_channels();
    Rig {
        engine,
        hook,
        pointer,
        foreground,
        config,
    }
}

impl Rig {
    /// Give the target process focus and let the watcher observe it.
    fn focus_target(&self) {
        self.foreground.set_foreground(Some(&self.config.target_exe()));
        self.engine.focus().poll_once();
        assert!(self.engine.focus().is_focused());
    }

    /// Take focus away and let the watcher observe the loss edge.
    fn lose_focus(&self) {
        self.foreground.set_foreground(Some("desktop.exe"));
        self.engine.focus().poll_once();
    }

    /// Press and release the key bound to `role`.
    fn tap(&self, role: HotkeyRole) {
        let code = self.config.scan_code(role);
        self.hook.send(code, EventKind::KeyDown);
        self.hook.send(code, EventKind::KeyUp);
    }

    fn press(&self, role: HotkeyRole) -> Decision {
        self.hook
            .send(self.config.scan_code(role), EventKind::KeyDown)
    }

    fn release(&self, role: HotkeyRole) -> Decision {
        self.hook
            .send(self.config.scan_code(role), EventKind::KeyUp)
    }

    fn right_downs(&self) -> usize {
        self.pointer.button_count(MouseButton::Right, true)
    }

    fn right_ups(&self) -> usize {
        self.pointer.button_count(MouseButton::Right, false)
    }
}

#[test]
fn activate_is_ignored_without_focus() {
    let rig = rig();
    rig.tap(HotkeyRole::Activate);
    assert!(!rig.engine.pinner().is_frozen());
    assert!(rig.pointer.moves().is_empty());
}

#[test]
fn activate_toggles_pin_while_focused() {
    let rig = rig();
    rig.focus_target();

    rig.tap(HotkeyRole::Activate);
    assert!(rig.engine.pinner().is_frozen());
    assert!(rig.pointer.suppressed());
    let frozen = rig.config.frozen_point();
    assert_eq!(rig.pointer.moves(), vec![(frozen.x, frozen.y)]);

    rig.tap(HotkeyRole::Activate);
    assert!(!rig.engine.pinner().is_frozen());
    assert!(!rig.pointer.suppressed());
}

#[test]
fn deactivate_unfreezes_and_enters_cam_mode() {
    let rig = rig();
    rig.focus_target();
    rig.tap(HotkeyRole::Activate);
    assert!(rig.engine.pinner().is_frozen());

    rig.tap(HotkeyRole::Deactivate);
    assert!(!rig.engine.pinner().is_frozen());
    assert!(rig.engine.cam_mode());
}

#[test]
fn translate_hold_becomes_one_button_hold_in_cam_mode() {
    let rig = rig();
    rig.focus_target();
    rig.tap(HotkeyRole::Deactivate);

    assert_eq!(rig.press(HotkeyRole::Translate), Decision::Suppress);
    assert_eq!(rig.right_downs(), 1);
    assert!(rig.engine.translated_down());
    assert!(rig.engine.physically_down());

    // Auto-repeat downs add nothing.
    rig.press(HotkeyRole::Translate);
    rig.press(HotkeyRole::Translate);
    assert_eq!(rig.right_downs(), 1);

    assert_eq!(rig.release(HotkeyRole::Translate), Decision::Suppress);
    assert_eq!(rig.right_ups(), 1);
    assert!(!rig.engine.translated_down());
    assert!(!rig.engine.physically_down());
}

#[test]
fn translate_outside_cam_mode_is_not_simulated() {
    let rig = rig();
    rig.focus_target();
    assert!(!rig.engine.cam_mode());

    // The channel still swallows the physical key, but no simulated press
    // occurs and no hold is tracked.
    assert_eq!(rig.press(HotkeyRole::Translate), Decision::Suppress);
    assert_eq!(rig.right_downs(), 0);
    assert!(!rig.engine.translated_down());
    rig.release(HotkeyRole::Translate);
    assert_eq!(rig.right_ups(), 0);
}

#[test]
fn translate_without_focus_is_not_simulated() {
    let rig = rig();
    rig.focus_target();
    rig.tap(HotkeyRole::Deactivate);
    rig.lose_focus();

    rig.press(HotkeyRole::Translate);
    assert_eq!(rig.right_downs(), 0);
    assert!(!rig.engine.translated_down());
}

#[test]
fn cancel_emits_exactly_one_release_for_an_inflight_hold() {
    let rig = rig();
    rig.focus_target();
    rig.tap(HotkeyRole::Deactivate);
    rig.press(HotkeyRole::Translate);
    assert!(rig.engine.translated_down());
    assert!(rig.engine.physically_down());

    rig.tap(HotkeyRole::CancelB);
    assert_eq!(rig.right_ups(), 1, "double-release guard must emit once");
    assert!(rig.engine.pinner().is_frozen());
    assert!(!rig.engine.cam_mode());
    assert!(!rig.engine.translated_down());
    assert!(!rig.engine.physically_down());

    // The physical key comes up later; nothing further is simulated.
    rig.release(HotkeyRole::Translate);
    assert_eq!(rig.right_ups(), 1);
}

#[test]
fn cancel_without_hold_emits_nothing() {
    let rig = rig();
    rig.focus_target();
    rig.tap(HotkeyRole::CancelA);
    assert!(rig.engine.pinner().is_frozen());
    assert_eq!(rig.right_ups(), 0);
}

#[test]
fn activate_deactivate_cancel_ends_frozen_and_idle() {
    let rig = rig();
    rig.focus_target();

    rig.tap(HotkeyRole::Activate);
    rig.press(HotkeyRole::Translate);
    rig.tap(HotkeyRole::Deactivate);
    rig.press(HotkeyRole::Translate);
    rig.tap(HotkeyRole::CancelA);

    assert!(rig.engine.pinner().is_frozen());
    assert!(!rig.engine.cam_mode());
    assert!(!rig.engine.translated_down());
    assert!(!rig.engine.physically_down());
}

#[test]
fn focus_loss_unfreezes_but_leaves_mode_alone() {
    let rig = rig();
    rig.focus_target();
    rig.tap(HotkeyRole::Activate);
    assert!(rig.engine.pinner().is_frozen());

    rig.lose_focus();
    assert!(!rig.engine.pinner().is_frozen());
    assert!(!rig.pointer.suppressed());
}

#[test]
fn focus_loss_keeps_cam_mode_and_hold_flags() {
    let rig = rig();
    rig.focus_target();
    rig.tap(HotkeyRole::Deactivate);
    rig.press(HotkeyRole::Translate);

    rig.lose_focus();
    // Explicit product decision: only the freeze is forced off.
    assert!(rig.engine.cam_mode());
    assert!(rig.engine.translated_down());
    assert!(rig.engine.physically_down());
}

#[test]
fn rebinding_activate_moves_the_trigger() {
    let rig = rig();
    rig.focus_target();
    let old = rig.config.scan_code(HotkeyRole::Activate);

    rig.config.set_scan_code(HotkeyRole::Activate, 82);

    // Old code is dead.
    rig.hook.send(old, EventKind::KeyDown);
    rig.hook.send(old, EventKind::KeyUp);
    assert!(!rig.engine.pinner().is_frozen());

    // New code triggers transition 1.
    rig.hook.send(82, EventKind::KeyDown);
    rig.hook.send(82, EventKind::KeyUp);
    assert!(rig.engine.pinner().is_frozen());
}

#[test]
fn reconfiguration_reaches_every_component_in_one_broadcast() {
    let rig = rig();
    rig.focus_target();

    rig.config.set_target_exe("other.exe");
    // The watcher compares against the new name on its next poll.
    rig.engine.focus().poll_once();
    assert!(!rig.engine.focus().is_focused());
}

#[tokio::test(flavor = "multi_thread")]
async fn run_unpins_cursor_on_stop() {
    let config = Arc::new(ConfigStore::new(Settings::default()));
    config.set_focus_poll(Duration::from_millis(5));
    config.set_position_poll(Duration::from_millis(5));
    let hook = MockHookApi::new();
    let pointer = MockPointerOps::new();
    let foreground = MockForegroundOps::new();
    foreground.set_foreground(Some(&config.target_exe()));

    let engine = Arc::new(Engine::new(
        config.clone(),
        Arc::new(hook.clone()),
        Arc::new(pointer.clone()),
        Arc::new(foreground.clone()),
    ));

    let stop = CancellationToken::new();
    let driver = {
        let config = config.clone();
        let hook = hook.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            // Wait for the loops to start and pick up focus.
            tokio::time::sleep(Duration::from_millis(40)).await;
            let code = config.scan_code(HotkeyRole::Activate);
            hook.send(code, EventKind::KeyDown);
            hook.send(code, EventKind::KeyUp);
            tokio::time::sleep(Duration::from_millis(20)).await;
            stop.cancel();
        })
    };

    engine.run(stop).await;
    driver.await.unwrap();

    assert!(!engine.pinner().is_frozen());
    assert!(!pointer.suppressed());
    // The pin really happened before shutdown released it.
    assert_eq!(pointer.suppression_calls(), vec![true, false]);
}
