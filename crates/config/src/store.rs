//! The observable configuration store and its persisted record.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{Change, HotkeyRole, Point, Result, defaults, error::Error};

/// The flat persisted record: one key per tunable.
///
/// Intervals are stored in milliseconds. Deserialization is lenient (see
/// [`Settings::from_value`]), so this struct's own serde derive is only used
/// on the write path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Executable name of the target process (matched case-insensitively).
    pub target_exe: String,
    /// Scan code toggling the pin.
    pub activate_scan_code: u32,
    /// Scan code releasing the pin into cam mode.
    pub deactivate_scan_code: u32,
    /// Scan code translated into a mouse button during cam mode.
    pub translate_scan_code: u32,
    /// First cancel scan code.
    pub cancel_a_scan_code: u32,
    /// Second cancel scan code.
    pub cancel_b_scan_code: u32,
    /// Where the cursor is held while pinned.
    pub frozen_point: Point,
    /// Where the cursor is parked when the pin is released.
    pub unfrozen_point: Point,
    /// Foreground-process poll interval, in milliseconds.
    pub focus_poll_ms: u64,
    /// Cursor re-assert interval, in milliseconds.
    pub position_poll_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_exe: defaults::TARGET_EXE.to_string(),
            activate_scan_code: defaults::ACTIVATE_SC,
            deactivate_scan_code: defaults::DEACTIVATE_SC,
            translate_scan_code: defaults::TRANSLATE_SC,
            cancel_a_scan_code: defaults::CANCEL_A_SC,
            cancel_b_scan_code: defaults::CANCEL_B_SC,
            frozen_point: Point::new(defaults::FROZEN_POINT.0, defaults::FROZEN_POINT.1),
            unfrozen_point: Point::new(defaults::UNFROZEN_POINT.0, defaults::UNFROZEN_POINT.1),
            focus_poll_ms: defaults::FOCUS_POLL_MS,
            position_poll_ms: defaults::POSITION_POLL_MS,
        }
    }
}

/// Read a string field, falling back to `default` when absent or invalid.
fn field_str(obj: &Value, key: &str, default: &str) -> String {
    match obj.get(key) {
        None => default.to_string(),
        Some(v) => match v.as_str() {
            Some(s) => s.to_string(),
            None => {
                warn!(key, "invalid value in persisted config; using default");
                default.to_string()
            }
        },
    }
}

/// Read a scan-code field, falling back to `default` when absent or invalid.
fn field_scan(obj: &Value, key: &str, default: u32) -> u32 {
    match obj.get(key) {
        None => default,
        Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) => n,
            None => {
                warn!(key, "invalid value in persisted config; using default");
                default
            }
        },
    }
}

/// Read a point field, falling back to `default` when absent or invalid.
fn field_point(obj: &Value, key: &str, default: Point) -> Point {
    match obj.get(key) {
        None => default,
        Some(v) => match serde_json::from_value::<Point>(v.clone()) {
            Ok(p) => p,
            Err(_) => {
                warn!(key, "invalid value in persisted config; using default");
                default
            }
        },
    }
}

/// Read a strictly positive millisecond interval, falling back to `default`
/// when absent, invalid, or zero.
fn field_interval(obj: &Value, key: &str, default: u64) -> u64 {
    match obj.get(key) {
        None => default,
        Some(v) => match v.as_u64() {
            Some(n) if n > 0 => n,
            _ => {
                warn!(key, "invalid value in persisted config; using default");
                default
            }
        },
    }
}

impl Settings {
    /// Build settings from a parsed JSON value, substituting the per-field
    /// default for every missing or invalid entry.
    pub fn from_value(value: &Value) -> Self {
        let d = Self::default();
        Self {
            target_exe: field_str(value, "target_exe", &d.target_exe),
            activate_scan_code: field_scan(value, "activate_scan_code", d.activate_scan_code),
            deactivate_scan_code: field_scan(value, "deactivate_scan_code", d.deactivate_scan_code),
            translate_scan_code: field_scan(value, "translate_scan_code", d.translate_scan_code),
            cancel_a_scan_code: field_scan(value, "cancel_a_scan_code", d.cancel_a_scan_code),
            cancel_b_scan_code: field_scan(value, "cancel_b_scan_code", d.cancel_b_scan_code),
            frozen_point: field_point(value, "frozen_point", d.frozen_point),
            unfrozen_point: field_point(value, "unfrozen_point", d.unfrozen_point),
            focus_poll_ms: field_interval(value, "focus_poll_ms", d.focus_poll_ms),
            position_poll_ms: field_interval(value, "position_poll_ms", d.position_poll_ms),
        }
    }

    fn scan_code(&self, role: HotkeyRole) -> u32 {
        match role {
            HotkeyRole::Activate => self.activate_scan_code,
            HotkeyRole::Deactivate => self.deactivate_scan_code,
            HotkeyRole::Translate => self.translate_scan_code,
            HotkeyRole::CancelA => self.cancel_a_scan_code,
            HotkeyRole::CancelB => self.cancel_b_scan_code,
        }
    }

    fn scan_code_mut(&mut self, role: HotkeyRole) -> &mut u32 {
        match role {
            HotkeyRole::Activate => &mut self.activate_scan_code,
            HotkeyRole::Deactivate => &mut self.deactivate_scan_code,
            HotkeyRole::Translate => &mut self.translate_scan_code,
            HotkeyRole::CancelA => &mut self.cancel_a_scan_code,
            HotkeyRole::CancelB => &mut self.cancel_b_scan_code,
        }
    }
}

/// Observer callback invoked for every genuine mutation.
type Observer = Arc<dyn Fn(&Change) + Send + Sync>;

/// Process-wide configuration store.
///
/// Reads take a short read lock and may run concurrently from any thread.
/// Each setter compares the old value, applies the write, and fans the
/// [`Change`] out to every observer before returning; the `update_gate`
/// serializes the whole mutate-and-notify sequence so observer invocations
/// for one mutation never interleave with another.
pub struct ConfigStore {
    settings: RwLock<Settings>,
    observers: Mutex<Vec<Observer>>,
    update_gate: Mutex<()>,
}

impl ConfigStore {
    /// Create a store from explicit settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            observers: Mutex::new(Vec::new()),
            update_gate: Mutex::new(()),
        }
    }

    /// Load a store from `path`.
    ///
    /// Never fails: a missing file means defaults, a malformed file is
    /// logged and means defaults, and individually invalid fields fall back
    /// per field.
    pub fn load(path: &Path) -> Self {
        let settings = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => {
                    info!(path = %path.display(), "loaded configuration");
                    Settings::from_value(&value)
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "malformed config; using defaults");
                    Settings::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file; using defaults");
                Settings::default()
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read config; using defaults");
                Settings::default()
            }
        };
        Self::new(settings)
    }

    /// Write the current settings to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.snapshot())?;
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(|source| Error::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, text).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Register an observer for all future mutations.
    ///
    /// Observers must be fast and non-blocking: they run on whichever thread
    /// performed the mutation, while that mutation holds the update gate.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.observers.lock().push(Arc::new(observer));
    }

    /// Copy of the full current settings.
    pub fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Current target executable name.
    pub fn target_exe(&self) -> String {
        self.settings.read().target_exe.clone()
    }

    /// Current scan code bound to `role`.
    pub fn scan_code(&self, role: HotkeyRole) -> u32 {
        self.settings.read().scan_code(role)
    }

    /// Where the cursor is held while pinned.
    pub fn frozen_point(&self) -> Point {
        self.settings.read().frozen_point
    }

    /// Where the cursor is parked when the pin is released.
    pub fn unfrozen_point(&self) -> Point {
        self.settings.read().unfrozen_point
    }

    /// Foreground poll interval.
    pub fn focus_poll(&self) -> Duration {
        Duration::from_millis(self.settings.read().focus_poll_ms)
    }

    /// Cursor re-assert interval.
    pub fn position_poll(&self) -> Duration {
        Duration::from_millis(self.settings.read().position_poll_ms)
    }

    /// Set the target executable name.
    pub fn set_target_exe<S: Into<String>>(&self, value: S) {
        let new = value.into();
        let _gate = self.update_gate.lock();
        let old = {
            let mut s = self.settings.write();
            if s.target_exe == new {
                return;
            }
            std::mem::replace(&mut s.target_exe, new.clone())
        };
        self.notify(&Change::TargetExe { old, new });
    }

    /// Rebind a hotkey role to a new scan code.
    pub fn set_scan_code(&self, role: HotkeyRole, code: u32) {
        let _gate = self.update_gate.lock();
        let old = {
            let mut s = self.settings.write();
            let slot = s.scan_code_mut(role);
            if *slot == code {
                return;
            }
            std::mem::replace(slot, code)
        };
        self.notify(&Change::ScanCode {
            role,
            old,
            new: code,
        });
    }

    /// Set the pinned cursor position.
    pub fn set_frozen_point(&self, point: Point) {
        let _gate = self.update_gate.lock();
        let old = {
            let mut s = self.settings.write();
            if s.frozen_point == point {
                return;
            }
            std::mem::replace(&mut s.frozen_point, point)
        };
        self.notify(&Change::FrozenPoint { old, new: point });
    }

    /// Set the release cursor position.
    pub fn set_unfrozen_point(&self, point: Point) {
        let _gate = self.update_gate.lock();
        let old = {
            let mut s = self.settings.write();
            if s.unfrozen_point == point {
                return;
            }
            std::mem::replace(&mut s.unfrozen_point, point)
        };
        self.notify(&Change::UnfrozenPoint { old, new: point });
    }

    /// Set the focus poll interval. Zero intervals are rejected.
    pub fn set_focus_poll(&self, interval: Duration) {
        if interval.is_zero() {
            warn!("ignoring zero focus poll interval");
            return;
        }
        let ms = interval.as_millis().min(u128::from(u64::MAX)) as u64;
        let _gate = self.update_gate.lock();
        let old = {
            let mut s = self.settings.write();
            if s.focus_poll_ms == ms {
                return;
            }
            std::mem::replace(&mut s.focus_poll_ms, ms)
        };
        self.notify(&Change::FocusPoll {
            old: Duration::from_millis(old),
            new: Duration::from_millis(ms),
        });
    }

    /// Set the position re-assert interval. Zero intervals are rejected.
    pub fn set_position_poll(&self, interval: Duration) {
        if interval.is_zero() {
            warn!("ignoring zero position poll interval");
            return;
        }
        let ms = interval.as_millis().min(u128::from(u64::MAX)) as u64;
        let _gate = self.update_gate.lock();
        let old = {
            let mut s = self.settings.write();
            if s.position_poll_ms == ms {
                return;
            }
            std::mem::replace(&mut s.position_poll_ms, ms)
        };
        self.notify(&Change::PositionPoll {
            old: Duration::from_millis(old),
            new: Duration::from_millis(ms),
        });
    }

    /// Invoke every observer for one mutation. Caller holds the update gate.
    fn notify(&self, change: &Change) {
        let observers: Vec<Observer> = self.observers.lock().clone();
        for obs in observers {
            obs(change);
        }
    }
}

/// Register the save-on-change observer: every mutation is written back to
/// `path`. A failed write is logged; the in-memory value is retained.
pub fn attach_autosave(store: &Arc<ConfigStore>, path: PathBuf) {
    let weak: Weak<ConfigStore> = Arc::downgrade(store);
    store.subscribe(move |change| {
        let Some(store) = weak.upgrade() else {
            return;
        };
        info!(field = change.field(), "saving config");
        if let Err(err) = store.save(&path) {
            warn!(%err, "config write-back failed; keeping value in memory");
        }
    });
}
