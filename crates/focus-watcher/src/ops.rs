//! Foreground-query trait with production and mock implementations.

use std::sync::Arc;

use parking_lot::Mutex;

/// Trait abstraction over the foreground-process query.
pub trait ForegroundOps: Send + Sync {
    /// Executable file name of the process owning the foreground window,
    /// or `None` when the query fails at any step.
    fn foreground_exe(&self) -> Option<String>;
}

/// Production implementation backed by Win32.
#[cfg(target_os = "windows")]
pub struct RealForegroundOps;

#[cfg(target_os = "windows")]
impl ForegroundOps for RealForegroundOps {
    fn foreground_exe(&self) -> Option<String> {
        crate::sys::foreground_exe()
    }
}

/// Simple mock implementation for tests: reports whatever name was last set.
#[derive(Clone, Default)]
pub struct MockForegroundOps {
    exe: Arc<Mutex<Option<String>>>,
}

impl MockForegroundOps {
    /// Create a mock with no foreground process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reported executable name; `None` simulates a failed query.
    pub fn set_foreground(&self, exe: Option<&str>) {
        *self.exe.lock() = exe.map(str::to_string);
    }
}

impl ForegroundOps for MockForegroundOps {
    fn foreground_exe(&self) -> Option<String> {
        self.exe.lock().clone()
    }
}
