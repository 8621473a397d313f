//! Error types and result alias for the win-hotkey crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying OS provided an error.
    #[error("OS error: {0}")]
    Os(String),
    /// The low-level keyboard hook could not be installed.
    #[error("Keyboard hook failed to install")]
    HookInstall,
    /// A hook manager already owns the process-wide keyboard hook.
    #[error("Keyboard hook manager already installed in this process")]
    AlreadyInstalled,
    /// No active registration exists for the provided id.
    #[error("Invalid registration id")]
    InvalidId,
    /// The real hook manager only runs on Windows.
    #[error("Global keyboard hooks are only supported on Windows")]
    Unsupported,
}
