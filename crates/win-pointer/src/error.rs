//! Error types and result alias for the win-pointer crate.
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
    /// The pointer-suppression hook could not be installed.
    #[error("Pointer suppression hook failed to install")]
    SuppressionInstall,
    /// The simulated input could not be delivered.
    #[error("Input injection failed")]
    Inject,
}
