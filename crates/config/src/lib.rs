//! Shared configuration store for mousepin.
//!
//! A single [`ConfigStore`] instance holds every tunable: the target
//! executable name, the five hotkey scan codes, the frozen/unfrozen cursor
//! coordinates, and the two poll intervals. The store is constructed once at
//! startup and handed to every consumer as an `Arc`; mutation happens only
//! through the typed setters, each of which notifies subscribed observers
//! with the field identity and the old/new values before returning.
//!
//! Persistence is a flat JSON record. Loading never fails: a missing or
//! malformed file falls back to defaults, and individually invalid fields
//! fall back per field.

mod defaults;
mod error;
mod store;
mod types;

pub use error::{Error, Result};
pub use store::{ConfigStore, Settings, attach_autosave};
pub use types::{Change, HotkeyRole, Point, UNBOUND};
