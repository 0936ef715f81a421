//! Local and session storage accessors.
//!
//! This module wraps a plain key/value [`StorageArea`] (the DOM `Storage`
//! shape: `get_item`, `set_item`, `remove_item`, `clear`) with typed,
//! prefixed accessors.
//!
//! # Concepts
//!
//! - **Local storage** — [`LocalStorage`] stores values in a JSON
//!   [`StoredEnvelope`] that can carry an expiry instant and a version tag.
//!   Reads evict expired or version-mismatched entries unless a hook decides
//!   otherwise.
//! - **Session storage** — [`SessionStorage`] stores bare `{value}` envelopes
//!   without expiry or versioning.
//!
//! Both contexts expose a "static" API taking explicit keys, and an item API
//! ([`LocalItem`], [`SessionItem`]) that binds one key, a default value and
//! the options resolved from the context's global defaults.
//!
//! # Available types
//!
//! - [`StorageArea`] — Trait for any storage backend.
//! - [`InMemoryArea`] — In-memory area, for session storage and tests.
//! - [`SqliteStore`] / [`SqliteArea`] — SQLite-backed persistent areas.
//! - [`NotifyingArea`] — Decorator publishing [`StorageEvent`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gosub_persist::config::ItemConfig;
//! use gosub_persist::storage::{AccessOptions, LocalStorage, SqliteStore};
//! use time::Duration;
//!
//! let db = SqliteStore::new("storage.db").unwrap();
//! let local = LocalStorage::new(Arc::new(db.area("local")));
//!
//! let token = local.item(
//!     "token",
//!     None::<String>,
//!     ItemConfig::new(AccessOptions::new().ttl(Duration::hours(12))),
//! );
//! token.set(&"secret".to_string()).unwrap();
//! ```
//!
//! # See also
//!
//! - [`Cookies`](crate::cookies::Cookies) — the cookie accessor.

/// Storage area module, defining the key/value storage interface.
pub mod area;
/// Persisted envelope and hook views.
pub mod envelope;
/// Event module, providing storage change events.
pub mod event;
/// Versioned, expiring local storage accessor.
pub mod local;
/// Change notification decorator.
pub mod notify;
/// Per-call options and resolution hooks.
pub mod options;
/// Plain session storage accessor.
pub mod session;

/// Storage area backends.
pub mod backends {
    /// In-memory storage area.
    pub mod in_memory;
    /// SQLite-backed storage areas.
    #[cfg(feature = "sqlite_store")]
    pub mod sqlite_store;
}

pub use area::StorageArea;
pub use backends::in_memory::InMemoryArea;
#[cfg(feature = "sqlite_store")]
pub use backends::sqlite_store::{SqliteArea, SqliteStore};
pub use envelope::{ExpiredEntry, Resolution, StoredEnvelope, VersionedEntry};
pub use event::{StorageEvent, StorageScope};
pub use local::{LocalItem, LocalStorage};
pub use notify::{NotifyingArea, Subscription};
pub use options::{AccessOptions, ExpiredHook, VersionMismatchHook};
pub use session::{SessionItem, SessionStorage};
