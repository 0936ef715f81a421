//! Key prefixing.
//!
//! Every accessor can namespace its keys with a [`Prefix`]. A literal prefix
//! is joined to the raw key with a single underscore (`"app"` + `"token"` →
//! `"app_token"`); a transform receives the raw key and returns the final
//! storage key verbatim.
//!
//! No escaping is done: a raw key that already contains the separator may
//! collide with a prefixed key.

use std::fmt;
use std::sync::Arc;

/// Function turning a raw key into an effective storage key.
pub type KeyTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// How the effective storage key is derived from a raw key.
#[derive(Clone, Default)]
pub enum Prefix {
    /// Raw key is used as-is.
    #[default]
    None,
    /// `"{prefix}_{key}"`. An empty literal behaves like [`Prefix::None`].
    Literal(String),
    /// Caller-supplied mapping with full control over the result.
    Transform(KeyTransform),
}

impl Prefix {
    pub fn literal<S: Into<String>>(prefix: S) -> Self {
        Prefix::Literal(prefix.into())
    }

    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Prefix::Transform(Arc::new(f))
    }

    /// Applies this prefix to `raw_key`.
    pub fn apply(&self, raw_key: &str) -> String {
        compute_effective_key(raw_key, self)
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::None => f.write_str("None"),
            Prefix::Literal(p) => f.debug_tuple("Literal").field(p).finish(),
            Prefix::Transform(_) => f.write_str("Transform(<fn>)"),
        }
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::Literal(s.to_string())
    }
}

impl From<String> for Prefix {
    fn from(s: String) -> Self {
        Prefix::Literal(s)
    }
}

/// Computes the storage key for `raw_key` under `prefix`.
pub fn compute_effective_key(raw_key: &str, prefix: &Prefix) -> String {
    match prefix {
        Prefix::None => raw_key.to_string(),
        Prefix::Literal(p) if p.is_empty() => raw_key.to_string(),
        Prefix::Literal(p) => format!("{p}_{raw_key}"),
        Prefix::Transform(f) => f(raw_key),
    }
}
