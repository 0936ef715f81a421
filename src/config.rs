//! Accessor configuration.
//!
//! Each accessor context ([`LocalStorage`](crate::storage::LocalStorage),
//! [`SessionStorage`](crate::storage::SessionStorage),
//! [`Cookies`](crate::cookies::Cookies)) holds a *global default config*.
//! It is read whenever an item is bound to a key; changing it later does not
//! touch items that already exist.
//!
//! An [`ItemConfig`] carries per-item overrides: any field it sets wins over
//! the global default, and the prefix is consumed while computing the item's
//! effective key.
//!
//! # Examples
//!
//! ```rust
//! use gosub_persist::config::StorageConfig;
//! use time::Duration;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = StorageConfig::builder()
//!     .prefix("app")
//!     .ttl(Duration::hours(1))
//!     .version("2")
//!     .build()?;
//! assert_eq!(cfg.version.as_deref(), Some("2"));
//! # Ok(()) }
//! ```

use std::fmt;
use time::Duration;

use crate::errors::StorageError;
use crate::prefix::Prefix;

/// Global defaults for local storage items.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub prefix: Prefix,
    /// Time to live applied when an item writes.
    pub ttl: Option<Duration>,
    /// Version tag written with, and required on read of, an item.
    pub version: Option<String>,
}

impl StorageConfig {
    pub fn builder() -> StorageConfigBuilder {
        StorageConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StorageConfigBuilder {
    inner: StorageConfig,
}

impl StorageConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut StorageConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn prefix<P: Into<Prefix>>(self, p: P) -> Self { self.map(|c| c.prefix = p.into()) }
    pub fn ttl(self, ttl: Duration) -> Self { self.map(|c| c.ttl = Some(ttl)) }
    pub fn version<S: Into<String>>(self, v: S) -> Self { self.map(|c| c.version = Some(v.into())) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<StorageConfig, ConfigError> {
        validate_prefix(&self.inner.prefix)?;
        Ok(self.inner)
    }
}

/// Global defaults for session storage items.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub prefix: Prefix,
}

impl SessionConfig {
    pub fn new<P: Into<Prefix>>(prefix: P) -> Result<Self, ConfigError> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self { prefix })
    }
}

/// Global defaults for cookie items.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub prefix: Prefix,
    pub expire: Option<Duration>,
    pub path: Option<String>,
    pub secure: bool,
    pub domain: Option<String>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            prefix: Prefix::None,
            expire: None,
            path: Some("/".to_string()),
            secure: false,
            domain: None,
        }
    }
}

impl CookieConfig {
    pub fn builder() -> CookieConfigBuilder {
        CookieConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CookieConfigBuilder {
    inner: CookieConfig,
}

impl CookieConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut CookieConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn prefix<P: Into<Prefix>>(self, p: P) -> Self { self.map(|c| c.prefix = p.into()) }
    pub fn expire(self, d: Duration) -> Self { self.map(|c| c.expire = Some(d)) }
    pub fn path<S: Into<String>>(self, path: S) -> Self { self.map(|c| c.path = Some(path.into())) }
    pub fn secure(self, on: bool) -> Self { self.map(|c| c.secure = on) }
    pub fn domain<S: Into<String>>(self, domain: S) -> Self { self.map(|c| c.domain = Some(domain.into())) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<CookieConfig, ConfigError> {
        validate_prefix(&self.inner.prefix)?;
        if let Some(path) = &self.inner.path {
            if !path.starts_with('/') {
                return Err(ConfigError::RelativeCookiePath(path.clone()));
            }
        }
        Ok(self.inner)
    }
}

/// Per-item configuration: an optional prefix override plus the accessor's
/// own option set (`O`).
#[derive(Debug, Clone, Default)]
pub struct ItemConfig<O> {
    pub prefix: Option<Prefix>,
    pub options: O,
}

impl<O> ItemConfig<O> {
    pub fn new(options: O) -> Self {
        Self { prefix: None, options }
    }

    pub fn with_prefix<P: Into<Prefix>>(mut self, prefix: P) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Splits off the prefix, falling back to `default` when not overridden.
    pub(crate) fn take_prefix(self, default: &Prefix) -> (Prefix, O) {
        (self.prefix.unwrap_or_else(|| default.clone()), self.options)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone)]
pub enum ConfigError {
    EmptyPrefix,
    RelativeCookiePath(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyPrefix =>
                write!(f, "literal prefix is empty (use Prefix::None for unprefixed keys)"),
            ConfigError::RelativeCookiePath(p) =>
                write!(f, "cookie path {p:?} must start with '/'"),
        }
    }
}
impl std::error::Error for ConfigError {}

impl From<ConfigError> for StorageError {
    fn from(e: ConfigError) -> Self {
        StorageError::InvalidConfig(e.to_string())
    }
}

fn validate_prefix(p: &Prefix) -> Result<(), ConfigError> {
    match p {
        Prefix::Literal(s) if s.is_empty() => Err(ConfigError::EmptyPrefix),
        _ => Ok(()),
    }
}
