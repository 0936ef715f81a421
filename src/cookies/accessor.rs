//! The cookie accessor: a "static" API over a [`CookieDocument`] and a
//! key-bound [`CookieItem`].
//!
//! Cookie values are plain strings; a missing cookie reads as `""`.

use std::sync::{Arc, PoisonError, RwLock};

use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use super::cookie::format_http_date;
use super::document::CookieDocument;
use crate::config::{CookieConfig, ItemConfig};
use crate::errors::Result;
use crate::prefix::compute_effective_key;

/// Attributes written with a cookie. Unset fields are left out of the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieOptions {
    /// Lifetime from now. Zero is treated as unset.
    pub expire: Option<Duration>,
    pub path: Option<String>,
    pub secure: Option<bool>,
    pub domain: Option<String>,
}

/// Latest instant an HTTP date can carry (four-digit year).
const MAX_HTTP_DATE: OffsetDateTime = datetime!(9999-12-31 23:59:59 UTC);

/// `now + lifetime`, clamped to what an `expires` attribute can express.
fn expires_at(now: OffsetDateTime, lifetime: Duration) -> OffsetDateTime {
    match now.checked_add(lifetime) {
        Some(at) if at <= MAX_HTTP_DATE => at,
        Some(_) => MAX_HTTP_DATE,
        None if lifetime.is_negative() => OffsetDateTime::UNIX_EPOCH,
        None => MAX_HTTP_DATE,
    }
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expire(mut self, d: Duration) -> Self {
        self.expire = Some(d);
        self
    }

    pub fn path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn secure(mut self, on: bool) -> Self {
        self.secure = Some(on);
        self
    }

    pub fn domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub(crate) fn over_defaults(self, defaults: &CookieConfig) -> Self {
        Self {
            expire: self.expire.or(defaults.expire),
            path: self.path.or_else(|| defaults.path.clone()),
            secure: self.secure.or(Some(defaults.secure)),
            domain: self.domain.or_else(|| defaults.domain.clone()),
        }
    }

    /// Builds the `name=value; attr...` record for `key`.
    fn record(&self, key: &str, value: &str) -> String {
        let mut s = format!("{key}={value}");

        if let Some(expire) = self.expire.filter(|d| !d.is_zero()) {
            let at = expires_at(OffsetDateTime::now_utc(), expire);
            s.push_str(&format!("; expires={}", format_http_date(at)));
        }
        if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
            s.push_str(&format!("; path={path}"));
        }
        if self.secure == Some(true) {
            s.push_str("; secure");
        }
        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            s.push_str(&format!("; domain={domain}"));
        }
        s
    }
}

/// Cookie accessor context over one document.
#[derive(Clone)]
pub struct Cookies {
    document: Option<Arc<dyn CookieDocument>>,
    defaults: Arc<RwLock<CookieConfig>>,
}

impl std::fmt::Debug for Cookies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cookies")
            .field("available", &self.document.is_some())
            .finish_non_exhaustive()
    }
}

impl Cookies {
    pub fn new(document: Arc<dyn CookieDocument>) -> Self {
        Self {
            document: Some(document),
            defaults: Arc::new(RwLock::new(CookieConfig::default())),
        }
    }

    /// A context without a document: writes are dropped, reads return `""`.
    pub fn unavailable() -> Self {
        Self {
            document: None,
            defaults: Arc::new(RwLock::new(CookieConfig::default())),
        }
    }

    pub fn ensure_available(&self) -> bool {
        self.document.is_some()
    }

    pub fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<()> {
        let Some(doc) = &self.document else { return Ok(()) };
        let record = options.record(key, value);
        log::trace!("cookie write {record:?}");
        doc.set_cookie_string(&record)?;
        Ok(())
    }

    /// Value of the first visible cookie named `key`, or `""`.
    pub fn get(&self, key: &str) -> String {
        let Some(doc) = &self.document else { return String::new() };
        let name_eq = format!("{key}=");
        let all = doc.cookie_string();
        let found = all
            .split(';')
            .map(str::trim)
            .find_map(|c| c.strip_prefix(name_eq.as_str()));
        found.unwrap_or_default().to_string()
    }

    /// Deletes the cookie at path `/` by writing an expiry in the past.
    pub fn remove(&self, key: &str) -> Result<()> {
        let Some(doc) = &self.document else { return Ok(()) };
        let record = format!(
            "{key}=; expires={}; path=/;",
            format_http_date(OffsetDateTime::UNIX_EPOCH)
        );
        doc.set_cookie_string(&record)?;
        Ok(())
    }

    pub fn global_config(&self) -> CookieConfig {
        self.defaults.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_global_config(&self, config: CookieConfig) {
        *self.defaults.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Binds `key` with a default value returned while the cookie is empty.
    pub fn item(&self, key: &str, default: &str, config: ItemConfig<CookieOptions>) -> CookieItem {
        let defaults = self.global_config();
        let (prefix, options) = config.take_prefix(&defaults.prefix);
        CookieItem {
            cookies: self.clone(),
            key: key.to_string(),
            effective_key: compute_effective_key(key, &prefix),
            default: default.to_string(),
            options: options.over_defaults(&defaults),
        }
    }
}

pub struct CookieItem {
    cookies: Cookies,
    key: String,
    effective_key: String,
    default: String,
    options: CookieOptions,
}

impl CookieItem {
    /// Cookie value, or the default when the cookie is missing or empty.
    pub fn get(&self) -> String {
        let value = self.cookies.get(&self.effective_key);
        if value.is_empty() { self.default.clone() } else { value }
    }

    pub fn set(&self, value: &str) -> Result<()> {
        self.cookies.set(&self.effective_key, value, &self.options)
    }

    pub fn remove(&self) -> Result<()> {
        self.cookies.remove(&self.effective_key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn effective_key(&self) -> &str {
        &self.effective_key
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }
}
