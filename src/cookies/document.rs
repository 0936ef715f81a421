//! Cookie document abstraction and a simple in-memory implementation.
//!
//! A **cookie document** is the `document.cookie` view of one page: reading it
//! yields every visible cookie as `"name=value; name2=value2"`, and writing
//! one `name=value; attr=...` record creates, replaces or (with a past
//! `expires`) deletes a single cookie.
//!
//! [`DefaultCookieDocument`] keeps cookies **in memory only** and handles the
//! `expires`, `path`, `domain` and `secure` attributes. Everything else
//! (`max-age`, `samesite`, size limits) is ignored.
//!
//! See also: RFC 6265bis (HTTP State Management Mechanism).

use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use time::OffsetDateTime;
use url::Url;

use super::cookie::{domain_matches, parse_http_date, Cookie};

/// The cookie string interface of a document.
pub trait CookieDocument: Send + Sync {
    /// All cookies visible to the document, as `name=value` pairs joined by `"; "`.
    fn cookie_string(&self) -> String;

    /// Applies a single `name=value[; attribute...]` record.
    fn set_cookie_string(&self, record: &str) -> Result<()>;
}

/// In-memory cookie jar bound to one document URL.
#[derive(Debug)]
pub struct DefaultCookieDocument {
    url: Url,
    cookies: RwLock<Vec<Cookie>>,
}

impl DefaultCookieDocument {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            cookies: RwLock::new(Vec::new()),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Unexpired cookies currently held, regardless of visibility.
    pub fn snapshot(&self) -> Vec<Cookie> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| !c.is_expired_at(now))
            .cloned()
            .collect()
    }

    fn default_path(&self) -> String {
        let path = self.url.path();
        path.rsplit_once('/')
            .map_or("/", |(a, _)| if a.is_empty() { "/" } else { a })
            .to_string()
    }

    /// Parses one record. Returns `None` for records without a `=`.
    fn parse_record(&self, record: &str) -> Option<Cookie> {
        let mut parts = record.split(';');
        let (name, value) = parts.next()?.split_once('=')?;

        let mut cookie = Cookie {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
            path: String::new(),
            domain: None,
            secure: false,
            expires: None,
        };

        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some((k, v)) = part.split_once('=') {
                let v = v.trim();
                match k.trim().to_ascii_lowercase().as_str() {
                    "path" if v.starts_with('/') => cookie.path = v.to_string(),
                    "domain" if !v.is_empty() => {
                        cookie.domain = Some(v.trim_start_matches('.').to_ascii_lowercase())
                    }
                    "expires" => match parse_http_date(v) {
                        Some(at) => cookie.expires = Some(at.unix_timestamp()),
                        None => log::debug!("ignoring unparsable cookie expiry {v:?}"),
                    },
                    _ => {}
                }
            } else if part.eq_ignore_ascii_case("secure") {
                cookie.secure = true;
            }
        }

        if cookie.path.is_empty() {
            cookie.path = self.default_path();
        }

        Some(cookie)
    }
}

impl CookieDocument for DefaultCookieDocument {
    fn cookie_string(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        let path = self.url.path();
        let is_https = self.url.scheme() == "https";
        let now = OffsetDateTime::now_utc().unix_timestamp();

        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| !c.is_expired_at(now))
            .filter(|c| c.matches(host, path, is_https))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie_string(&self, record: &str) -> Result<()> {
        let Some(cookie) = self.parse_record(record) else {
            log::debug!("ignoring cookie record without '=': {record:?}");
            return Ok(());
        };

        let host = self.url.host_str().unwrap_or_default();
        if let Some(domain) = &cookie.domain {
            if !domain_matches(host, domain) {
                log::debug!("rejecting cookie {:?} for foreign domain {domain:?}", cookie.name);
                return Ok(());
            }
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        cookies.retain(|c| !c.same_identity(&cookie) && !c.is_expired_at(now));

        // a record that is already expired only deletes
        if !cookie.is_expired_at(now) {
            cookies.push(cookie);
        }
        Ok(())
    }
}
