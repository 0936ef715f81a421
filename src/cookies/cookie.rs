//! Cookie record and HTTP date helpers.
//!
//! The [`Cookie`] struct is what a [`DefaultCookieDocument`](super::DefaultCookieDocument)
//! keeps per cookie. It can be (de)serialized via `serde` for snapshots.
//!
//! ```rust
//! use gosub_persist::cookies::Cookie;
//!
//! let c = Cookie {
//!     name: "session".into(),
//!     value: "abc123".into(),
//!     path: "/".into(),
//!     domain: Some("example.com".into()),
//!     secure: true,
//!     expires: None, // session cookie
//! };
//! assert!(!c.is_expired_at(0));
//! ```

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// A cookie as stored by the document jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Path scoping (e.g., `"/"`).
    pub path: String,

    /// Domain scoping (host-only if `None`).
    pub domain: Option<String>,

    /// If `true`, cookie is only visible to `https` documents.
    pub secure: bool,

    /// Expiry as Unix seconds. Session cookies have `None`.
    pub expires: Option<i64>,
}

impl Cookie {
    /// True when the cookie has an expiry at or before `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    /// Cookies are identified by name, domain and path.
    pub fn same_identity(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    /// Whether this cookie is visible from a document at `host` / `path`.
    pub fn matches(&self, host: &str, path: &str, is_https: bool) -> bool {
        let domain_ok = match &self.domain {
            Some(domain) => domain_matches(host, domain),
            None => true,
        };
        domain_ok && path_matches(path, &self.path) && (!self.secure || is_https)
    }
}

/// `host` equals `domain` or is a subdomain of it.
pub(crate) fn domain_matches(host: &str, domain: &str) -> bool {
    host.eq_ignore_ascii_case(domain)
        || host
            .to_ascii_lowercase()
            .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
}

/// RFC 6265 path-match: `cookie_path` is a prefix of `request_path` ending on
/// a segment boundary.
pub(crate) fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// Formats `at` as an HTTP date (`Thu, 01 Jan 1970 00:00:00 GMT`).
pub fn format_http_date(at: OffsetDateTime) -> String {
    let at = at.to_offset(time::UtcOffset::UTC);
    at.format(format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    ))
    .unwrap_or_default()
}

/// Parses an HTTP date. The trailing zone may be `GMT` or `UTC`; both mean UTC.
pub fn parse_http_date(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    let body = s
        .strip_suffix("GMT")
        .or_else(|| s.strip_suffix("UTC"))
        .unwrap_or(s)
        .trim_end();

    PrimitiveDateTime::parse(
        body,
        format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second]"
        ),
    )
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(path: &str, domain: Option<&str>, secure: bool) -> Cookie {
        Cookie {
            name: "n".into(),
            value: "v".into(),
            path: path.into(),
            domain: domain.map(Into::into),
            secure,
            expires: None,
        }
    }

    #[test]
    fn http_date_round_trip_at_epoch() {
        let s = format_http_date(OffsetDateTime::UNIX_EPOCH);
        assert_eq!(s, "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(parse_http_date(&s), Some(OffsetDateTime::UNIX_EPOCH));
    }

    #[test]
    fn parse_accepts_utc_suffix_and_rejects_garbage() {
        let t = parse_http_date("Thu, 01 Jan 1970 00:00:00 UTC").unwrap();
        assert_eq!(t.unix_timestamp(), 0);
        assert!(parse_http_date("yesterday").is_none());
    }

    #[test]
    fn expiry_check() {
        let mut c = cookie("/", None, false);
        assert!(!c.is_expired_at(i64::MAX));
        c.expires = Some(10);
        assert!(c.is_expired_at(10));
        assert!(!c.is_expired_at(9));
    }

    #[test]
    fn path_matching_respects_segments() {
        assert!(path_matches("/docs/page", "/docs"));
        assert!(path_matches("/docs", "/docs"));
        assert!(path_matches("/anything", "/"));
        assert!(!path_matches("/docsx", "/docs"));
        assert!(!path_matches("/", "/docs"));
    }

    #[test]
    fn domain_and_secure_matching() {
        let c = cookie("/", Some("example.com"), false);
        assert!(c.matches("example.com", "/", false));
        assert!(c.matches("www.Example.com", "/", false));
        assert!(!c.matches("badexample.com", "/", false));

        let s = cookie("/", None, true);
        assert!(!s.matches("example.com", "/", false));
        assert!(s.matches("example.com", "/", true));
    }

    #[test]
    fn identity_ignores_value() {
        let a = cookie("/", None, false);
        let mut b = a.clone();
        b.value = "other".into();
        assert!(a.same_identity(&b));
        b.path = "/x".into();
        assert!(!a.same_identity(&b));
    }
}
