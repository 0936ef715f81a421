//! The persisted record shape and the views handed to resolution hooks.

use serde::{Deserialize, Serialize};

/// A value as written to the storage area, together with its metadata.
///
/// Serialized as JSON text. `expire` and `version` are omitted when absent so
/// that "no expiry" and "unversioned" stay distinguishable from zero or empty
/// values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEnvelope<T> {
    pub value: T,

    /// Absolute expiry instant in Unix milliseconds.
    #[serde(rename = "expire", default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl<T> StoredEnvelope<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            expire_at: None,
            version: None,
        }
    }

    /// True when the envelope carries an expiry strictly before `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expire_at.is_some_and(|at| now_ms > at)
    }

    /// True when `requested` differs from the stored version. An unversioned
    /// envelope mismatches any requested version.
    pub fn version_mismatches(&self, requested: &str) -> bool {
        self.version.as_deref() != Some(requested)
    }

    /// Splits off the version, leaving the view given to an expiry hook.
    pub(crate) fn into_expired_view(self) -> (ExpiredEntry<T>, Option<String>) {
        (
            ExpiredEntry {
                value: self.value,
                expire_at: self.expire_at,
            },
            self.version,
        )
    }

    /// Splits off the expiry, leaving the view given to a version hook.
    pub(crate) fn into_versioned_view(self) -> (VersionedEntry<T>, Option<i64>) {
        (
            VersionedEntry {
                value: self.value,
                version: self.version,
            },
            self.expire_at,
        )
    }
}

/// Envelope view passed to an expiry hook (version excluded).
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiredEntry<T> {
    pub value: T,
    /// The stored instant on the way in. In a [`Resolution::Replace`] it is
    /// written back through `set`, i.e. as a lifetime in milliseconds.
    pub expire_at: Option<i64>,
}

impl<T> ExpiredEntry<T> {
    /// Merges the replacement over the original envelope, keeping its version.
    pub(crate) fn merge(self, version: Option<String>) -> StoredEnvelope<T> {
        StoredEnvelope {
            value: self.value,
            expire_at: self.expire_at,
            version,
        }
    }
}

/// Envelope view passed to a version-mismatch hook (expiry excluded).
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedEntry<T> {
    pub value: T,
    pub version: Option<String>,
}

impl<T> VersionedEntry<T> {
    /// Merges the replacement over the original envelope, keeping its expiry.
    pub(crate) fn merge(self, expire_at: Option<i64>) -> StoredEnvelope<T> {
        StoredEnvelope {
            value: self.value,
            expire_at,
            version: self.version,
        }
    }
}

/// What a hook decided to do with an entry it was shown.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<E> {
    /// Keep the entry, rewritten with these fields.
    Replace(E),
    /// Drop the entry; the read returns nothing.
    Evict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_metadata_is_omitted_from_text() {
        let env = StoredEnvelope::new("v");
        assert_eq!(serde_json::to_string(&env).unwrap(), r#"{"value":"v"}"#);
    }

    #[test]
    fn present_metadata_uses_wire_names() {
        let env = StoredEnvelope {
            value: 1,
            expire_at: Some(0),
            version: Some(String::new()),
        };
        let text = serde_json::to_string(&env).unwrap();
        assert_eq!(text, r#"{"value":1,"expire":0,"version":""}"#);

        // zero and empty survive the trip as present values
        let back: StoredEnvelope<i32> = serde_json::from_str(&text).unwrap();
        assert_eq!(back.expire_at, Some(0));
        assert_eq!(back.version.as_deref(), Some(""));
    }

    #[test]
    fn missing_fields_decode_as_none() {
        let env: StoredEnvelope<Vec<u8>> = serde_json::from_str(r#"{"value":[1,2]}"#).unwrap();
        assert_eq!(env.value, vec![1, 2]);
        assert!(env.expire_at.is_none());
        assert!(env.version.is_none());
    }

    #[test]
    fn expiry_is_strictly_after() {
        let env = StoredEnvelope {
            value: (),
            expire_at: Some(100),
            version: None,
        };
        assert!(!env.is_expired_at(100));
        assert!(env.is_expired_at(101));
        assert!(!StoredEnvelope::new(()).is_expired_at(i64::MAX));
    }

    #[test]
    fn version_mismatch_includes_unversioned() {
        let mut env = StoredEnvelope::new(());
        assert!(env.version_mismatches("1.0"));

        env.version = Some("1.0".into());
        assert!(!env.version_mismatches("1.0"));
        assert!(env.version_mismatches("2.0"));
    }

    #[test]
    fn merges_keep_the_hidden_field() {
        let env = StoredEnvelope {
            value: "old",
            expire_at: Some(5),
            version: Some("1".into()),
        };

        let (view, version) = env.clone().into_expired_view();
        let merged = ExpiredEntry { value: "new", ..view }.merge(version);
        assert_eq!(merged.version.as_deref(), Some("1"));
        assert_eq!(merged.expire_at, Some(5));
        assert_eq!(merged.value, "new");

        let (view, expire_at) = env.into_versioned_view();
        let merged = VersionedEntry { version: Some("2".into()), ..view }.merge(expire_at);
        assert_eq!(merged.expire_at, Some(5));
        assert_eq!(merged.version.as_deref(), Some("2"));
        assert_eq!(merged.value, "old");
    }
}
