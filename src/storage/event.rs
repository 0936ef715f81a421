#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StorageScope { Local, Session }

/// A single change made through a [`NotifyingArea`](super::NotifyingArea).
///
/// `key` is `None` when the whole area was cleared.
#[derive(Clone, Debug)]
pub struct StorageEvent {
    pub scope: StorageScope,
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}
