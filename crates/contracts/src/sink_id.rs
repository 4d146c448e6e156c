//! SinkId - identifier handed out on registration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a registered sink.
///
/// Assigned by the broadcaster in registration order, never reused within a
/// broadcaster instance (also not across shutdowns).
///
/// # Examples
/// ```
/// use contracts::SinkId;
///
/// let id = SinkId::new(7);
/// assert_eq!(id.get(), 7);
/// assert_eq!(id.to_string(), "#7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SinkId(u64);

impl SinkId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for SinkId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
