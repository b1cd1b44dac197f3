use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a bidder taking part in a match.
///
/// Owners are plain names announced on the wire (a player's `name` reply)
/// and used as keys when bid packs from several bidders are aggregated.
///
/// # Examples
///
/// ```
/// use fctp_player::core::owner::OwnerId;
///
/// let parallax = OwnerId::new("Parallax");
/// let rival = OwnerId::new("Rival");
/// assert_ne!(parallax, rival);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create a new owner identifier.
    ///
    /// Wire-level owner names never contain whitespace; the protocol splits
    /// stream lines on it.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this owner.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for OwnerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
