//! Causal-ordering bookmarks.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque token naming a point in the database's transaction history.
///
/// A transaction that depends on a bookmark will only start once the server
/// has caught up to it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bookmark(String);

impl Bookmark {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token as sent on the wire.
    pub fn value(&self) -> &str {
        &self.0
    }

    /// Parse a collection of raw tokens into a bookmark set.
    ///
    /// Duplicates collapse; empty tokens are dropped.
    pub fn parse<I, S>(values: I) -> BTreeSet<Bookmark>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values
            .into_iter()
            .map(Into::into)
            .filter(|v: &String| !v.is_empty())
            .map(Bookmark)
            .collect()
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Bookmark {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for Bookmark {
    fn from(v: String) -> Self {
        Self(v)
    }
}
