//! Ordered key combinations

use std::fmt;

use serde::{Deserialize, Serialize};

use super::KeyCode;
use crate::platform::InputBackend;

/// Ordered set of keys that must all be held at the same time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<KeyCode>", into = "Vec<KeyCode>")]
pub struct KeySet(Vec<KeyCode>);

impl KeySet {
    /// Create an empty key set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append keys, skipping ones already present
    pub fn extend(&mut self, keys: impl IntoIterator<Item = KeyCode>) {
        for key in keys {
            if !self.0.contains(&key) {
                self.0.push(key);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.0.iter().copied()
    }

    /// Check whether every key is currently down
    ///
    /// Stops at the first key that is up. An empty set never matches.
    pub fn all_down(&self, backend: &dyn InputBackend) -> bool {
        !self.0.is_empty() && self.0.iter().all(|key| backend.is_key_down(*key))
    }
}

impl fmt::Display for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl From<KeyCode> for KeySet {
    fn from(key: KeyCode) -> Self {
        Self(vec![key])
    }
}

impl From<Vec<KeyCode>> for KeySet {
    fn from(keys: Vec<KeyCode>) -> Self {
        let mut set = Self::new();
        set.extend(keys);
        set
    }
}

impl From<&[KeyCode]> for KeySet {
    fn from(keys: &[KeyCode]) -> Self {
        let mut set = Self::new();
        set.extend(keys.iter().copied());
        set
    }
}

impl<const N: usize> From<[KeyCode; N]> for KeySet {
    fn from(keys: [KeyCode; N]) -> Self {
        let mut set = Self::new();
        set.extend(keys);
        set
    }
}

impl From<KeySet> for Vec<KeyCode> {
    fn from(set: KeySet) -> Self {
        set.0
    }
}

impl FromIterator<KeyCode> for KeySet {
    fn from_iter<I: IntoIterator<Item = KeyCode>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
