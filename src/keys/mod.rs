//! Key codes and key combinations
//!
//! A `KeyCode` is a platform virtual-key code for a keyboard key or mouse
//! button. Codes come from a static table and can be looked up by name.

mod set;
mod table;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use set::KeySet;

/// Virtual-key code of a physical key or mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "KeyRepr", into = "KeyRepr")]
pub struct KeyCode(u8);

impl KeyCode {
    /// Wrap a raw virtual-key code
    pub const fn from_code(code: u8) -> Self {
        Self(code)
    }

    /// The raw virtual-key code
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Look up a key by its table name or a short alias (case-insensitive)
    ///
    /// Single letters and digits resolve to `KEY_x`, so `"k"` is `KEY_K`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() {
                let upper = c.to_ascii_uppercase();
                return Some(Self(upper as u8));
            }
        }

        table::TABLE
            .iter()
            .chain(table::ALIASES.iter())
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, code)| *code)
    }

    /// The table name of this key, if it has one
    pub fn name(self) -> Option<&'static str> {
        table::TABLE
            .iter()
            .find(|(_, code)| *code == self)
            .map(|(n, _)| *n)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// Error returned when a key name or code cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key '{0}'")]
pub struct ParseKeyError(String);

impl FromStr for KeyCode {
    type Err = ParseKeyError;

    /// Accepts table names, aliases, decimal codes and `0x`-prefixed hex codes
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            return u8::from_str_radix(hex, 16)
                .map(Self)
                .map_err(|_| ParseKeyError(s.to_string()));
        }
        // Bare digits 0-9 are keys, longer numbers are codes
        if trimmed.len() > 1 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return trimmed
                .parse::<u8>()
                .map(Self)
                .map_err(|_| ParseKeyError(s.to_string()));
        }
        Self::from_name(trimmed).ok_or_else(|| ParseKeyError(s.to_string()))
    }
}

/// Serialized form of a key: a name or a raw code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum KeyRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<KeyRepr> for KeyCode {
    type Error = ParseKeyError;

    fn try_from(repr: KeyRepr) -> Result<Self, Self::Error> {
        match repr {
            KeyRepr::Code(code) => Ok(Self(code)),
            KeyRepr::Name(name) => name.parse(),
        }
    }
}

impl From<KeyCode> for KeyRepr {
    fn from(key: KeyCode) -> Self {
        match key.name() {
            Some(name) => KeyRepr::Name(name.to_string()),
            None => KeyRepr::Code(key.0),
        }
    }
}
