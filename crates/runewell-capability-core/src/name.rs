//! Namespaced capability names.
//!
//! Every capability is identified by a `namespace:path` string, e.g.
//! `runewell:terrain`. Validation happens at construction so the registry
//! never has to reject a name at lookup time.

use crate::error::CapabilityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated, namespaced capability identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityName(String);

impl CapabilityName {
    /// Create a capability name, validating the `namespace:path` form.
    ///
    /// Both segments must be non-empty and consist of lowercase ASCII
    /// letters, digits, `_`, `.` or `-`.
    pub fn new(raw: impl Into<String>) -> Result<Self, CapabilityError> {
        let raw = raw.into();

        let invalid = |reason| CapabilityError::InvalidName {
            name: raw.clone(),
            reason,
        };

        if raw.is_empty() {
            return Err(invalid("name is empty"));
        }

        let (namespace, path) = raw
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' separator"))?;

        if namespace.is_empty() || path.is_empty() {
            return Err(invalid("namespace and path must be non-empty"));
        }

        let segment_ok = |s: &str| {
            s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-".contains(c))
        };

        if !segment_ok(namespace) || !segment_ok(path) {
            return Err(invalid(
                "segments must be lowercase ASCII letters, digits, '_', '.' or '-'",
            ));
        }

        Ok(Self(raw))
    }

    /// The namespace segment (before the `:`).
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or("")
    }

    /// The path segment (after the `:`).
    pub fn path(&self) -> &str {
        self.0.split_once(':').map(|(_, p)| p).unwrap_or("")
    }

    /// The full `namespace:path` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CapabilityName {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CapabilityName {
    type Error = CapabilityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CapabilityName> for String {
    fn from(name: CapabilityName) -> Self {
        name.0
    }
}

impl AsRef<str> for CapabilityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        let name = CapabilityName::new("runewell:terrain").unwrap();
        assert_eq!(name.namespace(), "runewell");
        assert_eq!(name.path(), "terrain");
        assert_eq!(name.as_str(), "runewell:terrain");

        assert!(CapabilityName::new("mod_pack.extra:loot-tables_v2").is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(CapabilityName::new("").is_err());
    }

    #[test]
    fn test_missing_separator_rejected() {
        assert!(CapabilityName::new("terrain").is_err());
    }

    #[test]
    fn test_empty_segments_rejected() {
        assert!(CapabilityName::new(":terrain").is_err());
        assert!(CapabilityName::new("runewell:").is_err());
    }

    #[test]
    fn test_bad_characters_rejected() {
        assert!(CapabilityName::new("Runewell:terrain").is_err());
        assert!(CapabilityName::new("runewell:ter rain").is_err());
    }

    #[test]
    fn test_parse_round_trip() {
        let name: CapabilityName = "runewell:loot".parse().unwrap();
        assert_eq!(name.to_string(), "runewell:loot");
    }
}
