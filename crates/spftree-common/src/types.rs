//! Common types for spftree

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a domain name in presentation form, without the root dot
pub const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single label
pub const MAX_LABEL_LEN: usize = 63;

/// A validated, normalized domain name
///
/// Lowercase, no trailing dot. Underscores are accepted because SPF
/// records commonly live on names such as `_spf.example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Parse and normalize a domain name
    pub fn parse(input: &str) -> crate::Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidInput(
                "domain must not be empty".to_string(),
            ));
        }

        let name = trimmed.strip_suffix('.').unwrap_or(trimmed).to_ascii_lowercase();
        if name.is_empty() {
            return Err(crate::Error::InvalidInput(format!(
                "'{}' is not a domain name",
                input
            )));
        }
        if name.len() > MAX_DOMAIN_LEN {
            return Err(crate::Error::InvalidInput(format!(
                "domain exceeds {} characters",
                MAX_DOMAIN_LEN
            )));
        }

        for label in name.split('.') {
            if label.is_empty() {
                return Err(crate::Error::InvalidInput(format!(
                    "'{}' contains an empty label",
                    input
                )));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(crate::Error::InvalidInput(format!(
                    "label '{}' exceeds {} characters",
                    label, MAX_LABEL_LEN
                )));
            }
            if let Some(c) = label
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
            {
                return Err(crate::Error::InvalidInput(format!(
                    "'{}' contains invalid character {:?}",
                    input, c
                )));
            }
        }

        Ok(Self(name))
    }

    /// Borrow the normalized name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DomainName {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DomainName {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<DomainName> for String {
    fn from(value: DomainName) -> Self {
        value.0
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
