use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DnsGuardError, Result};

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// A validated, lower-cased hostname without the trailing dot.
///
/// Underscores are accepted so that service labels such as `_dmarc` can be
/// expressed with the same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Parse and validate a hostname.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| DnsGuardError::InvalidDomain {
            domain: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let name = trimmed.strip_suffix('.').unwrap_or(trimmed).to_ascii_lowercase();

        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(invalid("longer than 253 characters"));
        }

        for label in name.split('.') {
            if label.is_empty() {
                return Err(invalid("empty label"));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(invalid("label longer than 63 characters"));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(invalid("label starts or ends with a hyphen"));
            }
            if !label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            {
                return Err(invalid("label contains characters outside [a-z0-9-_]"));
            }
        }

        Ok(Self(name))
    }

    /// The name without the trailing dot.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fully-qualified, dot-terminated form.
    #[must_use]
    pub fn fqdn(&self) -> String {
        format!("{}.", self.0)
    }

    /// Number of labels.
    #[must_use]
    pub fn label_count(&self) -> usize {
        self.0.split('.').count()
    }

    /// The name with its leftmost label removed, or `None` for a single label.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_once('.')
            .map(|(_, rest)| Self(rest.to_string()))
    }

    /// Prefix a label, e.g. `_dmarc` or `selector._domainkey`.
    pub fn child(&self, label: &str) -> Result<Self> {
        Self::parse(&format!("{label}.{}", self.0))
    }

    /// The rightmost `labels` labels of this name (the whole name if shorter).
    #[must_use]
    pub fn suffix(&self, labels: usize) -> Self {
        let parts: Vec<&str> = self.0.split('.').collect();
        let start = parts.len().saturating_sub(labels.max(1));
        Self(parts[start..].join("."))
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DomainName {
    type Err = DnsGuardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DomainName {
    type Error = DnsGuardError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DomainName> for String {
    fn from(name: DomainName) -> Self {
        name.0
    }
}

/// Normalize a wire name for comparison: lower-case, dot-terminated.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    if lower.ends_with('.') {
        lower
    } else {
        format!("{lower}.")
    }
}

/// True if `child` is strictly below `parent` (both normalized by the caller).
///
/// The root `.` is the parent of every other name.
#[must_use]
pub fn is_strict_subdomain(child: &str, parent: &str) -> bool {
    if child == parent {
        return false;
    }
    if parent == "." {
        return child != ".";
    }
    child
        .strip_suffix(parent)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

/// True if `name` equals `zone` or lies below it.
#[must_use]
pub fn is_in_zone(name: &str, zone: &str) -> bool {
    name == zone || is_strict_subdomain(name, zone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_trailing_dot() {
        let name = DomainName::parse("WWW.Example.COM.").unwrap();
        assert_eq!(name.as_str(), "www.example.com");
        assert_eq!(name.fqdn(), "www.example.com.");
        assert_eq!(name.label_count(), 3);
    }

    #[test]
    fn parse_rejects_malformed_names() {
        assert!(DomainName::parse("").is_err());
        assert!(DomainName::parse("exa mple.com").is_err());
        assert!(DomainName::parse("-bad.com").is_err());
        assert!(DomainName::parse("a..b").is_err());
        assert!(DomainName::parse(&"a".repeat(64)).is_err());
        assert!(DomainName::parse(&format!("{}com", "a.".repeat(130))).is_err());
    }

    #[test]
    fn parent_and_child() {
        let name = DomainName::parse("www.example.com").unwrap();
        assert_eq!(name.parent().unwrap().as_str(), "example.com");
        assert_eq!(
            name.child("_dmarc").unwrap().as_str(),
            "_dmarc.www.example.com"
        );
        assert!(DomainName::parse("com").unwrap().parent().is_none());
    }

    #[test]
    fn suffix_keeps_rightmost_labels() {
        let name = DomainName::parse("a.b.example.co.uk").unwrap();
        assert_eq!(name.suffix(2).as_str(), "co.uk");
        assert_eq!(name.suffix(10).as_str(), "a.b.example.co.uk");
    }

    #[test]
    fn subdomain_relations() {
        assert!(is_strict_subdomain("com.", "."));
        assert!(is_strict_subdomain("example.com.", "com."));
        assert!(!is_strict_subdomain("com.", "com."));
        assert!(!is_strict_subdomain("badcom.", "com."));
        assert!(is_in_zone("example.com.", "example.com."));
        assert_eq!(normalize_name("Example.COM"), "example.com.");
    }
}
