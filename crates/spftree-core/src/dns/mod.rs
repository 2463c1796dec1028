//! DNS collaborator
//!
//! The resolver only needs TXT, MX, A and AAAA answers. Everything it
//! consumes goes through [`DnsClient`] so the traversal can run against a
//! live resolver or a scripted zone in tests.

#[cfg(test)]
pub mod mock;
pub mod trust;

pub use trust::TrustDnsClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Record types the resolver queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Txt,
    Mx,
    A,
    Aaaa,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordType::Txt => "TXT",
            RecordType::Mx => "MX",
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        };
        f.write_str(name)
    }
}

/// Failure class of a DNS lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsErrorKind {
    /// NXDOMAIN or an empty answer
    NotFound,
    /// SERVFAIL, REFUSED, transport or protocol errors
    ServerFailure,
    /// The query did not complete in time
    Timeout,
    /// The client itself cannot issue queries (no nameservers, bad setup)
    Misconfigured,
}

impl DnsErrorKind {
    /// Transient and negative answers are data-shaped; misconfiguration is a fault
    pub fn is_absorbable(self) -> bool {
        !matches!(self, DnsErrorKind::Misconfigured)
    }
}

/// Error returned by a [`DnsClient`]
#[derive(Debug, Clone, Error)]
#[error("{record_type} lookup for {domain} failed ({kind:?}): {message}")]
pub struct DnsLookupError {
    pub domain: String,
    pub record_type: RecordType,
    pub kind: DnsErrorKind,
    pub message: String,
}

impl DnsLookupError {
    pub fn new(
        domain: impl Into<String>,
        record_type: RecordType,
        kind: DnsErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            record_type,
            kind,
            message: message.into(),
        }
    }
}

/// Result of a single DNS query
pub type LookupResult<T> = std::result::Result<T, DnsLookupError>;

/// One MX answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxRecord {
    pub preference: u16,
    /// Exchange hostname without the trailing dot
    pub exchange: String,
}

/// DNS resolution capability consumed by the SPF resolver
#[async_trait]
pub trait DnsClient: Send + Sync {
    /// TXT records of `domain`, each as its list of character-strings
    async fn resolve_txt(&self, domain: &str) -> LookupResult<Vec<Vec<String>>>;

    /// MX records of `domain`
    async fn resolve_mx(&self, domain: &str) -> LookupResult<Vec<MxRecord>>;

    /// IPv4 addresses of `domain` in presentation form
    async fn resolve_a(&self, domain: &str) -> LookupResult<Vec<String>>;

    /// IPv6 addresses of `domain` in presentation form
    async fn resolve_aaaa(&self, domain: &str) -> LookupResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorbable_kinds() {
        assert!(DnsErrorKind::NotFound.is_absorbable());
        assert!(DnsErrorKind::ServerFailure.is_absorbable());
        assert!(DnsErrorKind::Timeout.is_absorbable());
        assert!(!DnsErrorKind::Misconfigured.is_absorbable());
    }

    #[test]
    fn test_error_display() {
        let err = DnsLookupError::new(
            "example.com",
            RecordType::Txt,
            DnsErrorKind::Timeout,
            "deadline elapsed",
        );
        assert_eq!(
            err.to_string(),
            "TXT lookup for example.com failed (Timeout): deadline elapsed"
        );
    }
}
