//! spftree core - recursive SPF resolution
//!
//! This crate walks a domain's SPF record through every `include:` and
//! `redirect=` it delegates to, charging the RFC 7208 lookup budget and
//! totalling the address space each branch authorizes.

pub mod dns;
pub mod spf;

pub use dns::{DnsClient, DnsErrorKind, DnsLookupError, MxRecord, RecordType, TrustDnsClient};
pub use spf::{Qualifier, SpfNode, SpfResolver, SpfTree, SpfTreeService};
