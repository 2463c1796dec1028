//! SPF tree resolution
//!
//! [`SpfTreeService::get_spf_tree`] is the entry point: it validates the
//! domain, walks the include graph under a wall-clock budget and wraps the
//! root node with its rolled-up totals.

pub mod aggregate;
pub mod mechanism;
pub mod node;
pub mod resolver;

pub use mechanism::{Mechanism, Qualifier, Term};
pub use node::{SpfNode, SpfTree, RFC_LOOKUP_LIMIT};
pub use resolver::{SpfResolver, DEFAULT_MAX_DEPTH};

use crate::dns::{DnsClient, TrustDnsClient};
use chrono::Utc;
use spftree_common::config::ResolverConfig as ResolverSettings;
use spftree_common::{DomainName, Error, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Resolves SPF trees for arbitrary domains
pub struct SpfTreeService {
    resolver: SpfResolver,
    lookup_limit: u32,
    resolution_timeout: Duration,
}

impl SpfTreeService {
    pub fn new(dns: Arc<dyn DnsClient>, settings: &ResolverSettings) -> Self {
        Self {
            resolver: SpfResolver::new(dns, settings.max_depth),
            lookup_limit: settings.lookup_limit,
            resolution_timeout: Duration::from_millis(settings.resolution_timeout_ms),
        }
    }

    /// Build a service backed by the trust-dns resolver
    pub fn from_settings(settings: &ResolverSettings) -> Result<Self> {
        let dns = TrustDnsClient::from_settings(settings)?;
        Ok(Self::new(Arc::new(dns), settings))
    }

    /// Resolve the full SPF tree of `domain`
    ///
    /// Fails with `InvalidInput` for a malformed name, `NotFound` when the
    /// domain itself publishes no SPF record and `Timeout` when the walk
    /// outlives the resolution budget. Problems below the root only prune
    /// the affected branch.
    pub async fn get_spf_tree(&self, domain: &str) -> Result<SpfTree> {
        let domain = DomainName::parse(domain)?;
        let started = Instant::now();

        debug!(
            "Resolving SPF tree for {} (max depth {})",
            domain,
            self.resolver.max_depth()
        );

        let walk = self.resolver.resolve_root(&domain);
        let root = tokio::time::timeout(self.resolution_timeout, walk)
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "SPF resolution for {} exceeded {}ms",
                    domain,
                    self.resolution_timeout.as_millis()
                ))
            })??
            .ok_or_else(|| Error::NotFound(format!("No SPF record found for {}", domain)))?;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let tree = SpfTree::from_root(root, self.lookup_limit, Utc::now(), elapsed_ms);

        if tree.exceeds_lookup_limit() {
            warn!(
                "{} requires {} DNS lookups, above the limit of {}",
                domain, tree.dns_lookup_count(), self.lookup_limit
            );
        }
        info!(
            "Resolved SPF tree for {}: {} lookups, {} IPv4 / {} IPv6 addresses in {}ms",
            domain,
            tree.dns_lookup_count(),
            tree.ip4_block_total(),
            tree.ip6_block_total(),
            elapsed_ms
        );

        Ok(tree)
    }
}
