//! Recursive SPF walk with lookup accounting
//!
//! Expected dead ends (no policy, cycle, depth exhausted, transient DNS
//! failure) yield `Ok(None)` for the branch. Only a DNS client that cannot
//! operate at all surfaces as an error.

use super::mechanism::{is_spf_record, parse_record, redirect_applies, Mechanism};
use super::node::{NodeBuilder, SpfNode};
use crate::dns::{DnsClient, DnsErrorKind, LookupResult};
use spftree_common::{DomainName, Error, Result};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default bound on include depth below the root
pub const DEFAULT_MAX_DEPTH: usize = 10;

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<SpfNode>>> + Send + 'a>>;

/// Walks SPF records through a [`DnsClient`]
pub struct SpfResolver {
    dns: Arc<dyn DnsClient>,
    max_depth: usize,
}

impl SpfResolver {
    pub fn new(dns: Arc<dyn DnsClient>, max_depth: usize) -> Self {
        Self { dns, max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve `domain` as the root of a fresh walk
    pub async fn resolve_root(&self, domain: &DomainName) -> Result<Option<SpfNode>> {
        let mut visited = HashSet::new();
        self.resolve(domain.as_str(), 0, &mut visited).await
    }

    /// Resolve one domain at `depth`
    ///
    /// `visited` holds the domains on the current root-to-node path. The
    /// domain is added for the duration of its own walk and removed on
    /// return, so sibling branches may each reach the same domain.
    pub fn resolve<'a>(
        &'a self,
        domain: &'a str,
        depth: usize,
        visited: &'a mut HashSet<String>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            if visited.contains(domain) {
                debug!("Cycle at {} (depth {}), dropping branch", domain, depth);
                return Ok(None);
            }
            if depth > self.max_depth {
                debug!(
                    "Depth limit {} exceeded at {}, dropping branch",
                    self.max_depth, domain
                );
                return Ok(None);
            }

            visited.insert(domain.to_string());
            let result = self.resolve_marked(domain, depth, visited).await;
            visited.remove(domain);
            result
        })
    }

    async fn resolve_marked(
        &self,
        domain: &str,
        depth: usize,
        visited: &mut HashSet<String>,
    ) -> Result<Option<SpfNode>> {
        let record = match self.fetch_spf_record(domain).await? {
            Some(record) => record,
            None => return Ok(None),
        };

        debug!("Found SPF record for {} at depth {}: {}", domain, depth, record);

        let mut node = NodeBuilder::new(domain, record.as_str());

        let terms = parse_record(&record);
        let follow_redirect = redirect_applies(&terms);

        for term in terms {
            if !follow_redirect {
                if let Mechanism::Redirect(target) = &term.mechanism {
                    debug!(
                        "Ignoring redirect={} in {}: record has an all term",
                        target, domain
                    );
                    continue;
                }
            }
            node.charge(term.mechanism.lookup_cost());

            match term.mechanism {
                Mechanism::Include(target) | Mechanism::Redirect(target) => {
                    match self.resolve_target(&target, depth, visited).await? {
                        Some(child) => node.add_child(child),
                        None => node.drop_include(&target),
                    }
                }
                Mechanism::Ip4(literal) => node.add_ip4(&literal),
                Mechanism::Ip6(literal) => node.add_ip6(&literal),
                Mechanism::Mx(target) => {
                    if let Some(host) = query_name(target.as_deref(), domain) {
                        let records = absorb(self.dns.resolve_mx(&host).await)?;
                        node.add_mx_hosts(records.into_iter().map(|mx| mx.exchange));
                    }
                }
                Mechanism::A(target) => {
                    if let Some(host) = query_name(target.as_deref(), domain) {
                        node.add_a_hosts(absorb(self.dns.resolve_a(&host).await)?);
                        node.add_a_hosts(absorb(self.dns.resolve_aaaa(&host).await)?);
                    }
                }
                Mechanism::All => node.set_all(term.qualifier),
                Mechanism::Exists(_) | Mechanism::Ptr(_) => {}
                Mechanism::Unknown(raw) => {
                    debug!("Ignoring unrecognized term {:?} in {}", raw, domain);
                }
            }
        }

        Ok(Some(node.build()))
    }

    async fn resolve_target(
        &self,
        target: &str,
        depth: usize,
        visited: &mut HashSet<String>,
    ) -> Result<Option<SpfNode>> {
        match DomainName::parse(target) {
            Ok(name) => self.resolve(name.as_str(), depth + 1, visited).await,
            Err(e) => {
                debug!("Skipping include target {:?}: {}", target, e);
                Ok(None)
            }
        }
    }

    /// First TXT record that is an SPF record, parts concatenated
    async fn fetch_spf_record(&self, domain: &str) -> Result<Option<String>> {
        let records = absorb(self.dns.resolve_txt(domain).await)?;

        let mut spf = records
            .into_iter()
            .map(|parts| parts.concat())
            .filter(|txt| is_spf_record(txt));

        let first = spf.next();
        if first.is_some() && spf.next().is_some() {
            warn!("Multiple SPF records published for {}, using the first", domain);
        }
        if first.is_none() {
            debug!("No SPF record for {}", domain);
        }
        Ok(first)
    }
}

/// Name to query for an `a`/`mx` term; `None` when the target is not a
/// plain domain name (e.g. contains macros)
fn query_name(target: Option<&str>, current: &str) -> Option<String> {
    match target {
        None => Some(current.to_string()),
        Some(raw) => match DomainName::parse(raw) {
            Ok(name) => Some(name.into()),
            Err(e) => {
                debug!("Not querying {:?}: {}", raw, e);
                None
            }
        },
    }
}

/// Negative and transient answers become empty data; misconfiguration is fatal
fn absorb<T>(result: LookupResult<Vec<T>>) -> Result<Vec<T>> {
    match result {
        Ok(values) => Ok(values),
        Err(e) if e.kind == DnsErrorKind::NotFound => {
            debug!("{}", e);
            Ok(Vec::new())
        }
        Err(e) if e.kind.is_absorbable() => {
            warn!("{}", e);
            Ok(Vec::new())
        }
        Err(e) => Err(Error::Dns(e.to_string())),
    }
}
