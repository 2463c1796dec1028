//! Result model: one [`SpfNode`] per resolved domain and the [`SpfTree`]
//! wrapper handed to callers.

use super::aggregate;
use super::mechanism::Qualifier;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// RFC 7208 §4.6.4 limit on mechanism-induced DNS lookups
pub const RFC_LOOKUP_LIMIT: u32 = 10;

/// One domain's SPF record and everything it delegates to
///
/// Built once by the resolver; read-only afterwards. Children are owned
/// exclusively by their parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpfNode {
    domain: String,
    raw_record: String,
    #[serde(serialize_with = "serialize_all_term")]
    qualifier_all: Qualifier,
    all_declared: bool,
    ip4: Vec<String>,
    ip6: Vec<String>,
    mx_hosts: Vec<String>,
    a_hosts: Vec<String>,
    children: Vec<SpfNode>,
    dropped_includes: Vec<String>,
    local_lookup_count: u32,
    dns_lookup_count: u32,
    ip4_block_total: u64,
    #[serde(serialize_with = "serialize_u128_string")]
    ip6_block_total: u128,
}

/// u128 totals exceed what JSON numbers carry reliably; emit decimal strings
fn serialize_u128_string<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(value)
}

fn serialize_all_term<S>(qualifier: &Qualifier, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(qualifier.all_term())
}

impl SpfNode {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The SPF TXT record this node was built from
    pub fn raw_record(&self) -> &str {
        &self.raw_record
    }

    /// Catch-all policy; `~all` when the record declares none
    pub fn qualifier_all(&self) -> Qualifier {
        self.qualifier_all
    }

    /// Whether the record carried an explicit `all` term
    pub fn all_declared(&self) -> bool {
        self.all_declared
    }

    pub fn ip4(&self) -> &[String] {
        &self.ip4
    }

    pub fn ip6(&self) -> &[String] {
        &self.ip6
    }

    pub fn mx_hosts(&self) -> &[String] {
        &self.mx_hosts
    }

    pub fn a_hosts(&self) -> &[String] {
        &self.a_hosts
    }

    pub fn children(&self) -> &[SpfNode] {
        &self.children
    }

    /// Include/redirect targets that produced no node
    pub fn dropped_includes(&self) -> &[String] {
        &self.dropped_includes
    }

    /// Lookups charged by this node's own terms
    pub fn local_lookup_count(&self) -> u32 {
        self.local_lookup_count
    }

    /// Lookups charged by this node and all descendants
    pub fn dns_lookup_count(&self) -> u32 {
        self.dns_lookup_count
    }

    pub fn ip4_block_total(&self) -> u64 {
        self.ip4_block_total
    }

    pub fn ip6_block_total(&self) -> u128 {
        self.ip6_block_total
    }

    /// Number of levels below and including this node
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(SpfNode::depth).max().unwrap_or(0)
    }

    /// Pre-order iterator over this node and all descendants
    pub fn iter(&self) -> impl Iterator<Item = &SpfNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Accumulates one domain's terms while the resolver walks them
#[derive(Debug)]
pub(crate) struct NodeBuilder {
    domain: String,
    raw_record: String,
    qualifier_all: Option<Qualifier>,
    ip4: Vec<String>,
    ip6: Vec<String>,
    mx_hosts: Vec<String>,
    a_hosts: Vec<String>,
    children: Vec<SpfNode>,
    dropped_includes: Vec<String>,
    local_lookup_count: u32,
}

impl NodeBuilder {
    pub(crate) fn new(domain: impl Into<String>, raw_record: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            raw_record: raw_record.into(),
            qualifier_all: None,
            ip4: Vec::new(),
            ip6: Vec::new(),
            mx_hosts: Vec::new(),
            a_hosts: Vec::new(),
            children: Vec::new(),
            dropped_includes: Vec::new(),
            local_lookup_count: 0,
        }
    }

    pub(crate) fn charge(&mut self, lookups: u32) {
        self.local_lookup_count = self.local_lookup_count.saturating_add(lookups);
    }

    /// Later `all` terms replace earlier ones
    pub(crate) fn set_all(&mut self, qualifier: Qualifier) {
        self.qualifier_all = Some(qualifier);
    }

    pub(crate) fn add_ip4(&mut self, literal: &str) {
        self.ip4.push(literal.to_string());
    }

    pub(crate) fn add_ip6(&mut self, literal: &str) {
        self.ip6.push(literal.to_string());
    }

    pub(crate) fn add_mx_hosts(&mut self, hosts: impl IntoIterator<Item = String>) {
        self.mx_hosts.extend(hosts);
    }

    pub(crate) fn add_a_hosts(&mut self, hosts: impl IntoIterator<Item = String>) {
        self.a_hosts.extend(hosts);
    }

    pub(crate) fn add_child(&mut self, child: SpfNode) {
        self.children.push(child);
    }

    pub(crate) fn drop_include(&mut self, target: &str) {
        self.dropped_includes.push(target.to_string());
    }

    /// Fold children into the totals and freeze the node
    pub(crate) fn build(self) -> SpfNode {
        let dns_lookup_count = self
            .children
            .iter()
            .fold(self.local_lookup_count, |acc, c| {
                acc.saturating_add(c.dns_lookup_count)
            });
        let ip4_block_total = self.children.iter().fold(
            aggregate::ip4_total(self.ip4.iter().map(String::as_str)),
            |acc, c| acc.saturating_add(c.ip4_block_total),
        );
        let ip6_block_total = self.children.iter().fold(
            aggregate::ip6_total(self.ip6.iter().map(String::as_str)),
            |acc, c| acc.saturating_add(c.ip6_block_total),
        );

        SpfNode {
            domain: self.domain,
            raw_record: self.raw_record,
            qualifier_all: self.qualifier_all.unwrap_or(Qualifier::SoftFail),
            all_declared: self.qualifier_all.is_some(),
            ip4: self.ip4,
            ip6: self.ip6,
            mx_hosts: self.mx_hosts,
            a_hosts: self.a_hosts,
            children: self.children,
            dropped_includes: self.dropped_includes,
            local_lookup_count: self.local_lookup_count,
            dns_lookup_count,
            ip4_block_total,
            ip6_block_total,
        }
    }
}

/// Resolved SPF tree with the root's rolled-up totals
///
/// Read-only: the totals always mirror `root`.
#[derive(Debug, Clone, Serialize)]
pub struct SpfTree {
    dns_lookup_count: u32,
    ip4_block_total: u64,
    #[serde(serialize_with = "serialize_u128_string")]
    ip6_block_total: u128,
    exceeds_lookup_limit: bool,
    resolved_at: DateTime<Utc>,
    elapsed_ms: u64,
    root: SpfNode,
}

impl SpfTree {
    pub fn from_root(
        root: SpfNode,
        lookup_limit: u32,
        resolved_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            dns_lookup_count: root.dns_lookup_count,
            ip4_block_total: root.ip4_block_total,
            ip6_block_total: root.ip6_block_total,
            exceeds_lookup_limit: root.dns_lookup_count > lookup_limit,
            resolved_at,
            elapsed_ms,
            root,
        }
    }

    pub fn dns_lookup_count(&self) -> u32 {
        self.dns_lookup_count
    }

    pub fn ip4_block_total(&self) -> u64 {
        self.ip4_block_total
    }

    pub fn ip6_block_total(&self) -> u128 {
        self.ip6_block_total
    }

    /// `dns_lookup_count` is above the configured lookup limit
    pub fn exceeds_lookup_limit(&self) -> bool {
        self.exceeds_lookup_limit
    }

    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn root(&self) -> &SpfNode {
        &self.root
    }
}
