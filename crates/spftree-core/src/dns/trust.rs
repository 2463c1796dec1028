//! trust-dns backed [`DnsClient`]

use super::{DnsClient, DnsErrorKind, DnsLookupError, LookupResult, MxRecord, RecordType};
use async_trait::async_trait;
use spftree_common::config::ResolverConfig as ResolverSettings;
use spftree_common::{Error, Result};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::debug;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::TokioAsyncResolver;

const DNS_PORT: u16 = 53;

/// DNS client backed by a `TokioAsyncResolver`
#[derive(Clone)]
pub struct TrustDnsClient {
    resolver: TokioAsyncResolver,
    query_timeout: Duration,
}

impl TrustDnsClient {
    /// Build a client from resolver settings
    ///
    /// Uses the system configuration unless explicit nameservers are given.
    pub fn from_settings(settings: &ResolverSettings) -> Result<Self> {
        let (config, mut opts) = if settings.nameservers.is_empty() {
            trust_dns_resolver::system_conf::read_system_conf().map_err(|e| {
                Error::Dns(format!("Failed to read system resolver configuration: {}", e))
            })?
        } else {
            (
                nameserver_config(&settings.nameservers)?,
                ResolverOpts::default(),
            )
        };

        let query_timeout = Duration::from_millis(settings.query_timeout_ms);
        opts.timeout = query_timeout;
        opts.attempts = settings.attempts;

        let total_timeout = u32::try_from(settings.attempts)
            .ok()
            .and_then(|attempts| query_timeout.checked_mul(attempts))
            .unwrap_or(Duration::MAX);

        debug!(
            "DNS client ready: {} nameserver(s), per-query budget {:?}",
            config.name_servers().len(),
            total_timeout
        );

        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            query_timeout: total_timeout,
        })
    }

    async fn bounded<T, F>(
        &self,
        domain: &str,
        record_type: RecordType,
        fut: F,
    ) -> LookupResult<T>
    where
        F: Future<Output = std::result::Result<T, ResolveError>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DnsLookupError::new(
                domain,
                record_type,
                classify_error(&e),
                e.to_string(),
            )),
            Err(_) => Err(DnsLookupError::new(
                domain,
                record_type,
                DnsErrorKind::Timeout,
                format!("no answer within {:?}", self.query_timeout),
            )),
        }
    }
}

/// Fully qualify so the resolver never applies search domains
fn fqdn(domain: &str) -> String {
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{}.", domain)
    }
}

fn nameserver_config(nameservers: &[String]) -> Result<ResolverConfig> {
    let mut group = NameServerConfigGroup::new();
    for entry in nameservers {
        let addr = parse_nameserver(entry)?;
        group.merge(NameServerConfigGroup::from_ips_clear(
            &[addr.ip()],
            addr.port(),
            true,
        ));
    }
    Ok(ResolverConfig::from_parts(None, vec![], group))
}

fn parse_nameserver(entry: &str) -> Result<SocketAddr> {
    if let Ok(addr) = entry.parse::<SocketAddr>() {
        return Ok(addr);
    }
    entry
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| Error::Config(format!("Invalid nameserver address: {}", entry)))
}

fn classify_error(e: &ResolveError) -> DnsErrorKind {
    match e.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::ServFail | ResponseCode::Refused => DnsErrorKind::ServerFailure,
            _ => DnsErrorKind::NotFound,
        },
        ResolveErrorKind::Timeout => DnsErrorKind::Timeout,
        ResolveErrorKind::NoConnections => DnsErrorKind::Misconfigured,
        _ => DnsErrorKind::ServerFailure,
    }
}

#[async_trait]
impl DnsClient for TrustDnsClient {
    async fn resolve_txt(&self, domain: &str) -> LookupResult<Vec<Vec<String>>> {
        let lookup = self
            .bounded(domain, RecordType::Txt, self.resolver.txt_lookup(fqdn(domain)))
            .await?;

        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|part| String::from_utf8_lossy(part).into_owned())
                    .collect()
            })
            .collect())
    }

    async fn resolve_mx(&self, domain: &str) -> LookupResult<Vec<MxRecord>> {
        let lookup = self
            .bounded(domain, RecordType::Mx, self.resolver.mx_lookup(fqdn(domain)))
            .await?;

        Ok(lookup
            .iter()
            .map(|mx| MxRecord {
                preference: mx.preference(),
                exchange: mx.exchange().to_string().trim_end_matches('.').to_string(),
            })
            .collect())
    }

    async fn resolve_a(&self, domain: &str) -> LookupResult<Vec<String>> {
        let lookup = self
            .bounded(domain, RecordType::A, self.resolver.ipv4_lookup(fqdn(domain)))
            .await?;

        Ok(lookup
            .iter()
            .map(|record| {
                let addr: std::net::Ipv4Addr = (*record).into();
                addr.to_string()
            })
            .collect())
    }

    async fn resolve_aaaa(&self, domain: &str) -> LookupResult<Vec<String>> {
        let lookup = self
            .bounded(domain, RecordType::Aaaa, self.resolver.ipv6_lookup(fqdn(domain)))
            .await?;

        Ok(lookup
            .iter()
            .map(|record| {
                let addr: std::net::Ipv6Addr = (*record).into();
                addr.to_string()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fqdn() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
    }

    #[test]
    fn test_parse_nameserver() {
        assert_eq!(
            parse_nameserver("1.1.1.1").unwrap(),
            "1.1.1.1:53".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_nameserver("9.9.9.9:5353").unwrap(),
            "9.9.9.9:5353".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_nameserver("[2606:4700::1111]:53").unwrap().port(),
            53
        );
        assert!(matches!(
            parse_nameserver("not-an-ip"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_nameserver_config() {
        let config =
            nameserver_config(&["1.1.1.1".to_string(), "8.8.8.8:5353".to_string()]).unwrap();
        // one UDP and one TCP entry per address
        assert_eq!(config.name_servers().len(), 4);
    }

    #[tokio::test]
    async fn test_from_settings_with_nameservers() {
        let settings = ResolverSettings {
            nameservers: vec!["127.0.0.1".to_string()],
            ..ResolverSettings::default()
        };
        let client = TrustDnsClient::from_settings(&settings).unwrap();
        assert_eq!(client.query_timeout, Duration::from_millis(10_000));
    }
}
