//! Scripted [`DnsClient`] for tests

use super::{DnsClient, DnsErrorKind, DnsLookupError, LookupResult, MxRecord, RecordType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Zone {
    txt: HashMap<String, Vec<Vec<String>>>,
    mx: HashMap<String, Vec<MxRecord>>,
    a: HashMap<String, Vec<String>>,
    aaaa: HashMap<String, Vec<String>>,
    failures: HashMap<(String, RecordType), DnsErrorKind>,
    delays: HashMap<String, Duration>,
}

/// In-memory zone; unknown names answer NXDOMAIN
#[derive(Clone, Default)]
pub struct MockDnsClient {
    zone: Arc<Mutex<Zone>>,
    queries: Arc<AtomicUsize>,
}

impl MockDnsClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one single-string TXT record per entry
    pub fn add_txt(&self, domain: &str, records: &[&str]) -> &Self {
        let parts = records.iter().map(|r| vec![r.to_string()]).collect();
        self.zone.lock().unwrap().txt.insert(domain.to_string(), parts);
        self
    }

    /// Add TXT records given as character-string lists
    pub fn add_txt_parts(&self, domain: &str, records: Vec<Vec<&str>>) -> &Self {
        let parts = records
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect();
        self.zone.lock().unwrap().txt.insert(domain.to_string(), parts);
        self
    }

    pub fn add_mx(&self, domain: &str, exchanges: &[(u16, &str)]) -> &Self {
        let records = exchanges
            .iter()
            .map(|(preference, exchange)| MxRecord {
                preference: *preference,
                exchange: exchange.to_string(),
            })
            .collect();
        self.zone.lock().unwrap().mx.insert(domain.to_string(), records);
        self
    }

    pub fn add_a(&self, domain: &str, addrs: &[&str]) -> &Self {
        let addrs = addrs.iter().map(|a| a.to_string()).collect();
        self.zone.lock().unwrap().a.insert(domain.to_string(), addrs);
        self
    }

    pub fn add_aaaa(&self, domain: &str, addrs: &[&str]) -> &Self {
        let addrs = addrs.iter().map(|a| a.to_string()).collect();
        self.zone.lock().unwrap().aaaa.insert(domain.to_string(), addrs);
        self
    }

    /// Make one record type of `domain` fail
    pub fn fail(&self, domain: &str, record_type: RecordType, kind: DnsErrorKind) -> &Self {
        self.zone
            .lock()
            .unwrap()
            .failures
            .insert((domain.to_string(), record_type), kind);
        self
    }

    /// Make every record type of `domain` fail
    pub fn fail_all(&self, domain: &str, kind: DnsErrorKind) -> &Self {
        for record_type in [RecordType::Txt, RecordType::Mx, RecordType::A, RecordType::Aaaa] {
            self.fail(domain, record_type, kind);
        }
        self
    }

    /// Delay every answer for `domain`
    pub fn delay(&self, domain: &str, delay: Duration) -> &Self {
        self.zone
            .lock()
            .unwrap()
            .delays
            .insert(domain.to_string(), delay);
        self
    }

    /// Number of queries answered so far
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    async fn answer<T: Clone>(
        &self,
        domain: &str,
        record_type: RecordType,
        select: impl Fn(&Zone) -> Option<T>,
    ) -> LookupResult<T> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let delay = self.zone.lock().unwrap().delays.get(domain).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let zone = self.zone.lock().unwrap();
        if let Some(kind) = zone.failures.get(&(domain.to_string(), record_type)) {
            return Err(DnsLookupError::new(domain, record_type, *kind, "scripted failure"));
        }
        select(&zone).ok_or_else(|| {
            DnsLookupError::new(domain, record_type, DnsErrorKind::NotFound, "NXDOMAIN")
        })
    }
}

#[async_trait]
impl DnsClient for MockDnsClient {
    async fn resolve_txt(&self, domain: &str) -> LookupResult<Vec<Vec<String>>> {
        self.answer(domain, RecordType::Txt, |zone| zone.txt.get(domain).cloned())
            .await
    }

    async fn resolve_mx(&self, domain: &str) -> LookupResult<Vec<MxRecord>> {
        self.answer(domain, RecordType::Mx, |zone| zone.mx.get(domain).cloned())
            .await
    }

    async fn resolve_a(&self, domain: &str) -> LookupResult<Vec<String>> {
        self.answer(domain, RecordType::A, |zone| zone.a.get(domain).cloned())
            .await
    }

    async fn resolve_aaaa(&self, domain: &str) -> LookupResult<Vec<String>> {
        self.answer(domain, RecordType::Aaaa, |zone| zone.aaaa.get(domain).cloned())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_txt() {
        let dns = MockDnsClient::new();
        dns.add_txt("example.com", &["v=spf1 -all"]);

        let records = dns.resolve_txt("example.com").await.unwrap();
        assert_eq!(records, vec![vec!["v=spf1 -all".to_string()]]);
        assert_eq!(dns.queries(), 1);
    }

    #[tokio::test]
    async fn test_mock_unknown_is_not_found() {
        let dns = MockDnsClient::new();
        let err = dns.resolve_a("missing.example").await.unwrap_err();
        assert_eq!(err.kind, DnsErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let dns = MockDnsClient::new();
        dns.add_mx("example.com", &[(10, "mx.example.com")])
            .fail("example.com", RecordType::Mx, DnsErrorKind::ServerFailure);

        let err = dns.resolve_mx("example.com").await.unwrap_err();
        assert_eq!(err.kind, DnsErrorKind::ServerFailure);
        assert_eq!(err.record_type, RecordType::Mx);
    }
}
