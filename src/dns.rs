use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::timeout;
use tracing::debug;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::rr::{RData, RecordType};
use trust_dns_resolver::TokioAsyncResolver;

use crate::constants::DNS_TIMEOUT;
use crate::error::ConfigurationError;

/// DNS classification of a candidate name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RecordKind {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    #[serde(rename = "ANY")]
    Any,
    #[serde(rename = "CNAME")]
    Cname,
    #[serde(rename = "MX")]
    Mx,
    #[serde(rename = "NS")]
    Ns,
    #[serde(rename = "TXT")]
    Txt,
    #[serde(rename = "UNRESOLVED")]
    Unresolved,
}

impl RecordKind {
    /// Query types in the order they are attempted; the first non-empty
    /// answer classifies the name.
    pub const QUERY_ORDER: [RecordKind; 7] = [
        RecordKind::Any,
        RecordKind::A,
        RecordKind::Aaaa,
        RecordKind::Cname,
        RecordKind::Mx,
        RecordKind::Ns,
        RecordKind::Txt,
    ];

    pub const ALL: [RecordKind; 8] = [
        RecordKind::A,
        RecordKind::Aaaa,
        RecordKind::Any,
        RecordKind::Cname,
        RecordKind::Mx,
        RecordKind::Ns,
        RecordKind::Txt,
        RecordKind::Unresolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Any => "ANY",
            RecordKind::Cname => "CNAME",
            RecordKind::Mx => "MX",
            RecordKind::Ns => "NS",
            RecordKind::Txt => "TXT",
            RecordKind::Unresolved => "UNRESOLVED",
        }
    }

    /// Kinds whose answers carry host addresses worth an HTTP probe.
    pub fn is_address_bearing(&self) -> bool {
        matches!(self, RecordKind::A | RecordKind::Aaaa | RecordKind::Any)
    }

    fn query_type(&self) -> Option<RecordType> {
        match self {
            RecordKind::A => Some(RecordType::A),
            RecordKind::Aaaa => Some(RecordType::AAAA),
            RecordKind::Any => Some(RecordType::ANY),
            RecordKind::Cname => Some(RecordType::CNAME),
            RecordKind::Mx => Some(RecordType::MX),
            RecordKind::Ns => Some(RecordType::NS),
            RecordKind::Txt => Some(RecordType::TXT),
            RecordKind::Unresolved => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub subdomain: String,
    #[serde(rename = "type")]
    pub record_type: RecordKind,
    pub addresses: Option<Vec<String>>,
}

impl ResolutionResult {
    pub fn unresolved(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            record_type: RecordKind::Unresolved,
            addresses: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.record_type != RecordKind::Unresolved
    }

    /// True when the result should go on to the HTTP stage.
    pub fn is_probe_candidate(&self) -> bool {
        self.record_type.is_address_bearing()
            && self.addresses.as_ref().is_some_and(|a| !a.is_empty())
    }
}

/// Result of one query type against one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Records(Vec<String>),
    Empty,
    Failed(String),
}

impl QueryOutcome {
    fn from_lookup(result: Result<Vec<String>, ResolveError>) -> Self {
        match result {
            Ok(records) if records.is_empty() => QueryOutcome::Empty,
            Ok(records) => QueryOutcome::Records(records),
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => QueryOutcome::Empty,
                _ => QueryOutcome::Failed(e.to_string()),
            },
        }
    }
}

/// A source of DNS answers, one query type at a time.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    async fn query(&self, fqdn: &str, kind: RecordKind) -> QueryOutcome;
}

/// Tries every type in [`RecordKind::QUERY_ORDER`] and keeps the first
/// non-empty answer. Never fails; a name with no answers comes back as
/// [`RecordKind::Unresolved`].
pub async fn resolve<L>(lookup: &L, fqdn: &str) -> ResolutionResult
where
    L: RecordLookup + ?Sized,
{
    for kind in RecordKind::QUERY_ORDER {
        match lookup.query(fqdn, kind).await {
            QueryOutcome::Records(addresses) => {
                debug!(fqdn, %kind, records = addresses.len(), "resolved");
                return ResolutionResult {
                    subdomain: fqdn.to_string(),
                    record_type: kind,
                    addresses: Some(addresses),
                };
            }
            QueryOutcome::Empty => {}
            QueryOutcome::Failed(reason) => {
                debug!(fqdn, %kind, %reason, "query failed");
            }
        }
    }

    debug!(fqdn, "unresolved");
    ResolutionResult::unresolved(fqdn)
}

/// Shared async resolver used for every candidate in a scan.
#[derive(Clone)]
pub struct DnsResolver {
    inner: TokioAsyncResolver,
    query_timeout: Duration,
}

impl DnsResolver {
    /// Uses the host's resolver configuration.
    pub fn from_system() -> Result<Self, ConfigurationError> {
        let inner = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| ConfigurationError::Resolver(e.to_string()))?;
        Ok(Self {
            inner,
            query_timeout: DNS_TIMEOUT,
        })
    }

    /// Queries only the given nameservers over plain UDP/TCP port 53.
    pub fn with_nameservers(ips: &[IpAddr]) -> Result<Self, ConfigurationError> {
        if ips.is_empty() {
            return Err(ConfigurationError::Resolver(
                "no nameservers given".to_string(),
            ));
        }
        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(ips, 53, true),
        );
        let opts = ResolverOpts::default();

        Ok(Self {
            inner: TokioAsyncResolver::tokio(config, opts),
            query_timeout: DNS_TIMEOUT,
        })
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

impl fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsResolver")
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RecordLookup for DnsResolver {
    async fn query(&self, fqdn: &str, kind: RecordKind) -> QueryOutcome {
        let Some(record_type) = kind.query_type() else {
            return QueryOutcome::Empty;
        };

        match timeout(self.query_timeout, self.inner.lookup(fqdn, record_type)).await {
            Ok(result) => QueryOutcome::from_lookup(result.map(|lookup| {
                lookup
                    .iter()
                    .filter(|rdata| {
                        record_type == RecordType::ANY || rdata.record_type() == record_type
                    })
                    .map(normalize_rdata)
                    .collect()
            })),
            Err(_) => QueryOutcome::Failed(format!("timed out after {:?}", self.query_timeout)),
        }
    }
}

/// Renders a record as a printable string; structured records keep all of
/// their fields.
pub fn normalize_rdata(rdata: &RData) -> String {
    match rdata {
        RData::A(a) => a.to_string(),
        RData::AAAA(aaaa) => aaaa.to_string(),
        RData::MX(mx) => format!("{} {}", mx.preference(), mx.exchange()),
        RData::TXT(txt) => txt
            .iter()
            .map(|data| String::from_utf8_lossy(data).to_string())
            .collect::<Vec<_>>()
            .join(""),
        other => other.to_string(),
    }
}
