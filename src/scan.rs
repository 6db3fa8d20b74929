use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::constants::{
    DEFAULT_CONCURRENCY, DIGITS_REGEX, DNS_TIMEOUT, DOMAIN_REGEX, MAX_CONCURRENCY,
    MIN_CONCURRENCY,
};
use crate::dns::{resolve, RecordKind, RecordLookup, ResolutionResult};
use crate::error::{ScanError, TaskFailure, ValidationError};
use crate::probe::{ProbeOutcome, ProbeResult, Reachability, RetryPolicy};
use crate::progress::Progress;
use crate::scheduler::{run_bounded, Slot};
use crate::wordlist::{Mode, WordlistSource};

/// Checks `domain` against `label(.label)*.tld` and returns it lower-cased.
pub fn validate_domain(domain: &str) -> Result<String, ValidationError> {
    let trimmed = domain.trim();
    if !DOMAIN_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidDomain(domain.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Parses a user-supplied concurrency value: digits only, then range.
pub fn parse_concurrency(raw: &str) -> Result<usize, ValidationError> {
    let raw = raw.trim();
    if !DIGITS_REGEX.is_match(raw) {
        return Err(ValidationError::ConcurrencyNotNumeric(raw.to_string()));
    }
    let value = raw
        .parse::<usize>()
        .map_err(|_| ValidationError::ConcurrencyOutOfRange(usize::MAX))?;
    check_concurrency(value)
}

fn check_concurrency(value: usize) -> Result<usize, ValidationError> {
    if (MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::ConcurrencyOutOfRange(value))
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub concurrency: Option<usize>,
}

impl ScanOptions {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: Some(concurrency),
        }
    }

    pub fn effective_concurrency(&self) -> Result<usize, ValidationError> {
        match self.concurrency {
            Some(value) => check_concurrency(value),
            None => Ok(DEFAULT_CONCURRENCY),
        }
    }
}

/// Settings shared by every scan a [`Scanner`] runs.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub wordlists: WordlistSource,
    pub retry: RetryPolicy,
    pub dns_timeout: Duration,
    /// Send one progress line per resolved candidate and per probe.
    pub notify_each: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            wordlists: WordlistSource::bundled(),
            retry: RetryPolicy::default(),
            dns_timeout: DNS_TIMEOUT,
            notify_each: false,
        }
    }
}

/// Record-type counts over every candidate in a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub by_type: BTreeMap<RecordKind, usize>,
    pub total: usize,
    pub resolved: usize,
    pub probed: usize,
    pub reachable: usize,
}

impl ScanSummary {
    pub fn from_results(resolutions: &[ResolutionResult], probes: &[ProbeResult]) -> Self {
        let mut by_type: BTreeMap<RecordKind, usize> =
            RecordKind::ALL.iter().map(|kind| (*kind, 0)).collect();
        for result in resolutions {
            *by_type.entry(result.record_type).or_default() += 1;
        }

        Self {
            total: resolutions.len(),
            resolved: resolutions.iter().filter(|r| r.is_resolved()).count(),
            probed: probes.len(),
            reachable: probes.iter().filter(|p| p.http_reachable).count(),
            by_type,
        }
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        self.by_type.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub domain: String,
    pub mode: Mode,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    /// One entry per wordlist line, in wordlist order.
    pub resolutions: Vec<ResolutionResult>,
    /// Address-bearing entries only, in wordlist order.
    pub probes: Vec<ProbeResult>,
    pub summary: ScanSummary,
}

impl ScanReport {
    pub fn resolved(&self) -> impl Iterator<Item = &ResolutionResult> {
        self.resolutions.iter().filter(|r| r.is_resolved())
    }

    pub fn reachable(&self) -> impl Iterator<Item = &ProbeResult> {
        self.probes.iter().filter(|p| p.http_reachable)
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

/// Wordlist → DNS → filter → HTTP pipeline over shared lookup and probe
/// backends.
pub struct Scanner<L: ?Sized, P: ?Sized> {
    lookup: Arc<L>,
    prober: Arc<P>,
    config: ScanConfig,
}

impl<L, P> Scanner<L, P>
where
    L: RecordLookup + ?Sized + 'static,
    P: Reachability + ?Sized + 'static,
{
    pub fn new(lookup: Arc<L>, prober: Arc<P>, config: ScanConfig) -> Self {
        Self {
            lookup,
            prober,
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Runs one scan. Only bad input, an unreadable wordlist, or `cancel`
    /// firing make this fail; every wordlist entry otherwise gets a result.
    pub async fn scan(
        &self,
        domain: &str,
        mode: Mode,
        options: &ScanOptions,
        progress: &Progress,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        let domain = validate_domain(domain)?;
        let concurrency = options.effective_concurrency()?;
        let labels = self.config.wordlists.load(mode)?;

        let started_at = Utc::now();
        let clock = Instant::now();

        info!(%domain, %mode, candidates = labels.len(), concurrency, "starting scan");
        progress.emit(format!(
            "Starting scan of {} candidates for {} (mode {}, concurrency {})",
            labels.len(),
            domain,
            mode,
            concurrency
        ));

        let candidates: Vec<String> = labels
            .iter()
            .map(|label| format!("{}.{}", label, domain))
            .collect();

        let resolutions = self
            .resolve_all(candidates, concurrency, progress, cancel)
            .await?;
        let resolved = resolutions.iter().filter(|r| r.is_resolved()).count();
        info!(%domain, resolved, total = resolutions.len(), "DNS stage complete");

        let targets: Vec<ResolutionResult> = resolutions
            .iter()
            .filter(|r| r.is_probe_candidate())
            .cloned()
            .collect();
        progress.emit(format!(
            "Resolved {}/{} candidates, probing {} hosts over HTTP(S)",
            resolved,
            resolutions.len(),
            targets.len()
        ));

        let probes = self
            .probe_all(targets, concurrency, progress, cancel)
            .await?;

        let summary = ScanSummary::from_results(&resolutions, &probes);
        let elapsed = clock.elapsed();
        info!(
            %domain,
            probed = summary.probed,
            reachable = summary.reachable,
            elapsed_ms = elapsed.as_millis() as u64,
            "scan complete"
        );
        progress.emit(format!(
            "Scan of {} complete: {} resolved, {} reachable ({})",
            domain,
            summary.resolved,
            summary.reachable,
            summary
                .by_type
                .iter()
                .map(|(kind, count)| format!("{}={}", kind, count))
                .collect::<Vec<_>>()
                .join(" ")
        ));

        Ok(ScanReport {
            domain,
            mode,
            started_at,
            elapsed,
            resolutions,
            probes,
            summary,
        })
    }

    async fn resolve_all(
        &self,
        candidates: Vec<String>,
        concurrency: usize,
        progress: &Progress,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResolutionResult>, ScanError> {
        let lookup = Arc::clone(&self.lookup);
        let notify = self.config.notify_each.then(|| progress.clone());

        let slots = run_bounded(candidates.clone(), concurrency, cancel, move |fqdn: String| {
            let lookup = Arc::clone(&lookup);
            let notify = notify.clone();
            async move {
                let result = resolve(lookup.as_ref(), &fqdn).await;
                if let Some(progress) = notify.filter(|_| result.is_resolved()) {
                    progress.emit(format!(
                        "[+] {} {} {}",
                        result.subdomain,
                        result.record_type,
                        result.addresses.as_deref().unwrap_or_default().join(", ")
                    ));
                }
                result
            }
        })
        .await;

        if interrupted(&slots) {
            return Err(ScanError::Cancelled);
        }

        Ok(slots
            .into_iter()
            .zip(candidates)
            .map(|(slot, fqdn)| {
                slot.unwrap_or_else(|failure| {
                    degraded("DNS", &fqdn, &failure);
                    ResolutionResult::unresolved(fqdn)
                })
            })
            .collect())
    }

    async fn probe_all(
        &self,
        targets: Vec<ResolutionResult>,
        concurrency: usize,
        progress: &Progress,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProbeResult>, ScanError> {
        let prober = Arc::clone(&self.prober);
        let notify = self.config.notify_each.then(|| progress.clone());

        let slots = run_bounded(targets.clone(), concurrency, cancel, move |target: ResolutionResult| {
            let prober = Arc::clone(&prober);
            let notify = notify.clone();
            async move {
                let outcome = prober.probe(&target.subdomain).await;
                if let Some(progress) = notify {
                    progress.emit(format!(
                        "[{}] {} http={}",
                        if outcome.reachable { "+" } else { "-" },
                        target.subdomain,
                        outcome
                            .status
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "N/A".to_string())
                    ));
                }
                ProbeResult::new(target, outcome)
            }
        })
        .await;

        if interrupted(&slots) {
            return Err(ScanError::Cancelled);
        }

        Ok(slots
            .into_iter()
            .zip(targets)
            .map(|(slot, target)| {
                slot.unwrap_or_else(|failure| {
                    degraded("HTTP", &target.subdomain, &failure);
                    ProbeResult::new(target, ProbeOutcome::UNREACHABLE)
                })
            })
            .collect())
    }
}

/// True when cancellation cut at least one item short.
fn interrupted<R>(slots: &[Slot<R>]) -> bool {
    slots
        .iter()
        .any(|slot| matches!(slot, Err(TaskFailure::Cancelled)))
}

fn degraded(stage: &str, subject: &str, failure: &TaskFailure) {
    warn!(stage, subject, error = %failure, "task failed, recording empty result");
}
