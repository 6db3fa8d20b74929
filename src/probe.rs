use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::{header, redirect::Policy, Client, StatusCode};
use serde::Serialize;
use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::constants::{
    BACKOFF_BASE, BACKOFF_JITTER, HTTP_ATTEMPTS, HTTP_ATTEMPT_TIMEOUT, USER_AGENTS,
};
use crate::dns::ResolutionResult;
use crate::error::ConfigurationError;

/// A resolved host annotated with its HTTP liveness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    #[serde(flatten)]
    pub resolution: ResolutionResult,
    #[serde(rename = "httpStatus")]
    pub http_status: Option<u16>,
    #[serde(rename = "httpReachable")]
    pub http_reachable: bool,
}

impl ProbeResult {
    pub fn new(resolution: ResolutionResult, outcome: ProbeOutcome) -> Self {
        Self {
            resolution,
            http_status: outcome.status,
            http_reachable: outcome.reachable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeOutcome {
    /// Last status observed, if any response arrived at all.
    pub status: Option<u16>,
    pub reachable: bool,
}

impl ProbeOutcome {
    pub const UNREACHABLE: ProbeOutcome = ProbeOutcome {
        status: None,
        reachable: false,
    };
}

/// Liveness check for one host.
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn probe(&self, host: &str) -> ProbeOutcome;
}

/// Attempt budget and pacing for one scheme.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff_base: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: HTTP_ATTEMPTS,
            attempt_timeout: HTTP_ATTEMPT_TIMEOUT,
            backoff_base: BACKOFF_BASE,
            jitter: BACKOFF_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Pause after the given (1-based) failed attempt: the base doubled per
    /// attempt plus a random share of the jitter window.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.backoff_base.saturating_mul(1 << exponent);
        if self.jitter.is_zero() {
            return base;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        base + Duration::from_millis(jitter_ms)
    }
}

/// HEAD-based prober: plain HTTP first, HTTPS if that gave no good answer.
///
/// Redirects are not followed; a 3xx on the first hop already proves the
/// host is serving.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    policy: RetryPolicy,
}

impl HttpProber {
    pub fn new(policy: RetryPolicy) -> Result<Self, ConfigurationError> {
        let client = Client::builder()
            .timeout(policy.attempt_timeout)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(false)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .build()?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs up to `policy.attempts` HEAD requests against `url`. Returns the
    /// last observed status and whether any attempt was a 2xx/3xx.
    async fn attempt_url(&self, url: &str) -> ProbeOutcome {
        let mut last_status = None;

        for attempt in 1..=self.policy.attempts {
            let user_agent = USER_AGENTS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or("Mozilla/5.0");

            let request = self
                .client
                .head(url)
                .header(header::USER_AGENT, user_agent)
                .send();

            match timeout(self.policy.attempt_timeout, request).await {
                Ok(Ok(resp)) => {
                    let status = resp.status();
                    last_status = Some(status.as_u16());
                    if is_live(status) {
                        debug!(url, attempt, status = status.as_u16(), "reachable");
                        return ProbeOutcome {
                            status: last_status,
                            reachable: true,
                        };
                    }
                    debug!(url, attempt, status = status.as_u16(), "non-OK status");
                }
                Ok(Err(e)) => {
                    debug!(url, attempt, error = %e, "request failed");
                }
                Err(_) => {
                    debug!(url, attempt, "timed out");
                }
            }

            if attempt < self.policy.attempts {
                sleep(self.policy.backoff(attempt)).await;
            }
        }

        ProbeOutcome {
            status: last_status,
            reachable: false,
        }
    }
}

#[async_trait]
impl Reachability for HttpProber {
    async fn probe(&self, host: &str) -> ProbeOutcome {
        let plain = self.attempt_url(&format!("http://{}", host)).await;
        if plain.reachable {
            return plain;
        }

        let secure = self.attempt_url(&format!("https://{}", host)).await;
        pick(plain, secure)
    }
}

/// Combines the per-scheme outcomes. A live plain answer wins, then any
/// HTTPS answer, then whatever plain HTTP saw.
fn pick(plain: ProbeOutcome, secure: ProbeOutcome) -> ProbeOutcome {
    if plain.reachable {
        plain
    } else if secure.reachable || secure.status.is_some() {
        secure
    } else {
        plain
    }
}

fn is_live(status: StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_without_jitter() {
        let policy = RetryPolicy {
            attempts: 4,
            attempt_timeout: Duration::from_secs(1),
            backoff_base: Duration::from_millis(100),
            jitter: Duration::ZERO,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn backoff_jitter_stays_in_window() {
        let policy = RetryPolicy::default();
        for attempt in 1..=2 {
            let floor = BACKOFF_BASE * (1 << (attempt - 1));
            for _ in 0..50 {
                let delay = policy.backoff(attempt);
                assert!(delay >= floor);
                assert!(delay <= floor + BACKOFF_JITTER);
            }
        }
    }

    #[test]
    fn live_statuses_are_2xx_and_3xx() {
        assert!(is_live(StatusCode::OK));
        assert!(is_live(StatusCode::NO_CONTENT));
        assert!(is_live(StatusCode::MOVED_PERMANENTLY));
        assert!(!is_live(StatusCode::NOT_FOUND));
        assert!(!is_live(StatusCode::SERVICE_UNAVAILABLE));
    }

    fn seen(status: u16, reachable: bool) -> ProbeOutcome {
        ProbeOutcome {
            status: Some(status),
            reachable,
        }
    }

    #[test]
    fn live_plain_http_wins() {
        assert_eq!(pick(seen(200, true), seen(301, true)), seen(200, true));
        assert_eq!(pick(seen(302, true), ProbeOutcome::UNREACHABLE), seen(302, true));
    }

    #[test]
    fn https_answers_when_plain_http_is_silent() {
        assert_eq!(pick(ProbeOutcome::UNREACHABLE, seen(200, true)), seen(200, true));
        assert_eq!(pick(ProbeOutcome::UNREACHABLE, seen(404, false)), seen(404, false));
    }

    #[test]
    fn https_status_overrides_plain_status() {
        assert_eq!(pick(seen(503, false), seen(204, true)), seen(204, true));
        assert_eq!(pick(seen(503, false), seen(403, false)), seen(403, false));
    }

    #[test]
    fn plain_status_kept_when_https_is_silent() {
        assert_eq!(pick(seen(503, false), ProbeOutcome::UNREACHABLE), seen(503, false));
        assert_eq!(
            pick(ProbeOutcome::UNREACHABLE, ProbeOutcome::UNREACHABLE),
            ProbeOutcome::UNREACHABLE
        );
    }

    #[test]
    fn probe_result_serializes_flat() {
        let result = ProbeResult::new(
            ResolutionResult {
                subdomain: "www.example.com".into(),
                record_type: crate::dns::RecordKind::A,
                addresses: Some(vec!["93.184.216.34".into()]),
            },
            ProbeOutcome {
                status: Some(200),
                reachable: true,
            },
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["subdomain"], "www.example.com");
        assert_eq!(value["type"], "A");
        assert_eq!(value["httpStatus"], 200);
        assert_eq!(value["httpReachable"], true);
    }
}
