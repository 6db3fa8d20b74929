pub mod args;
mod constants;
pub mod dns;
pub mod error;
pub mod probe;
pub mod progress;
pub mod reporting;
pub mod scan;
pub mod scheduler;
pub mod wordlist;

pub use args::Args;
pub use dns::{resolve, DnsResolver, QueryOutcome, RecordKind, RecordLookup, ResolutionResult};
pub use error::{ConfigurationError, ScanError, SinkError, TaskFailure, ValidationError};
pub use probe::{HttpProber, ProbeOutcome, ProbeResult, Reachability, RetryPolicy};
pub use progress::{ConsoleSink, Progress, ProgressSink, TracingSink};
pub use reporting::{render, Format};
pub use scan::{
    parse_concurrency, validate_domain, ScanConfig, ScanOptions, ScanReport, ScanSummary, Scanner,
};
pub use scheduler::run_bounded;
pub use wordlist::{Mode, WordlistSource};

pub use constants::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY};

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Brute-forces `<label>.<domain>` for every label of the `mode` wordlist
/// using the system resolver and default HTTP retry settings.
///
/// Input is validated before anything touches the network.
pub async fn find_subdomains(
    domain: &str,
    mode: Mode,
    sink: Arc<dyn ProgressSink>,
    options: ScanOptions,
) -> Result<ScanReport, ScanError> {
    validate_domain(domain)?;
    options.effective_concurrency()?;

    let config = ScanConfig::default();
    let lookup = DnsResolver::from_system()?.with_query_timeout(config.dns_timeout);
    let prober = HttpProber::new(config.retry.clone())?;
    let scanner = Scanner::new(Arc::new(lookup), Arc::new(prober), config);

    let progress = Progress::spawn(sink);
    let report = scanner
        .scan(domain, mode, &options, &progress, &CancellationToken::new())
        .await;
    progress.flush().await;
    report
}

/// Command-line driver: builds the scanner from `args` and runs one scan.
pub async fn run(args: Args, cancel: CancellationToken) -> Result<ScanReport, ScanError> {
    validate_domain(&args.domain)?;
    let options = ScanOptions {
        concurrency: args.concurrency,
    };
    let concurrency = options.effective_concurrency()?;

    let mut config = ScanConfig {
        notify_each: args.each,
        ..ScanConfig::default()
    };
    if let Some(dir) = &args.wordlists {
        config.wordlists = WordlistSource::new(dir);
    }
    config.retry.attempts = args.retries;
    config.retry.attempt_timeout = Duration::from_millis(args.timeout_ms);

    info!(
        domain = %args.domain,
        mode = %args.mode,
        concurrency,
        wordlists = %config.wordlists.dir().display(),
        nameservers = ?args.nameservers,
        attempt_timeout_ms = args.timeout_ms,
        attempts = args.retries,
        "configuration"
    );

    let lookup = if args.nameservers.is_empty() {
        DnsResolver::from_system()?
    } else {
        DnsResolver::with_nameservers(&args.nameservers)?
    }
    .with_query_timeout(config.dns_timeout);
    let prober = HttpProber::new(config.retry.clone())?;
    let scanner = Scanner::new(Arc::new(lookup), Arc::new(prober), config);

    let sink: Arc<dyn ProgressSink> = match args.format {
        Format::Text => Arc::new(ConsoleSink),
        Format::Json | Format::Csv => Arc::new(TracingSink),
    };
    let progress = Progress::spawn(sink);

    let report = scanner
        .scan(&args.domain, args.mode, &options, &progress, &cancel)
        .await;
    progress.flush().await;
    report
}
