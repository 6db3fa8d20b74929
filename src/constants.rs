use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: usize = 300;
pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 650;

pub const DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Base pause between HTTP attempts, doubled for every further attempt.
pub const BACKOFF_BASE: Duration = Duration::from_millis(275);
/// Upper bound of the random delay added on top of the backoff.
pub const BACKOFF_JITTER: Duration = Duration::from_millis(1500);
pub const HTTP_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(1155 + 275);
pub const HTTP_ATTEMPTS: u32 = 2;

pub const DEFAULT_WORDLIST_DIR: &str = "wordlists/subs";

pub static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15",
    ]
});

pub static DOMAIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_-]+\.)+[A-Za-z]{2,}$").unwrap());

pub static DIGITS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());
