use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::reporting::Format;
use crate::scan::parse_concurrency;
use crate::wordlist::Mode;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Target domain to brute-force subdomains of
    #[arg(short, long)]
    pub domain: String,

    /// Wordlist size: low, mid, high or test
    #[arg(short, long, default_value = "low")]
    pub mode: Mode,

    /// Maximum number of in-flight DNS or HTTP operations (1-650, default 300)
    #[arg(short, long, value_parser = parse_concurrency)]
    pub concurrency: Option<usize>,

    /// Directory containing low.txt, mid.txt, high.txt and test.txt
    #[arg(long, env = "SUBPROBE_WORDLISTS")]
    pub wordlists: Option<PathBuf>,

    /// Query these nameservers instead of the system resolver
    #[arg(long = "nameserver")]
    pub nameservers: Vec<IpAddr>,

    /// Timeout of a single HTTP attempt in milliseconds
    #[arg(long, default_value = "1430")]
    pub timeout_ms: u64,

    /// Attempts per scheme before a host is considered unreachable
    #[arg(short, long, default_value = "2", value_parser = clap::value_parser!(u32).range(1..=10))]
    pub retries: u32,

    /// Abort the whole scan after this many seconds
    #[arg(long)]
    pub deadline: Option<u64>,

    /// Output format for the final report
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Report every resolved and probed host as it completes
    #[arg(long)]
    pub each: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
