use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Level};
use tracing_subscriber::EnvFilter;

use subprobe::{render, run, Args, ScanError};

fn exit_code(err: &ScanError) -> ExitCode {
    match err {
        ScanError::Configuration(_) => ExitCode::from(2),
        ScanError::Validation(_) => ExitCode::from(3),
        ScanError::Cancelled => ExitCode::from(130),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();

    let cancel = CancellationToken::new();

    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling scan");
            on_signal.cancel();
        }
    });

    if let Some(secs) = args.deadline {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(secs, "deadline reached, cancelling scan");
            on_deadline.cancel();
        });
    }

    let format = args.format;
    match run(args, cancel).await {
        Ok(report) => {
            let stdout = io::stdout();
            if let Err(e) = render(&report, format, &mut stdout.lock()) {
                eprintln!("[!] Failed to write report: {}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("[!] {}", e);
            exit_code(&e)
        }
    }
}
