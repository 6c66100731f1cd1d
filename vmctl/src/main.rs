//! Entry point for the `vmctl` command-line tool.

use std::path::Path;
use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vmctl::error::UsageError;
use vmctl::{cli, commands, interrupt, Console, ControllerConfig, ExitStatus};
use vmctl_client::VmrunClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VMCTL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program = args
        .first()
        .and_then(|p| Path::new(p).file_name())
        .map_or_else(|| "vmctl".to_owned(), |p| p.to_string_lossy().into_owned());
    let console = Console::stdio();

    let invocation = match cli::parse(args.get(1..).unwrap_or_default()) {
        Ok(invocation) => invocation,
        Err(e) => {
            if !matches!(e, UsageError::HelpRequested) {
                console.error(&e);
            }
            console.raw(&cli::usage(&program));
            return ExitStatus::Failure.into();
        }
    };

    let config = match ControllerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            console.error(&e);
            return ExitStatus::Failure.into();
        }
    };
    let console = console.report_soft_errors(config.report_soft_errors);

    let cancel = CancellationToken::new();
    if invocation.interruptible() {
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if interrupt::watch(tokio::signal::ctrl_c, on_interrupt).await {
                std::process::exit(interrupt::INTERRUPTED_EXIT_CODE);
            }
        });
    }

    let client = VmrunClient::new(config.host.clone());
    commands::execute(&client, &invocation, &config, &console, &cancel)
        .await
        .into()
}
