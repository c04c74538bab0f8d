use std::io::IsTerminal;
use std::process;

use clap::Parser;
use hanagrow::cli::Args;
use hanagrow::config::AppConfig;
use hanagrow::logging::init_logging;
use hanagrow::output::ConsoleSink;
use hanagrow::scheduler::Supervisor;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // A missing .env is fine; values may come from the real environment.
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let colored = !args.no_color && std::io::stdout().is_terminal();
    let console = ConsoleSink::new(colored);

    if let Err(e) = run(args, &console).await {
        error!("Application error: {e:#}");
        console.error(&format!("Error: {e:#}"));
        process::exit(1);
    }
}

async fn run(args: Args, console: &ConsoleSink) -> anyhow::Result<()> {
    init_logging(args.verbose, args.quiet, std::io::stderr().is_terminal())?;
    console.intro();

    let config = AppConfig::resolve(args.raw_config(), || args.iteration_count())?;
    info!(
        iterations = config.batch.iteration_count.get(),
        proxy = config.proxy.as_deref().unwrap_or("none"),
        "Configuration loaded"
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl-C, shutting down"),
                Err(e) => {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    return;
                }
            }
            cancel.cancel();
        });
    }

    let stats = Supervisor::new(config, cancel).run(console).await;
    info!(runs = stats.runs, failures = stats.failures, "Exiting");
    Ok(())
}
