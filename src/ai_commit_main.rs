use std::process;

use clap::Parser;
use zvezda::cli::ai_commit::AiCommitCommand;

/// Commit pending changes with an AI-written message, then push.
#[derive(Parser)]
#[command(name = "ai_commit", version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    command: AiCommitCommand,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = args.command.execute().await {
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  Caused by: {cause}");
        }
        process::exit(1);
    }
}
