//! apiwatch - main entry point

use apiwatch::cli::{cmd_detect, cmd_generate, Cli, Commands};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apiwatch=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            count,
            output,
            seed,
        } => cmd_generate(count, &output, seed),
        Commands::Detect {
            input,
            output,
            models,
            percentile,
            seed,
        } => cmd_detect(&input, &output, models.as_deref(), percentile, seed),
    }
}
