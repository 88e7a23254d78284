mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => commands::init::run(force),
        Commands::Import {
            subject,
            chart,
            born,
            lat,
            lon,
        } => commands::import::run(&subject, &chart, born, lat, lon).await,
        Commands::Resolve { subject, keys } => commands::resolve::run(&subject, &keys).await,
        Commands::Periods { subject, from, to } => {
            commands::periods::run(&subject, from.zip(to)).await
        }
        Commands::Turn {
            subject,
            user,
            assistant,
            keys,
        } => commands::turn::run(&subject, &user, &assistant, &keys).await,
        Commands::History { subject, limit } => commands::history::run(&subject, limit),
        Commands::Compact { subject } => commands::compact::run(&subject).await,
        Commands::Report => commands::report::run(),
        Commands::Status { subject } => commands::status::run(&subject),
    }
}
