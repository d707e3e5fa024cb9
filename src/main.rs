use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use tokio::signal;
use tome::adapters::{BooksClient, SqliteStore, TelegramClient};
use tome::bot::BotService;
use tome::config::AppConfig;
use tome::domain::RankedChoices;
use tome::error::Result;
use tome::voting;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tome", about = "Book club bot: submissions, ranked-choice voting, meetings")]
struct Cli {
    /// Directory holding default.toml and environment overrides
    #[arg(long, default_value = "config")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default)
    Run,
    /// Re-tabulate a meeting's recorded ballots and print each round
    Tally {
        /// Meeting number
        meeting: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;
    init_logging(&config.logging.level);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(config).await,
        Commands::Tally { meeting } => run_tally(config, meeting).await,
    }
}

async fn run_bot(config: AppConfig) -> Result<()> {
    let store = SqliteStore::new(&config.database.url, config.database.max_connections).await?;
    store.migrate().await?;
    info!("Database ready at {}", config.database.url);

    let telegram = TelegramClient::new(&config.telegram.token);
    let books = BooksClient::new(&config.catalog);
    let service = BotService::new(&config, store, telegram, books);

    tokio::select! {
        result = service.run() => result,
        _ = shutdown_signal() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

async fn run_tally(config: AppConfig, meeting_id: i64) -> Result<()> {
    let store = SqliteStore::new(&config.database.url, config.database.max_connections).await?;
    store.migrate().await?;

    let submissions = store.submissions(meeting_id).await?;
    let ballots = store.ballots(meeting_id).await?;
    let candidates: BTreeSet<i64> = submissions.iter().map(|s| s.submission_id).collect();
    let choices: Vec<RankedChoices> = ballots.iter().map(|b| b.choices).collect();

    let tabulation = voting::instant_runoff(&candidates, &choices)?;
    for (index, round) in tabulation.rounds.iter().enumerate() {
        println!("Round {}:", index + 1);
        for (candidate, votes) in &round.tallies {
            println!("  #{} -> {} vote(s)", candidate, votes);
        }
        if let Some(eliminated) = round.eliminated {
            println!("  eliminated #{}", eliminated);
        }
    }
    println!("Winner: submission #{}", tabulation.winner);
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn,hyper=warn", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
