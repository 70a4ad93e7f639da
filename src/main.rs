//! CLI entry point for parley.

mod cli;

use clap::Parser;
use cli::{Args, Command};
use parley::api::{ChatCompletionsAdapter, ProtocolAdapter};
use parley::config::{load_config_with_diagnostics, Config};
use parley::error::ParleyError;
use parley::history::Compactor;
use parley::session::{CheckpointGateway, FileCheckpointStore, Session};
use parley::tokens::TokenAccountant;
use parley::types::SessionTag;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PARLEY_LOG";
const LAST_TAG: &str = "last";

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging();

    if let Err(err) = run(args).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<(), ParleyError> {
    let config = load_config_with_diagnostics(args.config.as_deref())?.config;
    let store = FileCheckpointStore::open(&config.checkpoint.dir).await?;

    match args.command {
        Command::Stats { tag } => {
            let session = restore(&store, &tag).await?;
            print_stats(&session);
        }
        Command::Compact { tag, dry_run } => {
            let mut session = restore(&store, &tag).await?;
            compact(&config, &store, &mut session, dry_run).await?;
        }
        Command::Render { tag } => {
            let session = restore(&store, &tag).await?;
            let request =
                ChatCompletionsAdapter::new().render_request(&session.history, &config.generation);
            let text = serde_json::to_string_pretty(&request).map_err(ParleyError::Render)?;
            println!("{text}");
        }
    }
    Ok(())
}

async fn restore(store: &FileCheckpointStore, raw: &str) -> Result<Session, ParleyError> {
    let tag = if raw == LAST_TAG {
        store.latest().await?.ok_or(ParleyError::NoCheckpoint)?
    } else {
        SessionTag::parse(raw)?
    };
    Ok(Session::restore(store, tag).await?)
}

fn print_stats(session: &Session) {
    let accountant = TokenAccountant::shared();
    let tag = session.tag.as_ref().map(SessionTag::as_str).unwrap_or("-");
    println!("tag:    {tag}");
    println!("turns:  {}", session.history.len());
    println!("tokens: {}", accountant.cost_of_history(&session.history));
}

async fn compact(
    config: &Config,
    store: &FileCheckpointStore,
    session: &mut Session,
    dry_run: bool,
) -> Result<(), ParleyError> {
    let compactor = Compactor::new(config.history.clone(), TokenAccountant::shared().clone());
    let report = compactor.compact(session);
    println!(
        "{}: {} -> {} tokens, {} -> {} turns ({} compressed)",
        report.action.as_str(),
        report.tokens_before,
        report.tokens_after,
        report.turns_before,
        report.turns_after,
        report.compressed_turns
    );
    if dry_run || !report.changed() {
        return Ok(());
    }
    let tag = session.persist(store).await?;
    println!("saved checkpoint {tag}");
    Ok(())
}
