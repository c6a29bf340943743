use analytics_result::logging::init_logging;
use analytics_result::{QueryResult, ReaderSource, ResponseMetadata, Result, StreamConfig};
use anyhow::Context;
use clap::Parser;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tracing::{debug, error};

/// Demultiplex a captured analytics query response
#[derive(Parser)]
#[command(name = "analytics-result")]
#[command(
    about = "Stream a query response: rows as JSON lines on stdout, everything else on stderr",
    long_about = None
)]
struct Cli {
    /// Response document to read (stdin when omitted or "-")
    input: Option<PathBuf>,

    /// Path to a TOML stream configuration
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Read size in bytes, overriding the configuration
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Stop reading rows after this many, cancelling the query
    #[arg(long)]
    max_rows: Option<usize>,

    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {}", e);
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<StreamConfig> {
    let mut config = match &cli.config {
        Some(path) => StreamConfig::load(path)?,
        None => StreamConfig::default(),
    }
    .with_env_overrides()?;
    if let Some(chunk_size) = cli.chunk_size {
        config = config.with_read_chunk_size(chunk_size);
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = load_config(&cli)?;
    debug!(?config, "stream configuration");

    let reader: Box<dyn AsyncRead + Send + Unpin> = match &cli.input {
        Some(path) if path.as_os_str() != "-" => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        _ => Box::new(tokio::io::stdin()),
    };
    let source = ReaderSource::new(reader, config.read_chunk_size);
    let result = QueryResult::open(source, ResponseMetadata::default(), &config).await;

    if !result.request_id().is_empty() {
        eprintln!("requestID: {}", result.request_id());
    }
    if let Some(handle) = result.handle() {
        eprintln!("handle: {}", handle.uri());
    }

    let (printed, _, _) = tokio::join!(
        print_rows(result.rows(), cli.max_rows),
        print_entries(result.errors(), "error"),
        print_entries(result.warnings(), "warning"),
    );
    let printed = printed?;
    debug!(rows = printed, "rows written");

    match result.signature().await {
        Ok(Some(signature)) => eprintln!("signature: {}", signature),
        Ok(None) => {}
        Err(e) => eprintln!("signature: {}", e.user_message()),
    }
    match result.info().await {
        Ok(Some(metrics)) => eprintln!("metrics: {}", serde_json::to_string(&metrics)?),
        Ok(None) => {}
        Err(e) => eprintln!("metrics: {}", e.user_message()),
    }

    let status = result.status().await;
    let final_success = result.final_success().await;
    eprintln!("status: {}", status);
    Ok(final_success)
}

async fn print_rows(
    mut rows: BoxStream<'static, Result<analytics_result::Row>>,
    max_rows: Option<usize>,
) -> anyhow::Result<usize> {
    let mut printed = 0;
    while max_rows != Some(printed) {
        match rows.next().await {
            Some(Ok(row)) => {
                println!("{}", serde_json::to_string(&row)?);
                printed += 1;
            }
            Some(Err(e)) => {
                eprintln!("rows: {}", e.user_message());
                break;
            }
            None => break,
        }
    }
    Ok(printed)
}

async fn print_entries(
    mut entries: BoxStream<'static, Result<analytics_result::ErrorEntry>>,
    label: &str,
) {
    while let Some(entry) = entries.next().await {
        match entry {
            Ok(entry) => eprintln!("{}: {}", label, entry),
            Err(e) => {
                eprintln!("{}s: {}", label, e.user_message());
                break;
            }
        }
    }
}
