use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wallet_watcher::config::{Config, FeedConfig};
use wallet_watcher::query::commands::{
    PreviewQuery, cmd_clear_cursor, cmd_cursor, cmd_preview, cmd_set_cursor,
};
use wallet_watcher::query::formatters::OutputFormat;
use wallet_watcher::repository::CursorStore;
use wallet_watcher::rpc::HeliusClient;

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Inspect and manage the wallet watcher state", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    /// Cursor file; defaults to STATE_FILE or last_sig.json
    #[arg(long)]
    state_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the last processed signature
    Cursor,
    /// Overwrite the last processed signature
    SetCursor { signature: String },
    /// Forget the last processed signature
    ClearCursor,
    /// List the alerts the watcher would send next, without sending them
    Preview {
        #[arg(long, default_value = "20")]
        limit: usize,

        #[arg(long)]
        before: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    let state_file = cli.state_file.unwrap_or_else(Config::state_file_from_env);
    let store = CursorStore::new(state_file);

    match cli.command {
        Commands::Cursor => cmd_cursor(&store, &format)?,
        Commands::SetCursor { signature } => cmd_set_cursor(&store, &signature)?,
        Commands::ClearCursor => cmd_clear_cursor(&store)?,
        Commands::Preview { limit, before } => {
            let feed = FeedConfig::from_env()?;
            let client = HeliusClient::new(&feed.helius_api_url, &feed.helius_api_key)?;
            let query = PreviewQuery {
                address: feed.watch_wallet,
                limit,
                before,
            };
            cmd_preview(&client, Box::new(client.clone()), &store, query, &format).await?;
        }
    }

    Ok(())
}
