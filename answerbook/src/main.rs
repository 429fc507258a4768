use std::sync::Arc;

use anyhow::Result;
use answerbook::cli::{Cli, Commands};
use answerbook::{AppContext, commands, logging};
use answerbook_core::{RemoteFileStore, UpsertMode};
use answerbook_extensions::github::GitHubContentsClient;
use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap so `env = ...` defaults see it.
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet)?;

    let cx = AppContext::new(cli.settings(), open_store());
    debug!(settings = ?cx.settings, "Context ready");

    match cli.command {
        Commands::Serve(args) => commands::handle_serve(args, cx).await?,
        Commands::Create(args) => commands::handle_upsert(UpsertMode::Create, args, cx).await?,
        Commands::Update(args) => commands::handle_upsert(UpsertMode::Update, args, cx).await?,
        Commands::Show(args) => commands::handle_show(args, cx).await?,
    }

    Ok(())
}

fn open_store() -> Result<Arc<dyn RemoteFileStore>> {
    let client = GitHubContentsClient::from_env()?;
    debug!(owner = client.config().owner(), repo = client.config().repo(), "Using GitHub contents API");
    Ok(Arc::new(client))
}
