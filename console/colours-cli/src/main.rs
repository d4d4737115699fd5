mod commands;
mod render;

use anyhow::Context;
use clap::Parser;
use colours::gateway::{Gateway, HttpTransport};
use colours::stores::{GuildStore, NotificationStore, SessionStore};
use colours::{config, init, storage::DurableStore};
use commands::{Command, Console};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "colours")]
#[command(about = "Manage the colour roles of your Discord guilds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file. Defaults to $COLOURS_CONFIG, then /etc/colours/$COLOURS_ENV
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config::get_config_path().into());
    let config = config::load_config(&path)?;
    init::init(&config);

    let storage: Arc<dyn DurableStore> = Arc::new(
        colours::storage::init(&config.storage_path).context("Failed to open durable storage")?,
    );
    let http = init::http_client(&config).context("Failed to create the HTTP client")?;
    let gateway = Gateway::new(HttpTransport::new(
        http,
        config.graphql_url(),
        Arc::clone(&storage),
    ));

    let notifications = NotificationStore::new(config.notifications.expiry());
    let console = Console {
        session: SessionStore::new(
            gateway.clone(),
            storage,
            notifications.clone(),
            config.session.clone(),
            &cli.command.route(),
        ),
        guilds: GuildStore::new(gateway, notifications.clone()),
        notifications,
        sign_out_delay: config.session.sign_out_delay(),
    };

    console.run(cli.command).await
}
