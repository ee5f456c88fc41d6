//! Warezbot daemon entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use warezbot_core::network::{EmbyClient, RadarrClient, SlackClient};
use warezbot_core::{Dispatcher, Settings, TaskLauncher};
use warezbot_daemon::{build_router, logging, HttpsDaemon, Timeouts, TlsMaterial};

#[derive(Parser, Debug)]
#[command(name = "warezbot")]
#[command(about = "Slack bot bridging Emby and Radarr over TLS webhooks")]
struct Args {
    /// Address to listen on; ":port" binds all interfaces
    #[arg(long, default_value = ":3000")]
    http_listen: String,

    /// File receiving one JSON line per request
    #[arg(long, default_value = "/var/log/request.log")]
    request_log: PathBuf,

    /// JSON config file
    #[arg(long, default_value = "./daemon/config.json")]
    config_file: PathBuf,

    /// Force debug logging regardless of the configured level
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(&args.config_file).with_context(|| {
        format!("failed to load config {}", args.config_file.display())
    })?;

    let level = if args.debug {
        LevelFilter::DEBUG
    } else {
        logging::level_from_name(&settings.log_level)
    };
    logging::init(level, &args.request_log);

    info!("Starting warezbot");

    let messenger = Arc::new(SlackClient::new(&settings.slack)?);
    let media = Arc::new(EmbyClient::new(&settings.emby)?);
    let acquisition = Arc::new(RadarrClient::new(&settings.radarr)?);
    let dispatcher = Dispatcher::new(
        messenger,
        media,
        acquisition,
        TaskLauncher::new(settings.max_detached_tasks),
    );

    let router = build_router(dispatcher, &settings.slack.event_path);
    let daemon = HttpsDaemon::new(
        &TlsMaterial::from(&settings.tls),
        router,
        Timeouts::from(&settings.http),
    )?;
    daemon.run(&args.http_listen).await?;

    info!("Warezbot stopped");
    Ok(())
}
