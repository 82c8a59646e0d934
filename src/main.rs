//! tgbridged - Telegram/IRC bridge daemon.
//!
//! Two independent network clients run as separate tasks and communicate
//! only through the event dispatchers and the send handles the bridge
//! router holds. Shutdown is whole-process termination.

mod bridge;
mod config;
mod dispatch;
mod error;
mod fmt;
mod irc;
mod telegram;
mod web;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::bridge::Bridge;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::irc::IrcClient;
use crate::telegram::{MessagingClient, TelegramClient};
use crate::web::WebBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "failed to load config");
        e
    })?;

    info!(
        server = %config.irc.server,
        nick = %config.irc.nick,
        "starting tgbridged"
    );

    let web = Arc::new(WebBackend::new(config.web_backend));
    let tg = Arc::new(TelegramClient::new(&config.telegram)?);
    let irc = IrcClient::new(config.irc);

    let bridge = Bridge::new(
        config.bridge,
        irc.sender(),
        Arc::clone(&tg) as Arc<dyn MessagingClient>,
        web,
    );

    let mut irc_dispatcher = Dispatcher::new();
    bridge.register_irc(&mut irc_dispatcher);
    let mut tg_dispatcher = Dispatcher::new();
    bridge.register_tg(&mut tg_dispatcher);

    tokio::spawn({
        let tg = Arc::clone(&tg);
        async move { tg.run(tg_dispatcher).await }
    });

    // The IRC engine runs on the main task; exhausting its retry budget is
    // the one fatal condition.
    if let Err(e) = irc.run(irc_dispatcher).await {
        error!(error = %e, "IRC connection permanently failed");
        std::process::exit(1);
    }
    Ok(())
}
