mod commands;
mod config;
mod logging;
mod twitch;

use std::{io::IsTerminal as _, path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use command_core::JsonFileStore;
use dispatch::Dispatcher;
use tracing::{info, warn};
use twitch_irc::message::ServerMessage;

use crate::logging::init_tracing;
use crate::twitch::{TwitchChat, normalize_token};

#[derive(Parser, Debug)]
#[command(
    name = "twitch-command-bot",
    version,
    about = "Twitch chat bot with moderator-managed commands"
)]
struct Args {
    /// Channel to join (login name, with or without a leading `#`)
    #[arg(long, env = "TWITCH_CHANNEL")]
    channel: String,

    /// Login name of the bot account
    #[arg(long, env = "TWITCH_BOT_USERNAME")]
    username: String,

    /// Chat OAuth token (if omitted, will prompt when interactive)
    #[arg(long, env = "TWITCH_OAUTH_TOKEN")]
    token: Option<String>,

    /// YAML config with timing windows and per-command overrides
    #[arg(long, env = "BOT_CONFIG", default_value = "./config.yaml")]
    config: PathBuf,

    /// JSON file holding which commands are enabled
    #[arg(long, env = "BOT_STATE_FILE", default_value = "./command-state.json")]
    state_file: PathBuf,

    /// Directory with optional `<command>/config.yaml` files
    #[arg(long, env = "COMMANDS_DIR", default_value = "./commands")]
    commands_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so both clap and RUST_LOG can see it.
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let token = resolve_token(args.token.as_deref())?;
    let channel = args.channel.trim_start_matches('#').to_lowercase();
    let bot_login = args.username.to_lowercase();

    let config = config::load_config(&args.config)?;
    let dispatch_config = config.dispatch_config();
    dispatch_config
        .validate()
        .context("invalid timing settings in config")?;

    let store = Arc::new(JsonFileStore::new(&args.state_file));
    info!(file = %store.path().display(), "Using command state file");
    let registry = commands::build_registry(&config, store, &args.commands_dir).await;
    registry.load_persisted_state().await;

    let mut triggers = Vec::new();
    for entry in registry.list().await {
        let state = if entry.spec.enabled { "" } else { " (disabled)" };
        triggers.push(format!("{}{state}", entry.spec.trigger));
        info!(
            command = %entry.spec.name,
            trigger = %entry.spec.trigger,
            enabled = entry.spec.enabled,
            mod_only = entry.spec.mod_only,
            description = %entry.spec.description,
            "Registered command"
        );
    }
    info!(channel = %channel, triggers = ?triggers, "Registered command triggers");

    let (mut incoming, client) = twitch::connect(&bot_login, &token);
    client
        .join(channel.clone())
        .map_err(|e| anyhow!("cannot join channel {channel}: {e}"))?;
    let dispatcher = Dispatcher::new(registry, Arc::new(TwitchChat::new(client)), dispatch_config)?;
    let sweeper = dispatcher.spawn_sweeper();

    info!(channel = %channel, user = %bot_login, "Listening for chat… Press Ctrl+C to stop.");
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            message = incoming.recv() => {
                let Some(message) = message else {
                    warn!("Chat connection closed");
                    break;
                };
                if let ServerMessage::Privmsg(msg) = message {
                    let inbound = twitch::inbound(&msg, &bot_login);
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        dispatcher.dispatch(inbound).await;
                    });
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    sweeper.abort();
    Ok(())
}

fn resolve_token(arg: Option<&str>) -> Result<String> {
    // Treat empty env/arg as missing; avoid prompting in non-interactive mode.
    if let Some(token) = arg.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(normalize_token(token));
    }
    if !std::io::stdin().is_terminal() {
        return Err(anyhow!(
            "No TWITCH_OAUTH_TOKEN provided. In non-interactive mode, set TWITCH_OAUTH_TOKEN or pass --token"
        ));
    }
    warn!("No token provided via --token or TWITCH_OAUTH_TOKEN. Prompting...");
    #[cfg(feature = "rpassword")]
    {
        let token = rpassword::prompt_password("Twitch OAuth token:")
            .map_err(|e| anyhow!("Failed to read token: {e}"))?;
        Ok(normalize_token(&token))
    }
    #[cfg(not(feature = "rpassword"))]
    {
        Err(anyhow!(
            "rpassword feature is not enabled. Cannot prompt for token."
        ))
    }
}
