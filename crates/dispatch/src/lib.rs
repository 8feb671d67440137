//! Routes inbound chat lines to at most one command execution.
//!
//! Per message: drop own echoes and non-commands, suppress duplicate
//! deliveries and per-user repeats, intercept the moderator toggles, then
//! resolve, authorize and run the command under a time budget.

mod admin;
mod exec;
pub mod recent;

#[cfg(test)]
mod testing;

pub use admin::AdminOutcome;
pub use exec::ExecResult;
pub use recent::{Admission, RecentMessages};

use core::time::Duration;
use std::sync::Arc;

use command_core::{ChatSender, CommandContext, CommandRegistry, Invocation};
use thiserror::Error;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};

use crate::admin::Toggle;

/// One chat line as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel: String,
    pub invocation: Invocation,
    pub text: String,
    /// Set by the transport when the bot authored the line.
    pub is_self: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnMessage,
    NotCommand,
}

/// Terminal state of a dispatched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    Duplicate,
    Cooldown,
    Admin(AdminOutcome),
    NotFound,
    Disabled,
    Unauthorized,
    Executed { command: String, result: ExecResult },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cooldown ({cooldown:?}) must not exceed the dedup window ({dedup_ttl:?})")]
    CooldownExceedsDedup {
        cooldown: Duration,
        dedup_ttl: Duration,
    },
    #[error("handler timeout must be greater than zero")]
    ZeroTimeout,
    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub dedup_ttl: Duration,
    pub cooldown: Duration,
    pub handler_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dedup_ttl: Duration::from_secs(30),
            cooldown: Duration::from_secs(5),
            handler_timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

impl DispatchConfig {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first inconsistent setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cooldown > self.dedup_ttl {
            return Err(ConfigError::CooldownExceedsDedup {
                cooldown: self.cooldown,
                dedup_ttl: self.dedup_ttl,
            });
        }
        if self.handler_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: CommandRegistry,
    chat: Arc<dyn ChatSender>,
    recent: Arc<RecentMessages>,
    config: DispatchConfig,
}

impl core::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` does not validate.
    pub fn new(
        registry: CommandRegistry,
        chat: Arc<dyn ChatSender>,
        config: DispatchConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry,
            chat,
            recent: Arc::new(RecentMessages::new(config.dedup_ttl, config.cooldown)),
            config,
        })
    }

    #[must_use]
    pub const fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Starts the periodic eviction of expired dedup/cooldown entries.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.recent.spawn_sweeper(self.config.sweep_interval)
    }

    pub async fn dispatch(&self, msg: InboundMessage) -> Outcome {
        let user = msg.invocation.username.clone();
        let outcome = self.route(msg).await;
        debug!(user = %user, outcome = ?outcome, "Dispatched chat message");
        outcome
    }

    async fn route(&self, msg: InboundMessage) -> Outcome {
        if msg.is_self {
            return Outcome::Ignored(IgnoreReason::OwnMessage);
        }
        let line = clean_line(&msg.text);
        let normalized = line.to_lowercase();
        let prefix = self.registry.prefix();
        if !normalized.starts_with(prefix) {
            return Outcome::Ignored(IgnoreReason::NotCommand);
        }

        match self.recent.admit(
            &msg.invocation.message_id,
            &msg.invocation.username,
            &normalized,
            Instant::now(),
        ) {
            Admission::Fresh => {}
            Admission::Duplicate => return Outcome::Duplicate,
            Admission::Cooldown => return Outcome::Cooldown,
        }

        let (token, args) = split_trigger(&line);
        let trigger = token.to_lowercase();
        let args = args.to_owned();

        if let Some(toggle) = Toggle::parse(&trigger, prefix) {
            return Outcome::Admin(self.admin(toggle, &args, &msg).await);
        }

        let Some(entry) = self.registry.get_by_trigger(&trigger).await else {
            return Outcome::NotFound;
        };
        if !entry.spec.enabled {
            return Outcome::Disabled;
        }
        if entry.spec.mod_only && !msg.invocation.can_moderate(&msg.channel) {
            info!(command = %entry.spec.name, user = %msg.invocation.username, "Refused mod-only command");
            self.refuse(&msg).await;
            return Outcome::Unauthorized;
        }

        let command = entry.spec.name.clone();
        let ctx = CommandContext {
            chat: Arc::clone(&self.chat),
            channel: msg.channel,
            invocation: msg.invocation,
            spec: entry.spec.clone(),
            raw_text: line,
            registry: self.registry.clone(),
        };
        let result = exec::run_with_budget(entry, ctx, args, self.config.handler_timeout).await;
        Outcome::Executed { command, result }
    }

    async fn admin(&self, toggle: Toggle, args: &str, msg: &InboundMessage) -> AdminOutcome {
        if !msg.invocation.can_moderate(&msg.channel) {
            info!(user = %msg.invocation.username, action = toggle.verb(), "Refused admin command");
            self.refuse(msg).await;
            return AdminOutcome::Refused;
        }
        let prefix = self.registry.prefix();
        let Some(target) = args.split_whitespace().next() else {
            let verb = toggle.verb();
            self.reply(&msg.channel, &format!("Usage: {prefix}{verb} <command>"))
                .await;
            return AdminOutcome::Usage;
        };
        let Some(entry) = self.registry.get(target).await else {
            self.reply(&msg.channel, &format!("No command named '{target}'."))
                .await;
            return AdminOutcome::UnknownCommand(target.to_owned());
        };

        let name = entry.spec.name;
        let enabled = toggle.enabled();
        if enabled {
            self.registry.enable(&name).await;
        } else {
            self.registry.disable(&name).await;
        }
        info!(command = %name, enabled, by = %msg.invocation.username, "Command toggled from chat");
        let verb = if enabled { "enabled" } else { "disabled" };
        self.reply(&msg.channel, &format!("Command {} {verb}.", entry.spec.trigger))
            .await;
        AdminOutcome::Toggled {
            command: name,
            enabled,
        }
    }

    async fn refuse(&self, msg: &InboundMessage) {
        let text = format!(
            "@{}, that command is for moderators only.",
            msg.invocation.username
        );
        self.reply(&msg.channel, &text).await;
    }

    async fn reply(&self, channel: &str, text: &str) {
        if let Err(e) = self.chat.say(channel, text).await {
            warn!(channel = %channel, error = %format!("{e:#}"), "Failed to send reply");
        }
    }
}

/// Twitch clients append `U+E0000` to repeated lines to get past the
/// server's duplicate filter; it carries no meaning for commands.
const DUPLICATE_FILLER: char = '\u{E0000}';

fn clean_line(text: &str) -> String {
    if text.contains(DUPLICATE_FILLER) {
        text.replace(DUPLICATE_FILLER, "").trim().to_owned()
    } else {
        text.trim().to_owned()
    }
}

/// Splits a trimmed line into its leading token and the remaining arguments.
fn split_trigger(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (line, ""),
    }
}
