pub mod factory;
pub mod registry;
pub mod store;

pub use registry::{CommandEntry, CommandRegistry, RegisterError};
pub use store::{JsonFileStore, MemoryStore, StateStore};

use std::{borrow::ToOwned, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Twitch rejects chat lines longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Outbound half of the chat transport.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn say(&self, channel: &str, text: &str) -> Result<()>;
}

/// Per-message metadata supplied by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub username: String,
    pub is_moderator: bool,
    pub has_broadcaster_badge: bool,
    pub message_id: String,
    pub timestamp: OffsetDateTime,
}

impl Invocation {
    /// The channel owner either carries the badge or chats under the channel's login.
    #[must_use]
    pub fn is_broadcaster(&self, channel: &str) -> bool {
        self.has_broadcaster_badge
            || self
                .username
                .eq_ignore_ascii_case(channel.trim_start_matches('#'))
    }

    #[must_use]
    pub fn can_moderate(&self, channel: &str) -> bool {
        self.is_moderator || self.is_broadcaster(channel)
    }
}

#[derive(Clone)]
pub struct CommandContext {
    pub chat: Arc<dyn ChatSender>,
    pub channel: String,
    pub invocation: Invocation,
    /// Registration data of the command being run, including its `config`.
    pub spec: CommandSpec,
    /// The chat line exactly as received, before normalization.
    pub raw_text: String,
    pub registry: CommandRegistry,
}

impl core::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandContext")
            .field("channel", &self.channel)
            .field("invocation", &self.invocation)
            .field("command", &self.spec.name)
            .field("raw_text", &self.raw_text)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;
    fn help(&self) -> &'static str;

    /// Runs the command. `Ok(false)` reports a handled-but-unsuccessful
    /// invocation (bad arguments and the like); errors are logged by the caller.
    async fn run(&self, ctx: &CommandContext, args: &str) -> Result<bool>;
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandSpec {
    pub name: String,
    pub trigger: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled_true")]
    pub enabled: bool,
    #[serde(default)]
    pub mod_only: bool,
    #[serde(default)]
    pub config: serde_yaml::Value,
}

const fn enabled_true() -> bool {
    true
}

impl CommandSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, trigger: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trigger: trigger.into(),
            description: String::new(),
            enabled: true,
            mod_only: false,
            config: serde_yaml::Value::default(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub const fn mod_only(mut self, mod_only: bool) -> Self {
        self.mod_only = mod_only;
        self
    }
}

pub fn str_config(spec: &CommandSpec, key: &str) -> Option<String> {
    spec.config
        .get(key)
        .and_then(|v| v.as_str())
        .map(ToOwned::to_owned)
}

#[must_use]
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[must_use]
pub fn sanitize_line(s: &str, max: usize) -> String {
    let compact = s.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&compact, max)
}

/// Send a reply to the channel the command was invoked from.
///
/// # Errors
///
/// Returns the transport error if the message could not be sent.
pub async fn send_text(ctx: &CommandContext, text: impl Into<String>) -> Result<()> {
    let text = sanitize_line(&text.into(), MAX_MESSAGE_CHARS);
    ctx.chat.say(&ctx.channel, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn invocation(username: &str, is_moderator: bool, badge: bool) -> Invocation {
        Invocation {
            username: username.to_owned(),
            is_moderator,
            has_broadcaster_badge: badge,
            message_id: "id".to_owned(),
            timestamp: datetime!(2024-01-01 0:00 UTC),
        }
    }

    #[test]
    fn broadcaster_matches_channel_login() {
        let inv = invocation("SomeStreamer", false, false);
        assert!(inv.is_broadcaster("#somestreamer"));
        assert!(inv.can_moderate("somestreamer"));
        assert!(!inv.can_moderate("otherchannel"));
    }

    #[test]
    fn badge_or_mod_flag_grants_moderation() {
        assert!(invocation("viewer", false, true).can_moderate("chan"));
        assert!(invocation("viewer", true, false).can_moderate("chan"));
        assert!(!invocation("viewer", false, false).can_moderate("chan"));
    }

    #[test]
    fn sanitize_collapses_and_truncates() {
        assert_eq!(sanitize_line("a   b\n c", 100), "a b c");
        assert_eq!(sanitize_line("abcdef", 3), "abc");
    }

    #[test]
    fn spec_defaults_from_yaml() {
        let spec: CommandSpec = serde_yaml::from_str("name: dice\ntrigger: '!dice'\n").unwrap();
        assert!(spec.enabled);
        assert!(!spec.mod_only);
        assert!(spec.description.is_empty());
    }
}
