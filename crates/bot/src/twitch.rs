use anyhow::{Result, anyhow};
use async_trait::async_trait;
use command_core::{ChatSender, Invocation};
use dispatch::InboundMessage;
use time::OffsetDateTime;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use twitch_irc::{
    ClientConfig, SecureTCPTransport, TwitchIRCClient,
    login::StaticLoginCredentials,
    message::{PrivmsgMessage, ServerMessage},
};

pub(crate) type IrcClient = TwitchIRCClient<SecureTCPTransport, StaticLoginCredentials>;

pub(crate) fn connect(login: &str, token: &str) -> (UnboundedReceiver<ServerMessage>, IrcClient) {
    let credentials = StaticLoginCredentials::new(login.to_owned(), Some(token.to_owned()));
    IrcClient::new(ClientConfig::new_simple(credentials))
}

#[derive(Clone)]
pub(crate) struct TwitchChat {
    client: IrcClient,
}

impl core::fmt::Debug for TwitchChat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TwitchChat").finish_non_exhaustive()
    }
}

impl TwitchChat {
    pub(crate) const fn new(client: IrcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatSender for TwitchChat {
    async fn say(&self, channel: &str, text: &str) -> Result<()> {
        self.client
            .say(channel.trim_start_matches('#').to_owned(), text.to_owned())
            .await
            .map_err(|e| anyhow!("sending to #{channel}: {e}"))
    }
}

/// Tokens are accepted with or without the IRC `oauth:` prefix.
pub(crate) fn normalize_token(token: &str) -> String {
    let token = token.trim();
    token.strip_prefix("oauth:").unwrap_or(token).to_owned()
}

pub(crate) fn inbound(msg: &PrivmsgMessage, bot_login: &str) -> InboundMessage {
    let has_badge = |name: &str| msg.badges.iter().any(|b| b.name == name);
    let timestamp = OffsetDateTime::from_unix_timestamp_nanos(
        i128::from(msg.server_timestamp.timestamp_millis()) * 1_000_000,
    )
    .unwrap_or_else(|_| OffsetDateTime::now_utc());

    debug!(
        channel = %msg.channel_login,
        sender = %msg.sender.login,
        id = %msg.message_id,
        "Incoming chat message"
    );

    InboundMessage {
        channel: msg.channel_login.clone(),
        invocation: Invocation {
            username: msg.sender.login.clone(),
            is_moderator: has_badge("moderator"),
            has_broadcaster_badge: has_badge("broadcaster"),
            message_id: msg.message_id.clone(),
            timestamp,
        },
        text: msg.message_text.clone(),
        is_self: msg.sender.login.eq_ignore_ascii_case(bot_login),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_prefix_is_stripped() {
        assert_eq!(normalize_token("oauth:abc123"), "abc123");
        assert_eq!(normalize_token("  abc123\n"), "abc123");
    }
}
