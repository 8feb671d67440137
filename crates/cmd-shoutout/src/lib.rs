use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use command_core::factory::CommandFactory;
use command_core::{Command, CommandContext, CommandSpec, send_text, str_config};

const DEFAULT_TEMPLATE: &str = "Go check out @{user} at https://twitch.tv/{user} !";

#[derive(Debug)]
pub struct ShoutoutFactory;

impl CommandFactory for ShoutoutFactory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("shoutout", "!so")
            .description("Shout out another streamer: !so <user>")
            .mod_only(true)
    }

    fn build(&self) -> Arc<dyn Command> {
        Arc::new(Shoutout)
    }
}

#[derive(Debug)]
pub struct Shoutout;

#[async_trait]
impl Command for Shoutout {
    fn name(&self) -> &'static str {
        "shoutout"
    }
    fn help(&self) -> &'static str {
        "Shout out a channel. Config: template (use {user})"
    }

    async fn run(&self, ctx: &CommandContext, args: &str) -> Result<bool> {
        let Some(target) = target_login(args) else {
            send_text(ctx, format!("Usage: {} <user>", ctx.spec.trigger)).await?;
            return Ok(false);
        };
        let template =
            str_config(&ctx.spec, "template").unwrap_or_else(|| DEFAULT_TEMPLATE.to_owned());
        send_text(ctx, template.replace("{user}", &target)).await?;
        Ok(true)
    }
}

/// First argument as a Twitch login: `@` stripped, lowercased, and limited to
/// the characters logins may contain.
fn target_login(args: &str) -> Option<String> {
    let raw = args.split_whitespace().next()?.trim_start_matches('@');
    let valid = !raw.is_empty() && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| raw.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_core::{ChatSender, CommandRegistry, Invocation, MemoryStore};
    use parking_lot::Mutex;
    use time::OffsetDateTime;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl ChatSender for Recorder {
        async fn say(&self, _channel: &str, text: &str) -> Result<()> {
            self.0.lock().push(text.to_owned());
            Ok(())
        }
    }

    fn context(chat: Arc<Recorder>, spec: CommandSpec) -> CommandContext {
        CommandContext {
            chat,
            channel: "chan".to_owned(),
            invocation: Invocation {
                username: "mod".to_owned(),
                is_moderator: true,
                has_broadcaster_badge: false,
                message_id: "m1".to_owned(),
                timestamp: OffsetDateTime::UNIX_EPOCH,
            },
            spec,
            raw_text: String::new(),
            registry: CommandRegistry::new("!", Arc::new(MemoryStore::new())),
        }
    }

    #[test]
    fn target_login_validates() {
        assert_eq!(target_login("@Some_Streamer extra"), Some("some_streamer".to_owned()));
        assert_eq!(target_login(""), None);
        assert_eq!(target_login("@"), None);
        assert_eq!(target_login("bad-name"), None);
    }

    #[tokio::test]
    async fn renders_configured_template() {
        let chat = Arc::new(Recorder::default());
        let mut spec = ShoutoutFactory.spec();
        spec.config = serde_yaml::from_str("template: 'Follow {user}!'").unwrap();
        let ctx = context(Arc::clone(&chat), spec);

        assert!(Shoutout.run(&ctx, "@Friend").await.unwrap());
        assert!(!Shoutout.run(&ctx, "").await.unwrap());
        assert_eq!(
            *chat.0.lock(),
            vec!["Follow friend!".to_owned(), "Usage: !so <user>".to_owned()]
        );
    }
}
