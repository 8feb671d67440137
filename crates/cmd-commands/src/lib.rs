use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use command_core::factory::CommandFactory;
use command_core::{Command, CommandContext, CommandRegistry, CommandSpec, send_text};

#[derive(Debug)]
pub struct CommandsFactory;

impl CommandFactory for CommandsFactory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("commands", "!commands").description("List available commands")
    }

    fn build(&self) -> Arc<dyn Command> {
        Arc::new(CommandList)
    }
}

#[derive(Debug)]
pub struct CommandList;

#[async_trait]
impl Command for CommandList {
    fn name(&self) -> &'static str {
        "commands"
    }
    fn help(&self) -> &'static str {
        "List commands, or describe one with !commands <cmd>. Moderators also see disabled ones and the enable/disable toggles."
    }

    async fn run(&self, ctx: &CommandContext, args: &str) -> Result<bool> {
        let moderator = ctx.invocation.can_moderate(&ctx.channel);
        let text = match args.split_whitespace().next() {
            Some(target) => match describe(&ctx.registry, target, moderator).await {
                Some(text) => text,
                None => {
                    send_text(ctx, format!("No command named '{target}'.")).await?;
                    return Ok(false);
                }
            },
            None => render(&ctx.registry, moderator).await,
        };
        send_text(ctx, text).await?;
        Ok(true)
    }
}

/// One command's trigger and description. Falls back to the handler's help
/// text when the description is empty. Mod-only commands stay hidden from
/// viewers.
async fn describe(registry: &CommandRegistry, target: &str, moderator: bool) -> Option<String> {
    let entry = match registry.get(target).await {
        Some(entry) => entry,
        None => registry.get(&format!("{}{target}", registry.prefix())).await?,
    };
    if entry.spec.mod_only && !moderator {
        return None;
    }
    let about = if entry.spec.description.is_empty() {
        entry.command.help()
    } else {
        entry.spec.description.as_str()
    };
    let mut out = format!("{}: {about}", entry.spec.trigger);
    if entry.spec.mod_only {
        out.push_str(" (moderators only)");
    }
    if !entry.spec.enabled {
        out.push_str(" (disabled)");
    }
    Some(out)
}

async fn render(registry: &CommandRegistry, moderator: bool) -> String {
    let mut enabled = Vec::new();
    let mut disabled = Vec::new();
    for entry in registry.list().await {
        if entry.spec.mod_only && !moderator {
            continue;
        }
        if entry.spec.enabled {
            enabled.push(entry.spec.trigger);
        } else {
            disabled.push(entry.spec.trigger);
        }
    }

    let mut out = if enabled.is_empty() {
        "No commands available.".to_owned()
    } else {
        format!("Commands: {}", enabled.join(", "))
    };
    if moderator {
        if !disabled.is_empty() {
            out.push_str(&format!(" | disabled: {}", disabled.join(", ")));
        }
        let prefix = registry.prefix();
        out.push_str(&format!(" | {prefix}enable <cmd>, {prefix}disable <cmd>"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_core::MemoryStore;

    async fn registry() -> CommandRegistry {
        let registry = CommandRegistry::new("!", Arc::new(MemoryStore::new()));
        for spec in [
            CommandSpec::new("ping", "!ping").description("Check that the bot is alive"),
            CommandSpec::new("dice", "!dice"),
            CommandSpec::new("so", "!so").mod_only(true),
        ] {
            registry.register(spec, Arc::new(CommandList)).await.unwrap();
        }
        registry.disable("dice").await;
        registry
    }

    #[tokio::test]
    async fn viewers_see_enabled_public_commands() {
        let registry = registry().await;
        assert_eq!(render(&registry, false).await, "Commands: !ping");
    }

    #[tokio::test]
    async fn describes_single_command() {
        let registry = registry().await;
        assert_eq!(
            describe(&registry, "!ping", false).await.as_deref(),
            Some("!ping: Check that the bot is alive")
        );
        assert_eq!(
            describe(&registry, "dice", true).await.as_deref(),
            Some("!dice: List commands, or describe one with !commands <cmd>. Moderators also see disabled ones and the enable/disable toggles. (disabled)")
        );
        assert!(describe(&registry, "so", false).await.is_none());
        assert_eq!(
            describe(&registry, "so", true).await.as_deref(),
            Some("!so: List commands, or describe one with !commands <cmd>. Moderators also see disabled ones and the enable/disable toggles. (moderators only)")
        );
        assert!(describe(&registry, "missing", true).await.is_none());
    }

    #[tokio::test]
    async fn moderators_see_everything() {
        let registry = registry().await;
        assert_eq!(
            render(&registry, true).await,
            "Commands: !ping, !so | disabled: !dice | !enable <cmd>, !disable <cmd>"
        );
    }
}
