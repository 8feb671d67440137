use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use command_core::factory::CommandFactory;
use command_core::{Command, CommandContext, CommandSpec, send_text};

#[derive(Debug)]
pub struct PingFactory;

impl CommandFactory for PingFactory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("ping", "!ping").description("Check that the bot is alive")
    }

    fn build(&self) -> Arc<dyn Command> {
        Arc::new(Ping)
    }
}

#[derive(Debug)]
pub struct Ping;

#[async_trait]
impl Command for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }
    fn help(&self) -> &'static str {
        "🏓"
    }

    async fn run(&self, ctx: &CommandContext, _args: &str) -> Result<bool> {
        send_text(ctx, format!("@{} Pong! 🏓", ctx.invocation.username)).await?;
        Ok(true)
    }
}
