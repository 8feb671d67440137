use std::{sync::Arc, time::Instant};

use anyhow::Result;
use async_trait::async_trait;

use command_core::factory::CommandFactory;
use command_core::{Command, CommandContext, CommandSpec, send_text};

#[derive(Debug)]
pub struct UptimeFactory;

impl CommandFactory for UptimeFactory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("uptime", "!uptime").description("How long the bot has been running")
    }

    fn build(&self) -> Arc<dyn Command> {
        Arc::new(Uptime {
            started: Instant::now(),
        })
    }
}

#[derive(Debug)]
pub struct Uptime {
    started: Instant,
}

#[async_trait]
impl Command for Uptime {
    fn name(&self) -> &'static str {
        "uptime"
    }
    fn help(&self) -> &'static str {
        "Show bot uptime."
    }

    async fn run(&self, ctx: &CommandContext, _args: &str) -> Result<bool> {
        let text = format!("Bot uptime: {}", humanize(self.started.elapsed().as_secs()));
        send_text(ctx, text).await?;
        Ok(true)
    }
}

fn humanize(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    match (days, hours, minutes) {
        (0, 0, 0) => format!("{seconds}s"),
        (0, 0, _) => format!("{minutes}m {seconds}s"),
        (0, _, _) => format!("{hours}h {minutes}m"),
        _ => format!("{days}d {hours}h {minutes}m"),
    }
}
