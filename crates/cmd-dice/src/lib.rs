use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng as _;
use serde::Deserialize;

use command_core::factory::CommandFactory;
use command_core::{Command, CommandContext, CommandSpec, send_text};

#[derive(Debug)]
pub struct DiceFactory;

impl CommandFactory for DiceFactory {
    fn spec(&self) -> CommandSpec {
        CommandSpec::new("dice", "!dice").description("Roll a die: !dice [sides]")
    }

    fn build(&self) -> Arc<dyn Command> {
        Arc::new(Dice)
    }
}

/// Config keys: `default_sides`, `max_sides`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct DiceConfig {
    default_sides: u32,
    max_sides: u32,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            default_sides: 6,
            max_sides: 1000,
        }
    }
}

#[derive(Debug)]
pub struct Dice;

#[async_trait]
impl Command for Dice {
    fn name(&self) -> &'static str {
        "dice"
    }
    fn help(&self) -> &'static str {
        "Roll a die. Config: default_sides, max_sides"
    }

    async fn run(&self, ctx: &CommandContext, args: &str) -> Result<bool> {
        let cfg: DiceConfig = serde_yaml::from_value(ctx.spec.config.clone()).unwrap_or_default();
        let user = &ctx.invocation.username;
        let Some(sides) = parse_sides(args, &cfg) else {
            send_text(
                ctx,
                format!(
                    "@{user} usage: {} [sides], sides between 2 and {}",
                    ctx.spec.trigger, cfg.max_sides
                ),
            )
            .await?;
            return Ok(false);
        };
        let roll = rand::thread_rng().gen_range(1..=sides);
        send_text(ctx, format!("@{user} rolled a {roll} (d{sides}) 🎲")).await?;
        Ok(true)
    }
}

fn parse_sides(args: &str, cfg: &DiceConfig) -> Option<u32> {
    let sides = match args.split_whitespace().next() {
        None => cfg.default_sides,
        Some(raw) => raw.trim_start_matches(['d', 'D']).parse().ok()?,
    };
    (2..=cfg.max_sides).contains(&sides).then_some(sides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_default_and_parse() {
        let cfg = DiceConfig::default();
        assert_eq!(parse_sides("", &cfg), Some(6));
        assert_eq!(parse_sides("20", &cfg), Some(20));
        assert_eq!(parse_sides("d12 extra", &cfg), Some(12));
    }

    #[test]
    fn sides_out_of_range_or_garbage() {
        let cfg = DiceConfig {
            default_sides: 6,
            max_sides: 100,
        };
        assert_eq!(parse_sides("1", &cfg), None);
        assert_eq!(parse_sides("101", &cfg), None);
        assert_eq!(parse_sides("lots", &cfg), None);
        assert_eq!(parse_sides("-4", &cfg), None);
    }

    #[test]
    fn config_fills_missing_keys() {
        let cfg: DiceConfig = serde_yaml::from_str("max_sides: 20").unwrap();
        assert_eq!(cfg.default_sides, 6);
        assert_eq!(cfg.max_sides, 20);
    }
}
