use std::{collections::HashMap, path::Path, sync::Arc};

use cmd_commands::CommandsFactory;
use cmd_dice::DiceFactory;
use cmd_ping::PingFactory;
use cmd_shoutout::ShoutoutFactory;
use cmd_uptime::UptimeFactory;
use command_core::{CommandRegistry, CommandSpec, StateStore, factory::CommandFactory};
use tracing::warn;

use crate::config::BotConfig;

/// Every command the bot ships with. Adding a command means adding it here.
fn factories() -> Vec<Arc<dyn CommandFactory>> {
    vec![
        Arc::new(PingFactory),
        Arc::new(DiceFactory),
        Arc::new(CommandsFactory),
        Arc::new(UptimeFactory),
        Arc::new(ShoutoutFactory),
    ]
}

pub(crate) async fn build_registry(
    config: &BotConfig,
    store: Arc<dyn StateStore>,
    commands_dir: &Path,
) -> CommandRegistry {
    let factories = factories();
    let mut specs: Vec<CommandSpec> = Vec::new();
    let mut by_name: HashMap<String, Arc<dyn CommandFactory>> = HashMap::new();
    for factory in &factories {
        factory.register_defaults(&mut specs);
        by_name.insert(factory.spec().name, Arc::clone(factory));
    }

    for over in &config.commands {
        match specs.iter_mut().find(|s| s.name.eq_ignore_ascii_case(&over.name)) {
            Some(spec) => over.apply(spec),
            None => warn!(command = %over.name, "Config mentions unknown command; ignoring"),
        }
    }

    let registry = CommandRegistry::new(config.prefix.clone(), store);
    for mut spec in specs {
        let Some(factory) = by_name.get(&spec.name) else {
            continue;
        };
        if let Some(file_cfg) = load_command_config(commands_dir, &spec.name) {
            spec.config = merge_yaml(file_cfg, spec.config);
        }
        let name = spec.name.clone();
        if let Err(e) = registry.register(spec, factory.build()).await {
            warn!(command = %name, error = %e, "Skipping invalid command registration");
        }
    }
    registry
}

/// Deep-merges two YAML values; `file_cfg` wins on conflicting scalars.
fn merge_yaml(file_cfg: serde_yaml::Value, spec_cfg: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value::{Mapping, Null, Sequence};
    match (file_cfg, spec_cfg) {
        (Mapping(mut a), Mapping(b)) => {
            for (k, v_b) in b {
                match a.get_mut(&k) {
                    Some(v_a) => {
                        let merged = merge_yaml(v_a.clone(), v_b);
                        *v_a = merged;
                    }
                    None => {
                        a.insert(k, v_b);
                    }
                }
            }
            Mapping(a)
        }
        (Sequence(mut a), Sequence(b)) => {
            a.extend(b);
            Sequence(a)
        }
        (Null, b) => b,
        (a, _b) => a,
    }
}

fn load_command_config(root: &Path, name: &str) -> Option<serde_yaml::Value> {
    let path = root.join(name).join("config.yaml");
    match std::fs::read_to_string(&path) {
        Ok(s) => match serde_yaml::from_str::<serde_yaml::Value>(&s) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(command = %name, file = %path.display(), error = %e, "Failed to parse command config YAML");
                None
            }
        },
        Err(e) => {
            if path.exists() {
                warn!(command = %name, file = %path.display(), error = %e, "Failed to read command config file");
            }
            None
        }
    }
}
