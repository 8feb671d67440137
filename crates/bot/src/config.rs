use core::time::Duration;
use std::{fs, path::Path};

use anyhow::{Context as _, Result, ensure};
use command_core::CommandSpec;
use dispatch::DispatchConfig;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub(crate) struct BotConfig {
    /// Marker every command line starts with.
    pub(crate) prefix: String,
    pub(crate) dedup_ttl_secs: u64,
    pub(crate) cooldown_secs: u64,
    pub(crate) handler_timeout_secs: u64,
    pub(crate) sweep_interval_secs: u64,
    pub(crate) commands: Vec<CommandOverride>,
}

impl Default for BotConfig {
    fn default() -> Self {
        let dispatch = DispatchConfig::default();
        Self {
            prefix: "!".to_owned(),
            dedup_ttl_secs: dispatch.dedup_ttl.as_secs(),
            cooldown_secs: dispatch.cooldown.as_secs(),
            handler_timeout_secs: dispatch.handler_timeout.as_secs(),
            sweep_interval_secs: dispatch.sweep_interval.as_secs(),
            commands: Vec::new(),
        }
    }
}

impl BotConfig {
    pub(crate) const fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            dedup_ttl: Duration::from_secs(self.dedup_ttl_secs),
            cooldown: Duration::from_secs(self.cooldown_secs),
            handler_timeout: Duration::from_secs(self.handler_timeout_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}

/// Per-command settings from the `commands:` list. Unset fields keep the
/// command's built-in default.
#[derive(Debug, Deserialize, Clone, Default)]
pub(crate) struct CommandOverride {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) trigger: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) enabled: Option<bool>,
    #[serde(default)]
    pub(crate) mod_only: Option<bool>,
    #[serde(default)]
    pub(crate) config: serde_yaml::Value,
}

impl CommandOverride {
    pub(crate) fn apply(&self, spec: &mut CommandSpec) {
        if let Some(trigger) = &self.trigger {
            spec.trigger.clone_from(trigger);
        }
        if let Some(description) = &self.description {
            spec.description.clone_from(description);
        }
        if let Some(enabled) = self.enabled {
            spec.enabled = enabled;
        }
        if let Some(mod_only) = self.mod_only {
            spec.mod_only = mod_only;
        }
        if !self.config.is_null() {
            spec.config = self.config.clone();
        }
    }
}

pub(crate) fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        info!(file = %path.display(), "No config file; using defaults");
        return Ok(BotConfig::default());
    }
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;
    let cfg: BotConfig = serde_yaml::from_str(&yaml).context("parsing YAML config")?;
    ensure!(
        !cfg.prefix.is_empty() && !cfg.prefix.chars().any(char::is_whitespace),
        "prefix must be non-empty and contain no whitespace"
    );
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&tmp.path().join("config.yaml")).unwrap();
        assert_eq!(cfg.prefix, "!");
        assert!(cfg.dispatch_config().validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(
            &path,
            "cooldown_secs: 2\ncommands:\n  - name: dice\n    trigger: '!roll'\n    enabled: false\n",
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.dispatch_config().cooldown, Duration::from_secs(2));
        assert_eq!(cfg.dedup_ttl_secs, 30);
        assert_eq!(cfg.commands.len(), 1);
        assert_eq!(cfg.commands[0].trigger.as_deref(), Some("!roll"));
    }

    #[test]
    fn rejects_whitespace_prefix() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "prefix: ' '\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn override_touches_only_set_fields() {
        let mut spec = CommandSpec::new("dice", "!dice").description("roll");
        let over = CommandOverride {
            name: "dice".to_owned(),
            mod_only: Some(true),
            ..CommandOverride::default()
        };
        over.apply(&mut spec);
        assert!(spec.mod_only);
        assert!(spec.enabled);
        assert_eq!(spec.trigger, "!dice");
        assert_eq!(spec.description, "roll");
    }
}
