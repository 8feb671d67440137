use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    Command, CommandSpec,
    store::{EnabledMap, StateStore},
};

#[derive(Clone)]
pub struct CommandEntry {
    pub spec: CommandSpec,
    pub command: Arc<dyn Command>,
}

impl core::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("command name must not be empty")]
    EmptyName,
    #[error("command '{name}' has an empty trigger")]
    EmptyTrigger { name: String },
    #[error("trigger '{trigger}' of command '{name}' contains whitespace")]
    TriggerWhitespace { name: String, trigger: String },
    #[error("a command named '{0}' is already registered")]
    DuplicateName(String),
    #[error("trigger '{trigger}' is already taken by command '{owner}'")]
    TriggerTaken { trigger: String, owner: String },
}

#[derive(Default)]
struct RegistryInner {
    by_name: HashMap<String, CommandEntry>,
    by_trigger: HashMap<String, String>, // trigger -> name
    order: Vec<String>,
}

impl RegistryInner {
    fn enabled_map(&self) -> EnabledMap {
        self.by_name
            .iter()
            .map(|(name, entry)| (name.clone(), entry.spec.enabled))
            .collect()
    }

    fn lookup(&self, key: &str) -> Option<&CommandEntry> {
        self.by_trigger
            .get(key)
            .and_then(|name| self.by_name.get(name))
            .or_else(|| self.by_name.get(key))
    }
}

/// The set of known commands and their enabled state.
///
/// Cheap to clone; every clone shares the same underlying registry.
#[derive(Clone)]
pub struct CommandRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    store: Arc<dyn StateStore>,
    // Held across snapshot + write so persisted files land in toggle order.
    persist_lock: Arc<Mutex<()>>,
    prefix: Arc<str>,
}

impl core::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl CommandRegistry {
    /// The prefix is stored lowercased; chat lines and triggers are compared
    /// in lowercase.
    pub fn new(prefix: impl Into<String>, store: Arc<dyn StateStore>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner::default())),
            store,
            persist_lock: Arc::new(Mutex::new(())),
            prefix: Arc::from(prefix.into().trim().to_lowercase()),
        }
    }

    /// The command marker every trigger starts with.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Adds a command. The first command to claim a name or trigger keeps it.
    ///
    /// # Errors
    ///
    /// Returns a [`RegisterError`] when the spec is incomplete or collides with
    /// an existing registration; the registry is left unchanged.
    pub async fn register(
        &self,
        mut spec: CommandSpec,
        command: Arc<dyn Command>,
    ) -> Result<(), RegisterError> {
        spec.name = normalize_name(&spec.name);
        if spec.name.is_empty() {
            return Err(RegisterError::EmptyName);
        }
        if spec.trigger.trim().is_empty() {
            return Err(RegisterError::EmptyTrigger { name: spec.name });
        }
        spec.trigger = normalize_trigger(&self.prefix, &spec.trigger);
        if spec.trigger.chars().any(char::is_whitespace) {
            return Err(RegisterError::TriggerWhitespace {
                name: spec.name,
                trigger: spec.trigger,
            });
        }

        let mut inner = self.inner.write().await;
        if inner.by_name.contains_key(&spec.name) {
            return Err(RegisterError::DuplicateName(spec.name));
        }
        if let Some(owner) = inner.by_trigger.get(&spec.trigger) {
            return Err(RegisterError::TriggerTaken {
                trigger: spec.trigger,
                owner: owner.clone(),
            });
        }
        debug!(command = %spec.name, trigger = %spec.trigger, "Registered command");
        inner
            .by_trigger
            .insert(spec.trigger.clone(), spec.name.clone());
        inner.order.push(spec.name.clone());
        inner
            .by_name
            .insert(spec.name.clone(), CommandEntry { spec, command });
        Ok(())
    }

    /// Looks a command up by trigger first, then by name.
    pub async fn get(&self, trigger_or_name: &str) -> Option<CommandEntry> {
        let key = trigger_or_name.trim().to_lowercase();
        let inner = self.inner.read().await;
        inner.lookup(&key).cloned()
    }

    /// Exact trigger lookup, as used by chat dispatch.
    pub async fn get_by_trigger(&self, trigger: &str) -> Option<CommandEntry> {
        let inner = self.inner.read().await;
        inner
            .by_trigger
            .get(trigger)
            .and_then(|name| inner.by_name.get(name))
            .cloned()
    }

    /// All commands in registration order.
    pub async fn list(&self) -> Vec<CommandEntry> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|name| inner.by_name.get(name))
            .cloned()
            .collect()
    }

    pub async fn is_enabled(&self, name: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .by_name
            .get(&normalize_name(name))
            .is_some_and(|entry| entry.spec.enabled)
    }

    /// Returns whether a command with this name exists.
    pub async fn enable(&self, name: &str) -> bool {
        self.set_enabled(name, true).await
    }

    /// Returns whether a command with this name exists.
    pub async fn disable(&self, name: &str) -> bool {
        self.set_enabled(name, false).await
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let name = normalize_name(name);
        let _persist = self.persist_lock.lock().await;
        let snapshot = {
            let mut inner = self.inner.write().await;
            let Some(entry) = inner.by_name.get_mut(&name) else {
                return false;
            };
            if entry.spec.enabled == enabled {
                return true;
            }
            entry.spec.enabled = enabled;
            inner.enabled_map()
        };
        info!(command = %name, enabled, "Command state changed");
        if let Err(e) = self.store.save(&snapshot) {
            warn!(command = %name, error = %format!("{e:#}"), "Failed to persist command state; keeping in-memory change");
        }
        true
    }

    /// Writes the full name -> enabled map to the store.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the write fails.
    pub async fn persist_state(&self) -> Result<()> {
        let _persist = self.persist_lock.lock().await;
        let snapshot = self.inner.read().await.enabled_map();
        self.store.save(&snapshot)
    }

    /// Applies persisted overrides to the registered commands and returns how
    /// many were applied. Unreadable state is logged and ignored.
    pub async fn load_persisted_state(&self) -> usize {
        let state = match self.store.load() {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!("No persisted command state; using defaults");
                return 0;
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Ignoring unreadable command state; using defaults");
                return 0;
            }
        };
        let mut inner = self.inner.write().await;
        let mut applied = 0;
        for (name, enabled) in state {
            match inner.by_name.get_mut(&normalize_name(&name)) {
                Some(entry) => {
                    entry.spec.enabled = enabled;
                    applied += 1;
                }
                None => debug!(command = %name, "Ignoring persisted state for unknown command"),
            }
        }
        drop(inner);
        info!(applied, "Loaded persisted command state");
        applied
    }
}

fn normalize_name(s: &str) -> String {
    s.trim().to_lowercase()
}

fn normalize_trigger(prefix: &str, s: &str) -> String {
    let trigger = s.trim().to_lowercase();
    if trigger.starts_with(prefix) {
        trigger
    } else {
        format!("{prefix}{trigger}")
    }
}
