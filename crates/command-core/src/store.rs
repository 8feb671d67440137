use core::sync::atomic::{AtomicUsize, Ordering};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result, bail};
use parking_lot::Mutex;

/// Command name -> enabled.
pub type EnabledMap = BTreeMap<String, bool>;

/// Durable name -> enabled mapping, read and written as a whole.
pub trait StateStore: Send + Sync {
    /// `Ok(None)` means nothing has been persisted yet.
    fn load(&self) -> Result<Option<EnabledMap>>;
    fn save(&self, state: &EnabledMap) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<EnabledMap>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("reading command state at {}", self.path.display()))?;
        let state: EnabledMap = serde_json::from_str(&data)
            .with_context(|| format!("parsing command state at {}", self.path.display()))?;
        Ok(Some(state))
    }

    fn save(&self, state: &EnabledMap) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing command state at {}", self.path.display()))?;
        Ok(())
    }
}

/// Keeps state in memory only. Counts writes, and can be told to fail them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<EnabledMap>>,
    saves: AtomicUsize,
    fail_writes: bool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_state(state: EnabledMap) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Option<EnabledMap> {
        self.state.lock().clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<EnabledMap>> {
        Ok(self.state.lock().clone())
    }

    fn save(&self, state: &EnabledMap) -> Result<()> {
        if self.fail_writes {
            bail!("memory store is read-only");
        }
        *self.state.lock() = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
