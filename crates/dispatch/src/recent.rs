//! Short-lived memory of recently seen messages, used for duplicate and
//! cooldown suppression.

use core::{cmp::Reverse, time::Duration};
use std::{
    collections::{BinaryHeap, HashMap},
    sync::Arc,
};

use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum RecentKey {
    Message(String),
    Cooldown { user: String, command: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Fresh,
    Duplicate,
    Cooldown,
}

#[derive(Debug, Default)]
struct Entries {
    expires: HashMap<RecentKey, Instant>,
    // Min-heap on expiry; may hold stale items for keys re-recorded later.
    queue: BinaryHeap<Reverse<(Instant, RecentKey)>>,
}

impl Entries {
    fn live(&self, key: &RecentKey, now: Instant) -> bool {
        self.expires.get(key).is_some_and(|&at| at > now)
    }

    fn insert(&mut self, key: RecentKey, at: Instant) {
        self.expires.insert(key.clone(), at);
        self.queue.push(Reverse((at, key)));
    }

    fn sweep(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while self
            .queue
            .peek()
            .is_some_and(|Reverse((at, _))| *at <= now)
        {
            let Some(Reverse((at, key))) = self.queue.pop() else {
                break;
            };
            if self.expires.get(&key) == Some(&at) {
                self.expires.remove(&key);
                removed += 1;
            }
        }
        removed
    }
}

#[derive(Debug)]
pub struct RecentMessages {
    entries: Mutex<Entries>,
    dedup_ttl: Duration,
    cooldown: Duration,
}

impl RecentMessages {
    #[must_use]
    pub fn new(dedup_ttl: Duration, cooldown: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            dedup_ttl,
            cooldown,
        }
    }

    /// Checks a command line against the duplicate and cooldown windows and,
    /// when it passes both, records it.
    ///
    /// `command` is expected to be normalized already. An empty `message_id`
    /// skips the duplicate check.
    pub fn admit(&self, message_id: &str, user: &str, command: &str, now: Instant) -> Admission {
        let message_key =
            (!message_id.is_empty()).then(|| RecentKey::Message(message_id.to_owned()));
        let cooldown_key = RecentKey::Cooldown {
            user: user.to_lowercase(),
            command: command.to_owned(),
        };

        let mut entries = self.entries.lock();
        if message_key.as_ref().is_some_and(|k| entries.live(k, now)) {
            return Admission::Duplicate;
        }
        if entries.live(&cooldown_key, now) {
            return Admission::Cooldown;
        }
        if let Some(key) = message_key {
            entries.insert(key, now + self.dedup_ttl);
        }
        entries.insert(cooldown_key, now + self.cooldown);
        Admission::Fresh
    }

    /// Drops every entry that has expired by `now`, returning how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        self.entries.lock().sweep(now)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts a background task that sweeps expired entries every `every`.
    ///
    /// # Panics
    ///
    /// Panics if `every` is zero.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let recent = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = recent.sweep(Instant::now());
                if removed > 0 {
                    trace!(removed, remaining = recent.len(), "Swept expired message entries");
                }
            }
        })
    }
}
