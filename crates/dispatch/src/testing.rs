use core::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use command_core::{ChatSender, Command, CommandContext, Invocation};
use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::InboundMessage;

#[derive(Debug, Default)]
pub struct RecordingChat {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingChat {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl ChatSender for RecordingChat {
    async fn say(&self, channel: &str, text: &str) -> Result<()> {
        self.sent.lock().push((channel.to_owned(), text.to_owned()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Counting {
    calls: AtomicUsize,
}

impl Counting {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Command for Counting {
    fn name(&self) -> &'static str {
        "counting"
    }
    fn help(&self) -> &'static str {
        "counts invocations"
    }
    async fn run(&self, _ctx: &CommandContext, _args: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

pub struct Never;

#[async_trait]
impl Command for Never {
    fn name(&self) -> &'static str {
        "never"
    }
    fn help(&self) -> &'static str {
        "never finishes"
    }
    async fn run(&self, _ctx: &CommandContext, _args: &str) -> Result<bool> {
        core::future::pending::<()>().await;
        Ok(true)
    }
}

pub struct Faulty;

#[async_trait]
impl Command for Faulty {
    fn name(&self) -> &'static str {
        "faulty"
    }
    fn help(&self) -> &'static str {
        "always errors"
    }
    async fn run(&self, _ctx: &CommandContext, _args: &str) -> Result<bool> {
        bail!("backend unavailable")
    }
}

pub struct Panicking;

#[async_trait]
impl Command for Panicking {
    fn name(&self) -> &'static str {
        "panicking"
    }
    fn help(&self) -> &'static str {
        "always panics"
    }
    async fn run(&self, _ctx: &CommandContext, _args: &str) -> Result<bool> {
        panic!("handler bug")
    }
}

pub fn message(id: &str, user: &str, text: &str) -> InboundMessage {
    InboundMessage {
        channel: "chan".to_owned(),
        invocation: Invocation {
            username: user.to_owned(),
            is_moderator: false,
            has_broadcaster_badge: false,
            message_id: id.to_owned(),
            timestamp: OffsetDateTime::UNIX_EPOCH,
        },
        text: text.to_owned(),
        is_self: false,
    }
}

pub fn moderator_message(id: &str, user: &str, text: &str) -> InboundMessage {
    let mut msg = message(id, user, text);
    msg.invocation.is_moderator = true;
    msg
}
