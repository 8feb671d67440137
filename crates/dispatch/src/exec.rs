use core::time::Duration;

use command_core::{CommandContext, CommandEntry};
use tracing::{info, warn};

/// How a handler invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecResult {
    Succeeded,
    /// The handler ran but reported failure.
    Declined,
    Failed(String),
    Panicked,
    TimedOut,
}

impl ExecResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Runs a handler on its own task under `budget`. A handler that overruns is
/// aborted and its result discarded.
pub(crate) async fn run_with_budget(
    entry: CommandEntry,
    ctx: CommandContext,
    args: String,
    budget: Duration,
) -> ExecResult {
    let name = entry.spec.name.clone();
    let user = ctx.invocation.username.clone();
    let command = entry.command;
    let mut handle = tokio::spawn(async move { command.run(&ctx, &args).await });

    let result = match tokio::time::timeout(budget, &mut handle).await {
        Ok(Ok(Ok(true))) => ExecResult::Succeeded,
        Ok(Ok(Ok(false))) => ExecResult::Declined,
        Ok(Ok(Err(e))) => ExecResult::Failed(format!("{e:#}")),
        Ok(Err(join_err)) if join_err.is_panic() => ExecResult::Panicked,
        Ok(Err(join_err)) => ExecResult::Failed(join_err.to_string()),
        Err(_elapsed) => {
            handle.abort();
            ExecResult::TimedOut
        }
    };

    match &result {
        ExecResult::Succeeded => info!(command = %name, user = %user, "Command executed"),
        ExecResult::Declined => info!(command = %name, user = %user, "Command reported failure"),
        ExecResult::Failed(error) => {
            warn!(command = %name, user = %user, error = %error, "Command failed");
        }
        ExecResult::Panicked => warn!(command = %name, user = %user, "Command panicked"),
        ExecResult::TimedOut => {
            warn!(command = %name, user = %user, timeout_ms = budget.as_millis(), "Command timed out");
        }
    }
    result
}
