use std::sync::Arc;

use crate::{Command, CommandSpec};

/// Describes a built-in command: its default registration data and how to
/// construct its handler.
pub trait CommandFactory: Send + Sync {
    /// The default specification, before any configuration overrides.
    fn spec(&self) -> CommandSpec;

    /// Adds the default specification unless one with the same name is present.
    ///
    /// # Arguments
    ///
    /// * `specs` - The specifications collected so far.
    fn register_defaults(&self, specs: &mut Vec<CommandSpec>) {
        let spec = self.spec();
        if !specs.iter().any(|s| s.name == spec.name) {
            specs.push(spec);
        }
    }

    /// Builds the handler instance.
    #[must_use]
    fn build(&self) -> Arc<dyn Command>;
}
