//! Inline `enable` / `disable` handling, checked before generic dispatch.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Toggle {
    Enable,
    Disable,
}

impl Toggle {
    /// Recognizes `<prefix>enable` and `<prefix>disable`. `trigger` is lowercase.
    pub(crate) fn parse(trigger: &str, prefix: &str) -> Option<Self> {
        match trigger.strip_prefix(prefix)? {
            "enable" => Some(Self::Enable),
            "disable" => Some(Self::Disable),
            _ => None,
        }
    }

    pub(crate) const fn enabled(self) -> bool {
        matches!(self, Self::Enable)
    }

    pub(crate) const fn verb(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

/// Result of an intercepted admin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminOutcome {
    Toggled { command: String, enabled: bool },
    UnknownCommand(String),
    Usage,
    Refused,
}
