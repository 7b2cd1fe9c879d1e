use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateOutcome {
    /// Exit status 0. `text` is the captured stdout and may be empty.
    Translated { text: String, truncated: bool },
    /// Non-zero exit, or the process was killed by a signal (`exit_code` is `None`).
    Failed {
        exit_code: Option<i32>,
        stderr: Option<String>,
    },
    TimedOut { after: Duration },
    /// The process could not be started at all.
    Unavailable { reason: String },
}

impl TranslateOutcome {
    pub fn translated(text: impl Into<String>) -> Self {
        Self::Translated {
            text: text.into(),
            truncated: false,
        }
    }

    pub fn failed(exit_code: Option<i32>, stderr: Option<String>) -> Self {
        Self::Failed { exit_code, stderr }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Translated { .. } => "translated",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Unavailable { .. } => "unavailable",
        }
    }
}
