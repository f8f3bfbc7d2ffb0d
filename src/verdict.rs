//! Verdict taxonomy (§6) and the pure sandbox-status -> verdict mapping (C4, §4.4).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A verdict from the closed set in §6. `Display` produces the exact
/// user-visible string; `Serialize`/`Deserialize` use the same string so the
/// wire shape matches what the rest of the backend expects to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Compiling")]
    Compiling,
    #[serde(rename = "Running")]
    Running,
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Wrong Answer")]
    WrongAnswer,
    #[serde(rename = "Time Limit Exceeded")]
    TimeLimitExceeded,
    #[serde(rename = "Memory Limit Exceeded")]
    MemoryLimitExceeded,
    #[serde(rename = "Runtime Error")]
    RuntimeError,
    #[serde(rename = "Compile Error")]
    CompileError,
    #[serde(rename = "System Error")]
    SystemError,
    #[serde(rename = "Output Limit Exceeded")]
    OutputLimitExceeded,
    #[serde(rename = "File Error")]
    FileError,
    #[serde(rename = "Nonzero Exit Status")]
    NonzeroExitStatus,
    #[serde(rename = "Signalled")]
    Signalled,
    #[serde(rename = "Internal Error")]
    InternalError,
    #[serde(rename = "Presentation Error")]
    PresentationError,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pending => "Pending",
            Verdict::Compiling => "Compiling",
            Verdict::Running => "Running",
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::MemoryLimitExceeded => "Memory Limit Exceeded",
            Verdict::RuntimeError => "Runtime Error",
            Verdict::CompileError => "Compile Error",
            Verdict::SystemError => "System Error",
            Verdict::OutputLimitExceeded => "Output Limit Exceeded",
            Verdict::FileError => "File Error",
            Verdict::NonzeroExitStatus => "Nonzero Exit Status",
            Verdict::Signalled => "Signalled",
            Verdict::InternalError => "Internal Error",
            Verdict::PresentationError => "Presentation Error",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    /// Only `System Error` is eligible for retry at the manager level (§5, §7).
    pub fn is_system_error(&self) -> bool {
        matches!(self, Verdict::SystemError)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status string returned by the sandbox for a single `SandboxCmd` (the
/// `status` field of a `SandboxResponse`, see `crate::sandbox`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxStatus {
    Accepted,
    MemoryLimitExceeded,
    TimeLimitExceeded,
    OutputLimitExceeded,
    RuntimeError,
    FileError,
    NonzeroExitStatus,
    Signalled,
    InternalError,
    Other(String),
}

impl From<&str> for SandboxStatus {
    fn from(s: &str) -> Self {
        match s {
            "Accepted" => SandboxStatus::Accepted,
            "Memory Limit Exceeded" => SandboxStatus::MemoryLimitExceeded,
            "Time Limit Exceeded" => SandboxStatus::TimeLimitExceeded,
            "Output Limit Exceeded" => SandboxStatus::OutputLimitExceeded,
            "Runtime Error" => SandboxStatus::RuntimeError,
            "File Error" => SandboxStatus::FileError,
            "Nonzero Exit Status" => SandboxStatus::NonzeroExitStatus,
            "Signalled" => SandboxStatus::Signalled,
            "Internal Error" => SandboxStatus::InternalError,
            other => SandboxStatus::Other(other.to_string()),
        }
    }
}

/// C4: pure mapping from a sandbox-level status to a verdict. `Accepted`
/// here is a pre-check value only — the comparator or SPJ still has to run
/// before it can be treated as final (§4.4).
pub fn map_sandbox_status(status: &SandboxStatus) -> Verdict {
    match status {
        SandboxStatus::Accepted => Verdict::Accepted,
        SandboxStatus::MemoryLimitExceeded => Verdict::MemoryLimitExceeded,
        SandboxStatus::TimeLimitExceeded => Verdict::TimeLimitExceeded,
        SandboxStatus::OutputLimitExceeded => Verdict::OutputLimitExceeded,
        SandboxStatus::RuntimeError => Verdict::RuntimeError,
        SandboxStatus::FileError => Verdict::FileError,
        SandboxStatus::NonzeroExitStatus => Verdict::NonzeroExitStatus,
        SandboxStatus::Signalled => Verdict::Signalled,
        SandboxStatus::InternalError => Verdict::InternalError,
        SandboxStatus::Other(_) => Verdict::SystemError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_exact_user_visible_strings() {
        assert_eq!(Verdict::WrongAnswer.to_string(), "Wrong Answer");
        assert_eq!(Verdict::TimeLimitExceeded.to_string(), "Time Limit Exceeded");
        assert_eq!(Verdict::PresentationError.to_string(), "Presentation Error");
    }

    #[test]
    fn mapping_table_matches_spec_4_4() {
        assert_eq!(map_sandbox_status(&SandboxStatus::Accepted), Verdict::Accepted);
        assert_eq!(
            map_sandbox_status(&SandboxStatus::MemoryLimitExceeded),
            Verdict::MemoryLimitExceeded
        );
        assert_eq!(
            map_sandbox_status(&SandboxStatus::from("Weird Status")),
            Verdict::SystemError
        );
    }

    #[test]
    fn unknown_status_string_becomes_other() {
        let status = SandboxStatus::from("Something Unexpected");
        assert_eq!(status, SandboxStatus::Other("Something Unexpected".into()));
        assert_eq!(map_sandbox_status(&status), Verdict::SystemError);
    }

    #[test]
    fn serde_round_trip_uses_display_form() {
        let json = serde_json::to_string(&Verdict::CompileError).unwrap();
        let back: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Verdict::CompileError);
    }
}
