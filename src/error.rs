//! Typed error taxonomy for system-class failures (§7) and the single
//! classifier that decides whether an attempt is retry-eligible.

use thiserror::Error;

/// Errors that can abort a judge attempt before it produces a terminal
/// user-facing verdict. Every variant here is, by construction, a
/// system-class failure: it surfaces as `Verdict::SystemError` and is
/// eligible for retry under the manager's back-off policy (§4.10).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("sandbox unreachable: {0}")]
    SandboxUnreachable(String),

    #[error("sandbox reported an internal error: {0}")]
    SandboxInternal(String),

    #[error("[Special Judge Compile Error] {0}")]
    SpjCompileFailed(String),

    #[error("judge attempt timed out after {0}s")]
    AttemptTimedOut(u64),

    #[error("no test data available for problem {0}")]
    NoTestData(i64),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("queue error: {0}")]
    Queue(#[from] redis::RedisError),

    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),

    #[error("{0}")]
    Other(String),
}

impl DispatchError {
    /// Render the message that ends up in `JudgeResult::error_info` for a
    /// synthesized `System Error` verdict.
    pub fn to_error_info(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spj_compile_error_carries_the_structured_prefix() {
        let err = DispatchError::SpjCompileFailed("g++: error".into());
        assert!(err.to_error_info().starts_with("[Special Judge Compile Error]"));
    }

    #[test]
    fn unsupported_language_message_names_the_language() {
        let err = DispatchError::UnsupportedLanguage("cobol".into());
        assert!(err.to_error_info().contains("cobol"));
    }
}
