//! Data model shared across the dispatcher: the task pulled off the queue,
//! the test cases materialized for it, and the result handed to the store.

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// A submission to judge, as it arrives on `judge:queue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeTask {
    pub id: i64,
    pub problem_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<i64>,
    pub user_id: i64,
    pub language: String,
    pub code: String,
    pub time_limit_ms: u32,
    pub memory_limit_mb: u32,
    #[serde(default)]
    pub use_spj: bool,
}

impl JudgeTask {
    /// Validate the invariants listed in the data model: positive limits.
    /// Language recognition is checked separately against the catalogue,
    /// since that requires the loaded `LangConfig` set.
    pub fn validate(&self) -> Result<(), String> {
        if self.time_limit_ms == 0 {
            return Err("time_limit_ms must be > 0".to_string());
        }
        if self.memory_limit_mb == 0 {
            return Err("memory_limit_mb must be > 0".to_string());
        }
        Ok(())
    }
}

/// One test case materialized from the problem's data directory.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub expected_output: String,
}

/// Outcome of judging a single test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub status: Verdict,
    pub time_used_ms: u32,
    pub memory_used_kb: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<String>,
}

impl TestCaseResult {
    pub fn formatted_info(&self) -> String {
        format!(
            "Time: {} ms Memory: {} KB",
            self.time_used_ms, self.memory_used_kb
        )
    }
}

/// Aggregate result of judging a submission, handed to the Result Handler
/// and published on `judge:result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeResult {
    pub id: i64,
    pub user_id: i64,
    pub problem_id: i64,
    pub status: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_used_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_used_kb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<String>,
    pub testcases_status: Vec<Verdict>,
    pub testcases_info: Vec<String>,
    pub test_case_results: Vec<TestCaseResult>,
    /// File ids cached sandbox-side over the course of this judge (compiled
    /// user binary, compiled SPJ, per-case cached outputs) awaiting cleanup.
    #[serde(default)]
    pub cached_file_ids: Vec<String>,
}

impl JudgeResult {
    /// Construct a synthesized system-error result with no per-case detail,
    /// e.g. for unsupported language, missing test data, or retry exhaustion.
    pub fn system_error(task: &JudgeTask, message: impl Into<String>) -> Self {
        Self {
            id: task.id,
            user_id: task.user_id,
            problem_id: task.problem_id,
            status: Verdict::SystemError,
            time_used_ms: None,
            memory_used_kb: None,
            error_info: Some(message.into()),
            testcases_status: Vec::new(),
            testcases_info: Vec::new(),
            test_case_results: Vec::new(),
            cached_file_ids: Vec::new(),
        }
    }

    pub fn compile_error(task: &JudgeTask, stderr: impl Into<String>) -> Self {
        Self {
            id: task.id,
            user_id: task.user_id,
            problem_id: task.problem_id,
            status: Verdict::CompileError,
            time_used_ms: None,
            memory_used_kb: None,
            error_info: Some(stderr.into()),
            testcases_status: Vec::new(),
            testcases_info: Vec::new(),
            test_case_results: Vec::new(),
            cached_file_ids: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_validation_rejects_zero_limits() {
        let mut task = JudgeTask {
            id: 1,
            problem_id: 1,
            contest_id: None,
            user_id: 1,
            language: "python3".into(),
            code: String::new(),
            time_limit_ms: 0,
            memory_limit_mb: 256,
            use_spj: false,
        };
        assert!(task.validate().is_err());
        task.time_limit_ms = 1000;
        task.memory_limit_mb = 0;
        assert!(task.validate().is_err());
        task.memory_limit_mb = 256;
        assert!(task.validate().is_ok());
    }

    #[test]
    fn task_round_trips_through_json() {
        let task = JudgeTask {
            id: 42,
            problem_id: 7,
            contest_id: Some(3),
            user_id: 9,
            language: "cpp".into(),
            code: "int main(){}".into(),
            time_limit_ms: 1000,
            memory_limit_mb: 256,
            use_spj: true,
        };
        let json = serde_json::to_string(&task).unwrap();
        let back: JudgeTask = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, task.id);
        assert_eq!(back.contest_id, task.contest_id);
        assert_eq!(back.use_spj, task.use_spj);
    }

    #[test]
    fn formatted_info_matches_expected_shape() {
        let r = TestCaseResult {
            status: Verdict::Accepted,
            time_used_ms: 12,
            memory_used_kb: 2048,
            error_info: None,
        };
        assert_eq!(r.formatted_info(), "Time: 12 ms Memory: 2048 KB");
    }
}
