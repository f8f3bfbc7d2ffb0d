//! SPJ Engine (C6, §4.6): compiles and runs a per-problem Special Judge.
//!
//! Compile-once-per-judge policy: a `SpjEngine` is constructed fresh per
//! `Judge(task)` call and compiles its SPJ binary lazily on first use,
//! caching the resulting sandbox `fileId` for the remainder of that judge.
//! The cache never survives past one task — there is no cross-submission
//! checker cache, matching the compile-once-per-judge framing in §4.6
//! (compare the teacher's cross-task `CheckerCompiler::get_or_compile`,
//! which caches by content match instead).

use tokio::sync::OnceCell;

use crate::error::DispatchError;
use crate::sandbox::{CopyInEntry, SandboxClient, SandboxCmd};
use crate::verdict::Verdict;

const SPJ_COMPILE_CPU_LIMIT_NS: u64 = 30_000_000_000;
const SPJ_COMPILE_MEMORY_LIMIT_BYTES: u64 = 512 * 1024 * 1024;
const SPJ_COMPILE_PROC_LIMIT: u32 = 50;
const SPJ_RUN_CPU_LIMIT_NS: u64 = 10_000_000_000;
const SPJ_RUN_MEMORY_LIMIT_BYTES: u64 = 512 * 1024 * 1024;
const SPJ_RUN_PROC_LIMIT: u32 = 50;

/// Drives SPJ compile-once-per-judge and per-case invocation.
pub struct SpjEngine<'a> {
    sandbox: &'a SandboxClient,
    source: String,
    compiled: OnceCell<String>,
}

impl<'a> SpjEngine<'a> {
    pub fn new(sandbox: &'a SandboxClient, source: String) -> Self {
        Self {
            sandbox,
            source,
            compiled: OnceCell::new(),
        }
    }

    /// Compile `spj.cpp` if not already compiled this judge, returning the
    /// cached `fileId` of the `spj` artifact. Failure surfaces as
    /// `SpjCompileFailed`, distinguishing it from a user compile error.
    async fn ensure_compiled(&self) -> Result<&str, DispatchError> {
        self.compiled
            .get_or_try_init(|| async {
                let cmd = SandboxCmd::new(
                    vec![
                        "g++".to_string(),
                        "-O2".to_string(),
                        "-std=c++17".to_string(),
                        "-o".to_string(),
                        "spj".to_string(),
                        "spj.cpp".to_string(),
                    ],
                    SPJ_COMPILE_CPU_LIMIT_NS,
                    SPJ_COMPILE_MEMORY_LIMIT_BYTES,
                )
                .with_proc_limit(SPJ_COMPILE_PROC_LIMIT)
                .with_copy_in("spj.cpp", CopyInEntry::content(self.source.clone()))
                .with_copy_out(vec!["stdout".to_string(), "stderr".to_string()])
                .with_copy_out_cached(vec!["spj".to_string()]);

                let responses = self.sandbox.run(std::slice::from_ref(&cmd)).await?;
                let response = responses
                    .into_iter()
                    .next()
                    .ok_or_else(|| DispatchError::SpjCompileFailed("empty sandbox response".into()))?;

                if response.status != "Accepted" {
                    return Err(DispatchError::SpjCompileFailed(
                        response.stderr().to_string(),
                    ));
                }

                response
                    .file_ids
                    .get("spj")
                    .cloned()
                    .ok_or_else(|| DispatchError::SpjCompileFailed("no spj artifact produced".into()))
            })
            .await
            .map(|s| s.as_str())
    }

    /// Ensure the SPJ binary is compiled, returning its cached `fileId` so
    /// the caller can record it for later sandbox-artifact cleanup.
    pub async fn compile(&self) -> Result<String, DispatchError> {
        self.ensure_compiled().await.map(|s| s.to_string())
    }

    /// Run the compiled SPJ against one test case: `./spj std.in std.out
    /// user.out`, where `user.out` is copied in by `fileId` (produced by the
    /// user program's `copyOutCached`). Exit `0` -> Accepted, else
    /// Wrong Answer. Sandbox-level failure -> System Error.
    pub async fn judge_case(
        &self,
        input: &str,
        expected_output: &str,
        user_output_file_id: &str,
    ) -> Result<Verdict, DispatchError> {
        let spj_file_id = self.ensure_compiled().await?.to_string();

        let cmd = SandboxCmd::new(
            vec!["./spj".to_string(), "std.in".to_string(), "std.out".to_string(), "user.out".to_string()],
            SPJ_RUN_CPU_LIMIT_NS,
            SPJ_RUN_MEMORY_LIMIT_BYTES,
        )
        .with_proc_limit(SPJ_RUN_PROC_LIMIT)
        .with_copy_in("spj", CopyInEntry::file_id(spj_file_id))
        .with_copy_in("std.in", CopyInEntry::content(input.to_string()))
        .with_copy_in("std.out", CopyInEntry::content(expected_output.to_string()))
        .with_copy_in("user.out", CopyInEntry::file_id(user_output_file_id.to_string()));

        let responses = self.sandbox.run(std::slice::from_ref(&cmd)).await?;
        let response = responses
            .into_iter()
            .next()
            .ok_or_else(|| DispatchError::SandboxInternal("empty sandbox response".into()))?;

        if response.status != "Accepted" {
            return Err(DispatchError::SandboxInternal(response.status));
        }

        Ok(if response.exit_status == 0 {
            Verdict::Accepted
        } else {
            Verdict::WrongAnswer
        })
    }
}
