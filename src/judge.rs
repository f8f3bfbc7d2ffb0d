//! Judge Strategy (C7, §4.7): orchestrates compile -> per-case run ->
//! comparator/SPJ for one task and aggregates the per-case results.

use tracing::{info, warn};

use crate::comparator;
use crate::languages::{self, LangConfig};
use crate::model::{JudgeResult, JudgeTask, TestCaseResult};
use crate::sandbox::{CopyInEntry, SandboxClient, SandboxCmd};
use crate::spj::SpjEngine;
use crate::testcases::TestDataRoot;
use crate::verdict::{map_sandbox_status, SandboxStatus, Verdict};

/// Single entry point: judge one task end to end. Takes owned handles so it
/// can be spawned as a standalone `'static` task by the manager (C10), which
/// needs to be able to catch a panic inside this call without tearing down
/// its own worker task.
pub async fn judge(task: JudgeTask, sandbox: SandboxClient, test_data: TestDataRoot) -> JudgeResult {
    match judge_inner(&task, &sandbox, &test_data).await {
        Ok(result) => result,
        Err(message) => JudgeResult::system_error(&task, message),
    }
}

async fn judge_inner(
    task: &JudgeTask,
    sandbox: &SandboxClient,
    test_data: &TestDataRoot,
) -> Result<JudgeResult, String> {
    let lang = languages::get_language(&task.language).map_err(|e| e.to_error_info())?;

    let mut cached_file_ids = Vec::new();

    let spj_source = if task.use_spj {
        Some(
            tokio::fs::read_to_string(test_data.spj_path(task.problem_id))
                .await
                .map_err(|e| format!("[Special Judge Compile Error] failed to read spj.cpp: {e}"))?,
        )
    } else {
        None
    };
    let spj_engine = spj_source
        .as_ref()
        .map(|source| SpjEngine::new(sandbox, source.clone()));

    if let Some(engine) = &spj_engine {
        let spj_file_id = engine
            .compile()
            .await
            .map_err(|e| e.to_error_info())?;
        cached_file_ids.push(spj_file_id);
    }

    let compiled_artifact = if lang.is_compiled() {
        match compile_user_code(task, &lang, sandbox).await? {
            CompileOutcome::Success { file_id } => {
                cached_file_ids.push(file_id.clone());
                Some(file_id)
            }
            CompileOutcome::CompileError(stderr) => {
                let mut result = JudgeResult::compile_error(task, stderr);
                result.cached_file_ids = cached_file_ids;
                return Ok(result);
            }
        }
    } else {
        None
    };

    let cases = test_data
        .load_test_cases(task.problem_id)
        .await
        .map_err(|e| e.to_error_info())?;

    let mut testcases_status = Vec::with_capacity(cases.len());
    let mut testcases_info = Vec::with_capacity(cases.len());
    let mut test_case_results = Vec::with_capacity(cases.len());
    let mut max_time_ms = 0u32;
    let mut max_memory_kb = 0u32;
    let mut aggregate_status = Verdict::Accepted;
    let mut aggregate_error: Option<String> = None;

    for (i, case) in cases.iter().enumerate() {
        let stdout_name = format!("stdout{i}");
        let stderr_name = format!("stderr{i}");

        let mut cmd = SandboxCmd::new(
            lang.run.command.clone(),
            lang.amplified_time_limit_ms(task.time_limit_ms) * 1_000_000,
            lang.amplified_memory_limit_mb(task.memory_limit_mb) * 1024 * 1024,
        )
        .with_env(lang.env.clone())
        .with_proc_limit(lang.run.proc_limit)
        .with_output_max(lang.run.stdout_max, lang.run.stderr_max)
        .with_output_names(stdout_name.clone(), stderr_name.clone())
        .with_stdin(case.input.clone())
        .with_copy_out(vec![stdout_name.clone(), stderr_name.clone()]);

        if let Some(file_id) = &compiled_artifact {
            cmd = cmd.with_copy_in(
                lang.compile.as_ref().unwrap().artifact_name.clone(),
                CopyInEntry::file_id(file_id.clone()),
            );
        } else {
            cmd = cmd.with_copy_in(lang.source_file.clone(), CopyInEntry::content(task.code.clone()));
        }

        if spj_engine.is_some() {
            cmd = cmd.with_copy_out_cached(vec![stdout_name.clone()]);
        }

        let responses = sandbox.run(std::slice::from_ref(&cmd)).await.map_err(|e| e.to_error_info())?;
        let response = responses
            .into_iter()
            .next()
            .ok_or_else(|| "sandbox returned no response for test case".to_string())?;

        let time_used_ms = response.time_ms();
        let memory_used_kb = response.memory_kb();
        max_time_ms = max_time_ms.max(time_used_ms);
        max_memory_kb = max_memory_kb.max(memory_used_kb);

        let status = SandboxStatus::from(response.status.as_str());

        let (verdict, error_info) = if matches!(status, SandboxStatus::Accepted) {
            if let Some(engine) = &spj_engine {
                let user_output_file_id = response
                    .file_ids
                    .get(&stdout_name)
                    .cloned()
                    .ok_or_else(|| "useSPJ run did not cache stdout".to_string())?;
                cached_file_ids.push(user_output_file_id.clone());

                match engine
                    .judge_case(&case.input, &case.expected_output, &user_output_file_id)
                    .await
                {
                    Ok(v) => (v, None),
                    Err(e) => (Verdict::SystemError, Some(e.to_error_info())),
                }
            } else {
                let verdict = comparator::compare(response.file(&stdout_name), &case.expected_output);
                (verdict, None)
            }
        } else {
            let verdict = map_sandbox_status(&status);
            (verdict, Some(response.file(&stderr_name).to_string()))
        };

        test_case_results.push(TestCaseResult {
            status: verdict,
            time_used_ms,
            memory_used_kb,
            error_info: error_info.clone(),
        });
        testcases_status.push(verdict);
        testcases_info.push(format!(
            "Time: {} ms Memory: {} KB",
            time_used_ms, memory_used_kb
        ));

        if !verdict.is_accepted() && matches!(aggregate_status, Verdict::Accepted) {
            aggregate_status = verdict;
            aggregate_error = Some(format!(
                "[Test #{}] {}",
                i + 1,
                error_info.unwrap_or_default()
            ));
        }
    }

    if cases.is_empty() {
        return Err("No test data available".to_string());
    }

    info!(
        submission_id = task.id,
        status = %aggregate_status,
        "judged submission"
    );

    Ok(JudgeResult {
        id: task.id,
        user_id: task.user_id,
        problem_id: task.problem_id,
        status: aggregate_status,
        time_used_ms: Some(max_time_ms),
        memory_used_kb: Some(max_memory_kb),
        error_info: aggregate_error,
        testcases_status,
        testcases_info,
        test_case_results,
        cached_file_ids,
    })
}

enum CompileOutcome {
    Success { file_id: String },
    CompileError(String),
}

async fn compile_user_code(
    task: &JudgeTask,
    lang: &LangConfig,
    sandbox: &SandboxClient,
) -> Result<CompileOutcome, String> {
    let compile = lang.compile.as_ref().expect("checked is_compiled before calling");

    let cmd = SandboxCmd::new(
        compile.command.clone(),
        compile.cpu_limit_ms * 1_000_000,
        compile.memory_limit_mb * 1024 * 1024,
    )
    .with_env(lang.env.clone())
    .with_proc_limit(compile.proc_limit)
    .with_output_max(compile.stdout_max, compile.stderr_max)
    .with_copy_in(lang.source_file.clone(), CopyInEntry::content(task.code.clone()))
    .with_copy_out(vec!["stdout".to_string(), "stderr".to_string()])
    .with_copy_out_cached(vec![compile.artifact_name.clone()]);

    let responses = sandbox.run(std::slice::from_ref(&cmd)).await.map_err(|e| e.to_error_info())?;
    let response = responses
        .into_iter()
        .next()
        .ok_or_else(|| "sandbox returned no response for compile".to_string())?;

    if response.status != "Accepted" {
        warn!(submission_id = task.id, "user compile failed");
        return Ok(CompileOutcome::CompileError(response.stderr().to_string()));
    }

    let file_id = response
        .file_ids
        .get(&compile.artifact_name)
        .cloned()
        .ok_or_else(|| "compile succeeded but produced no cached artifact".to_string())?;

    Ok(CompileOutcome::Success { file_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_pins_to_first_failure() {
        // The first non-accepted case both sets the aggregate status and
        // prefixes its error with the 1-indexed test number (§4.7 step 4).
        let formatted = format!("[Test #{}] {}", 2, "boom");
        assert_eq!(formatted, "[Test #2] boom");
    }
}
