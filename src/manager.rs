//! Judge Manager (C10, §4.10): dequeues, enforces the concurrency
//! semaphore and per-attempt timeout, retries system-class failures with
//! bounded back-off, and hands results to the Result Handler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::judge;
use crate::model::{JudgeResult, JudgeTask};
use crate::queue::TaskQueue;
use crate::sandbox::SandboxClient;
use crate::store::ResultHandler;
use crate::testcases::TestDataRoot;

const PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(600);
const BACKOFF: [Duration; 3] = [
    Duration::from_secs(3),
    Duration::from_secs(10),
    Duration::from_secs(60),
];
const MAX_ATTEMPTS: u32 = 3;

/// Drives the dequeue -> semaphore -> spawn-worker loop forever.
pub struct JudgeManager {
    sandbox: SandboxClient,
    test_data: Arc<TestDataRoot>,
    semaphore: Arc<Semaphore>,
}

impl JudgeManager {
    pub fn new(sandbox: SandboxClient, test_data: TestDataRoot, concurrency: usize) -> Self {
        Self {
            sandbox,
            test_data: Arc::new(test_data),
            semaphore: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// Blocking dequeue loop. One worker is spawned per popped task; the
    /// semaphore bounds how many run concurrently (§4.10). `results` is
    /// shared read-only — `ResultHandler::handle` only needs `&self`, since
    /// the `PgPool`/`SandboxClient` it wraps pool their own connections, so
    /// concurrent judges write results concurrently rather than serializing
    /// on a mutex.
    pub async fn run(&self, queue: &mut TaskQueue, results: Arc<ResultHandler>) {
        loop {
            let task = match queue.pop_task().await {
                Ok(task) => task,
                Err(e) => {
                    error!("failed to pop task: {e}");
                    continue;
                }
            };

            let permit = Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .expect("semaphore never closed");

            let sandbox = self.sandbox.clone();
            let test_data = Arc::clone(&self.test_data);
            let results = Arc::clone(&results);
            let mut result_sink = queue.result_sink();

            tokio::spawn(async move {
                let _permit = permit;
                let result = judge_with_retry(&task, &sandbox, &test_data).await;

                if let Err(e) = results.handle(&task, &result).await {
                    error!(submission_id = task.id, "result handler failed: {e}");
                }

                if let Err(e) = result_sink.push_result(&result).await {
                    error!(submission_id = task.id, "failed to push result to judge:result: {e}");
                }
            });
        }
    }
}

/// Run C7 with the manager's retry state machine: `{Attempt(n), BackOff(n),
/// Done(verdict)}`, n in {1,2,3}. Only `System Error` (including timeout
/// and worker panic) triggers a retry.
async fn judge_with_retry(task: &JudgeTask, sandbox: &SandboxClient, test_data: &TestDataRoot) -> JudgeResult {
    let mut last_result = None;

    for attempt in 1..=MAX_ATTEMPTS {
        // Spawned so a panic inside C7 (which is never supposed to happen,
        // but C10 must not trust that) is caught here rather than tearing
        // down this worker task.
        let attempt_task = tokio::spawn(judge::judge(task.clone(), sandbox.clone(), test_data.clone()));
        let outcome = tokio::time::timeout(PER_ATTEMPT_TIMEOUT, attempt_task).await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                warn!(submission_id = task.id, attempt, "judge attempt panicked: {join_err}");
                JudgeResult::system_error(task, format!("worker task panicked: {join_err}"))
            }
            Err(_) => {
                warn!(submission_id = task.id, attempt, "judge attempt timed out");
                JudgeResult::system_error(
                    task,
                    format!("judge attempt timed out after {}s", PER_ATTEMPT_TIMEOUT.as_secs()),
                )
            }
        };

        if !result.status.is_system_error() {
            return result;
        }

        warn!(
            submission_id = task.id,
            attempt, "attempt ended in System Error, considering retry"
        );
        last_result = Some(result);

        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(BACKOFF[(attempt - 1) as usize]).await;
        }
    }

    info!(submission_id = task.id, "retry budget exhausted");
    last_result.unwrap_or_else(|| JudgeResult::system_error(task, "retry budget exhausted"))
}
