//! Result Handler (C11, §4.11): one transaction touching submissions,
//! contest qualification, problem stats, user stats, and user-problem
//! status; then best-effort sandbox artifact cleanup.
//!
//! Schema (external store, not owned by this module but assumed present):
//! `submissions`, `contests`, `contest_submission_status`, `problems`,
//! `users`, `user_problem_status`.

use chrono::Utc;
use serde_json::json;
use sqlx::{PgPool, Row};
use tracing::warn;

use crate::model::JudgeResult;
use crate::sandbox::SandboxClient;
use crate::verdict::Verdict;

pub struct ResultHandler {
    pool: PgPool,
    sandbox: SandboxClient,
}

impl ResultHandler {
    pub fn new(pool: PgPool, sandbox: SandboxClient) -> Self {
        Self { pool, sandbox }
    }

    /// Apply one judge result. `task` is only used for its id/problem/user —
    /// the manager already retried everything retryable, so by the time this
    /// runs `result.status` is terminal.
    pub async fn handle(
        &self,
        task: &crate::model::JudgeTask,
        result: &JudgeResult,
    ) -> Result<(), sqlx::Error> {
        let outcome = self.apply_in_transaction(task, result).await;

        if let Err(e) = &outcome {
            warn!(
                submission_id = result.id,
                "result handler transaction failed: {e}; submission may remain non-terminal"
            );
        }

        // Artifact cleanup happens regardless of transaction outcome (§7:
        // deletion failures are logged, never retried, leaks tolerated).
        for file_id in &result.cached_file_ids {
            if let Err(e) = self.sandbox.delete_file(file_id).await {
                warn!(submission_id = result.id, file_id, "artifact cleanup failed: {e}");
            }
        }

        outcome
    }

    async fn apply_in_transaction(
        &self,
        task: &crate::model::JudgeTask,
        result: &JudgeResult,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // 1. Load the submission row. A terminal status already set means a
        // retried judge reached C11 twice — a bug upstream (§8); treat as a
        // no-op rather than double-counting.
        let existing_status: Option<String> =
            sqlx::query("SELECT status FROM submissions WHERE id = $1")
                .bind(task.id)
                .fetch_optional(&mut *tx)
                .await?
                .and_then(|row| row.try_get("status").ok());

        if is_terminal(existing_status.as_deref()) {
            tx.rollback().await?;
            return Ok(());
        }

        // 2. Contest qualification.
        let now = Utc::now();
        let mut role = "user".to_string();
        let mut contest_id = task.contest_id;

        if let Some(cid) = task.contest_id {
            let contest_row = sqlx::query(
                "SELECT start_time, end_time, problem_ids FROM contests WHERE id = $1",
            )
            .bind(cid)
            .fetch_optional(&mut *tx)
            .await?;

            let qualifies = if let Some(row) = contest_row {
                let start: chrono::DateTime<Utc> = row.try_get("start_time")?;
                let end: chrono::DateTime<Utc> = row.try_get("end_time")?;
                let problem_ids: serde_json::Value = row.try_get("problem_ids")?;
                let in_window = now >= start && now <= end;
                let in_problem_list = problem_ids
                    .as_array()
                    .map(|ids| ids.iter().any(|v| v.as_i64() == Some(task.problem_id)))
                    .unwrap_or(false);
                in_window && in_problem_list
            } else {
                false
            };

            if qualifies {
                role = "admin".to_string();
                sqlx::query(
                    r#"
                    INSERT INTO contest_submission_status (contest_id, submission_ids, updated_at)
                    VALUES ($1, jsonb_build_array($2::bigint), $3)
                    ON CONFLICT (contest_id) DO UPDATE
                    SET submission_ids = CASE
                            WHEN contest_submission_status.submission_ids @> jsonb_build_array($2::bigint)
                            THEN contest_submission_status.submission_ids
                            ELSE contest_submission_status.submission_ids || jsonb_build_array($2::bigint)
                        END,
                        updated_at = $3
                    "#,
                )
                .bind(cid)
                .bind(task.id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            } else {
                contest_id = None;
            }
        }

        // 3. Write submission fields.
        sqlx::query(
            r#"
            UPDATE submissions
            SET status = $1,
                time_used = $2,
                memory_used = $3,
                error_info = $4,
                judge_time = $5,
                testcases_status = $6,
                testcases_info = $7,
                test_case_results = $8,
                contest_id = $9,
                role = $10
            WHERE id = $11
            "#,
        )
        .bind(result.status.as_str())
        .bind(result.time_used_ms.map(|v| v as i32))
        .bind(result.memory_used_kb.map(|v| v as i32))
        .bind(&result.error_info)
        .bind(now)
        .bind(json!(result
            .testcases_status
            .iter()
            .map(Verdict::as_str)
            .collect::<Vec<_>>()))
        .bind(json!(result.testcases_info))
        .bind(serde_json::to_value(&result.test_case_results).unwrap_or(serde_json::Value::Null))
        .bind(contest_id)
        .bind(&role)
        .bind(task.id)
        .execute(&mut *tx)
        .await?;

        // 4. Problem stats.
        let accepted_delta = if result.status.is_accepted() { 1 } else { 0 };
        sqlx::query(
            r#"
            UPDATE problems
            SET submission_count = submission_count + 1,
                accepted_count = accepted_count + $1
            WHERE id = $2
            "#,
        )
        .bind(accepted_delta)
        .bind(task.problem_id)
        .execute(&mut *tx)
        .await?;

        // 5. Recompute user stats (not incremental, guarantees convergence).
        sqlx::query(
            r#"
            UPDATE users
            SET submissions = (SELECT COUNT(*) FROM submissions WHERE user_id = $1),
                accepted_problems = (
                    SELECT COUNT(DISTINCT problem_id) FROM submissions
                    WHERE user_id = $1 AND status = 'Accepted'
                )
            WHERE id = $1
            "#,
        )
        .bind(task.user_id)
        .execute(&mut *tx)
        .await?;

        // 6. Absorbing user-problem status.
        let new_status = if result.status.is_accepted() {
            "accepted"
        } else {
            "attempted"
        };
        sqlx::query(
            r#"
            INSERT INTO user_problem_status (user_id, problem_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, problem_id) DO UPDATE
            SET status = CASE
                WHEN user_problem_status.status = 'accepted' THEN 'accepted'
                ELSE EXCLUDED.status
            END
            "#,
        )
        .bind(task.user_id)
        .bind(task.problem_id)
        .bind(new_status)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }
}

fn is_terminal(status: Option<&str>) -> bool {
    !matches!(status, None | Some("Pending") | Some("Compiling") | Some("Running"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_and_absent_statuses_are_not_terminal() {
        assert!(!is_terminal(None));
        assert!(!is_terminal(Some("Pending")));
        assert!(!is_terminal(Some("Running")));
    }

    #[test]
    fn a_final_verdict_is_terminal() {
        assert!(is_terminal(Some("Accepted")));
        assert!(is_terminal(Some("System Error")));
    }
}
