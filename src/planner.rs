//! Concurrency Planner (C9, §4.9): computes the dispatcher's fixed
//! concurrency cap from host RAM/CPU once at startup.

use sysinfo::System;

use crate::config::Config;

/// Default per-task memory budget (MB) used when `JUDGE_TASK_MEMORY_LIMIT`
/// is unset.
const DEFAULT_TASK_MEMORY_MB: u32 = 1024;

/// `concurrency = max(1, min(floor((availRAM_GB x 1024) / taskMemoryMB), availCores))`
/// (§4.9). Computed once; the result is immutable for the process lifetime.
pub fn plan_concurrency(config: &Config) -> usize {
    let mut sys = System::new_all();
    sys.refresh_memory();
    sys.refresh_cpu_all();

    let total_ram_gb = sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0);
    let cores = sys.cpus().len() as f64;

    let avail_ram_gb = (total_ram_gb - config.reserve_memory_gb).max(0.0);
    let avail_cores = (cores - config.reserve_cpu).max(0.0);

    let task_memory_mb = if config.task_memory_limit_mb == 0 {
        DEFAULT_TASK_MEMORY_MB
    } else {
        config.task_memory_limit_mb
    } as f64;

    let by_memory = ((avail_ram_gb * 1024.0) / task_memory_mb).floor();
    let by_cores = avail_cores.floor();

    (by_memory.min(by_cores).max(1.0)) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(task_memory_limit_mb: u32, reserve_memory_gb: f64, reserve_cpu: f64) -> Config {
        Config {
            judge_addr: "http://goj-judge:5050".to_string(),
            task_memory_limit_mb,
            reserve_memory_gb,
            reserve_cpu,
            language_config_path: "pkg/judge/config/language.yaml".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            database_url: "postgres://localhost/judge".to_string(),
        }
    }

    #[test]
    fn never_returns_zero_even_on_a_tiny_host() {
        let cfg = config(1_000_000, 0.0, 0.0);
        assert!(plan_concurrency(&cfg) >= 1);
    }

    #[test]
    fn smaller_task_budget_allows_more_concurrency() {
        let small_tasks = config(128, 0.0, 0.0);
        let large_tasks = config(8192, 0.0, 0.0);
        assert!(plan_concurrency(&small_tasks) >= plan_concurrency(&large_tasks));
    }
}
