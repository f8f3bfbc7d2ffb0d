mod comparator;
mod config;
mod error;
mod judge;
mod languages;
mod manager;
mod model;
mod planner;
mod queue;
mod sandbox;
mod spj;
mod store;
mod testcases;
mod verdict;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use manager::JudgeManager;
use queue::TaskQueue;
use sandbox::SandboxClient;
use store::ResultHandler;
use testcases::TestDataRoot;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("judge=info".parse()?),
        )
        .init();

    let config = config::init();

    let language_yaml = tokio::fs::read_to_string(&config.language_config_path)
        .await
        .with_context(|| format!("failed to read language config at {}", config.language_config_path))?;
    languages::init_languages(&language_yaml)?;
    info!("loaded language catalogue from {}", config.language_config_path);

    let sandbox = SandboxClient::new(config.judge_addr.clone());
    let test_data = TestDataRoot::new("data");

    let pool = store::connect(&config.database_url)
        .await
        .context("failed to connect to the relational store")?;
    let results = Arc::new(ResultHandler::new(pool, sandbox.clone()));

    let mut queue = TaskQueue::connect(&config.redis_url)
        .await
        .context("failed to connect to redis")?;

    let concurrency = planner::plan_concurrency(config);
    info!(concurrency, "concurrency plan computed");

    let manager = JudgeManager::new(sandbox, test_data, concurrency);

    info!("judge dispatcher ready, waiting for tasks");
    manager.run(&mut queue, results).await;

    Ok(())
}
