//! Language Catalogue (C2, §4.2): a YAML-described set of compile/run
//! recipes and resource caps, loaded once at boot and read-only thereafter.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::DispatchError;

/// Compile-phase resource caps and command template.
#[derive(Debug, Clone, Deserialize)]
pub struct CompileSpec {
    pub command: Vec<String>,
    #[serde(rename = "artifactName")]
    pub artifact_name: String,
    #[serde(rename = "cpuLimitMs")]
    pub cpu_limit_ms: u64,
    #[serde(rename = "memoryLimitMb")]
    pub memory_limit_mb: u64,
    #[serde(rename = "procLimit")]
    pub proc_limit: u32,
    #[serde(rename = "stdoutMax", default = "default_output_max")]
    pub stdout_max: u64,
    #[serde(rename = "stderrMax", default = "default_output_max")]
    pub stderr_max: u64,
}

/// Run-phase resource caps, command template and the amplification factor
/// applied to the task's nominal limits before they reach the sandbox.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSpec {
    pub command: Vec<String>,
    #[serde(rename = "limitAmplify", default = "default_amplify")]
    pub limit_amplify: u32,
    #[serde(rename = "procLimit", default = "default_run_proc_limit")]
    pub proc_limit: u32,
    #[serde(rename = "stdoutMax", default = "default_output_max")]
    pub stdout_max: u64,
    #[serde(rename = "stderrMax", default = "default_output_max")]
    pub stderr_max: u64,
}

fn default_amplify() -> u32 {
    1
}

fn default_run_proc_limit() -> u32 {
    1
}

/// 64 MiB, matching `SandboxCmd::new`'s own fallback.
fn default_output_max() -> u64 {
    64 * 1024 * 1024
}

/// One language's full recipe. A language is *interpreted* iff `compile` is
/// absent.
#[derive(Debug, Clone, Deserialize)]
pub struct LangConfig {
    #[serde(rename = "sourceFile")]
    pub source_file: String,
    #[serde(default)]
    pub env: Vec<String>,
    pub compile: Option<CompileSpec>,
    pub run: RunSpec,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl LangConfig {
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Run-phase limits after applying `limitAmplify` to the task's nominal
    /// per-submission limits (§5: `memoryLimitMB × limitAmplify`).
    pub fn amplified_time_limit_ms(&self, base_time_limit_ms: u32) -> u64 {
        base_time_limit_ms as u64 * self.run.limit_amplify as u64
    }

    pub fn amplified_memory_limit_mb(&self, base_memory_limit_mb: u32) -> u64 {
        base_memory_limit_mb as u64 * self.run.limit_amplify as u64
    }
}

/// Defaults merged into any language entry missing the corresponding field.
/// Only `env` is currently merge-eligible; everything else is required per
/// entry in the catalogue.
#[derive(Debug, Deserialize, Default)]
struct Defaults {
    #[serde(default)]
    env: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Catalogue {
    #[serde(default)]
    defaults: Defaults,
    languages: HashMap<String, LangConfig>,
}

static LANGUAGES: OnceLock<HashMap<String, LangConfig>> = OnceLock::new();

/// Parse and install the global language catalogue. Must be called exactly
/// once at boot, before any judge worker starts.
pub fn init_languages(yaml: &str) -> anyhow::Result<()> {
    let mut catalogue: Catalogue = serde_yaml::from_str(yaml)?;

    let mut languages = HashMap::new();
    for (name, mut config) in catalogue.languages.drain() {
        if config.env.is_empty() {
            config.env = catalogue.defaults.env.clone();
        }
        let aliases = config.aliases.clone();
        languages.insert(name.to_lowercase(), config.clone());
        for alias in aliases {
            languages.insert(alias.to_lowercase(), config.clone());
        }
    }

    LANGUAGES
        .set(languages)
        .map_err(|_| anyhow::anyhow!("language catalogue already initialized"))?;
    Ok(())
}

/// Resolve a language name (or alias) to its catalogue entry.
pub fn get_language(language: &str) -> Result<LangConfig, DispatchError> {
    LANGUAGES
        .get()
        .and_then(|langs| langs.get(&language.to_lowercase()).cloned())
        .ok_or_else(|| DispatchError::UnsupportedLanguage(language.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
defaults:
  env:
    - "PATH=/usr/bin:/bin"

languages:
  cpp:
    sourceFile: main.cpp
    compile:
      command: ["g++", "-O2", "-std=c++17", "-o", "main", "main.cpp"]
      artifactName: main
      cpuLimitMs: 10000
      memoryLimitMb: 512
      procLimit: 10
    run:
      command: ["./main"]
      limitAmplify: 2
    aliases: ["g++", "c++"]
  python3:
    sourceFile: main.py
    run:
      command: ["python3", "main.py"]
      limitAmplify: 3
      procLimit: 4
      stdoutMax: 1048576
      stderrMax: 1048576
"#;

    #[test]
    fn compiled_language_has_compile_spec_and_amplify() {
        let catalogue: Catalogue = serde_yaml::from_str(SAMPLE).unwrap();
        let cpp = &catalogue.languages["cpp"];
        assert!(cpp.is_compiled());
        assert_eq!(cpp.run.limit_amplify, 2);
        assert_eq!(cpp.compile.as_ref().unwrap().artifact_name, "main");
    }

    #[test]
    fn interpreted_language_has_no_compile_spec() {
        let catalogue: Catalogue = serde_yaml::from_str(SAMPLE).unwrap();
        let python = &catalogue.languages["python3"];
        assert!(!python.is_compiled());
        assert_eq!(python.run.limit_amplify, 3);
    }

    #[test]
    fn amplified_limits_multiply_base_task_limits() {
        let catalogue: Catalogue = serde_yaml::from_str(SAMPLE).unwrap();
        let cpp = &catalogue.languages["cpp"];
        assert_eq!(cpp.amplified_time_limit_ms(1000), 2000);
        assert_eq!(cpp.amplified_memory_limit_mb(256), 512);
    }

    #[test]
    fn run_proc_and_output_limits_default_when_absent_but_override_when_given() {
        let catalogue: Catalogue = serde_yaml::from_str(SAMPLE).unwrap();

        let cpp = &catalogue.languages["cpp"];
        assert_eq!(cpp.run.proc_limit, 1);
        assert_eq!(cpp.run.stdout_max, 64 * 1024 * 1024);
        assert_eq!(cpp.compile.as_ref().unwrap().stdout_max, 64 * 1024 * 1024);

        let python = &catalogue.languages["python3"];
        assert_eq!(python.run.proc_limit, 4);
        assert_eq!(python.run.stdout_max, 1_048_576);
        assert_eq!(python.run.stderr_max, 1_048_576);
    }
}
