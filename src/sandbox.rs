//! Sandbox Client (C1, §4.1): a typed wrapper around the sandbox's HTTP RPC.
//!
//! This module does not interpret verdicts, does not know about languages,
//! and does not compare outputs — it only marshals commands and unmarshals
//! responses, the same layering the teacher draws between its low-level
//! sandbox wrapper and the judging logic built on top of it.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Either inline content or a reference to a previously cached sandbox file.
/// Serializes as `{"content": "..."}` or `{"fileId": "..."}`, matching the
/// `copyIn` wire shape in §4.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CopyInEntry {
    Content { content: String },
    FileId { #[serde(rename = "fileId")] file_id: String },
}

impl CopyInEntry {
    pub fn content(s: impl Into<String>) -> Self {
        CopyInEntry::Content { content: s.into() }
    }

    pub fn file_id(id: impl Into<String>) -> Self {
        CopyInEntry::FileId { file_id: id.into() }
    }
}

/// One of the three positional `files` slots (stdin/stdout/stderr). stdin is
/// provided as inline content; stdout/stderr are named outputs with a byte
/// cap, per §4.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSpec {
    StdinContent { content: String },
    OutputSpec { name: String, max: u64 },
}

impl FileSpec {
    pub fn stdin(content: impl Into<String>) -> Self {
        FileSpec::StdinContent { content: content.into() }
    }

    pub fn output(name: impl Into<String>, max: u64) -> Self {
        FileSpec::OutputSpec { name: name.into(), max }
    }
}

/// One command in a `/run` batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxCmd {
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    /// files[0] = stdin, files[1] = stdout, files[2] = stderr.
    pub files: Vec<FileSpec>,
    #[serde(rename = "cpuLimit")]
    pub cpu_limit_ns: u64,
    #[serde(rename = "memoryLimit")]
    pub memory_limit_bytes: u64,
    #[serde(rename = "procLimit")]
    pub proc_limit: u32,
    #[serde(rename = "copyIn")]
    pub copy_in: HashMap<String, CopyInEntry>,
    #[serde(rename = "copyOut", default, skip_serializing_if = "Vec::is_empty")]
    pub copy_out: Vec<String>,
    #[serde(
        rename = "copyOutCached",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub copy_out_cached: Vec<String>,
}

/// Builder-style constructor covering the common two shapes (compile/run).
impl SandboxCmd {
    pub fn new(args: Vec<String>, cpu_limit_ns: u64, memory_limit_bytes: u64) -> Self {
        Self {
            args,
            env: Vec::new(),
            files: vec![
                FileSpec::stdin(""),
                FileSpec::output("stdout", 64 * 1024 * 1024),
                FileSpec::output("stderr", 64 * 1024 * 1024),
            ],
            cpu_limit_ns,
            memory_limit_bytes,
            proc_limit: 1,
            copy_in: HashMap::new(),
            copy_out: Vec::new(),
            copy_out_cached: Vec::new(),
        }
    }

    pub fn with_env(mut self, env: Vec<String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_stdin(mut self, content: impl Into<String>) -> Self {
        self.files[0] = FileSpec::stdin(content);
        self
    }

    pub fn with_proc_limit(mut self, n: u32) -> Self {
        self.proc_limit = n;
        self
    }

    /// Rename the stdout/stderr file-spec slots. Needed whenever the names
    /// referenced by `copyOutCached`/`fileIds` differ from the default
    /// `"stdout"`/`"stderr"` (e.g. per-case `stdoutN`/`stderrN`).
    pub fn with_output_names(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        let stdout_max = output_max(&self.files[1]);
        let stderr_max = output_max(&self.files[2]);
        self.files[1] = FileSpec::output(stdout, stdout_max);
        self.files[2] = FileSpec::output(stderr, stderr_max);
        self
    }

    /// Override the byte caps on the stdout/stderr file-spec slots.
    pub fn with_output_max(mut self, stdout_max: u64, stderr_max: u64) -> Self {
        let stdout_name = output_name(&self.files[1]).to_string();
        let stderr_name = output_name(&self.files[2]).to_string();
        self.files[1] = FileSpec::output(stdout_name, stdout_max);
        self.files[2] = FileSpec::output(stderr_name, stderr_max);
        self
    }

    pub fn with_copy_in(mut self, name: impl Into<String>, entry: CopyInEntry) -> Self {
        self.copy_in.insert(name.into(), entry);
        self
    }

    pub fn with_copy_out(mut self, names: Vec<String>) -> Self {
        self.copy_out = names;
        self
    }

    pub fn with_copy_out_cached(mut self, names: Vec<String>) -> Self {
        self.copy_out_cached = names;
        self
    }
}

fn output_max(spec: &FileSpec) -> u64 {
    match spec {
        FileSpec::OutputSpec { max, .. } => *max,
        FileSpec::StdinContent { .. } => 64 * 1024 * 1024,
    }
}

fn output_name(spec: &FileSpec) -> &str {
    match spec {
        FileSpec::OutputSpec { name, .. } => name,
        FileSpec::StdinContent { .. } => "",
    }
}

#[derive(Debug, Clone, Serialize)]
struct RunRequest<'a> {
    cmd: &'a [SandboxCmd],
}

/// One element of the `/run` response array, aligned positionally with the
/// request's `cmd` array.
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxResponse {
    pub status: String,
    #[serde(rename = "exitStatus", default)]
    pub exit_status: i32,
    /// CPU time used, nanoseconds.
    #[serde(default)]
    pub time: u64,
    /// Memory used, bytes.
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub files: HashMap<String, String>,
    #[serde(rename = "fileIds", default)]
    pub file_ids: HashMap<String, String>,
}

impl SandboxResponse {
    pub fn time_ms(&self) -> u32 {
        (self.time / 1_000_000) as u32
    }

    pub fn memory_kb(&self) -> u32 {
        (self.memory / 1024) as u32
    }

    pub fn stdout(&self) -> &str {
        self.file("stdout")
    }

    pub fn stderr(&self) -> &str {
        self.file("stderr")
    }

    /// Inline content returned for a `copyOut`-requested name. Per-case runs
    /// request `stdoutN`/`stderrN` rather than the fixed `stdout`/`stderr`
    /// names the compile phase uses.
    pub fn file(&self, name: &str) -> &str {
        self.files.get(name).map(|s| s.as_str()).unwrap_or("")
    }
}

/// Thin HTTP client to the sandbox service. Holds a single pooled
/// `reqwest::Client` for the lifetime of the process.
#[derive(Clone)]
pub struct SandboxClient {
    http: reqwest::Client,
    base_url: String,
}

impl SandboxClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(660))
            .build()
            .expect("failed to build sandbox HTTP client");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// `POST /run`. Transport failures become `SandboxUnreachable`; C10 is
    /// the only layer that retries, so this never retries internally.
    pub async fn run(&self, cmds: &[SandboxCmd]) -> Result<Vec<SandboxResponse>, DispatchError> {
        let url = format!("{}/run", self.base_url);
        let body = RunRequest { cmd: cmds };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::SandboxUnreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DispatchError::SandboxUnreachable(format!(
                "sandbox returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<Vec<SandboxResponse>>()
            .await
            .map_err(|e| DispatchError::SandboxUnreachable(e.to_string()))
    }

    /// `DELETE /file/{id}`, best-effort. Failures are logged by the caller
    /// and never retried (§7).
    pub async fn delete_file(&self, file_id: &str) -> Result<(), DispatchError> {
        let url = format!("{}/file/{}", self.base_url, file_id);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| DispatchError::SandboxUnreachable(e.to_string()))?;

        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(DispatchError::SandboxUnreachable(format!(
                "delete file {} returned HTTP {}",
                file_id,
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_in_entry_serializes_to_exact_wire_shape() {
        let content = serde_json::to_value(CopyInEntry::content("int main(){}")).unwrap();
        assert_eq!(content, serde_json::json!({"content": "int main(){}"}));

        let file_id = serde_json::to_value(CopyInEntry::file_id("abc123")).unwrap();
        assert_eq!(file_id, serde_json::json!({"fileId": "abc123"}));
    }

    #[test]
    fn file_spec_serializes_stdin_and_output_shapes() {
        let stdin = serde_json::to_value(FileSpec::stdin("hi\n")).unwrap();
        assert_eq!(stdin, serde_json::json!({"content": "hi\n"}));

        let stdout = serde_json::to_value(FileSpec::output("stdout", 1024)).unwrap();
        assert_eq!(stdout, serde_json::json!({"name": "stdout", "max": 1024}));
    }

    #[test]
    fn sandbox_cmd_builder_produces_three_file_slots() {
        let cmd = SandboxCmd::new(vec!["./a.out".into()], 1_000_000_000, 256 * 1024 * 1024)
            .with_stdin("input\n")
            .with_copy_in("a.out", CopyInEntry::file_id("bin-1"))
            .with_copy_out_cached(vec!["stdout0".into()]);

        assert_eq!(cmd.files.len(), 3);
        assert_eq!(cmd.copy_out_cached, vec!["stdout0".to_string()]);
        assert!(cmd.copy_in.contains_key("a.out"));
    }

    #[test]
    fn with_output_names_renames_stdout_and_stderr_slots_preserving_caps() {
        let cmd = SandboxCmd::new(vec!["./a.out".into()], 1_000_000_000, 256 * 1024 * 1024)
            .with_output_max(1024, 2048)
            .with_output_names("stdout3", "stderr3");

        assert_eq!(output_name(&cmd.files[1]), "stdout3");
        assert_eq!(output_max(&cmd.files[1]), 1024);
        assert_eq!(output_name(&cmd.files[2]), "stderr3");
        assert_eq!(output_max(&cmd.files[2]), 2048);
    }

    #[test]
    fn response_converts_ns_and_bytes_to_ms_and_kb() {
        let mut files = HashMap::new();
        files.insert("stdout".to_string(), "42\n".to_string());
        let resp = SandboxResponse {
            status: "Accepted".to_string(),
            exit_status: 0,
            time: 123_000_000,
            memory: 2 * 1024 * 1024,
            files,
            file_ids: HashMap::new(),
        };
        assert_eq!(resp.time_ms(), 123);
        assert_eq!(resp.memory_kb(), 2048);
        assert_eq!(resp.stdout(), "42\n");
    }
}
