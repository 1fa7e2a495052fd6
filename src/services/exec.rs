use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::utils::format::safe_truncate;

/// Maximum captured output size per stream (1 MB); the transport layer
/// chunks further for the message size ceiling
const MAX_OUTPUT_BYTES: usize = 1_048_576;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Error executing command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Command timed out after {0} seconds")]
    Timeout(u64),
}

/// One launch request: command text, jail-resolved working directory,
/// per-user environment overrides, optional stdin payload, and timeout
pub struct ExecRequest<'a> {
    pub command: &'a str,
    pub working_dir: &'a Path,
    pub envs: &'a [(String, String)],
    pub stdin: Option<&'a str>,
    pub timeout_secs: u64,
}

#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    /// Trimmed stdout and stderr joined with a newline, empty parts dropped
    pub fn combined(&self) -> String {
        [self.stdout.trim(), self.stderr.trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Run a command line through `bash -c` with a hard timeout.
/// The child is killed when the timeout elapses.
pub async fn run_command(req: ExecRequest<'_>) -> Result<CommandOutput, ExecError> {
    let mut cmd = Command::new("bash");
    cmd.arg("-c")
        .arg(req.command)
        .current_dir(req.working_dir)
        .stdin(if req.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in req.envs {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn()?;

    if let Some(input) = req.stdin {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await?;
            // dropping the handle closes the pipe
        }
    }

    let waited = tokio::time::timeout(
        Duration::from_secs(req.timeout_secs),
        child.wait_with_output(),
    )
    .await;

    match waited {
        Ok(output) => {
            let output = output?;
            let mut stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let mut stderr = String::from_utf8_lossy(&output.stderr).to_string();
            if stdout.len() > MAX_OUTPUT_BYTES {
                safe_truncate(&mut stdout, MAX_OUTPUT_BYTES);
                stdout.push_str("\n... [output truncated at 1MB]");
            }
            if stderr.len() > MAX_OUTPUT_BYTES {
                safe_truncate(&mut stderr, MAX_OUTPUT_BYTES);
                stderr.push_str("\n... [stderr truncated at 1MB]");
            }
            Ok(CommandOutput {
                stdout,
                stderr,
                success: output.status.success(),
            })
        }
        // timeout dropped the wait future, which kills the child
        Err(_) => Err(ExecError::Timeout(req.timeout_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request<'a>(command: &'a str, dir: &'a Path) -> ExecRequest<'a> {
        ExecRequest {
            command,
            working_dir: dir,
            envs: &[],
            stdin: None,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_captures_stdout_and_status() {
        let temp = TempDir::new().unwrap();
        let out = run_command(request("echo hello", temp.path())).await.unwrap();
        assert!(out.success);
        assert_eq!(out.combined(), "hello");
    }

    #[tokio::test]
    async fn test_combines_stderr() {
        let temp = TempDir::new().unwrap();
        let out = run_command(request("echo out; echo err 1>&2", temp.path()))
            .await
            .unwrap();
        assert_eq!(out.combined(), "out\nerr");
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let temp = TempDir::new().unwrap();
        let out = run_command(request("pwd", temp.path())).await.unwrap();
        assert_eq!(
            out.stdout.trim(),
            temp.path().canonicalize().unwrap().display().to_string()
        );
    }

    #[tokio::test]
    async fn test_env_overrides_visible() {
        let temp = TempDir::new().unwrap();
        let envs = vec![("GH_CONFIG_DIR".to_string(), "/tmp/ghcfg".to_string())];
        let req = ExecRequest {
            command: "echo $GH_CONFIG_DIR",
            working_dir: temp.path(),
            envs: &envs,
            stdin: None,
            timeout_secs: 5,
        };
        let out = run_command(req).await.unwrap();
        assert_eq!(out.stdout.trim(), "/tmp/ghcfg");
    }

    #[tokio::test]
    async fn test_stdin_payload() {
        let temp = TempDir::new().unwrap();
        let req = ExecRequest {
            command: "cat",
            working_dir: temp.path(),
            envs: &[],
            stdin: Some("piped token"),
            timeout_secs: 5,
        };
        let out = run_command(req).await.unwrap();
        assert_eq!(out.stdout, "piped token");
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let temp = TempDir::new().unwrap();
        let req = ExecRequest {
            command: "sleep 30",
            working_dir: temp.path(),
            envs: &[],
            stdin: None,
            timeout_secs: 1,
        };
        match run_command(req).await {
            Err(ExecError::Timeout(1)) => {}
            other => panic!("expected timeout, got {:?}", other.map(|o| o.combined())),
        }
    }
}
