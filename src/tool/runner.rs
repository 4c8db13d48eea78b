use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of one finished tool invocation.
///
/// An empty `stdout` with exit code 0 is a valid result ("the tool had
/// nothing to report") and is distinct from "not executed" — a run that
/// never produced a status yields `Err` from [`run`] instead.
#[derive(Debug)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    /// Success is exit code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execute `program` with a discrete argument vector and capture its output.
///
/// Blocks the calling thread until the tool exits or `timeout` elapses;
/// a tool still running at the deadline is killed and the call errors.
/// Knows nothing about metadata semantics — callers interpret the output.
///
/// Errors (program missing, wait interrupted, timeout) are returned for
/// the caller to log and convert into an absence result; invocations are
/// never retried.
pub fn run(program: &Path, args: &[OsString], timeout: Duration) -> Result<ExecOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to launch {}", program.display()))?;

    // Drain both pipes on their own threads so a chatty tool cannot
    // deadlock against a full pipe buffer while we poll for exit.
    let stdout = child.stdout.take().context("Failed to capture stdout")?;
    let stderr = child.stderr.take().context("Failed to capture stderr")?;
    let stdout_thread = thread::spawn(move || read_lossy(stdout));
    let stderr_thread = thread::spawn(move || read_lossy(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait().context("Failed to wait for the tool")? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            anyhow::bail!(
                "{} did not finish within {}s and was killed",
                program.display(),
                timeout.as_secs_f32()
            );
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    Ok(ExecOutput {
        stdout,
        stderr,
        exit_code: status.code().unwrap_or(-1),
    })
}

fn read_lossy(mut source: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = source.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fake_tool(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("tool.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn captures_stdout_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "echo hello");

        let out = run(&tool, &[], Duration::from_secs(5)).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn passes_arguments_as_discrete_vector() {
        let dir = TempDir::new().unwrap();
        // $2 arrives intact even with a space in it — no shell splitting
        let tool = fake_tool(&dir, "echo \"$2\"");

        let out = run(
            &tool,
            &args(&["-S", "/photos/with space.jpg"]),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(out.stdout.trim(), "/photos/with space.jpg");
    }

    #[test]
    fn nonzero_exit_is_a_result_not_an_error() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "echo oops >&2\nexit 3");

        let out = run(&tool, &[], Duration::from_secs(5)).unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn empty_output_with_success_is_valid() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "exit 0");

        let out = run(&tool, &[], Duration::from_secs(5)).unwrap();
        assert!(out.success());
        assert!(out.stdout.is_empty());
    }

    #[test]
    fn missing_program_is_an_error() {
        let result = run(
            Path::new("/nonexistent/exiftool"),
            &[],
            Duration::from_secs(5),
        );
        assert!(result.is_err());
    }

    #[test]
    fn hung_tool_is_killed_at_the_deadline() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "exec sleep 30");

        let started = Instant::now();
        let result = run(&tool, &[], Duration::from_millis(200));
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
