//! Single abstraction for running an external tool with a wall-clock bound.
//!
//! Both pandoc and pdflatex go through [`run_tool`]; their stages only decide
//! arguments and how to interpret the resulting [`ToolOutput`].
//!
//! stdin is closed so a tool that unexpectedly prompts fails fast instead of
//! blocking. stdout and stderr are drained concurrently with `wait()`;
//! reading them one after another could deadlock once a pipe buffer fills.
//! Output lands in buffers that outlive the wait, so a timed-out run still
//! reports what the tool printed before it hung.
//!
//! On unix every tool runs in its own process group. On timeout the whole
//! group is killed (pdflatex spawns helpers such as `mktexpk`, and wrapper
//! scripts add a shell in between), then the child is reaped before
//! returning. `kill_on_drop` covers any early exit from this function.

use crate::config::ExternalTool;
use crate::error::CheatmarkError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// One fully-specified tool run.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Human-readable name used in messages ("pandoc", "pdflatex").
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl ToolInvocation {
    /// Build an invocation from a configured tool: its `extra_args` come
    /// first, followed by `args`.
    pub fn new(
        name: impl Into<String>,
        tool: &ExternalTool,
        args: impl IntoIterator<Item = String>,
        cwd: &Path,
        timeout: Duration,
    ) -> Self {
        let mut all_args = tool.extra_args.clone();
        all_args.extend(args);
        Self {
            name: name.into(),
            program: tool.program.clone(),
            args: all_args,
            cwd: cwd.to_path_buf(),
            timeout,
        }
    }
}

/// Typed result of a tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub elapsed_ms: u64,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// stderr followed by stdout, or `None` when the tool printed nothing.
    pub fn combined_output(&self) -> Option<String> {
        let combined = format!("{}\n{}", self.stderr.trim_end(), self.stdout.trim_end());
        match combined.trim() {
            "" => None,
            text => Some(text.to_string()),
        }
    }

    /// Exit code for messages: the number, or "signal"/"timeout".
    pub fn exit_label(&self) -> String {
        match (self.timed_out, self.exit_code) {
            (true, _) => "timeout".to_string(),
            (false, Some(code)) => code.to_string(),
            (false, None) => "signal".to_string(),
        }
    }
}

/// Run `inv` to completion or until its timeout elapses.
///
/// Only a failure to spawn is an error; non-zero exits and timeouts are
/// reported through [`ToolOutput`] for the calling stage to classify.
pub async fn run_tool(inv: &ToolInvocation) -> Result<ToolOutput, CheatmarkError> {
    debug!(
        "Running {}: {} {:?} (cwd={}, timeout={:?})",
        inv.name,
        inv.program.display(),
        inv.args,
        inv.cwd.display(),
        inv.timeout
    );

    let start = Instant::now();
    let mut command = Command::new(&inv.program);
    command
        .args(&inv.args)
        .current_dir(&inv.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|e| CheatmarkError::ToolLaunch {
        tool: inv.name.clone(),
        program: inv.program.clone(),
        source: e,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_buf = Mutex::new(Vec::new());
    let err_buf = Mutex::new(Vec::new());

    let finished = tokio::time::timeout(inv.timeout, async {
        tokio::try_join!(
            child.wait(),
            drain(stdout, &out_buf),
            drain(stderr, &err_buf)
        )
    })
    .await;

    let status = match finished {
        Ok(Ok((status, (), ()))) => Some(status),
        Ok(Err(e)) => {
            return Err(CheatmarkError::Internal(format!(
                "I/O error while waiting for {}: {e}",
                inv.name
            )))
        }
        Err(_) => {
            warn!(
                "{} exceeded {:?}; killing its process group",
                inv.name, inv.timeout
            );
            kill_tree(&mut child, &inv.name).await;
            None
        }
    };

    let output = ToolOutput {
        exit_code: status.and_then(|s| s.code()),
        stdout: into_text(out_buf),
        stderr: into_text(err_buf),
        timed_out: status.is_none(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    debug!(
        "{} finished: exit={} in {}ms",
        inv.name,
        output.exit_label(),
        output.elapsed_ms
    );
    Ok(output)
}

/// Copy `pipe` into `sink` chunk by chunk, so whatever was read survives
/// the future being dropped at the timeout.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, sink: &Mutex<Vec<u8>>) -> std::io::Result<()> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(&chunk[..n]);
    }
}

fn into_text(buf: Mutex<Vec<u8>>) -> String {
    let bytes = buf.into_inner().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

/// SIGKILL the child's whole process group, then kill and reap the child.
async fn kill_tree(child: &mut Child, name: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: plain syscall on a pid we own; the child is not reaped yet,
        // so its pid (and pgid, via process_group(0)) cannot have been reused.
        let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            warn!(
                "Failed to kill process group of {}: {}",
                name,
                std::io::Error::last_os_error()
            );
        }
    }
    if let Err(e) = child.kill().await {
        warn!("Failed to kill {}: {}", name, e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> ToolInvocation {
        ToolInvocation::new(
            "sh",
            &ExternalTool::new("sh").with_args(["-c"]),
            [script.to_string()],
            &std::env::temp_dir(),
            timeout,
        )
    }

    #[tokio::test]
    async fn captures_exit_code_and_streams() {
        let out = run_tool(&sh("echo out; echo err >&2; exit 3", Duration::from_secs(10)))
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(!out.timed_out);
        assert!(!out.success());
        assert_eq!(out.exit_label(), "3");
    }

    #[tokio::test]
    async fn runs_in_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut inv = sh("pwd", Duration::from_secs(10));
        inv.cwd = dir.path().to_path_buf();
        let out = run_tool(&inv).await.unwrap();
        assert!(out.success());
        let reported = PathBuf::from(out.stdout.trim()).canonicalize().unwrap();
        assert_eq!(reported, dir.path().canonicalize().unwrap());
    }

    #[tokio::test]
    async fn timeout_kills_the_process() {
        let start = Instant::now();
        let out = run_tool(&sh("exec sleep 20", Duration::from_millis(300)))
            .await
            .unwrap();
        assert!(out.timed_out);
        assert_eq!(out.exit_code, None);
        assert_eq!(out.exit_label(), "timeout");
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn timeout_keeps_partial_output() {
        let out = run_tool(&sh(
            "echo started; echo 'warming up' >&2; sleep 30; true",
            Duration::from_millis(800),
        ))
        .await
        .unwrap();
        assert!(out.timed_out);
        assert_eq!(out.stdout.trim(), "started");
        assert_eq!(out.stderr.trim(), "warming up");
        assert_eq!(out.combined_output().as_deref(), Some("warming up\nstarted"));
    }

    /// Alive and not a zombie waiting to be reaped.
    #[cfg(target_os = "linux")]
    fn is_alive(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn timeout_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("grandchild.pid");
        let script = format!("sleep 30 & echo $! > '{}'; wait; true", pidfile.display());

        let out = run_tool(&sh(&script, Duration::from_millis(1000)))
            .await
            .unwrap();
        assert!(out.timed_out);

        let pid: i32 = std::fs::read_to_string(&pidfile)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while is_alive(pid) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!is_alive(pid), "grandchild {pid} outlived the timeout");
    }

    #[test]
    fn combined_output_is_none_when_silent() {
        assert_eq!(ToolOutput::default().combined_output(), None);
        let out = ToolOutput {
            stdout: "only stdout\n".into(),
            ..ToolOutput::default()
        };
        assert_eq!(out.combined_output().as_deref(), Some("only stdout"));
    }

    #[tokio::test]
    async fn missing_program_is_launch_error() {
        let inv = ToolInvocation::new(
            "ghost",
            &ExternalTool::new("/definitely/not/a/real/binary"),
            Vec::new(),
            &std::env::temp_dir(),
            Duration::from_secs(1),
        );
        let err = run_tool(&inv).await.unwrap_err();
        assert!(matches!(err, CheatmarkError::ToolLaunch { .. }), "got: {err}");
    }

    #[test]
    fn extra_args_precede_stage_args() {
        let inv = ToolInvocation::new(
            "pandoc",
            &ExternalTool::new("pandoc").with_args(["--listings"]),
            vec!["in.md".to_string()],
            Path::new("/ws"),
            Duration::from_secs(1),
        );
        assert_eq!(inv.args, vec!["--listings".to_string(), "in.md".to_string()]);
    }
}
