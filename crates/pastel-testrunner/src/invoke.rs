//! Child-process plumbing shared by the compiler invoker and the target
//! runners.
//!
//! Output is captured on reader threads with byte caps, and every child is
//! bounded by a wall timeout so a hung toolchain fails its stage instead of
//! stalling the whole run.

use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

const STDOUT_CAP: usize = 1024 * 1024;
const STDERR_CAP: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl CapturedOutput {
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    pub fn exited_cleanly(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// stdout and stderr merged, for build-tool output where diagnostics may
    /// land on either stream.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.trim().to_string();
        let err = self.stderr.trim();
        if !err.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(err);
        }
        out
    }
}

/// Run a child to completion, capturing stdout/stderr as text. Paths handed
/// to children are absolute, so `cwd` only controls where relative outputs
/// land.
pub fn run_tool(
    program: impl AsRef<OsStr>,
    args: &[impl AsRef<OsStr>],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<CapturedOutput> {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawn {}", program.to_string_lossy()))?;

    let stdout = child.stdout.take().context("take child stdout")?;
    let stderr = child.stderr.take().context("take child stderr")?;

    let stdout_thread =
        std::thread::spawn(move || -> std::io::Result<(Vec<u8>, bool)> {
            read_to_end_capped(stdout, STDOUT_CAP)
        });
    let stderr_thread =
        std::thread::spawn(move || -> std::io::Result<(Vec<u8>, bool)> {
            read_to_end_capped(stderr, STDERR_CAP)
        });

    let (status, timed_out) = wait_with_wall_timeout(&mut child, timeout)?;

    let (stdout_bytes, stdout_truncated) = stdout_thread
        .join()
        .unwrap_or_else(|_| Ok((Vec::new(), false)))
        .context("read child stdout")?;
    let (stderr_bytes, stderr_truncated) = stderr_thread
        .join()
        .unwrap_or_else(|_| Ok((Vec::new(), false)))
        .context("read child stderr")?;

    Ok(CapturedOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        exit_code: status.code(),
        timed_out,
        stdout_truncated,
        stderr_truncated,
    })
}

/// `compiler <manifest> <target>`; stdout is the compiler's sole diagnostic
/// channel.
pub fn invoke_compiler(
    compiler: &Path,
    manifest_path: &Path,
    target_name: &str,
    timeout: Duration,
) -> Result<CapturedOutput> {
    let args = [manifest_path.as_os_str(), OsStr::new(target_name)];
    run_tool(compiler, &args, None, timeout)
}

fn wait_with_wall_timeout(
    child: &mut std::process::Child,
    timeout: Duration,
) -> Result<(std::process::ExitStatus, bool)> {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if let Some(status) = child.try_wait().context("try_wait child")? {
            return Ok((status, false));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            let _ = child.kill();
            let status = child.wait().context("wait child after kill")?;
            return Ok((status, true));
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn read_to_end_capped<R: Read>(mut reader: R, cap: usize) -> std::io::Result<(Vec<u8>, bool)> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];
    let mut truncated = false;

    loop {
        let n = reader.read(&mut tmp)?;
        if n == 0 {
            break;
        }

        if truncated {
            continue;
        }

        let remaining = cap.saturating_sub(buf.len());
        if n <= remaining {
            buf.extend_from_slice(&tmp[..n]);
        } else {
            buf.extend_from_slice(&tmp[..remaining]);
            truncated = true;
        }
    }

    Ok((buf, truncated))
}
