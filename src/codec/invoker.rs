use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// An external program plus the arguments that always precede the
/// pipeline's own arguments (e.g. `wine ekstraktor.exe`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CodecCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CodecCommand {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_available(&self) -> bool {
        resolve_program(&self.program).is_some()
    }
}

impl fmt::Display for CodecCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CodecResult {
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CodecResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short description of a failed run for warnings.
    pub fn failure_detail(&self) -> String {
        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };

        match self.stderr.lines().rev().find(|line| !line.trim().is_empty()) {
            Some(line) => format!("{}: {}", status, line.trim()),
            None => status,
        }
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Codec executable not found: {}", path.display())]
    ExecutableMissing { path: PathBuf },

    #[error("Codec timed out after {} seconds", timeout.as_secs())]
    TimedOut { timeout: Duration, pid: u32 },

    #[error("Failed to launch {}: {reason}", program.display())]
    LaunchFailed { program: PathBuf, reason: String },
}

/// Runs codec executables synchronously with a hard time limit.
#[derive(Debug, Clone)]
pub struct CodecInvoker {
    timeout: Duration,
    poll_interval: Duration,
}

impl CodecInvoker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(25),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn invoke<I, S>(&self, command: &CodecCommand, args: I) -> Result<CodecResult, CodecError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program =
            resolve_program(&command.program).ok_or_else(|| CodecError::ExecutableMissing {
                path: command.program.clone(),
            })?;

        let start = Instant::now();
        let mut child = Command::new(&program)
            .args(&command.args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CodecError::LaunchFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        let pid = child.id();
        tracing::debug!(pid, program = %program.display(), "Codec launched");

        let stdout = capture(child.stdout.take());
        let stderr = capture(child.stderr.take());

        let status = match self.wait_with_deadline(&mut child, start) {
            Ok(Some(status)) => status,
            Ok(None) => {
                terminate(&mut child);
                tracing::warn!(pid, timeout = ?self.timeout, "Codec timed out and was killed");
                return Err(CodecError::TimedOut {
                    timeout: self.timeout,
                    pid,
                });
            }
            Err(e) => {
                terminate(&mut child);
                return Err(CodecError::LaunchFailed {
                    program,
                    reason: format!("failed while waiting for process: {}", e),
                });
            }
        };

        // A process the codec left behind can keep the pipes open past its
        // exit, so reading is bounded by the same deadline.
        let deadline = start + self.timeout;
        let (stdout, stdout_closed) = collect(stdout, deadline);
        let (stderr, stderr_closed) = collect(stderr, deadline);
        if !(stdout_closed && stderr_closed) {
            tracing::warn!(pid, "Codec exited but another process still holds its output, output may be incomplete");
        }

        let result = CodecResult {
            exit_code: status.code(),
            stdout,
            stderr,
            elapsed: start.elapsed(),
        };

        tracing::debug!(
            pid,
            exit_code = ?result.exit_code,
            elapsed = ?result.elapsed,
            "Codec finished"
        );

        Ok(result)
    }

    fn wait_with_deadline(&self, child: &mut Child, start: Instant) -> io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                return Ok(None);
            }

            thread::sleep(self.poll_interval.min(self.timeout - elapsed));
        }
    }
}

impl Default for CodecInvoker {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Locate an executable: an existing file as given, or a bare program
/// name looked up on `PATH`.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.is_file() {
        return Some(program.to_path_buf());
    }

    if program.components().count() == 1 {
        return which::which(program).ok();
    }

    None
}

fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "Kill failed, process probably already exited");
    }
    if let Err(e) = child.wait() {
        tracing::warn!(error = %e, "Failed to reap codec process");
    }
}

struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    closed: Receiver<()>,
}

// Pipes are drained on their own threads so the child never blocks on a
// full buffer while we poll for exit.
fn capture<R: Read + Send + 'static>(stream: Option<R>) -> Option<Capture> {
    stream.map(|mut stream| {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (closed_tx, closed) = mpsc::channel();
        let sink = Arc::clone(&buffer);

        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buffer) => buffer.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            let _ = closed_tx.send(());
        });

        Capture { buffer, closed }
    })
}

/// Whatever the stream produced by `deadline`, and whether it reached EOF.
fn collect(capture: Option<Capture>, deadline: Instant) -> (String, bool) {
    let Some(capture) = capture else {
        return (String::new(), true);
    };

    let wait = deadline.saturating_duration_since(Instant::now());
    let closed = !matches!(capture.closed.recv_timeout(wait), Err(RecvTimeoutError::Timeout));

    let bytes = capture
        .buffer
        .lock()
        .map(|buffer| buffer.clone())
        .unwrap_or_default();
    (String::from_utf8_lossy(&bytes).into_owned(), closed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> CodecCommand {
        CodecCommand::new("/bin/sh").with_args(["-c", script])
    }

    #[test]
    fn test_missing_executable() {
        let invoker = CodecInvoker::new(Duration::from_secs(5));
        let command = CodecCommand::new("/nonexistent/bin/ekstraktor");

        let result = invoker.invoke(&command, ["in.fbx", "out.dat"]);
        assert!(matches!(result, Err(CodecError::ExecutableMissing { .. })));
        assert!(!command.is_available());
    }

    #[test]
    fn test_missing_bare_program_name() {
        let invoker = CodecInvoker::default();
        let command = CodecCommand::new("rizombridge-no-such-codec");

        let result = invoker.invoke(&command, Vec::<String>::new());
        assert!(matches!(result, Err(CodecError::ExecutableMissing { .. })));
    }

    #[test]
    fn test_display() {
        let command = CodecCommand::new("wine").with_args(["injektor.exe"]);
        assert_eq!(command.to_string(), "wine injektor.exe");
    }

    #[test]
    fn test_failure_detail() {
        let result = CodecResult {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "Could not open FBX file\n\n".to_string(),
            elapsed: Duration::from_millis(3),
        };
        assert!(!result.success());
        assert_eq!(result.failure_detail(), "exit code 1: Could not open FBX file");

        let killed = CodecResult {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::from_millis(3),
        };
        assert_eq!(killed.failure_detail(), "terminated by signal");
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_streams_and_exit_code() {
        let invoker = CodecInvoker::new(Duration::from_secs(10));
        let command = shell("echo out; echo err >&2; exit 3");

        let result = invoker.invoke(&command, Vec::<String>::new()).unwrap();
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert!(!result.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_leading_args_precede_pipeline_args() {
        let invoker = CodecInvoker::new(Duration::from_secs(10));
        let command = shell("printf '%s|%s' \"$0\" \"$1\"");

        let result = invoker.invoke(&command, ["model.fbx", "model.dat"]).unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "model.fbx|model.dat");
    }

    #[cfg(unix)]
    #[test]
    fn test_large_output_does_not_block() {
        let invoker = CodecInvoker::new(Duration::from_secs(10));
        let command = shell("head -c 262144 /dev/zero");

        let result = invoker.invoke(&command, Vec::<String>::new()).unwrap();
        assert!(result.success());
        assert_eq!(result.stdout.len(), 262144);
    }

    #[cfg(unix)]
    #[test]
    fn test_leftover_process_does_not_extend_the_wait() {
        let invoker = CodecInvoker::new(Duration::from_secs(1));
        let command = shell("echo done; sleep 6 & exit 0");

        let start = Instant::now();
        let result = invoker.invoke(&command, Vec::<String>::new()).unwrap();
        let elapsed = start.elapsed();

        assert!(result.success());
        assert!(result.stdout.contains("done"), "{:?}", result.stdout);
        assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let invoker = CodecInvoker::new(Duration::from_secs(1));
        let command = CodecCommand::new("sleep");

        let start = Instant::now();
        let result = invoker.invoke(&command, ["10"]);
        let elapsed = start.elapsed();

        let pid = match result {
            Err(CodecError::TimedOut { timeout, pid }) => {
                assert_eq!(timeout, Duration::from_secs(1));
                pid
            }
            other => panic!("expected timeout, got {:?}", other),
        };
        assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);

        // The child was killed and reaped, so its proc entry is gone.
        #[cfg(target_os = "linux")]
        assert!(!Path::new(&format!("/proc/{}", pid)).exists());
        #[cfg(not(target_os = "linux"))]
        let _ = pid;
    }
}
