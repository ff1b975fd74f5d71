//! Low-level shell command execution with a bounded wait

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;
use wait_timeout::ChildExt;

/// Timeout for collecting output from child process pipes
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum output size kept per stream (10MB)
const MAX_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

/// What happened when a command ran
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    /// Whether the command was killed at the timeout
    pub timed_out: bool,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Tail of combined output, for reports
    pub fn excerpt(&self, max_chars: usize) -> Option<String> {
        let combined = match (self.stdout.trim(), self.stderr.trim()) {
            ("", "") => return None,
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{out}\n{err}"),
        };
        let count = combined.chars().count();
        if count <= max_chars {
            return Some(combined);
        }
        let tail: String = combined.chars().skip(count - max_chars).collect();
        Some(format!("...{tail}"))
    }
}

/// Run `command` through the system shell in `working_dir`, killing it (and
/// on Unix its whole process group) once `timeout` elapses.
///
/// Only a failure to spawn or wait is an error; nonzero exits and timeouts
/// are reported through [`CommandOutcome`].
pub fn run_command(command: &str, working_dir: &Path, timeout: Duration) -> io::Result<CommandOutcome> {
    let start = Instant::now();
    let mut child = spawn_shell_command(command, working_dir)?;

    // Drain the pipes while waiting, or a chatty child blocks on a full pipe
    let stdout_rx = drain(child.stdout.take());
    let stderr_rx = drain(child.stderr.take());

    let wait_result = child.wait_timeout(timeout)?;
    let timed_out = wait_result.is_none();
    if timed_out {
        warn!(command, timeout_secs = timeout.as_secs(), "command timed out");
        kill_process_group(&mut child);
    }
    let duration = start.elapsed();

    let stdout = stdout_rx
        .recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
        .unwrap_or_else(|_| "[output collection timed out]".to_string());
    let stderr = stderr_rx
        .recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
        .unwrap_or_else(|_| "[output collection timed out]".to_string());

    Ok(CommandOutcome {
        exit_code: wait_result.and_then(|status| status.code()),
        stdout,
        stderr,
        duration,
        timed_out,
    })
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    match stream {
        Some(stream) => {
            thread::spawn(move || {
                let _ = tx.send(read_stream_to_string(stream));
            });
        }
        None => {
            let _ = tx.send(String::new());
        }
    }
    rx
}

/// `sh -c` on Unix and `cmd /C` on Windows, with the command as one argument.
fn spawn_shell_command(command: &str, working_dir: &Path) -> io::Result<Child> {
    let mut cmd = if cfg!(target_family = "unix") {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    } else {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    };

    cmd.current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    cmd.spawn()
}

/// Read a stream to string, keeping at most [`MAX_OUTPUT_SIZE`] bytes.
///
/// Anything past the limit is drained and discarded so the child never sees
/// a broken pipe.
fn read_stream_to_string<R: Read>(mut stream: R) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                let remaining = MAX_OUTPUT_SIZE.saturating_sub(buf.len());
                let to_copy = n.min(remaining);
                buf.extend_from_slice(&chunk[..to_copy]);
                if to_copy < n {
                    truncated = true;
                    while stream.read(&mut chunk).unwrap_or(0) > 0 {}
                    break;
                }
            }
            Err(_) => {
                if buf.is_empty() {
                    return "[error reading output]".to_string();
                }
                break;
            }
        }
    }

    if truncated {
        buf.extend_from_slice(b"\n[output truncated at 10MB]");
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Kill the child and everything it spawned, then reap it.
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Ok(pgid) = i32::try_from(child.id()) {
            let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_stream_small_input() {
        assert_eq!(read_stream_to_string(Cursor::new(b"hello world")), "hello world");
    }

    #[test]
    fn test_read_stream_truncates_at_limit() {
        let data = vec![b'x'; MAX_OUTPUT_SIZE + 1000];
        let result = read_stream_to_string(Cursor::new(data));
        assert!(result.ends_with("[output truncated at 10MB]"));
        assert!(result.len() <= MAX_OUTPUT_SIZE + 50);
    }

    #[test]
    fn test_read_stream_exact_limit() {
        let data = vec![b'y'; MAX_OUTPUT_SIZE];
        let result = read_stream_to_string(Cursor::new(data));
        assert_eq!(result.len(), MAX_OUTPUT_SIZE);
    }

    #[test]
    fn test_excerpt_keeps_tail() {
        let outcome = CommandOutcome {
            exit_code: Some(1),
            stdout: "abcdefghij".to_string(),
            stderr: String::new(),
            duration: Duration::ZERO,
            timed_out: false,
        };
        assert_eq!(outcome.excerpt(4).as_deref(), Some("...ghij"));
        assert_eq!(outcome.excerpt(100).as_deref(), Some("abcdefghij"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_exit_codes() {
        let dir = std::env::temp_dir();
        let ok = run_command("echo hi", &dir, Duration::from_secs(5)).unwrap();
        assert!(ok.success());
        assert_eq!(ok.stdout.trim(), "hi");

        let failed = run_command("exit 3", &dir, Duration::from_secs(5)).unwrap();
        assert!(!failed.success());
        assert_eq!(failed.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_runs_in_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();
        let outcome = run_command("test -f marker", dir.path(), Duration::from_secs(5)).unwrap();
        assert!(outcome.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_timeout_kills_group() {
        let dir = std::env::temp_dir();
        let start = Instant::now();
        let outcome = run_command("sleep 5 & sleep 5; wait", &dir, Duration::from_millis(300)).unwrap();
        assert!(outcome.timed_out);
        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, None);
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
