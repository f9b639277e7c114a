//! Host capabilities: executable lookup and subprocess execution
//!
//! The provisioner only touches the outside world through [`System`], so
//! tests can swap in a fake search path and a fake process runner.

use crate::error::{ProvisionError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Split};
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, timeout_at, Instant};

/// How long to keep reading output after the child has exited.
///
/// A background process spawned by the child can hold the pipes open, so
/// reading stops once nothing arrives within this window.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Captured result of a finished subprocess
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Executable lookup and process execution
pub trait System {
    /// Find `program` on the executable search path.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Run `program` with `args`, capturing output, killing it after `limit`.
    ///
    /// A non-zero exit is not an error here; callers inspect
    /// [`CommandOutput::success`]. Spawn failures and timeouts are.
    fn run(
        &self,
        program: &Path,
        args: &[String],
        limit: Duration,
    ) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// The real machine: `PATH` lookup and tokio subprocesses
#[derive(Debug, Clone)]
pub struct HostSystem {
    search_path: Vec<PathBuf>,
}

impl HostSystem {
    /// Use the process's `PATH`
    pub fn new() -> Self {
        Self::with_search_path(parse_system_path())
    }

    /// Use an explicit list of directories instead of `PATH`
    pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }
}

impl Default for HostSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Lines read from one of the child's output streams
struct StreamLines<R> {
    name: &'static str,
    reader: Split<BufReader<R>>,
    lines: Vec<String>,
    open: bool,
}

impl<R: AsyncRead + Unpin> StreamLines<R> {
    fn new(name: &'static str, stream: R) -> Self {
        Self {
            name,
            reader: BufReader::new(stream).split(b'\n'),
            lines: Vec::new(),
            open: true,
        }
    }

    /// Record one read result; invalid UTF-8 is replaced, not dropped
    fn record(&mut self, segment: std::io::Result<Option<Vec<u8>>>) {
        match segment {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes).trim_end_matches('\r').to_string();
                tracing::debug!(stream = self.name, "{}", line);
                self.lines.push(line);
            }
            Ok(None) => self.open = false,
            Err(e) => {
                tracing::warn!("Error reading {}: {}", self.name, e);
                self.open = false;
            }
        }
    }

    /// Read what is already available once the child is gone
    async fn drain(&mut self) {
        while self.open {
            let segment = match timeout(DRAIN_GRACE, self.reader.next_segment()).await {
                Ok(segment) => segment,
                Err(_) => break,
            };
            self.record(segment);
        }
    }

    fn joined(&self) -> String {
        self.lines.join("\n")
    }
}

impl System for HostSystem {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        resolve_tool_path(program, &self.search_path)
    }

    async fn run(&self, program: &Path, args: &[String], limit: Duration) -> Result<CommandOutput> {
        let command = display_command(program, args);
        tracing::debug!(%command, "Running");
        let deadline = Instant::now() + limit;

        let mut child = TokioCommand::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProvisionError::Execution {
                command: command.clone(),
                message: format!("failed to spawn: {}", e),
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ProvisionError::Execution {
                command,
                message: "failed to capture output".to_string(),
            });
        };

        let mut stdout = StreamLines::new("stdout", stdout);
        let mut stderr = StreamLines::new("stderr", stderr);

        // Stream output until the child exits; the exit, not pipe EOF, ends the run
        let run_task = async {
            let status = loop {
                tokio::select! {
                    status = child.wait() => break status,
                    segment = stdout.reader.next_segment(), if stdout.open => stdout.record(segment),
                    segment = stderr.reader.next_segment(), if stderr.open => stderr.record(segment),
                }
            };
            stdout.drain().await;
            stderr.drain().await;
            status
        };

        let status = match timeout_at(deadline, run_task).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(ProvisionError::Execution {
                    command,
                    message: format!("failed to wait for process: {}", e),
                })
            }
            Err(_) => {
                let _ = child.kill().await;
                return Err(ProvisionError::Timeout {
                    command,
                    secs: limit.as_secs(),
                });
            }
        };

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: stdout.joined(),
            stderr: stderr.joined(),
        })
    }
}

/// `program arg1 arg2`, for logs and error messages
pub fn display_command(program: &Path, args: &[String]) -> String {
    std::iter::once(program.display().to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the `PATH` environment variable into a list of directories.
pub fn parse_system_path() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default()
}

/// Return the first executable named `tool` in `path_entries`.
pub fn resolve_tool_path(tool: &str, path_entries: &[PathBuf]) -> Option<PathBuf> {
    let entries: Vec<&PathBuf> = path_entries
        .iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .collect();
    if entries.is_empty() {
        return None;
    }

    let joined = std::env::join_paths(entries).ok()?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(tool, Some(joined), cwd).ok()
}
