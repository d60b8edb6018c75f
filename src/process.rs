//! Process execution for the external fish tools.
//!
//! Every invocation spawns one child process, optionally feeds it stdin, and
//! collects stdout, stderr and the exit status together. A non-zero exit code
//! is a normal outcome at this layer; only a program that cannot be run (or
//! that dies without an exit code) is reported as an error.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Captured outcome of a process that exited normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code reported by the operating system.
    pub exit_code: i32,
    /// Standard output, decoded lossily as UTF-8.
    pub stdout: String,
    /// Standard error, decoded lossily as UTF-8.
    pub stderr: String,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a non-zero exit into [`ProcessError::NonZeroExit`].
    pub fn into_success(self) -> Result<Self, ProcessError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ProcessError::NonZeroExit(self))
        }
    }
}

/// Failure to obtain a [`ProcessResult`].
///
/// Every variant except [`ProcessError::NonZeroExit`] is an infrastructure
/// error: the program never produced an exit code we can interpret.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("no executable given")]
    EmptyCommand,

    #[error("'{program}' was not found; is it installed and on PATH?")]
    NotFound { program: String },

    #[error("permission denied when running '{program}'")]
    PermissionDenied { program: String },

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' was terminated before it could exit")]
    Terminated { program: String },

    #[error("'{program}' timed out after {timeout_ms}ms")]
    TimedOut { program: String, timeout_ms: u64 },

    #[error("process exited with status {}", .0.exit_code)]
    NonZeroExit(ProcessResult),
}

impl ProcessError {
    /// True when the program could not be run at all, as opposed to running
    /// and reporting failure through its exit code.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, Self::NonZeroExit(_))
    }
}

/// A single external command to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Text written to the child's stdin, which is closed afterwards.
    pub stdin: Option<String>,
    /// Working directory; the current directory when unset.
    pub cwd: Option<PathBuf>,
    /// Upper bound on the run time; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Build an invocation from a command line where the first element is
    /// the executable.
    pub fn from_command(command: &[String]) -> Result<Self, ProcessError> {
        let (program, args) = command.split_first().ok_or(ProcessError::EmptyCommand)?;
        Ok(Self::new(program.clone()).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command line for log output.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Something that can run an [`Invocation`].
///
/// The pipelines only talk to this trait, so they can be driven by a scripted
/// runner in tests instead of real binaries.
#[tower_lsp::async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the invocation to completion. Any normal exit, zero or not, is `Ok`.
    async fn run(&self, invocation: &Invocation) -> Result<ProcessResult, ProcessError>;

    /// Like [`ProcessRunner::run`], but a non-zero exit becomes
    /// [`ProcessError::NonZeroExit`].
    async fn run_checked(&self, invocation: &Invocation) -> Result<ProcessResult, ProcessError> {
        self.run(invocation).await?.into_success()
    }
}

/// Runs invocations as real child processes on the tokio runtime.
///
/// Children are not killed when the future driving them is dropped: a
/// cancelled request lets the process finish and throws its output away.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[tower_lsp::async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessResult, ProcessError> {
        if invocation.program.is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        let program = invocation.program.clone();
        log::debug!("Running `{}`", invocation.display());

        let mut cmd = Command::new(&program);
        cmd.args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| spawn_error(&program, e))?;

        let stdout_task = child.stdout.take().map(|out| tokio::spawn(read_pipe_to_string(out)));
        let stderr_task = child.stderr.take().map(|err| tokio::spawn(read_pipe_to_string(err)));

        // Feed stdin from its own task so a child that writes a lot before
        // draining its input cannot deadlock against us.
        let stdin_task = match (invocation.stdin.clone(), child.stdin.take()) {
            (Some(input), Some(mut pipe)) => Some(tokio::spawn(async move {
                pipe.write_all(input.as_bytes()).await?;
                pipe.shutdown().await
            })),
            _ => None,
        };

        let waited = match invocation.timeout.filter(|t| !t.is_zero()) {
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, child.wait()).await;
                match outcome {
                    Ok(waited) => waited,
                    Err(_) => {
                        if let Err(e) = child.kill().await {
                            log::warn!("Failed to kill timed out '{program}': {e}");
                        }
                        for task in [stdout_task, stderr_task].into_iter().flatten() {
                            task.abort();
                        }
                        return Err(ProcessError::TimedOut {
                            program,
                            timeout_ms: limit.as_millis() as u64,
                        });
                    }
                }
            }
            None => child.wait().await,
        };
        let status = waited.map_err(|source| ProcessError::Io {
            program: program.clone(),
            source,
        })?;

        if let Some(task) = stdin_task {
            match task.await {
                Ok(Ok(())) => {}
                // The child may exit without reading its input; its exit code
                // still tells the story.
                Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                    log::debug!("'{program}' closed stdin early");
                }
                Ok(Err(source)) => return Err(ProcessError::Io { program, source }),
                Err(e) => {
                    return Err(ProcessError::Io {
                        program,
                        source: std::io::Error::other(e),
                    });
                }
            }
        }

        let stdout = join_reader(&program, stdout_task).await?;
        let stderr = join_reader(&program, stderr_task).await?;

        let exit_code = status.code().ok_or_else(|| ProcessError::Terminated {
            program: program.clone(),
        })?;
        log::debug!("'{program}' exited with status {exit_code}");

        Ok(ProcessResult {
            exit_code,
            stdout,
            stderr,
        })
    }
}

fn spawn_error(program: &str, source: std::io::Error) -> ProcessError {
    let program = program.to_string();
    match source.kind() {
        ErrorKind::NotFound => ProcessError::NotFound { program },
        ErrorKind::PermissionDenied => ProcessError::PermissionDenied { program },
        _ => ProcessError::Spawn { program, source },
    }
}

async fn read_pipe_to_string<R: AsyncRead + Unpin>(mut pipe: R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn join_reader(
    program: &str,
    handle: Option<JoinHandle<std::io::Result<String>>>,
) -> Result<String, ProcessError> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let read = handle.await.map_err(std::io::Error::other).and_then(|res| res);
    read.map_err(|source| ProcessError::Io {
        program: program.to_string(),
        source,
    })
}
