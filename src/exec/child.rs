// src/exec/child.rs

//! Child process supervision.
//!
//! One reader task per pipe forwards lines over an mpsc channel; the
//! supervising loop selects over that channel, `child.wait()` and the
//! deadline, so the timeout can never starve behind a blocking read.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::exec::{
    CaptureBuffer, ExecOutcome, ExecRequest, OutputLine, OutputStream, Termination,
};
use crate::types::{LAUNCH_FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE};

/// How long to keep draining pipes after the child is gone. Grandchildren
/// that inherited the pipes could otherwise hold them open forever.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

const LINE_CHANNEL_CAPACITY: usize = 256;

/// Text appended to the captured log when the deadline kills the child.
pub fn timeout_notice(limit: Duration) -> String {
    format!(
        "\n\nExperiment timed out after {}s and was killed\n",
        limit.as_secs()
    )
}

/// Map an exit status onto a single integer code.
///
/// Signal terminations have no code; they are reported shell style as
/// `128 + signal` on Unix.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Spawn and supervise `request.argv` until it exits or its deadline passes.
pub async fn supervise(request: &ExecRequest) -> ExecOutcome {
    let Some((program, args)) = request.argv.split_first() else {
        return launch_failed("no command given".to_string());
    };

    info!(program = %program, args = ?args, timeout = ?request.timeout, "starting child process");

    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            error!(program = %program, error = %e, "failed to launch command");
            return launch_failed(format!("Failed to launch {program}: {e}"));
        }
    };

    let (tx, mut rx) = mpsc::channel::<OutputLine>(LINE_CHANNEL_CAPACITY);
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(OutputStream::Stdout, stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(OutputStream::Stderr, stderr, tx.clone()));
    }
    drop(tx);

    let mut capture = CaptureBuffer::new();
    let mut echo = Echo::new(request.echo);
    let deadline = request.timeout.map(|limit| Instant::now() + limit);

    let (exit_code, termination) = loop {
        tokio::select! {
            Some(line) = rx.recv() => {
                echo.write(&line).await;
                capture.push(&line);
            }

            status = child.wait() => {
                break match status {
                    Ok(status) => (exit_code_of(status), Termination::Completed),
                    Err(e) => {
                        error!(error = %e, "waiting for child process failed");
                        (LAUNCH_FAILURE_EXIT_CODE, Termination::Completed)
                    }
                };
            }

            _ = wait_for(deadline) => {
                warn!(timeout = ?request.timeout, "timeout reached; killing child process");
                kill(&mut child).await;
                break (TIMEOUT_EXIT_CODE, Termination::TimedOut);
            }
        }
    };

    let drained = timeout(DRAIN_GRACE, async {
        while let Some(line) = rx.recv().await {
            echo.write(&line).await;
            capture.push(&line);
        }
    })
    .await;
    if drained.is_err() {
        debug!("output pipes still open after child exit; dropping the rest");
    }
    for reader in readers {
        reader.abort();
    }

    if termination == Termination::TimedOut {
        let limit = request.timeout.unwrap_or_default();
        let notice = timeout_notice(limit);
        echo.notice(&notice).await;
        capture.append_notice(&notice);
    }

    ExecOutcome {
        exit_code,
        output: capture.into_string(),
        termination,
    }
}

fn launch_failed(message: String) -> ExecOutcome {
    ExecOutcome {
        exit_code: LAUNCH_FAILURE_EXIT_CODE,
        output: message,
        termination: Termination::LaunchFailed,
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill child process");
    }
}

fn spawn_reader<R>(
    stream: OutputStream,
    pipe: R,
    tx: mpsc::Sender<OutputLine>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(OutputLine::from_bytes(stream, &buf)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(?stream, error = %e, "reading child output failed");
                    break;
                }
            }
        }
    })
}

/// Mirrors child output to our own stdout / stderr.
struct Echo<O, E> {
    enabled: bool,
    stdout: O,
    stderr: E,
}

impl Echo<tokio::io::Stdout, tokio::io::Stderr> {
    fn new(enabled: bool) -> Self {
        Self::with_writers(enabled, tokio::io::stdout(), tokio::io::stderr())
    }
}

impl<O, E> Echo<O, E>
where
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    fn with_writers(enabled: bool, stdout: O, stderr: E) -> Self {
        Self {
            enabled,
            stdout,
            stderr,
        }
    }

    async fn write(&mut self, line: &OutputLine) {
        if !self.enabled {
            return;
        }
        let result = match line.stream {
            OutputStream::Stdout => write_flush(&mut self.stdout, &line.text).await,
            OutputStream::Stderr => write_flush(&mut self.stderr, &line.text).await,
        };
        if let Err(e) = result {
            debug!(error = %e, "echoing child output failed");
        }
    }

    async fn notice(&mut self, text: &str) {
        if !self.enabled {
            return;
        }
        if let Err(e) = write_flush(&mut self.stderr, text).await {
            debug!(error = %e, "echoing timeout notice failed");
        }
    }
}

async fn write_flush<W>(out: &mut W, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}
