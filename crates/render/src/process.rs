use crate::command::CommandLine;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{self, Read, Write};
use std::process::{Child, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::instrument;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// What the renderer left behind on its way out.
pub(crate) struct Captured {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

/// Run the command to completion, feeding `input` on stdin.
///
/// stdin, stdout and stderr each get their own thread. Writing a large
/// document while the renderer is blocked writing progress output to a full
/// pipe would otherwise deadlock both processes. With no input, stdin is
/// closed straight away.
#[instrument(skip_all, fields(command = %command, input = input.map(<[u8]>::len)))]
pub(crate) fn execute(command: &CommandLine, input: Option<&[u8]>, timeout: Option<Duration>) -> Result<Captured> {
    let mut child = command
        .to_command()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .or_raise(|| ErrorKind::ProcessSpawnFailed(command.to_string()))?;
    tracing::debug!(pid = child.id(), "Renderer started");

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    thread::scope(|scope| -> Result<Captured> {
        let writer = scope.spawn(move || feed(stdin, input));
        let out = scope.spawn(move || drain(stdout));
        let err = scope.spawn(move || drain(stderr));

        let status = wait(&mut child, timeout)?;
        let fed = join(writer);
        let stdout = join(out).or_raise(|| ErrorKind::Io)?;
        let stderr = join(err).or_raise(|| ErrorKind::Io)?;
        let captured = Captured {
            status,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };
        // The exit status alone decides the outcome. A renderer may close stdin
        // before reading all of it, whether it then succeeds or fails.
        if let Err(e) = fed {
            tracing::debug!(error = %e, status = %captured.status, "Renderer stopped reading input before exiting");
        }
        Ok(captured)
    })
}

fn feed(stdin: Option<impl Write>, input: Option<&[u8]>) -> io::Result<()> {
    let (Some(mut stdin), Some(input)) = (stdin, input) else {
        return Ok(());
    };
    stdin.write_all(input)?;
    stdin.flush()
    // Dropping stdin here closes the pipe, signalling end of input.
}

fn drain(pipe: Option<impl Read>) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buffer)?;
    }
    Ok(buffer)
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus> {
    let Some(timeout) = timeout else {
        return child.wait().or_raise(|| ErrorKind::Io);
    };
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().or_raise(|| ErrorKind::Io)? {
            return Ok(status);
        }
        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(pid = child.id(), timeout = ?timeout, "Renderer timed out; killing");
            // Already exited between the poll and the kill is fine.
            let _ = child.kill();
            let _ = child.wait();
            exn::bail!(ErrorKind::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}
