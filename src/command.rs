use crate::{debug, warning};
use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use wait_timeout::ChildExt;

/// program, arguments and working directory of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<OsString>,
    pub dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<Cow<'_, str>> = self.args.iter().map(|arg| arg.to_string_lossy()).collect();
        let words: Vec<&str> = std::iter::once(self.program.as_str())
            .chain(args.iter().map(AsRef::as_ref))
            .collect();
        // shlex refuses words containing nul bytes, fall back to a plain join
        match shlex::try_join(words.iter().copied()) {
            Ok(line) => f.write_str(&line),
            Err(_) => f.write_str(&words.join(" ")),
        }
    }
}

/// how a command invocation ended
#[derive(Debug)]
pub enum Outcome {
    /// exited with status 0
    Success,
    /// ran to completion but exited non-zero (or was terminated by a signal)
    NonZeroExit(ExitStatus),
    /// exceeded the deadline and was killed
    TimedOut(Duration),
    /// could not be spawned, or its exit status could not be collected
    StartFailure(io::Error),
}

/// captured output of a command plus its outcome
///
/// stdout and stderr hold whatever was read before the process ended, including
/// when it was killed on timeout
#[derive(Debug)]
pub struct ProcessResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub outcome: Outcome,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to run command {command:?}: {source}")]
    Start {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("command {command:?} failed with {status}: stderr: {stderr}")]
    NonZeroExit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("command {command:?} killed after {timeout:?} timeout elapsed: stderr: {stderr}")]
    TimedOut {
        command: String,
        timeout: Duration,
        stderr: String,
    },
}

impl ProcessResult {
    /// turn any non-success outcome into an error, keeping the captured output
    pub fn check(self) -> Result<Self, ProcessError> {
        let Self {
            command,
            stdout,
            stderr,
            outcome,
        } = self;
        match outcome {
            Outcome::Success => Ok(Self {
                command,
                stdout,
                stderr,
                outcome: Outcome::Success,
            }),
            Outcome::NonZeroExit(status) => Err(ProcessError::NonZeroExit {
                command,
                status,
                stderr: stderr.trim().to_string(),
            }),
            Outcome::TimedOut(timeout) => Err(ProcessError::TimedOut {
                command,
                timeout,
                stderr: stderr.trim().to_string(),
            }),
            Outcome::StartFailure(source) => Err(ProcessError::Start { command, source }),
        }
    }
}

/// how long the readers may keep draining the pipes once a killed child is reaped
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// run a command to completion, killing it if it outlives `timeout`
///
/// the deadline covers both the process and its output: if the pipes are still
/// open when it passes (a background grandchild holding them) the run times out
/// with whatever was captured so far. a zero timeout waits indefinitely. there
/// are no retries: one invocation, one outcome
pub fn run(spec: &CommandSpec, timeout: Duration) -> ProcessResult {
    let command = spec.to_string();
    debug!("running command: {}", command);
    let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &spec.dir {
        cmd.current_dir(dir);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ProcessResult {
                command,
                stdout: String::new(),
                stderr: String::new(),
                outcome: Outcome::StartFailure(e),
            };
        }
    };

    // drain both pipes while waiting so a chatty child never blocks on a full pipe
    let mut stdout = Capture::spawn(child.stdout.take());
    let mut stderr = Capture::spawn(child.stderr.take());

    let outcome = match wait(&mut child, timeout) {
        Ok(Some(status)) => {
            // non-short-circuiting so both streams get drained
            let drained = stdout.drain(deadline) & stderr.drain(deadline);
            if !drained {
                debug!("output of {} still open at the deadline", command);
                Outcome::TimedOut(timeout)
            } else if status.success() {
                Outcome::Success
            } else {
                Outcome::NonZeroExit(status)
            }
        }
        Ok(None) => {
            terminate(&mut child, &command);
            drain_after_kill(&mut stdout, &mut stderr);
            Outcome::TimedOut(timeout)
        }
        Err(e) => {
            terminate(&mut child, &command);
            drain_after_kill(&mut stdout, &mut stderr);
            Outcome::StartFailure(e)
        }
    };

    ProcessResult {
        command,
        stdout: stdout.snapshot(),
        stderr: stderr.snapshot(),
        outcome,
    }
}

fn wait(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    if timeout.is_zero() {
        child.wait().map(Some)
    } else {
        child.wait_timeout(timeout)
    }
}

/// kill and reap the child
fn terminate(child: &mut Child, command: &str) {
    if let Err(e) = child.kill() {
        warning!("failed to kill {}: {}", command, e);
    }
    let _ = child.wait();
}

/// let the readers pick up what the child wrote before it died
///
/// readers still blocked afterwards stay detached: a grandchild may hold the pipes
fn drain_after_kill(stdout: &mut Capture, stderr: &mut Capture) {
    let grace = Some(Instant::now() + DRAIN_GRACE);
    stdout.drain(grace);
    stderr.drain(grace);
}

/// background reader accumulating one output stream
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    /// signalled once the reader hit EOF, `None` when there is nothing left to wait for
    eof: Option<Receiver<()>>,
}

impl Capture {
    fn spawn<R: Read + Send + 'static>(stream: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let eof = stream.map(|mut stream| {
            let buffer = Arc::clone(&buffer);
            let (done, eof) = mpsc::channel();
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match stream.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => {
                            if let Ok(mut captured) = buffer.lock() {
                                captured.extend_from_slice(&chunk[..n]);
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                        Err(_) => break,
                    }
                }
                let _ = done.send(());
            });
            eof
        });
        Self { buffer, eof }
    }

    /// wait for the stream to reach EOF, giving up at `deadline`
    ///
    /// returns whether EOF was reached; `None` waits as long as it takes
    fn drain(&mut self, deadline: Option<Instant>) -> bool {
        let Some(eof) = &self.eof else {
            return true;
        };
        // a disconnected channel means the reader is gone, which also ends the stream
        let reached = match deadline {
            None => {
                let _ = eof.recv();
                true
            }
            Some(deadline) => !matches!(
                eof.recv_timeout(deadline.saturating_duration_since(Instant::now())),
                Err(RecvTimeoutError::Timeout)
            ),
        };
        if reached {
            self.eof = None;
        }
        reached
    }

    fn snapshot(&self) -> String {
        self.buffer
            .lock()
            .map(|captured| String::from_utf8_lossy(&captured).into_owned())
            .unwrap_or_default()
    }
}
