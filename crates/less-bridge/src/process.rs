use crate::types::{CompilerConfig, LessError};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Flags passed to lessc on every run
pub const COMPILER_FLAGS: [&str; 2] = ["--no-color", "--relative-urls"];

/// Raw result of one compiler run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Launches the external compiler and waits for it within a deadline
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
    poll_interval: Duration,
}

impl ProcessInvoker {
    pub fn new(config: &CompilerConfig) -> Self {
        let working_dir = config.working_dir.clone().or_else(|| {
            config.program.parent().filter(|p| !p.as_os_str().is_empty()).map(Path::to_path_buf)
        });

        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir,
            timeout: config.timeout,
            poll_interval: config.poll_interval,
        }
    }

    /// Full argument list for compiling `input` into `output`
    pub fn arguments(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend(COMPILER_FLAGS.iter().map(|f| (*f).to_string()));
        args.push(input.to_string_lossy().into_owned());
        args.push(output.to_string_lossy().into_owned());
        args
    }

    /// Run the compiler on `input`, writing CSS to `output`.
    ///
    /// Blocks until the process exits or the timeout elapses. On timeout the
    /// child is killed and `LessError::Timeout` is returned. Output still
    /// arriving after the child exited is collected until the same deadline;
    /// whatever came in by then is returned.
    pub fn invoke(&self, input: &Path, output: &Path) -> Result<ProcessOutcome, LessError> {
        let mut command = Command::new(&self.program);
        command
            .args(self.arguments(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        tracing::debug!(
            program = %self.program.display(),
            input = %input.display(),
            "starting less compiler"
        );

        let mut child = command
            .spawn()
            .map_err(|source| LessError::Launch { program: self.program.clone(), source })?;

        // Drain both pipes concurrently so a chatty compiler cannot block on a full pipe
        let (tx, rx) = mpsc::channel();
        let mut open = 0;
        if let Some(pipe) = child.stdout.take() {
            drain(Stream::Stdout, pipe, tx.clone());
            open += 1;
        }
        if let Some(pipe) = child.stderr.take() {
            drain(Stream::Stderr, pipe, tx.clone());
            open += 1;
        }
        drop(tx);

        let start = Instant::now();
        let deadline = start + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    terminate(&mut child);
                    return Err(LessError::Wait(e));
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                terminate(&mut child);
                tracing::warn!(
                    program = %self.program.display(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "less compiler timed out"
                );
                // Reader threads are abandoned; a grandchild may still hold the pipes
                return Err(LessError::Timeout(self.timeout));
            }

            thread::sleep(self.poll_interval.min(self.timeout - elapsed));
        };

        let (stdout, stderr) = collect(&rx, open, deadline);
        let outcome = ProcessOutcome {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };

        tracing::debug!(
            exit_code = ?outcome.exit_code,
            duration_ms = start.elapsed().as_millis() as u64,
            stdout_bytes = outcome.stdout.len(),
            stderr_bytes = outcome.stderr.len(),
            "less compiler finished"
        );

        Ok(outcome)
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// A chunk read from one pipe; `None` marks end of stream
type Chunk = (Stream, Option<Vec<u8>>);

fn drain<R: Read + Send + 'static>(stream: Stream, mut pipe: R, tx: Sender<Chunk>) {
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send((stream, Some(buf[..n].to_vec()))).is_err() {
                        return;
                    }
                }
            }
        }
        let _ = tx.send((stream, None));
    });
}

/// Gather pipe output until both streams close or `deadline` passes.
/// A grandchild holding the pipes open cannot extend the wait.
fn collect(rx: &Receiver<Chunk>, mut open: usize, deadline: Instant) -> (Vec<u8>, Vec<u8>) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let mut push = |(stream, chunk): Chunk, open: &mut usize| match (stream, chunk) {
        (Stream::Stdout, Some(bytes)) => stdout.extend_from_slice(&bytes),
        (Stream::Stderr, Some(bytes)) => stderr.extend_from_slice(&bytes),
        (_, None) => *open -= 1,
    };

    while open > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(chunk) => push(chunk, &mut open),
            Err(RecvTimeoutError::Timeout) => {
                // Take what is already queued, then stop waiting
                while let Ok(chunk) = rx.try_recv() {
                    push(chunk, &mut open);
                }
                if open > 0 {
                    tracing::warn!(
                        "compiler output still open at deadline, returning partial output"
                    );
                }
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    (stdout, stderr)
}

fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
