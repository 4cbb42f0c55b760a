//! Lifecycle of the supervised child process.
//!
//! The [`Supervisor`] starts the child with piped stdout/stderr, relays both streams
//! line by line, forwards `SIGINT`/`SIGTERM` to the child and finally reports how the
//! child terminated. Its lifecycle moves strictly forward, and each transition is
//! logged at debug level:
//!
//! `Idle → Starting → Running → DrainingStreams → AwaitingChildExit → Terminated`
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};

use nix::sys::signal::{Signal as NixSignal, kill};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ResultOkLogExt;
use crate::relay;

/// Number of relayed streams per child (stdout and stderr).
const RELAY_COUNT: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no command given")]
    EmptyCommand,
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("child process has no {0} handle")]
    MissingPipe(&'static str),
    #[error("failed to install {signal} handler: {source}")]
    SignalHandler {
        signal: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Lifecycle phase, traced at debug level on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Starting,
    Running,
    DrainingStreams,
    AwaitingChildExit,
    Terminated,
}

/// Owns a running child process and the tasks relaying its output.
#[derive(Debug)]
pub struct Supervisor {
    child: Child,
    state: State,
    done_rx: mpsc::Receiver<()>,
    relays: Vec<JoinHandle<()>>,
    forwarder: JoinHandle<()>,
}

impl Supervisor {
    /// Starts `command` and begins relaying its stdout to `stdout_tx` and its stderr to
    /// `stderr_tx`.
    ///
    /// Termination signal handlers are installed before the child is started, so no
    /// signal can slip through unforwarded.
    ///
    /// # Errors
    ///
    /// Fails if `command` is empty, if the signal handlers cannot be installed, or if the
    /// child cannot be started.
    pub fn spawn(
        command: &[String],
        stdout_tx: mpsc::Sender<String>,
        stderr_tx: mpsc::Sender<String>,
    ) -> Result<Self> {
        let mut state = State::Idle;
        transition(&mut state, State::Starting);

        let (program, args) = command.split_first().ok_or(Error::EmptyCommand)?;
        let sigint = install_handler(SignalKind::interrupt(), "SIGINT")?;
        let sigterm = install_handler(SignalKind::terminate(), "SIGTERM")?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                command: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(Error::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(Error::MissingPipe("stderr"))?;

        let (done_tx, done_rx) = mpsc::channel(RELAY_COUNT);
        let relays = vec![
            tokio::spawn(relay::relay_lines(stdout, stdout_tx, done_tx.clone())),
            tokio::spawn(relay::relay_lines(stderr, stderr_tx, done_tx)),
        ];

        let pid = child.id().map(|pid| Pid::from_raw(pid as i32));
        let forwarder = tokio::spawn(forward_signals(pid, sigint, sigterm));

        transition(&mut state, State::Running);
        Ok(Self {
            child,
            state,
            done_rx,
            relays,
            forwarder,
        })
    }

    /// Waits until both output streams are drained, then for the child to exit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Wait`] if waiting on the child fails. A non-zero exit is not an
    /// error; it is part of the returned status.
    pub async fn wait(mut self) -> Result<ExitStatus> {
        transition(&mut self.state, State::DrainingStreams);
        for _ in 0..RELAY_COUNT {
            if self.done_rx.recv().await.is_none() {
                break;
            }
        }
        for relay in self.relays.drain(..) {
            if let Err(err) = relay.await {
                log::error!("stream relay task failed: {err}");
            }
        }

        transition(&mut self.state, State::AwaitingChildExit);
        let status = self.child.wait().await;
        self.forwarder.abort();
        transition(&mut self.state, State::Terminated);

        status.map_err(Error::Wait)
    }
}

fn transition(state: &mut State, next: State) {
    log::debug!("supervisor: {state:?} -> {next:?}");
    *state = next;
}

fn install_handler(kind: SignalKind, name: &'static str) -> Result<Signal> {
    signal(kind).map_err(|source| Error::SignalHandler {
        signal: name,
        source,
    })
}

async fn forward_signals(pid: Option<Pid>, mut sigint: Signal, mut sigterm: Signal) {
    loop {
        let caught = tokio::select! {
            Some(()) = sigint.recv() => NixSignal::SIGINT,
            Some(()) = sigterm.recv() => NixSignal::SIGTERM,
            else => return,
        };
        if let Some(pid) = pid {
            kill(pid, caught).ok_log();
        }
        log::info!("caught signal: {caught:?}");
    }
}

/// `SIGINT` and `SIGTERM` handlers for when there is no child to supervise.
#[derive(Debug)]
pub struct ShutdownSignals {
    sigint: Signal,
    sigterm: Signal,
}

impl ShutdownSignals {
    /// Installs the handlers. From here on the signals no longer terminate the process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignalHandler`] if a handler cannot be installed.
    pub fn install() -> Result<Self> {
        Ok(Self {
            sigint: install_handler(SignalKind::interrupt(), "SIGINT")?,
            sigterm: install_handler(SignalKind::terminate(), "SIGTERM")?,
        })
    }

    /// Waits for the first of the two signals.
    pub async fn recv(mut self) {
        let caught = tokio::select! {
            _ = self.sigint.recv() => NixSignal::SIGINT,
            _ = self.sigterm.recv() => NixSignal::SIGTERM,
        };
        log::info!("caught signal: {caught:?}");
    }
}

/// Maps a child's exit status onto this program's exit code.
///
/// A normal exit keeps its code; death by signal `N` becomes `128 + N`.
pub fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return u8::try_from(code).unwrap_or(1);
    }
    match status.signal() {
        Some(sig) => u8::try_from(128 + sig).unwrap_or(1),
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_exit_code_from_raw_status() {
        // Raw wait statuses: exit code in the high byte, terminating signal in the low bits.
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
        assert_eq!(exit_code(ExitStatus::from_raw(15)), 143);
    }

    #[tokio::test]
    async fn test_empty_command() {
        let (out_tx, _out_rx) = mpsc::channel(1);
        let (err_tx, _err_rx) = mpsc::channel(1);
        let err = Supervisor::spawn(&[], out_tx, err_tx).unwrap_err();
        assert!(matches!(err, Error::EmptyCommand));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let (out_tx, _out_rx) = mpsc::channel(1);
        let (err_tx, _err_rx) = mpsc::channel(1);
        let err = Supervisor::spawn(
            &["/definitely/does/not/exist".to_string()],
            out_tx,
            err_tx,
        )
        .unwrap_err();
        match err {
            Error::Spawn { command, source } => {
                assert_eq!(command, "/definitely/does/not/exist");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_child_stdin_is_empty() {
        let (out_tx, mut out_rx) = mpsc::channel(1);
        let (err_tx, _err_rx) = mpsc::channel(1);
        let supervisor = Supervisor::spawn(
            &sh("if read line; then echo got; else echo eof; fi"),
            out_tx,
            err_tx,
        )
        .unwrap();

        assert_eq!(out_rx.recv().await.as_deref(), Some("eof"));
        let status = supervisor.wait().await.unwrap();
        assert_eq!(exit_code(status), 0);
    }

    #[tokio::test]
    async fn test_relays_output_and_reports_exit_status() {
        let (out_tx, mut out_rx) = mpsc::channel(1);
        let (err_tx, mut err_rx) = mpsc::channel(1);
        let supervisor =
            Supervisor::spawn(&sh("echo hello; echo oops >&2; exit 3"), out_tx, err_tx).unwrap();

        let collect_out = tokio::spawn(async move {
            let mut lines = Vec::new();
            while let Some(line) = out_rx.recv().await {
                lines.push(line);
            }
            lines
        });
        let collect_err = tokio::spawn(async move {
            let mut lines = Vec::new();
            while let Some(line) = err_rx.recv().await {
                lines.push(line);
            }
            lines
        });

        let status = supervisor.wait().await.unwrap();
        assert_eq!(exit_code(status), 3);
        assert_eq!(collect_out.await.unwrap(), vec!["hello"]);
        assert_eq!(collect_err.await.unwrap(), vec!["oops"]);
    }
}
