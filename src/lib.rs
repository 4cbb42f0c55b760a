//! Crunchstat: run a command and report the resource usage of its cgroup.
//!
//! The command's stdout and stderr are relayed line by line. Telemetry lines tagged
//! `crunchstat:` are interleaved with the command's stderr. Termination signals are
//! forwarded to the command and its exit status becomes this program's exit status.
use std::process::ExitCode;

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

pub mod cgroup;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod output;
pub mod relay;
pub mod supervisor;

pub use config::Config;
pub use error::Error;

/// Lines in flight per output stream. Producers block until the writer catches up.
const LINE_BUFFER: usize = 1;

enum Workload {
    Child(supervisor::Supervisor),
    Idle(supervisor::ShutdownSignals),
}

/// Runs crunchstat with `config`, writing relayed and telemetry lines to the given sinks.
///
/// With a command, returns once the command has exited and all of its output has been
/// written. Without one, samples until `SIGINT` or `SIGTERM` arrives.
///
/// # Errors
///
/// Returns an error if neither a cgroup path nor a cid file is configured, or if the
/// command cannot be started or waited on.
pub async fn run<O, E>(config: Config, stdout: O, stderr: E) -> Result<ExitCode, Error>
where
    O: AsyncWrite + Unpin + Send + 'static,
    E: AsyncWrite + Unpin + Send + 'static,
{
    let source = config.cgroup_source()?;

    let (stdout_tx, stdout_rx) = mpsc::channel(LINE_BUFFER);
    let (stderr_tx, stderr_rx) = mpsc::channel(LINE_BUFFER);
    let output = tokio::spawn(output::multiplex(stdout_rx, stderr_rx, stdout, stderr));

    let workload = if config.command.is_empty() {
        drop(stdout_tx);
        Workload::Idle(supervisor::ShutdownSignals::install()?)
    } else {
        log::info!("Running {:?}", config.command);
        Workload::Child(supervisor::Supervisor::spawn(
            &config.command,
            stdout_tx,
            stderr_tx.clone(),
        )?)
    };

    let cgroup = source.resolve().await;
    log::info!("Using cgroup {}", cgroup.display());
    let sampler = cgroup::Sampler::new(&cgroup);
    let sampler = tokio::spawn(sampler.run(stderr_tx, config.poll_interval()));

    let code = match workload {
        Workload::Child(child) => supervisor::exit_code(child.wait().await?),
        Workload::Idle(signals) => {
            signals.recv().await;
            0
        }
    };

    sampler.abort();
    if let Err(err) = sampler.await {
        if !err.is_cancelled() {
            log::error!("cgroup sampler failed: {err}");
        }
    }
    match output.await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => log::error!("failed to write output: {err}"),
        Err(err) => log::error!("output task failed: {err}"),
    }

    Ok(ExitCode::from(code))
}
