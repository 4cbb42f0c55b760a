use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use crunchstat::Config;

/// Entry point for crunchstat.
///
/// Diagnostics are logged to stderr with the same `crunchstat:` tag as telemetry.
/// The log level defaults to `info` and can be changed with `RUST_LOG`.
///
/// # Examples
///
/// ```bash
/// crunchstat --cgroup-parent=/sys/fs/cgroup/cpu/docker --cgroup-cid=/tmp/cid \
///     docker run --cidfile=/tmp/cid image make
/// ```
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| match record.level() {
            log::Level::Info => writeln!(buf, "crunchstat: {}", record.args()),
            level => writeln!(buf, "crunchstat: {level}: {}", record.args()),
        })
        .init();

    let config = Config::parse();
    match crunchstat::run(config, tokio::io::stdout(), tokio::io::stderr()).await {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
