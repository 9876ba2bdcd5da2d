//! warden-noticer — long-poll warden for notices and dispatch the probe.
//!
//! # Usage
//!
//! ```text
//! warden-noticer [--socket <path>] [--probe <path>] [--probe-log <path>]
//!                [--wait-timeout-secs <n>]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use warden_client::DEFAULT_SOCKET;
use warden_noticer::{start_blocking, NoticerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "warden-noticer",
    version,
    about = "Dispatch warden notices to the workload probe",
    long_about = None,
)]
struct Cli {
    /// Control socket to long-poll for notices.
    #[arg(long, default_value = DEFAULT_SOCKET)]
    socket: PathBuf,

    /// Probe executable invoked once per workload event.
    #[arg(long, default_value = "warden-probe")]
    probe: PathBuf,

    /// Event log the probe appends to, rotated by the noticer.
    #[arg(long, default_value = "probe.log")]
    probe_log: PathBuf,

    /// Server-side long-poll timeout per notices request, in seconds.
    #[arg(long, default_value_t = 30)]
    wait_timeout_secs: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    start_blocking(NoticerConfig {
        socket: cli.socket,
        probe_bin: cli.probe,
        probe_log: cli.probe_log,
        wait_timeout: Duration::from_secs(cli.wait_timeout_secs),
    })
    .context("noticer exited with error")
}
