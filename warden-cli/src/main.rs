//! warden-probe — stand-in workload process for observing event dispatch.
//!
//! # Usage
//!
//! ```text
//! warden-probe <event_type> <notice_id> <notice_type> <notice_key>
//! ```
//!
//! The noticer invokes this once per workload event. The probe performs one
//! read-only query against the warden control socket (`$WARDEN_SOCKET`, or
//! the fixed default) and appends what it found to `./probe.log`.

mod probe;

use anyhow::{Context, Result};
use clap::Parser;

use warden_client::Client;

#[derive(Parser, Debug)]
#[command(
    name = "warden-probe",
    version,
    about = "Fetch and log the warden state behind one workload event",
    long_about = None,
)]
struct Cli {
    /// Workload event type (custom, change-updated, recover-check, perform-check).
    event_type: String,

    /// Id of the notice that produced this event.
    notice_id: String,

    /// Type of the notice that produced this event.
    notice_type: String,

    /// Key of the notice that produced this event.
    notice_key: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    probe::init_event_log(probe::PROBE_LOG)
        .with_context(|| format!("failed to open event log '{}'", probe::PROBE_LOG))?;

    let client = Client::from_env();
    probe::run(
        &client,
        &cli.event_type,
        &cli.notice_id,
        &cli.notice_type,
        &cli.notice_key,
    )
}
