//! Event dispatch: one control-socket query, one log record.

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use anyhow::{Context, Result};

use warden_client::Client;
use warden_core::types::{ChangeId, NoticeId, NoticeType};
use warden_core::WorkloadEventType;

/// Fixed event log, relative to the probe's working directory.
pub const PROBE_LOG: &str = "probe.log";

/// Route all tracing output to the append-only event log, ANSI off.
pub fn init_event_log(path: &str) -> io::Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

/// Perform the one query this event calls for and log the result.
///
/// Event types outside the known set are not an error: the probe exits
/// normally without touching the socket or the log.
pub fn run(
    client: &Client,
    event_type: &str,
    notice_id: &str,
    notice_type: &str,
    notice_key: &str,
) -> Result<()> {
    let Ok(event_type) = event_type.parse::<WorkloadEventType>() else {
        tracing::debug!(event_type, "ignoring unrecognized event type");
        return Ok(());
    };

    match event_type {
        WorkloadEventType::Custom => {
            // A custom event carrying any other notice type is a dispatcher
            // bug, not a runtime condition.
            assert_eq!(
                notice_type,
                NoticeType::Custom.as_str(),
                "custom event dispatched with notice type '{notice_type}'"
            );
            let notice = client
                .get_notice(&NoticeId::from(notice_id))
                .with_context(|| format!("failed to fetch notice '{notice_id}'"))?;
            tracing::info!(
                "custom notice: id={}, user_id={}, key={}, occurrences={}, last_data={}",
                notice.id,
                display_opt_u64(notice.user_id),
                notice.key,
                notice.occurrences,
                serde_json::Value::Object(notice.last_data),
            );
        }
        WorkloadEventType::ChangeUpdated => {
            // The notice key doubles as the change id.
            let change = client
                .get_change(&ChangeId::from(notice_key))
                .with_context(|| format!("failed to fetch change '{notice_key}'"))?;
            tracing::info!(
                "change updated: id={}, kind={}, summary={}, status={}, ready={}, err={}, data={}",
                change.id,
                change.kind,
                change.summary,
                change.status,
                change.ready,
                change.err.as_deref().unwrap_or("none"),
                serde_json::Value::Object(change.data),
            );
        }
        WorkloadEventType::RecoverCheck | WorkloadEventType::PerformCheck => {
            // Check lifecycle events only ever ride on change-update notices.
            assert_eq!(
                notice_type,
                NoticeType::ChangeUpdate.as_str(),
                "{event_type} event dispatched with notice type '{notice_type}'"
            );
            let checks = client.checks().context("failed to list checks")?;
            for check in checks.iter().filter(|check| check.belongs_to(notice_key)) {
                tracing::info!(
                    "check {:?} is {} (failure count: {}/{})",
                    check.name.0,
                    check.status,
                    check.failures,
                    check.threshold,
                );
            }
        }
    }

    Ok(())
}

fn display_opt_u64(value: Option<u64>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "none".to_string(),
    }
}
