//! Workload events — how notices map onto probe invocations.
//!
//! The dispatcher turns each notice into at most one [`WorkloadEvent`] and
//! hands its four string fields to the probe process verbatim; the probe
//! parses the first one back into a [`WorkloadEventType`] to pick a branch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{Notice, NoticeId, NoticeType};

/// The event categories a notice can dispatch as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkloadEventType {
    Custom,
    ChangeUpdated,
    RecoverCheck,
    PerformCheck,
}

impl WorkloadEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadEventType::Custom => "custom",
            WorkloadEventType::ChangeUpdated => "change-updated",
            WorkloadEventType::RecoverCheck => "recover-check",
            WorkloadEventType::PerformCheck => "perform-check",
        }
    }
}

impl fmt::Display for WorkloadEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an event-type string no branch handles.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown workload event type '{0}'")]
pub struct UnknownEventType(pub String);

impl FromStr for WorkloadEventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "custom" => Ok(WorkloadEventType::Custom),
            "change-updated" => Ok(WorkloadEventType::ChangeUpdated),
            "recover-check" => Ok(WorkloadEventType::RecoverCheck),
            "perform-check" => Ok(WorkloadEventType::PerformCheck),
            other => Err(UnknownEventType(other.to_owned())),
        }
    }
}

/// One dispatched event: the four strings passed to the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadEvent {
    pub event_type: WorkloadEventType,
    pub notice_id: NoticeId,
    pub notice_type: NoticeType,
    pub notice_key: String,
}

impl WorkloadEvent {
    pub fn from_notice(event_type: WorkloadEventType, notice: &Notice) -> Self {
        Self {
            event_type,
            notice_id: notice.id.clone(),
            notice_type: notice.notice_type,
            notice_key: notice.key.clone(),
        }
    }
}

/// Classify a notice into the event type it should dispatch as.
///
/// Change-update notices carry the change kind in `last_data["kind"]`; the
/// two check lifecycle kinds get their own event types so the probe can go
/// straight to the check list. Returns `None` for notice types this build
/// does not dispatch.
pub fn classify(notice: &Notice) -> Option<WorkloadEventType> {
    match notice.notice_type {
        NoticeType::Custom => Some(WorkloadEventType::Custom),
        NoticeType::ChangeUpdate => {
            let kind = notice.last_data.get("kind").and_then(Value::as_str);
            Some(match kind {
                // Status in (Hold, Doing)
                Some("recover-check") => WorkloadEventType::RecoverCheck,
                // Status in (Error, Abort)
                Some("perform-check") => WorkloadEventType::PerformCheck,
                _ => WorkloadEventType::ChangeUpdated,
            })
        }
        NoticeType::Unknown => None,
    }
}
