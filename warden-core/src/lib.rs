//! Warden core library — domain types and event classification.
//!
//! Public API surface:
//! - [`types`] — newtypes and remote-state snapshots (notices, changes, checks)
//! - [`events`] — workload event types and notice classification

pub mod events;
pub mod types;

pub use events::{classify, UnknownEventType, WorkloadEvent, WorkloadEventType};
pub use types::{Change, ChangeId, Check, CheckName, Notice, NoticeId, NoticeType};
