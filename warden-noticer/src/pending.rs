//! In-flight workload events, tracked between enqueue and probe completion.

use std::collections::HashMap;

use warden_core::types::NoticeType;
use warden_core::WorkloadEvent;

/// Registry of events that have been queued but not yet handed to the probe.
///
/// Ids are monotonically assigned and never reused within one process.
#[derive(Debug, Default)]
pub struct PendingEvents {
    next_id: u64,
    pending: HashMap<u64, WorkloadEvent>,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event and return its id for later removal.
    pub fn add(&mut self, event: WorkloadEvent) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id, event);
        id
    }

    pub fn remove(&mut self, id: u64) {
        self.pending.remove(&id);
    }

    /// True when an event with this notice type and key is already in flight.
    // Linear scan; the queue stays small enough that an index is not worth it.
    pub fn contains(&self, notice_type: NoticeType, notice_key: &str) -> bool {
        self.pending
            .values()
            .any(|event| event.notice_type == notice_type && event.notice_key == notice_key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
