//! Remote-state snapshots fetched from the warden control socket.
//!
//! None of these types are owned by this process: each is a read-once
//! representation of daemon state, deserialized from one query response and
//! discarded after logging. All types are serializable via serde + serde_json.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a recorded notice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoticeId(pub String);

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for NoticeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NoticeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed identifier for a tracked change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeId(pub String);

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ChangeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChangeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed name for a health check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckName(pub String);

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CheckName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CheckName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The kind of a recorded notice.
///
/// The daemon may grow new notice kinds at any time; anything this build does
/// not know about deserializes as [`NoticeType::Unknown`] and is ignored by
/// the dispatcher rather than failing the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeType {
    Custom,
    ChangeUpdate,
    #[serde(other)]
    Unknown,
}

impl NoticeType {
    /// Wire spelling, as it appears in notice payloads and probe arguments.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeType::Custom => "custom",
            NoticeType::ChangeUpdate => "change-update",
            NoticeType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NoticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Snapshot structs
// ---------------------------------------------------------------------------

/// A recorded event, fetched by id or returned in long-poll batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: NoticeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(rename = "type")]
    pub notice_type: NoticeType,
    pub key: String,
    pub first_occurred: DateTime<Utc>,
    pub last_repeated: DateTime<Utc>,
    pub occurrences: u64,
    #[serde(default)]
    pub last_data: Map<String, Value>,
}

/// A tracked unit of daemon work, fetched by id.
///
/// `kind` and `status` are open-ended daemon vocabulary, so they stay plain
/// strings rather than enums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub id: ChangeId,
    pub kind: String,
    pub summary: String,
    pub status: String,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// A health-check record tied to a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub name: CheckName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_id: Option<ChangeId>,
    pub status: String,
    pub failures: u32,
    pub threshold: u32,
}

impl Check {
    /// True when this check belongs to the change identified by `key`.
    pub fn belongs_to(&self, key: &str) -> bool {
        self.change_id.as_ref().is_some_and(|id| id.0 == key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn newtype_display() {
        assert_eq!(NoticeId::from("42").to_string(), "42");
        assert_eq!(ChangeId::from("7").to_string(), "7");
        assert_eq!(CheckName::from("svc-alive").to_string(), "svc-alive");
    }

    #[test]
    fn notice_type_wire_spelling() {
        assert_eq!(NoticeType::Custom.to_string(), "custom");
        assert_eq!(NoticeType::ChangeUpdate.to_string(), "change-update");
        assert_eq!(
            serde_json::to_value(NoticeType::ChangeUpdate).unwrap(),
            json!("change-update")
        );
    }

    #[test]
    fn unknown_notice_type_deserializes_as_fallback() {
        let parsed: NoticeType = serde_json::from_value(json!("warning")).unwrap();
        assert_eq!(parsed, NoticeType::Unknown);
    }

    #[test]
    fn notice_deserializes_without_optional_fields() {
        let notice: Notice = serde_json::from_value(json!({
            "id": "3",
            "type": "custom",
            "key": "example.com/reload",
            "first_occurred": "2026-08-01T10:00:00Z",
            "last_repeated": "2026-08-01T10:05:00Z",
            "occurrences": 2,
        }))
        .unwrap();
        assert_eq!(notice.id, NoticeId::from("3"));
        assert_eq!(notice.user_id, None);
        assert!(notice.last_data.is_empty());
    }

    #[test]
    fn change_serde_roundtrip() {
        let change = Change {
            id: ChangeId::from("12"),
            kind: "perform-check".to_string(),
            summary: "Performing HTTP check \"alive\"".to_string(),
            status: "Doing".to_string(),
            ready: false,
            err: None,
            data: Map::new(),
        };
        let value = serde_json::to_value(&change).unwrap();
        let back: Change = serde_json::from_value(value).unwrap();
        assert_eq!(change, back);
    }

    #[test]
    fn check_ownership_filter() {
        let check = Check {
            name: CheckName::from("alive"),
            change_id: Some(ChangeId::from("12")),
            status: "up".to_string(),
            failures: 0,
            threshold: 3,
        };
        assert!(check.belongs_to("12"));
        assert!(!check.belongs_to("13"));

        let orphan = Check {
            change_id: None,
            ..check
        };
        assert!(!orphan.belongs_to("12"));
    }
}
