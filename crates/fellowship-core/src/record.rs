//! Flat wire records exchanged with the shared public store
//!
//! A [`WireRecord`] is a schema-typed key/value structure: every field is a
//! primitive ([`FieldValue`]) so the schema stays decoder-stable across
//! client versions. Records are keyed by `(kind, id)` where `id` is the
//! string form of the owning entity's identifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The four record kinds mirrored into the public directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKind {
    /// A discoverable live study session
    Session,
    /// One user's membership in a session
    Participant,
    /// One chat message in a session timeline
    Message,
    /// An offer for a user to join a session
    Invitation,
}

impl RecordKind {
    /// Stable wire name for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Session => "LiveSession",
            RecordKind::Participant => "LiveSessionParticipant",
            RecordKind::Message => "ChatMessage",
            RecordKind::Invitation => "SessionInvitation",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A primitive field value in a wire record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// UTF-8 text
    Text(String),
    /// Signed integer
    Integer(i64),
    /// Boolean flag
    Boolean(bool),
    /// Unix timestamp in milliseconds
    Timestamp(i64),
    /// List of UTF-8 text values
    TextList(Vec<String>),
}

/// A flat, schema-typed record exchanged with the shared public store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    /// Externally-visible record identifier (string form of the entity id)
    pub id: String,
    /// Which of the four mirrored kinds this record is
    pub kind: RecordKind,
    /// Field name to primitive value
    pub fields: BTreeMap<String, FieldValue>,
}

impl WireRecord {
    /// Create an empty record of the given kind and identifier
    pub fn new(kind: RecordKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, replacing any existing value
    pub fn set(mut self, key: &str, value: FieldValue) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Set a field only when the value is present.
    ///
    /// Absent optionals are omitted from the record entirely rather than
    /// written as a null marker.
    pub fn set_opt(self, key: &str, value: Option<FieldValue>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    /// Remove a field (for building malformed records in tests)
    pub fn unset(mut self, key: &str) -> Self {
        self.fields.remove(key);
        self
    }

    /// Raw field lookup
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Whether a field is present at all
    pub fn is_present(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Typed accessor: text field, `None` if absent or mis-typed
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Typed accessor: integer field, `None` if absent or mis-typed
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(FieldValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// Typed accessor: boolean field, `None` if absent or mis-typed
    pub fn boolean(&self, key: &str) -> Option<bool> {
        match self.fields.get(key) {
            Some(FieldValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// Typed accessor: timestamp field, `None` if absent or mis-typed
    pub fn timestamp(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(FieldValue::Timestamp(t)) => Some(*t),
            _ => None,
        }
    }

    /// Typed accessor: text-list field, `None` if absent or mis-typed
    pub fn text_list(&self, key: &str) -> Option<&[String]> {
        match self.fields.get(key) {
            Some(FieldValue::TextList(items)) => Some(items.as_slice()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> WireRecord {
        WireRecord::new(RecordKind::Session, "abc123")
            .set("title", FieldValue::Text("Psalm 23 Study".to_string()))
            .set("maxParticipants", FieldValue::Integer(10))
            .set("isActive", FieldValue::Boolean(true))
            .set("startTime", FieldValue::Timestamp(1_700_000_000_000))
            .set(
                "tags",
                FieldValue::TextList(vec!["psalms".to_string(), "evening".to_string()]),
            )
    }

    #[test]
    fn test_typed_accessors() {
        let record = sample_record();
        assert_eq!(record.text("title"), Some("Psalm 23 Study"));
        assert_eq!(record.integer("maxParticipants"), Some(10));
        assert_eq!(record.boolean("isActive"), Some(true));
        assert_eq!(record.timestamp("startTime"), Some(1_700_000_000_000));
        assert_eq!(record.text_list("tags").map(<[String]>::len), Some(2));
    }

    #[test]
    fn test_accessors_reject_wrong_type() {
        let record = sample_record();
        // "title" holds Text, so a typed integer read must miss
        assert_eq!(record.integer("title"), None);
        assert_eq!(record.text("maxParticipants"), None);
        assert_eq!(record.timestamp("isActive"), None);
    }

    #[test]
    fn test_accessors_on_absent_field() {
        let record = sample_record();
        assert_eq!(record.text("missing"), None);
        assert!(!record.is_present("missing"));
        assert!(record.is_present("title"));
    }

    #[test]
    fn test_set_opt_omits_absent_values() {
        let record = WireRecord::new(RecordKind::Invitation, "inv1")
            .set_opt("invitedEmail", None)
            .set_opt(
                "invitedUserId",
                Some(FieldValue::Text("userB".to_string())),
            );
        assert!(!record.is_present("invitedEmail"));
        assert_eq!(record.text("invitedUserId"), Some("userB"));
    }

    #[test]
    fn test_record_json_roundtrip() {
        let record = sample_record();
        let json = serde_json::to_vec(&record).unwrap();
        let back: WireRecord = serde_json::from_slice(&json).unwrap();
        assert_eq!(record, back);
    }
}
