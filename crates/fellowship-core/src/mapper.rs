//! Bidirectional mapping between local entities and wire records
//!
//! One [`Mirrored`] implementation per entity kind. `to_record` is total;
//! `from_record` is best-effort: it returns `None` when any required field
//! is missing or mis-typed, and falls back to documented defaults for
//! optional fields. The mapper performs no I/O and has no side effects, so
//! every field-presence combination is unit-testable in isolation.

use crate::record::{FieldValue, RecordKind, WireRecord};
use crate::types::{
    ChatMessage, InvitationId, InvitationStatus, LiveSession, MessageId, MessageKind,
    ParticipantId, SessionId, SessionInvitation, SessionParticipant,
};

/// What to do with the wire record's identifier when reconstructing an entity.
///
/// Rather than bake either behavior into field-by-field decoding, the choice
/// is a single policy passed to [`Mirrored::from_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityPolicy {
    /// Reuse the wire record's identifier; decode fails if it does not parse
    /// as the entity's id type. Identity is stable end-to-end, so re-pushing
    /// a fetched entity overwrites instead of duplicating.
    #[default]
    Preserve,
    /// Mint a fresh identifier for the reconstructed entity on every pull.
    /// Suitable for display-only copies that are never re-pushed.
    Reassign,
}

/// An entity kind that is mirrored into the shared public store
pub trait Mirrored: Sized {
    /// Record kind this entity maps to
    const KIND: RecordKind;

    /// The externally-visible record identifier: the string form of the
    /// entity's own identifier.
    fn record_id(&self) -> String;

    /// Map the entity to its wire record
    fn to_record(&self) -> WireRecord;

    /// Reconstruct an entity from a wire record.
    ///
    /// Returns `None` when a required field is missing or mis-typed, or when
    /// `policy` is [`IdentityPolicy::Preserve`] and the record id does not
    /// parse. Optional fields fall back to documented defaults.
    fn from_record(record: &WireRecord, policy: IdentityPolicy) -> Option<Self>;
}

impl Mirrored for LiveSession {
    const KIND: RecordKind = RecordKind::Session;

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn to_record(&self) -> WireRecord {
        WireRecord::new(Self::KIND, self.record_id())
            .set("title", FieldValue::Text(self.title.clone()))
            .set("details", FieldValue::Text(self.details.clone()))
            .set("hostId", FieldValue::Text(self.host_id.clone()))
            .set("startTime", FieldValue::Timestamp(self.start_time))
            .set_opt("endTime", self.end_time.map(FieldValue::Timestamp))
            .set("isActive", FieldValue::Boolean(self.is_active))
            .set("maxParticipants", FieldValue::Integer(self.max_participants))
            .set(
                "currentParticipants",
                FieldValue::Integer(self.current_participants),
            )
            .set("category", FieldValue::Text(self.category.clone()))
            .set("tags", FieldValue::TextList(self.tags.clone()))
            .set("isPrivate", FieldValue::Boolean(self.is_private))
            .set("createdAt", FieldValue::Timestamp(self.created_at))
    }

    fn from_record(record: &WireRecord, policy: IdentityPolicy) -> Option<Self> {
        let id = match policy {
            IdentityPolicy::Preserve => SessionId::from_string(&record.id).ok()?,
            IdentityPolicy::Reassign => SessionId::new(),
        };

        let title = record.text("title")?.to_string();
        let details = record.text("details")?.to_string();
        let host_id = record.text("hostId")?.to_string();
        let category = record.text("category")?.to_string();
        let start_time = record.timestamp("startTime")?;
        let max_participants = record.integer("maxParticipants")?;

        Some(Self {
            id,
            title,
            details,
            host_id,
            start_time,
            end_time: record.timestamp("endTime"),
            is_active: record.boolean("isActive").unwrap_or(true),
            max_participants,
            current_participants: record.integer("currentParticipants").unwrap_or(1),
            category,
            tags: record.text_list("tags").map(<[String]>::to_vec).unwrap_or_default(),
            is_private: record.boolean("isPrivate").unwrap_or(false),
            created_at: record.timestamp("createdAt").unwrap_or(start_time),
        })
    }
}

impl Mirrored for SessionParticipant {
    const KIND: RecordKind = RecordKind::Participant;

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn to_record(&self) -> WireRecord {
        WireRecord::new(Self::KIND, self.record_id())
            .set("sessionId", FieldValue::Text(self.session_id.to_string()))
            .set("userId", FieldValue::Text(self.user_id.clone()))
            .set("userName", FieldValue::Text(self.user_name.clone()))
            .set("joinedAt", FieldValue::Timestamp(self.joined_at))
            .set_opt("leftAt", self.left_at.map(FieldValue::Timestamp))
            .set("isHost", FieldValue::Boolean(self.is_host))
            .set("isActive", FieldValue::Boolean(self.is_active))
    }

    fn from_record(record: &WireRecord, policy: IdentityPolicy) -> Option<Self> {
        let id = match policy {
            IdentityPolicy::Preserve => ParticipantId::from_string(&record.id).ok()?,
            IdentityPolicy::Reassign => ParticipantId::new(),
        };

        let session_id = SessionId::from_string(record.text("sessionId")?).ok()?;
        let user_id = record.text("userId")?.to_string();
        let user_name = record.text("userName")?.to_string();
        let joined_at = record.timestamp("joinedAt")?;

        Some(Self {
            id,
            session_id,
            user_id,
            user_name,
            joined_at,
            left_at: record.timestamp("leftAt"),
            is_host: record.boolean("isHost").unwrap_or(false),
            is_active: record.boolean("isActive").unwrap_or(true),
        })
    }
}

impl Mirrored for ChatMessage {
    const KIND: RecordKind = RecordKind::Message;

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn to_record(&self) -> WireRecord {
        WireRecord::new(Self::KIND, self.record_id())
            .set("sessionId", FieldValue::Text(self.session_id.to_string()))
            .set("userId", FieldValue::Text(self.user_id.clone()))
            .set("userName", FieldValue::Text(self.user_name.clone()))
            .set("message", FieldValue::Text(self.body.clone()))
            .set("timestamp", FieldValue::Timestamp(self.timestamp))
            .set("messageType", FieldValue::Text(self.kind.as_str().to_string()))
    }

    fn from_record(record: &WireRecord, policy: IdentityPolicy) -> Option<Self> {
        let id = match policy {
            IdentityPolicy::Preserve => MessageId::from_string(&record.id).ok()?,
            IdentityPolicy::Reassign => MessageId::new(),
        };

        // All message fields are required, including a recognized messageType
        let session_id = SessionId::from_string(record.text("sessionId")?).ok()?;
        let user_id = record.text("userId")?.to_string();
        let user_name = record.text("userName")?.to_string();
        let body = record.text("message")?.to_string();
        let timestamp = record.timestamp("timestamp")?;
        let kind = MessageKind::from_str_opt(record.text("messageType")?)?;

        Some(Self {
            id,
            session_id,
            user_id,
            user_name,
            body,
            timestamp,
            kind,
        })
    }
}

impl Mirrored for SessionInvitation {
    const KIND: RecordKind = RecordKind::Invitation;

    fn record_id(&self) -> String {
        self.id.to_string()
    }

    fn to_record(&self) -> WireRecord {
        WireRecord::new(Self::KIND, self.record_id())
            .set("sessionId", FieldValue::Text(self.session_id.to_string()))
            .set("sessionTitle", FieldValue::Text(self.session_title.clone()))
            .set("hostId", FieldValue::Text(self.host_id.clone()))
            .set("hostName", FieldValue::Text(self.host_name.clone()))
            .set_opt(
                "invitedUserId",
                self.invited_user_id.clone().map(FieldValue::Text),
            )
            .set_opt(
                "invitedUserName",
                self.invited_user_name.clone().map(FieldValue::Text),
            )
            .set_opt(
                "invitedEmail",
                self.invited_email.clone().map(FieldValue::Text),
            )
            .set("inviteCode", FieldValue::Text(self.invite_code.clone()))
            .set("status", FieldValue::Text(self.status.as_str().to_string()))
            .set("createdAt", FieldValue::Timestamp(self.created_at))
            .set_opt("respondedAt", self.responded_at.map(FieldValue::Timestamp))
            .set_opt("expiresAt", self.expires_at.map(FieldValue::Timestamp))
    }

    fn from_record(record: &WireRecord, policy: IdentityPolicy) -> Option<Self> {
        let id = match policy {
            IdentityPolicy::Preserve => InvitationId::from_string(&record.id).ok()?,
            IdentityPolicy::Reassign => InvitationId::new(),
        };

        let session_id = SessionId::from_string(record.text("sessionId")?).ok()?;
        let session_title = record.text("sessionTitle")?.to_string();
        let host_id = record.text("hostId")?.to_string();
        let host_name = record.text("hostName")?.to_string();
        let invite_code = record.text("inviteCode")?.to_string();
        let status = InvitationStatus::from_str_opt(record.text("status")?)?;
        let created_at = record.timestamp("createdAt")?;

        Some(Self {
            id,
            session_id,
            session_title,
            host_id,
            host_name,
            invited_user_id: record.text("invitedUserId").map(str::to_string),
            invited_user_name: record.text("invitedUserName").map(str::to_string),
            invited_email: record.text("invitedEmail").map(str::to_string),
            invite_code,
            status,
            created_at,
            responded_at: record.timestamp("respondedAt"),
            expires_at: record.timestamp("expiresAt"),
        })
    }
}
