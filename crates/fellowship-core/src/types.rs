//! Local entity types mirrored into the public directory
//!
//! These are the in-memory shapes the rest of the application works with.
//! Each entity kind has a wire counterpart (see [`crate::record`] and
//! [`crate::mapper`]) used when pushing to or pulling from the shared
//! public store.

use rand::Rng;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix timestamp in milliseconds for "now"
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Unique identifier for a live session
///
/// Uses ULID for time-ordered unique identifiers that sort lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Create a new SessionId with current timestamp
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse from string representation
    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a session participant record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub Ulid);

impl ParticipantId {
    /// Create a new ParticipantId with current timestamp
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse from string representation
    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Ulid);

impl MessageId {
    /// Create a new MessageId with current timestamp
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse from string representation
    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a session invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvitationId(pub Ulid);

impl InvitationId {
    /// Create a new InvitationId with current timestamp
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse from string representation
    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for InvitationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvitationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A discoverable live study session
///
/// Created by a host and published into the public directory so that users
/// on other accounts can find and join it. Mutations (closing the session,
/// participant counts) are re-pushed as whole-record upserts; the store
/// applies last-write-wins semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSession {
    /// Unique identifier, also used as the wire record identifier
    pub id: SessionId,
    /// Session title shown in the directory
    pub title: String,
    /// Longer description
    pub details: String,
    /// Identifier of the hosting user
    pub host_id: String,
    /// Unix timestamp (ms) when the session starts
    pub start_time: i64,
    /// Unix timestamp (ms) when the session ended, if it has
    pub end_time: Option<i64>,
    /// Whether the session is currently running
    pub is_active: bool,
    /// Maximum number of participants the host allows
    pub max_participants: i64,
    /// Current participant count (maintained client-side, not validated)
    pub current_participants: i64,
    /// Category label, e.g. "Bible Study" or "Prayer"
    pub category: String,
    /// Free-form topic tags
    pub tags: Vec<String>,
    /// Whether the session is hidden from the open directory listing
    pub is_private: bool,
    /// Unix timestamp (ms) of creation
    pub created_at: i64,
}

/// Default participant cap for a new session
pub const DEFAULT_MAX_PARTICIPANTS: i64 = 10;

impl LiveSession {
    /// Create a new session hosted by `host_id`, starting now.
    ///
    /// Starts active, public, with the host as the only participant.
    pub fn new(
        title: impl Into<String>,
        details: impl Into<String>,
        host_id: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let now = now_ms();
        Self {
            id: SessionId::new(),
            title: title.into(),
            details: details.into(),
            host_id: host_id.into(),
            start_time: now,
            end_time: None,
            is_active: true,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            current_participants: 1,
            category: category.into(),
            tags: Vec::new(),
            is_private: false,
            created_at: now,
        }
    }

    /// Set the participant cap
    pub fn with_max_participants(mut self, max: i64) -> Self {
        self.max_participants = max;
        self
    }

    /// Set the topic tags
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(|t| t.into()).collect();
        self
    }

    /// Whether the session has reached its participant cap.
    ///
    /// Client-side check only; the store performs no validation on push.
    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }

    /// End the session: flips `is_active` and stamps `end_time`.
    ///
    /// The change only becomes visible to other accounts once re-pushed.
    pub fn close(&mut self) {
        if self.is_active {
            self.is_active = false;
            self.end_time = Some(now_ms());
        }
    }
}

/// One user's membership in a session
///
/// At most one active participant record per `(session_id, user_id)` pair is
/// a caller-side invariant; the store does not deduplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParticipant {
    /// Unique identifier, also used as the wire record identifier
    pub id: ParticipantId,
    /// Session this membership belongs to
    pub session_id: SessionId,
    /// Identifier of the participating user
    pub user_id: String,
    /// Display name of the participating user
    pub user_name: String,
    /// Unix timestamp (ms) when the user joined
    pub joined_at: i64,
    /// Unix timestamp (ms) when the user left, if they have
    pub left_at: Option<i64>,
    /// Whether this participant is the session host
    pub is_host: bool,
    /// Whether the membership is currently active
    pub is_active: bool,
}

impl SessionParticipant {
    /// Create a new active membership, joined now
    pub fn new(
        session_id: SessionId,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        is_host: bool,
    ) -> Self {
        Self {
            id: ParticipantId::new(),
            session_id,
            user_id: user_id.into(),
            user_name: user_name.into(),
            joined_at: now_ms(),
            left_at: None,
            is_host,
            is_active: true,
        }
    }

    /// Mark the participant as having left: stamps `left_at`, clears `is_active`
    pub fn leave(&mut self) {
        if self.is_active {
            self.is_active = false;
            self.left_at = Some(now_ms());
        }
    }
}

/// Kind of a chat message in a session timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Plain conversation text
    Text,
    /// A prayer shared with the session
    Prayer,
    /// A scripture reference or quotation
    Scripture,
    /// System-generated notice (joins, leaves)
    System,
}

impl MessageKind {
    /// Stable wire string for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Prayer => "prayer",
            MessageKind::Scripture => "scripture",
            MessageKind::System => "system",
        }
    }

    /// Parse from the wire string; `None` for unknown values
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageKind::Text),
            "prayer" => Some(MessageKind::Prayer),
            "scripture" => Some(MessageKind::Scripture),
            "system" => Some(MessageKind::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One chat message in a session's timeline
///
/// Messages are immutable once pushed: only create and fetch paths exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique identifier, also used as the wire record identifier
    pub id: MessageId,
    /// Session this message belongs to
    pub session_id: SessionId,
    /// Identifier of the sender
    pub user_id: String,
    /// Display name of the sender
    pub user_name: String,
    /// Message text
    pub body: String,
    /// Unix timestamp (ms) when the message was created
    pub timestamp: i64,
    /// Kind of message
    pub kind: MessageKind,
}

impl ChatMessage {
    /// Create a new message timestamped now
    pub fn new(
        session_id: SessionId,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        body: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            user_id: user_id.into(),
            user_name: user_name.into(),
            body: body.into(),
            timestamp: now_ms(),
            kind,
        }
    }
}

/// Status of a session invitation
///
/// `Pending` is the sole initial state; `Accepted` and `Declined` are
/// terminal. `Expired` is never written by this subsystem; readers derive it
/// from `expires_at` via [`SessionInvitation::is_expired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationStatus {
    /// Awaiting a response from the invitee
    Pending,
    /// Invitee accepted
    Accepted,
    /// Invitee declined
    Declined,
    /// Past its expiry (derived; only stored if a client chooses to)
    Expired,
}

impl InvitationStatus {
    /// Stable wire string for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "Pending",
            InvitationStatus::Accepted => "Accepted",
            InvitationStatus::Declined => "Declined",
            InvitationStatus::Expired => "Expired",
        }
    }

    /// Parse from the wire string; `None` for unknown values
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(InvitationStatus::Pending),
            "Accepted" => Some(InvitationStatus::Accepted),
            "Declined" => Some(InvitationStatus::Declined),
            "Expired" => Some(InvitationStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a new invitation stays valid by default (7 days)
pub const DEFAULT_INVITE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Length of a generated invite code
const INVITE_CODE_LEN: usize = 8;

/// Generate an 8-character uppercase alphanumeric invite code
pub fn generate_invite_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// An offer for a user to join a session
///
/// Addressed either to a known user id or to an email address. Expiry is a
/// read-time derivation from `expires_at`; no background sweeper exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInvitation {
    /// Unique identifier, also used as the wire record identifier
    pub id: InvitationId,
    /// Session the invitation is for
    pub session_id: SessionId,
    /// Title of the session, denormalized for display
    pub session_title: String,
    /// Identifier of the inviting host
    pub host_id: String,
    /// Display name of the inviting host
    pub host_name: String,
    /// Invited user's identifier, when known
    pub invited_user_id: Option<String>,
    /// Invited user's display name, when known
    pub invited_user_name: Option<String>,
    /// Invited user's email, when the invitation is addressed by email
    pub invited_email: Option<String>,
    /// Short shareable code for joining
    pub invite_code: String,
    /// Current status of the invitation
    pub status: InvitationStatus,
    /// Unix timestamp (ms) of creation
    pub created_at: i64,
    /// Unix timestamp (ms) when the invitee responded, if they have
    pub responded_at: Option<i64>,
    /// Unix timestamp (ms) after which the invitation is expired
    pub expires_at: Option<i64>,
}

impl SessionInvitation {
    /// Create a pending invitation with a generated invite code and the
    /// default 7-day expiry.
    pub fn new(
        session_id: SessionId,
        session_title: impl Into<String>,
        host_id: impl Into<String>,
        host_name: impl Into<String>,
    ) -> Self {
        let now = now_ms();
        Self {
            id: InvitationId::new(),
            session_id,
            session_title: session_title.into(),
            host_id: host_id.into(),
            host_name: host_name.into(),
            invited_user_id: None,
            invited_user_name: None,
            invited_email: None,
            invite_code: generate_invite_code(),
            status: InvitationStatus::Pending,
            created_at: now,
            responded_at: None,
            expires_at: Some(now + DEFAULT_INVITE_TTL_MS),
        }
    }

    /// Address the invitation to a known user
    pub fn for_user(mut self, user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        self.invited_user_id = Some(user_id.into());
        self.invited_user_name = Some(user_name.into());
        self
    }

    /// Address the invitation to an email
    pub fn for_email(mut self, email: impl Into<String>) -> Self {
        self.invited_email = Some(email.into());
        self
    }

    /// Override the generated invite code
    pub fn with_invite_code(mut self, code: impl Into<String>) -> Self {
        self.invite_code = code.into();
        self
    }

    /// Override the expiry (or remove it with `None`)
    pub fn with_expires_at(mut self, expires_at: Option<i64>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Whether the invitation is past its expiry at time `now` (ms)
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }

    /// Whether the invitation can still be responded to at time `now` (ms):
    /// pending and not expired.
    pub fn is_valid(&self, now: i64) -> bool {
        self.status == InvitationStatus::Pending && !self.is_expired(now)
    }

    /// Accept a pending invitation, stamping `responded_at`.
    ///
    /// No-op unless the invitation is still valid at `now`.
    pub fn accept(&mut self, now: i64) {
        if self.is_valid(now) {
            self.status = InvitationStatus::Accepted;
            self.responded_at = Some(now);
        }
    }

    /// Decline a pending invitation, stamping `responded_at`.
    ///
    /// No-op unless the invitation is still valid at `now`.
    pub fn decline(&mut self, now: i64) {
        if self.is_valid(now) {
            self.status = InvitationStatus::Declined;
            self.responded_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_roundtrip() {
        let id = SessionId::new();
        let parsed = SessionId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_new_session_defaults() {
        let session = LiveSession::new("Psalm 23 Study", "Walking through Psalm 23", "userA", "Bible Study");
        assert!(session.is_active);
        assert_eq!(session.current_participants, 1);
        assert_eq!(session.max_participants, DEFAULT_MAX_PARTICIPANTS);
        assert!(session.tags.is_empty());
        assert!(!session.is_private);
        assert!(session.end_time.is_none());
        assert_eq!(session.start_time, session.created_at);
    }

    #[test]
    fn test_session_is_full() {
        let mut session =
            LiveSession::new("Study", "", "userA", "Prayer").with_max_participants(2);
        assert!(!session.is_full());
        session.current_participants = 2;
        assert!(session.is_full());
    }

    #[test]
    fn test_session_close() {
        let mut session = LiveSession::new("Study", "", "userA", "Prayer");
        session.close();
        assert!(!session.is_active);
        assert!(session.end_time.is_some());

        // Closing again must not move end_time
        let first_end = session.end_time;
        session.close();
        assert_eq!(session.end_time, first_end);
    }

    #[test]
    fn test_participant_leave() {
        let mut participant =
            SessionParticipant::new(SessionId::new(), "userB", "Ruth", false);
        assert!(participant.is_active);
        assert!(participant.left_at.is_none());

        participant.leave();
        assert!(!participant.is_active);
        assert!(participant.left_at.is_some());
    }

    #[test]
    fn test_message_kind_wire_strings() {
        for kind in [
            MessageKind::Text,
            MessageKind::Prayer,
            MessageKind::Scripture,
            MessageKind::System,
        ] {
            assert_eq!(MessageKind::from_str_opt(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageKind::from_str_opt("emoji"), None);
    }

    #[test]
    fn test_invitation_defaults() {
        let invitation = SessionInvitation::new(SessionId::new(), "Study", "userA", "Naomi");
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert_eq!(invitation.invite_code.len(), 8);
        assert!(invitation.expires_at.is_some());
        assert!(invitation.responded_at.is_none());
    }

    #[test]
    fn test_invite_code_charset() {
        let code = generate_invite_code();
        assert_eq!(code.len(), 8);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_invitation_expiry_is_derived() {
        let now = now_ms();
        let invitation = SessionInvitation::new(SessionId::new(), "Study", "userA", "Naomi")
            .with_expires_at(Some(now - 1));
        // Expired by observation only; status is untouched
        assert!(invitation.is_expired(now));
        assert!(!invitation.is_valid(now));
        assert_eq!(invitation.status, InvitationStatus::Pending);
    }

    #[test]
    fn test_invitation_without_expiry_never_expires() {
        let invitation = SessionInvitation::new(SessionId::new(), "Study", "userA", "Naomi")
            .with_expires_at(None);
        assert!(!invitation.is_expired(i64::MAX));
    }

    #[test]
    fn test_invitation_accept() {
        let now = now_ms();
        let mut invitation = SessionInvitation::new(SessionId::new(), "Study", "userA", "Naomi");
        invitation.accept(now);
        assert_eq!(invitation.status, InvitationStatus::Accepted);
        assert_eq!(invitation.responded_at, Some(now));
    }

    #[test]
    fn test_invitation_decline_is_terminal() {
        let now = now_ms();
        let mut invitation = SessionInvitation::new(SessionId::new(), "Study", "userA", "Naomi");
        invitation.decline(now);
        assert_eq!(invitation.status, InvitationStatus::Declined);

        // A terminal invitation cannot flip back
        invitation.accept(now);
        assert_eq!(invitation.status, InvitationStatus::Declined);
    }

    #[test]
    fn test_expired_invitation_cannot_be_accepted() {
        let now = now_ms();
        let mut invitation = SessionInvitation::new(SessionId::new(), "Study", "userA", "Naomi")
            .with_expires_at(Some(now - 1));
        invitation.accept(now);
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert!(invitation.responded_at.is_none());
    }
}
