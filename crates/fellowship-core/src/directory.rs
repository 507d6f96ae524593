//! Directory service façade
//!
//! The entry point the rest of the application calls. Composes the sync
//! gateway, the subscription manager, and the identity chain into the
//! user-facing workflows: publish a session, list the public directory,
//! join, chat, and invite. Every operation is a thin, stateless
//! orchestration over one store round trip; nothing is cached, so repeated
//! calls always reflect the shared store.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::error::SyncResult;
use crate::gateway::SyncGateway;
use crate::identity::IdentityChain;
use crate::mapper::IdentityPolicy;
use crate::query::{Predicate, Sort};
use crate::store::{ChangeNotification, PublicStore, SubscriptionId};
use crate::subscription::SubscriptionManager;
use crate::types::{
    ChatMessage, LiveSession, MessageKind, SessionId, SessionInvitation, SessionParticipant,
};

/// Façade over the cross-account public directory.
///
/// Explicitly constructed with its dependencies (no process-wide shared
/// instance); safe to clone and call concurrently, since each operation is
/// an independent round trip. Transport errors surface to the caller and
/// every operation is safe to retry.
pub struct DirectoryService<S> {
    gateway: SyncGateway<S>,
    subscriptions: SubscriptionManager<S>,
    identity: Arc<IdentityChain>,
}

impl<S> Clone for DirectoryService<S> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            subscriptions: self.subscriptions.clone(),
            identity: Arc::clone(&self.identity),
        }
    }
}

impl<S: PublicStore> DirectoryService<S> {
    /// Create a directory service over the given store and identity chain
    pub fn new(store: Arc<S>, identity: IdentityChain) -> Self {
        Self {
            gateway: SyncGateway::new(Arc::clone(&store)),
            subscriptions: SubscriptionManager::new(store),
            identity: Arc::new(identity),
        }
    }

    /// Override the identity policy used when decoding fetched records
    pub fn with_identity_policy(mut self, policy: IdentityPolicy) -> Self {
        self.gateway = self.gateway.with_identity_policy(policy);
        self
    }

    /// The identity chain this service resolves the current user through
    pub fn identity(&self) -> &IdentityChain {
        &self.identity
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Sessions
    // ═══════════════════════════════════════════════════════════════════════

    /// Host a new session: builds it from the identity chain and publishes it
    pub async fn host_session(
        &self,
        title: impl Into<String>,
        details: impl Into<String>,
        category: impl Into<String>,
    ) -> SyncResult<LiveSession> {
        let session = LiveSession::new(title, details, self.identity.current_user_id(), category);
        info!(session_id = %session.id, "hosting session");
        self.gateway.push(&session).await?;
        Ok(session)
    }

    /// Publish (or re-publish) a locally built session record
    pub async fn publish_session(&self, session: &LiveSession) -> SyncResult<()> {
        self.gateway.push(session).await
    }

    /// All sessions in the public directory, newest start time first
    pub async fn list_public_sessions(&self) -> SyncResult<Vec<LiveSession>> {
        self.gateway
            .fetch(&Predicate::All, &Sort::descending("startTime"))
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Participants
    // ═══════════════════════════════════════════════════════════════════════

    /// Join a session as the current user and publish the membership.
    ///
    /// Whether the membership would exceed `max_participants` is not
    /// enforced here; check [`LiveSession::is_full`] before calling.
    pub async fn join_session(&self, session: &LiveSession) -> SyncResult<SessionParticipant> {
        let user_id = self.identity.current_user_id();
        let is_host = user_id == session.host_id;
        let participant = SessionParticipant::new(
            session.id,
            user_id,
            self.identity.current_user_name(),
            is_host,
        );
        info!(session_id = %session.id, participant_id = %participant.id, "joining session");
        self.gateway.push(&participant).await?;
        Ok(participant)
    }

    /// Publish (or re-publish) a locally built participant record
    pub async fn publish_participant(&self, participant: &SessionParticipant) -> SyncResult<()> {
        self.gateway.push(participant).await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Messages
    // ═══════════════════════════════════════════════════════════════════════

    /// Send a chat message to a session as the current user
    pub async fn send_message(
        &self,
        session_id: SessionId,
        body: impl Into<String>,
        kind: MessageKind,
    ) -> SyncResult<ChatMessage> {
        let message = ChatMessage::new(
            session_id,
            self.identity.current_user_id(),
            self.identity.current_user_name(),
            body,
            kind,
        );
        self.gateway.push(&message).await?;
        Ok(message)
    }

    /// A session's timeline, oldest message first
    pub async fn fetch_messages(&self, session_id: SessionId) -> SyncResult<Vec<ChatMessage>> {
        self.gateway
            .fetch(
                &Predicate::text_eq("sessionId", session_id.to_string()),
                &Sort::ascending("timestamp"),
            )
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Invitations
    // ═══════════════════════════════════════════════════════════════════════

    /// Invite a known user to a session, hosting as the current user
    pub async fn invite_user(
        &self,
        session: &LiveSession,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
    ) -> SyncResult<SessionInvitation> {
        let invitation = SessionInvitation::new(
            session.id,
            session.title.clone(),
            self.identity.current_user_id(),
            self.identity.current_user_name(),
        )
        .for_user(user_id, user_name);
        info!(invitation_id = %invitation.id, code = %invitation.invite_code, "sending invitation");
        self.gateway.push(&invitation).await?;
        Ok(invitation)
    }

    /// Invite by email address, hosting as the current user
    pub async fn invite_by_email(
        &self,
        session: &LiveSession,
        email: impl Into<String>,
    ) -> SyncResult<SessionInvitation> {
        let invitation = SessionInvitation::new(
            session.id,
            session.title.clone(),
            self.identity.current_user_id(),
            self.identity.current_user_name(),
        )
        .for_email(email);
        info!(invitation_id = %invitation.id, code = %invitation.invite_code, "sending invitation");
        self.gateway.push(&invitation).await?;
        Ok(invitation)
    }

    /// Publish (or re-publish) a locally built invitation. Accept/decline
    /// responses are recorded as upserts of the same record.
    pub async fn publish_invitation(&self, invitation: &SessionInvitation) -> SyncResult<()> {
        self.gateway.push(invitation).await
    }

    /// Invitations addressed to the given user, newest first.
    ///
    /// Matches `invitedUserId == user_id`, or `invitedEmail == email` when
    /// the caller's email is known.
    pub async fn fetch_invitations(
        &self,
        user_id: &str,
        email: Option<&str>,
    ) -> SyncResult<Vec<SessionInvitation>> {
        let mut terms = vec![Predicate::text_eq("invitedUserId", user_id)];
        if let Some(email) = email {
            terms.push(Predicate::text_eq("invitedEmail", email));
        }
        self.gateway
            .fetch(&Predicate::Or(terms), &Sort::descending("createdAt"))
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Change notifications
    // ═══════════════════════════════════════════════════════════════════════

    /// Register the global session-list subscription
    pub async fn watch_sessions(&self) -> SyncResult<SubscriptionId> {
        self.subscriptions.watch_sessions().await
    }

    /// Register a per-session chat subscription
    pub async fn watch_messages(&self, session_id: SessionId) -> SyncResult<SubscriptionId> {
        self.subscriptions.watch_messages(session_id).await
    }

    /// Remove a standing subscription
    pub async fn unwatch(&self, id: &SubscriptionId) -> SyncResult<()> {
        self.subscriptions.unwatch(id).await
    }

    /// Obtain a fresh receiver for change notifications.
    ///
    /// A received token only means "matching records changed"; re-issue the
    /// corresponding fetch to get data.
    pub fn notifications(&self) -> broadcast::Receiver<ChangeNotification> {
        self.subscriptions.notifications()
    }
}
