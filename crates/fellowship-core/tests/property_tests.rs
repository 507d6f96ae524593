//! Property-based tests for the mapper and query layers

use proptest::prelude::*;

use fellowship_core::{
    ChatMessage, FieldValue, IdentityPolicy, LiveSession, MessageId, MessageKind, Mirrored,
    Predicate, RecordKind, SessionId, SessionInvitation, Sort, WireRecord,
};

prop_compose! {
    fn arb_session()(
        title in ".{0,64}",
        details in ".{0,128}",
        host_id in "[A-Za-z0-9_-]{1,24}",
        category in "[A-Za-z ]{1,16}",
        start_time in -1_000_000_000_000i64..4_000_000_000_000i64,
        end_time in proptest::option::of(0i64..4_000_000_000_000i64),
        is_active in any::<bool>(),
        max_participants in 1i64..1_000,
        current_participants in 0i64..1_000,
        tags in proptest::collection::vec("[a-z]{1,10}", 0..5),
        is_private in any::<bool>(),
        created_at in 0i64..4_000_000_000_000i64,
    ) -> LiveSession {
        let mut session = LiveSession::new(title, details, host_id, category)
            .with_max_participants(max_participants)
            .with_tags(tags);
        session.start_time = start_time;
        session.end_time = end_time;
        session.is_active = is_active;
        session.current_participants = current_participants;
        session.is_private = is_private;
        session.created_at = created_at;
        session
    }
}

prop_compose! {
    fn arb_message()(
        user_id in "[A-Za-z0-9_-]{1,24}",
        user_name in ".{1,32}",
        body in ".{0,256}",
        timestamp in 0i64..4_000_000_000_000i64,
        kind in prop_oneof![
            Just(MessageKind::Text),
            Just(MessageKind::Prayer),
            Just(MessageKind::Scripture),
            Just(MessageKind::System),
        ],
    ) -> ChatMessage {
        let mut message = ChatMessage::new(SessionId::new(), user_id, user_name, body, kind);
        message.timestamp = timestamp;
        message
    }
}

prop_compose! {
    fn arb_invitation()(
        session_title in ".{0,64}",
        host_id in "[A-Za-z0-9_-]{1,24}",
        host_name in ".{1,32}",
        invited_user in proptest::option::of(("[A-Za-z0-9_-]{1,24}", ".{1,32}")),
        invited_email in proptest::option::of("[a-z]{1,10}@[a-z]{1,10}\\.com"),
        expires_at in proptest::option::of(0i64..4_000_000_000_000i64),
    ) -> SessionInvitation {
        let mut invitation =
            SessionInvitation::new(SessionId::new(), session_title, host_id, host_name)
                .with_expires_at(expires_at);
        if let Some((id, name)) = invited_user {
            invitation = invitation.for_user(id, name);
        }
        if let Some(email) = invited_email {
            invitation = invitation.for_email(email);
        }
        invitation
    }
}

proptest! {
    /// Any session survives the wire round trip intact under Preserve.
    #[test]
    fn session_roundtrip(session in arb_session()) {
        let record = session.to_record();
        prop_assert_eq!(record.id, session.record_id());
        let back = LiveSession::from_record(&session.to_record(), IdentityPolicy::Preserve)
            .expect("a record built by to_record must decode");
        prop_assert_eq!(back, session);
    }

    /// Any message survives the wire round trip intact under Preserve.
    #[test]
    fn message_roundtrip(message in arb_message()) {
        let back = ChatMessage::from_record(&message.to_record(), IdentityPolicy::Preserve)
            .expect("a record built by to_record must decode");
        prop_assert_eq!(back, message);
    }

    /// Any invitation, with any combination of optionals, survives the
    /// round trip intact under Preserve.
    #[test]
    fn invitation_roundtrip(invitation in arb_invitation()) {
        let back =
            SessionInvitation::from_record(&invitation.to_record(), IdentityPolicy::Preserve)
                .expect("a record built by to_record must decode");
        prop_assert_eq!(back, invitation);
    }

    /// Reassign never reuses the wire id and never affects other fields.
    #[test]
    fn reassign_changes_only_identity(message in arb_message()) {
        let back = ChatMessage::from_record(&message.to_record(), IdentityPolicy::Reassign)
            .expect("a record built by to_record must decode");
        prop_assert_ne!(back.id, message.id);
        prop_assert_eq!(back.body, message.body);
        prop_assert_eq!(back.timestamp, message.timestamp);
        prop_assert_eq!(back.session_id, message.session_id);
    }

    /// Decoding never panics, whatever fields the record carries.
    #[test]
    fn decode_is_total(
        keys in proptest::collection::vec("[a-zA-Z]{1,16}", 0..8),
        id in ".{0,32}",
    ) {
        let mut record = WireRecord::new(RecordKind::Session, id);
        for key in keys {
            record = record.set(&key, FieldValue::Integer(1));
        }
        let _ = LiveSession::from_record(&record, IdentityPolicy::Preserve);
        let _ = LiveSession::from_record(&record, IdentityPolicy::Reassign);
    }

    /// Ascending sort leaves timestamps non-decreasing; descending reverses.
    #[test]
    fn sort_orders_timestamps(timestamps in proptest::collection::vec(any::<i64>(), 0..20)) {
        let mut records: Vec<WireRecord> = timestamps
            .iter()
            .map(|t| {
                WireRecord::new(RecordKind::Message, MessageId::new().to_string())
                    .set("timestamp", FieldValue::Timestamp(*t))
            })
            .collect();

        Sort::ascending("timestamp").apply(&mut records);
        let sorted: Vec<i64> = records.iter().filter_map(|r| r.timestamp("timestamp")).collect();
        prop_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));

        Sort::descending("timestamp").apply(&mut records);
        let sorted: Vec<i64> = records.iter().filter_map(|r| r.timestamp("timestamp")).collect();
        prop_assert!(sorted.windows(2).all(|w| w[0] >= w[1]));
    }

    /// Or(p, q) matches exactly when p or q matches; And dually.
    #[test]
    fn predicate_composition_agrees_with_parts(
        user in "[a-c]",
        target in "[a-c]",
        present_key in prop_oneof![Just("userId"), Just("other")],
    ) {
        let record = WireRecord::new(RecordKind::Message, "m")
            .set("userId", FieldValue::Text(user));
        let p = Predicate::text_eq("userId", target);
        let q = Predicate::IsPresent(present_key.to_string());

        let or = Predicate::Or(vec![p.clone(), q.clone()]);
        let and = Predicate::And(vec![p.clone(), q.clone()]);
        prop_assert_eq!(or.matches(&record), p.matches(&record) || q.matches(&record));
        prop_assert_eq!(and.matches(&record), p.matches(&record) && q.matches(&record));
    }
}
