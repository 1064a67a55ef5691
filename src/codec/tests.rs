use super::*;

fn sample_user(wss: Option<&str>) -> User {
    User {
        user_id: "u-1".into(),
        user_name: "Ada".into(),
        email: "ada@example.com".into(),
        password: "hunter2".into(),
        date_of_birth: "1990-12-10".into(),
        created_at: 1_700_000_000_000,
        user_image_url: None,
        wss_id: wss.map(String::from),
    }
}

#[test]
fn user_round_trip_preserves_all_fields() {
    let user = sample_user(Some("conn-42"));
    let decoded = decode_user(&encode_user(&user)).unwrap();
    assert_eq!(decoded, user);
}

#[test]
fn absent_optionals_stay_absent_through_round_trip() {
    let user = sample_user(None);
    let record = encode_user(&user);
    assert!(!record.contains_key("wssId"));
    assert!(!record.contains_key("userImageUrl"));

    let decoded = decode_user(&record).unwrap();
    assert_eq!(decoded.wss_id, None);
    assert_eq!(decoded.user_image_url, None);
    assert_eq!(decoded, user);
}

#[test]
fn group_round_trip() {
    let group = Group {
        group_id: "g-1".into(),
        group_name: "climbing".into(),
        emoticon: "🧗".into(),
        created_at: 1_700_000_000_001,
        last_message_at: Some(1_700_000_000_500),
    };
    let record = encode_group(&group);
    assert_eq!(decode_group(&record).unwrap(), group);

    let record = encode_group(&Group {
        last_message_at: None,
        ..group
    });
    assert!(!record.contains_key("lastMessageAt"));
}

#[test]
fn membership_round_trip() {
    let membership = Membership {
        user_id: "u-1".into(),
        group_id: "g-1".into(),
        joined_at: 7,
    };
    assert_eq!(
        decode_membership(&encode_membership(&membership)).unwrap(),
        membership
    );
}

#[test]
fn thread_round_trip() {
    let thread = Thread {
        thread_id: "t-1".into(),
        group_id: "g-1".into(),
        thread_name: "general".into(),
        color: "#aabbcc".into(),
        created_at: 5,
        last_message_at: None,
    };
    assert_eq!(decode_thread(&encode_thread(&thread)).unwrap(), thread);
}

#[test]
fn message_round_trip_and_group_index_keys() {
    let message = Message {
        message_id: "m-1".into(),
        thread_id: "t-1".into(),
        group_id: "g-1".into(),
        sender_user_id: "u-1".into(),
        content: "hello".into(),
        created_at: 9,
    };
    let record = encode_message(&message);
    assert_eq!(record.get("gsi1pk"), Some(&AttrValue::S("GROUP#g-1".into())));
    assert_eq!(
        record.get("gsi1sk"),
        Some(&AttrValue::S("THREAD#t-1#MESSAGE#m-1".into()))
    );
    assert_eq!(decode_message(&record).unwrap(), message);
}

#[test]
fn entity_round_trip_for_all_kinds() {
    let entities = vec![
        Entity::User(sample_user(None)),
        Entity::Group(Group {
            group_id: "g".into(),
            group_name: "n".into(),
            emoticon: "e".into(),
            created_at: 1,
            last_message_at: None,
        }),
        Entity::Membership(Membership {
            user_id: "u".into(),
            group_id: "g".into(),
            joined_at: 2,
        }),
        Entity::Thread(Thread {
            thread_id: "t".into(),
            group_id: "g".into(),
            thread_name: "n".into(),
            color: "c".into(),
            created_at: 3,
            last_message_at: Some(4),
        }),
        Entity::Message(Message {
            message_id: "m".into(),
            thread_id: "t".into(),
            group_id: "g".into(),
            sender_user_id: "u".into(),
            content: "c".into(),
            created_at: 5,
        }),
    ];

    for entity in entities {
        let record = encode(&entity);
        let decoded = decode(&record).unwrap();
        assert_eq!(decoded.kind(), entity.kind());
        assert_eq!(decoded, entity);
        // Round-trip law: re-encoding the decoded entity reproduces the record.
        assert_eq!(encode(&decoded), record);
    }
}

#[test]
fn missing_required_attribute_is_an_error() {
    let mut record = encode_user(&sample_user(None));
    record.remove("email");
    match decode_user(&record) {
        Err(CodecError::MissingAttribute("email")) => {}
        other => panic!("expected MissingAttribute, got {other:?}"),
    }
}

#[test]
fn wrong_attribute_type_is_an_error() {
    let mut record = encode_user(&sample_user(None));
    record.insert("createdAt".into(), AttrValue::S("not a number".into()));
    match decode_user(&record) {
        Err(CodecError::WrongType("createdAt")) => {}
        other => panic!("expected WrongType, got {other:?}"),
    }
}

#[test]
fn kind_of_classifies_by_key_prefix() {
    let record = encode_membership(&Membership {
        user_id: "u".into(),
        group_id: "g".into(),
        joined_at: 0,
    });
    assert_eq!(kind_of(&record).unwrap(), EntityKind::Membership);
    assert_eq!(EntityKind::Membership.as_str(), "membership");
    assert_eq!(EntityKind::User.as_str(), "user");

    let mut bogus = RawRecord::new();
    bogus.insert("pk".into(), AttrValue::S("WAT#1".into()));
    bogus.insert("sk".into(), AttrValue::S("HUH".into()));
    assert!(matches!(
        kind_of(&bogus),
        Err(CodecError::UnknownKeyShape { .. })
    ));
}
