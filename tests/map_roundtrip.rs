//! End-to-end mapping checks through the public API.

use serde_json::Value;

use mqttbridge::mapping::{InternalMessage, MapData, MapError, MessageMap};

fn identity_map() -> MessageMap {
    MessageMap::new(
        MapData::no_map("home", vec!["home/#".to_owned()]),
        "mqttbridge",
    )
    .expect("identity map must build")
}

#[test]
fn bare_action_example_round_trips() {
    let map = identity_map();
    let topic = "home/lighting/dummygw/office/lamp1/me/C";

    let msg = map.decode(topic, b"light_on").expect("decode");
    assert!(msg.is_command);
    assert_eq!(msg.function, "lighting");
    assert_eq!(msg.gateway, "dummygw");
    assert_eq!(msg.location, "office");
    assert_eq!(msg.device, "lamp1");
    assert_eq!(msg.sender, "me");
    assert_eq!(msg.action, "light_on");
    assert!(msg.arguments.is_empty());

    let (encoded_topic, encoded_payload) = map.encode(&msg).expect("encode");
    assert_eq!(encoded_topic, topic);
    assert_eq!(encoded_payload, b"light_on");
}

#[test]
fn json_arguments_example_round_trips() {
    let map = identity_map();
    let msg = map
        .decode(
            "home/lighting/dummygw/office/lamp1/me/C",
            br#"{"action":"set_level","level":"40"}"#,
        )
        .expect("decode");
    assert_eq!(msg.action, "set_level");
    assert_eq!(msg.argument("level"), Some("40"));

    let (topic, payload) = map.encode(&msg).expect("encode");
    assert_eq!(topic, "home/lighting/dummygw/office/lamp1/me/C");
    let object: serde_json::Map<String, Value> =
        serde_json::from_slice(&payload).expect("payload must be a JSON object");
    assert_eq!(object.get("action"), Some(&Value::String("set_level".into())));
    assert_eq!(object.get("level"), Some(&Value::String("40".into())));
}

#[test]
fn status_type_token_round_trips() {
    let map = identity_map();
    let msg = map
        .decode("home/audio/av/salon/amp/remote/S", b"volume_ok")
        .expect("decode");
    assert!(!msg.is_command);
    let (topic, _) = map.encode(&msg).expect("encode");
    assert!(topic.ends_with("/S"));
}

#[test]
fn topic_with_wrong_token_count_always_fails() {
    let map = identity_map();
    for topic in [
        "home",
        "home/lighting",
        "home/lighting/gw/office/lamp1/me",
        "home/lighting/gw/office/lamp1/me/C/extra",
    ] {
        let err = map.decode(topic, b"action").unwrap_err();
        assert!(
            matches!(err, MapError::MalformedTopic(_)),
            "topic <{topic}> should be malformed"
        );
    }
}

#[test]
fn json_payload_without_action_always_fails() {
    let map = identity_map();
    let err = map
        .decode("home/lighting/gw/office/lamp1/me/C", br#"{"level":"40"}"#)
        .unwrap_err();
    assert!(matches!(err, MapError::MissingAction(_)));
}

#[test]
fn strict_map_rejects_unknown_function() {
    let json = r#"{
        "root": "home",
        "topics": [],
        "function": {"maptype": "strict", "map": {"lighting": ["lights"]}},
        "gateway": {"maptype": "none"},
        "location": {"maptype": "none"},
        "device": {"maptype": "none"},
        "sender": {"maptype": "none"},
        "action": {"maptype": "none"},
        "argkey": {"maptype": "none"},
        "argvalue": {"maptype": "none"}
    }"#;
    let map = MessageMap::new(MapData::from_json(json).expect("parse"), "me").expect("build");

    let err = map
        .decode("home/heating/gw/office/rad1/you/C", b"on")
        .unwrap_err();
    assert!(matches!(err, MapError::UnknownToken(t) if t == "heating"));

    let msg = InternalMessage::command()
        .with_function("heating")
        .with_action("on");
    assert!(matches!(
        map.encode(&msg).unwrap_err(),
        MapError::UnknownToken(_)
    ));
}

#[test]
fn map_data_missing_field_is_fatal_at_construction() {
    let json = r#"{"root": "home", "topics": []}"#;
    let err = MessageMap::new(MapData::from_json(json).expect("parse"), "me").unwrap_err();
    assert!(matches!(err, MapError::InvalidMap(m) if m.contains("<function>")));
}

#[test]
fn empty_sender_encodes_as_own_identity() {
    let map = identity_map();
    let msg = InternalMessage::command()
        .with_function("lighting")
        .with_action("light_on");
    let (topic, _) = map.encode(&msg).expect("encode");
    let tokens: Vec<&str> = topic.split('/').collect();
    assert_eq!(tokens.len(), 7);
    assert_eq!(tokens[5], "mqttbridge");
}
