use super::*;
use serde_json::json;

#[test]
fn encode_omits_absent_stream_and_data() {
    let text = encode_frame(&Frame { stream: None, kind: TYPE_READY.to_owned(), data: None });
    assert_eq!(text, r#"{"type":"ready"}"#);
}

#[test]
fn encode_writes_stream_type_and_data() {
    let frame = Frame::new("console", TYPE_START).with_data(json!({"tail": 0}));
    let value: Value = serde_json::from_str(&encode_frame(&frame)).expect("json");
    assert_eq!(value, json!({"stream": "console", "type": "start", "data": {"tail": 0}}));
}

#[test]
fn decode_reads_channel_frame() {
    let frame = decode_frame(r#"{"stream":"tick","type":"tick","data":{"averageTickTime":50}}"#)
        .expect("decode should succeed");
    assert_eq!(frame.stream.as_deref(), Some("tick"));
    assert_eq!(frame.kind, "tick");
    assert_eq!(frame.data, Some(json!({"averageTickTime": 50})));
}

#[test]
fn decode_reads_control_frame_without_stream() {
    let frame = decode_frame(r#"{"type":"keep-alive"}"#).expect("decode");
    assert_eq!(frame.stream, None);
    assert_eq!(frame.kind, TYPE_KEEP_ALIVE);
    assert_eq!(frame.data, None);
}

#[test]
fn decode_treats_null_data_as_absent() {
    let frame = decode_frame(r#"{"stream":"console","type":"started","data":null}"#).expect("decode");
    assert_eq!(frame.data, None);
}

#[test]
fn decode_ignores_unknown_fields() {
    let frame = decode_frame(r#"{"type":"ready","extra":true}"#).expect("decode");
    assert_eq!(frame.kind, "ready");
}

#[test]
fn decode_rejects_malformed_json() {
    let err = decode_frame("{not json").expect_err("should fail");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_rejects_missing_type() {
    let err = decode_frame(r#"{"stream":"console"}"#).expect_err("should fail");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_rejects_empty_type() {
    let err = decode_frame(r#"{"type":""}"#).expect_err("should fail");
    assert!(matches!(err, CodecError::MissingType));
}

#[test]
fn status_push_requires_status_stream() {
    let push = Frame::new(STREAM_STATUS, TYPE_STATUS);
    assert!(push.is_status_push());

    let misplaced = Frame::new("console", TYPE_STATUS);
    assert!(!misplaced.is_status_push());

    let bare = Frame { stream: None, kind: TYPE_STATUS.to_owned(), data: None };
    assert!(!bare.is_status_push());
}
