use super::*;

#[test]
fn codes_match_wire_numbering() {
    assert_eq!(ServerStatus::Offline.code(), 0);
    assert_eq!(ServerStatus::Online.code(), 1);
    assert_eq!(ServerStatus::Starting.code(), 2);
    assert_eq!(ServerStatus::Stopping.code(), 3);
    assert_eq!(ServerStatus::Restarting.code(), 4);
    assert_eq!(ServerStatus::Saving.code(), 5);
    assert_eq!(ServerStatus::Loading.code(), 6);
    assert_eq!(ServerStatus::Crashed.code(), 7);
    assert_eq!(ServerStatus::Pending.code(), 8);
    assert_eq!(ServerStatus::Preparing.code(), 10);
}

#[test]
fn code_nine_is_unassigned() {
    assert_eq!(ServerStatus::from_code(9), None);
}

#[test]
fn from_code_rejects_out_of_range() {
    assert_eq!(ServerStatus::from_code(-1), None);
    assert_eq!(ServerStatus::from_code(11), None);
}

#[test]
fn from_code_inverts_code_for_all_variants() {
    for status in ServerStatus::ALL {
        assert_eq!(ServerStatus::from_code(status.code()), Some(status));
    }
}

#[test]
fn serializes_as_integer() {
    assert_eq!(serde_json::to_string(&ServerStatus::Preparing).expect("serialize"), "10");
}

#[test]
fn deserialize_rejects_unknown_code() {
    let err = serde_json::from_str::<ServerStatus>("9").expect_err("9 is unassigned");
    assert!(err.to_string().contains("unknown server status code 9"));
}

#[test]
fn display_uses_upper_case_label() {
    assert_eq!(ServerStatus::Restarting.to_string(), "RESTARTING");
}
