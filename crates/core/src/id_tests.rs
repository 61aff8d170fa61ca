// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::borrow::Borrow;
use std::collections::HashMap;

#[test]
fn define_id_new_and_as_str() {
    let id = SessionId::new("be-1");
    assert_eq!(id.as_str(), "be-1");
}

#[test]
fn define_id_display() {
    let id = TaskId::new("task-1");
    assert_eq!(format!("{}", id), "task-1");
}

#[test]
fn define_id_from_string() {
    let id: PlanId = String::from("sprint-plan").into();
    assert_eq!(id.as_str(), "sprint-plan");
}

#[test]
fn define_id_partial_eq_str() {
    let id = SessionId::new("be-2");
    assert_eq!(id, "be-2");
    assert_eq!(id, *"be-2");
}

#[test]
fn define_id_borrow_str() {
    let id = SessionId::new("key");
    let borrowed: &str = id.borrow();
    assert_eq!(borrowed, "key");
}

#[test]
fn define_id_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(SessionId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));
}

#[test]
fn define_id_serde_roundtrip() {
    let id = TaskId::new("t-9");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"t-9\"");
    let back: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn define_id_short_truncates() {
    let id = SessionId::new("abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

// --- session-id validation ---

#[yare::parameterized(
    simple      = { "be-1" },
    underscores = { "my_session" },
    digits      = { "042" },
    mixed       = { "Be_3-x" },
)]
fn validate_accepts(id: &str) {
    assert!(validate_session_id(id).is_ok());
}

#[yare::parameterized(
    empty       = { "" },
    slash       = { "a/b" },
    dotdot      = { ".." },
    space       = { "a b" },
    traversal   = { "../../etc/passwd" },
    unicode     = { "sesión" },
    colon       = { "a:b" },
)]
fn validate_rejects(id: &str) {
    assert!(matches!(
        validate_session_id(id),
        Err(IdError::Invalid(_))
    ));
}

#[test]
fn session_id_parse_rejects_traversal() {
    assert!(SessionId::parse("../escape").is_err());
    assert_eq!(SessionId::parse("be-7").unwrap().as_str(), "be-7");
}
