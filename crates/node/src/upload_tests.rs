// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    ok_200 = { 200 },
    created_201 = { 201 },
)]
fn test_classify_success(status: u16) {
    let receipt = classify(status, r#"{"success":true,"message":"Image uploaded"}"#).unwrap();
    assert_eq!(receipt.status, status);
    assert_eq!(receipt.message.as_deref(), Some("Image uploaded"));
}

#[parameterized(
    negative_body = { 200, r#"{"success":false,"message":"nope"}"# },
    missing_success = { 201, r#"{"message":"stored"}"# },
    not_json = { 200, "OK" },
    empty_body = { 200, "" },
)]
fn test_classify_2xx_with_bad_body_is_failure(status: u16, body: &str) {
    let err = classify(status, body).unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)));
    assert!(!err.is_unauthorized());
}

#[test]
fn test_classify_401_is_unauthorized() {
    let err = classify(401, r#"{"success":false,"message":"Token expired"}"#).unwrap_err();
    assert!(err.is_unauthorized());
}

#[parameterized(
    no_content = { 204 },
    bad_request = { 400 },
    forbidden = { 403 },
    too_large = { 413 },
    server_error = { 500 },
)]
fn test_classify_other_status_is_rejection(status: u16) {
    let err = classify(status, r#"{"success":true}"#).unwrap_err();
    assert_eq!(err.http_status(), Some(status));
    assert!(!err.is_unauthorized());
}

#[test]
fn test_truncate_respects_char_boundaries() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 3), "hel");
    // 'é' is two bytes; cutting inside it backs off
    assert_eq!(truncate("aé", 2), "a");
}

#[test]
fn test_client_refuses_empty_payload() {
    let mut client = UploadClient::new(&UploadConfig::default()).unwrap();
    let endpoint = Endpoint::new("http", "127.0.0.1", 9, "/api");
    let err = client
        .upload(&endpoint, Payload::new(&[], None), "tok")
        .unwrap_err();
    assert!(matches!(err, Error::CaptureFailed(_)));
    assert!(client.last_http_status().is_none());
}
