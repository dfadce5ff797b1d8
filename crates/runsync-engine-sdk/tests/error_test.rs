// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error type tests for runsync-engine-sdk.

use runsync_engine_sdk::SdkError;

#[test]
fn test_config_error_display() {
    let err = SdkError::Config("bad url".to_string());
    assert!(err.to_string().contains("configuration error"));
    assert!(err.to_string().contains("bad url"));
}

#[test]
fn test_timeout_error_display() {
    let err = SdkError::Timeout(15000);
    assert!(err.to_string().contains("timed out"));
    assert!(err.to_string().contains("15000"));
}

#[test]
fn test_not_found_is_distinguishable() {
    let err = SdkError::NotFound("projects/p/executions/e".to_string());
    assert!(err.is_not_found());
    assert!(!err.is_access_denied());
    assert!(err.to_string().contains("execution not found"));
}

#[test]
fn test_access_denied_is_distinguishable() {
    let err = SdkError::AccessDenied {
        status: 403,
        message: "caller lacks workflows.executions.get".to_string(),
    };
    assert!(err.is_access_denied());
    assert!(!err.is_not_found());
    let display = err.to_string();
    assert!(display.contains("403"));
    assert!(display.contains("workflows.executions.get"));
}

#[test]
fn test_server_error_is_neither() {
    let err = SdkError::Server {
        status: 500,
        message: "Internal error".to_string(),
    };
    assert!(!err.is_not_found());
    assert!(!err.is_access_denied());
    assert!(err.to_string().contains("server error"));
}

#[test]
fn test_from_serde_json_error() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: SdkError = json_err.into();
    assert!(matches!(err, SdkError::Serialization(_)));
}
