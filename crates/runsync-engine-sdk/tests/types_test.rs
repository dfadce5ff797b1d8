// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deserialization tests for execution payloads.

use chrono::{TimeZone, Utc};
use runsync_engine_sdk::{Execution, ExecutionState};

#[test]
fn test_execution_state_from_engine_strings() {
    let cases = [
        ("\"ACTIVE\"", ExecutionState::Active),
        ("\"SUCCEEDED\"", ExecutionState::Succeeded),
        ("\"FAILED\"", ExecutionState::Failed),
        ("\"CANCELLED\"", ExecutionState::Cancelled),
        ("\"QUEUED\"", ExecutionState::Queued),
        ("\"UNAVAILABLE\"", ExecutionState::Unavailable),
        ("\"STATE_UNSPECIFIED\"", ExecutionState::Unspecified),
        ("\"SOMETHING_NEW\"", ExecutionState::Unspecified),
    ];

    for (json, expected) in cases {
        let state: ExecutionState = serde_json::from_str(json).unwrap();
        assert_eq!(state, expected, "parsing {}", json);
    }
}

#[test]
fn test_terminal_states() {
    assert!(ExecutionState::Succeeded.is_terminal());
    assert!(ExecutionState::Failed.is_terminal());
    assert!(ExecutionState::Cancelled.is_terminal());
    assert!(!ExecutionState::Active.is_terminal());
    assert!(!ExecutionState::Queued.is_terminal());
    assert!(!ExecutionState::Unspecified.is_terminal());
}

#[test]
fn test_succeeded_execution() {
    let json = r#"{
        "name": "projects/p/locations/us-central1/workflows/story/executions/9f1c",
        "startTime": "2025-03-01T10:00:00.123456Z",
        "endTime": "2025-03-01T10:04:30Z",
        "state": "SUCCEEDED",
        "argument": "{\"storyId\":\"s-1\"}",
        "result": "{\"pages\":12}",
        "workflowRevisionId": "000007-abc"
    }"#;

    let execution: Execution = serde_json::from_str(json).unwrap();
    assert_eq!(execution.state, ExecutionState::Succeeded);
    assert_eq!(execution.execution_id(), "9f1c");
    assert_eq!(
        execution.end_time,
        Some(Utc.with_ymd_and_hms(2025, 3, 1, 10, 4, 30).unwrap())
    );
    assert!(execution.start_time.is_some());
    assert_eq!(execution.result.as_deref(), Some("{\"pages\":12}"));
    assert!(execution.error.is_none());
}

#[test]
fn test_failed_execution_carries_error() {
    let json = r#"{
        "name": "projects/p/locations/l/workflows/w/executions/e2",
        "state": "FAILED",
        "error": {
            "payload": "{\"message\":\"image generation quota exceeded\"}",
            "context": "step: generate_illustrations"
        }
    }"#;

    let execution: Execution = serde_json::from_str(json).unwrap();
    assert_eq!(execution.state, ExecutionState::Failed);
    let error = execution.error.expect("error details");
    assert!(error.payload.unwrap().contains("quota exceeded"));
    assert_eq!(error.context.as_deref(), Some("step: generate_illustrations"));
}

#[test]
fn test_missing_state_defaults_to_unspecified() {
    let execution: Execution = serde_json::from_str(r#"{"name":"x/executions/e3"}"#).unwrap();
    assert_eq!(execution.state, ExecutionState::Unspecified);
    assert!(execution.start_time.is_none());
}
