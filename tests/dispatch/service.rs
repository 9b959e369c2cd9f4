//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Opal.
//! The Opal project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

#[path = "../support/mod.rs"]
mod support;

use std::time::Duration;

use serde_json::json;

use opal::{snapshot_status, OpalRequest, OpalStatus};
use support::{dispatcher, error_message, wait_for_terminal};

fn request(target: &str, operation: &str) -> OpalRequest {
    OpalRequest::builder()
        .target(target)
        .operation(operation)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_short_handler_runs_to_completion() {
    let dispatcher = dispatcher();
    let reply = dispatcher.spawn_service(request("general", "null")).await;

    assert_eq!(reply.status(), Some(OpalStatus::Complete));
    assert_eq!(reply.percent_complete(), Some(100.0));
    assert_eq!(reply.data(), &json!([]));
}

#[tokio::test]
async fn test_short_handler_return_value_becomes_data() {
    let dispatcher = dispatcher();
    let req = OpalRequest::builder()
        .target("general")
        .operation("echo")
        .data(json!({"message": "hello"}))
        .build()
        .unwrap();
    let reply = dispatcher.spawn_service(req).await;

    assert_eq!(reply.status(), Some(OpalStatus::Complete));
    assert_eq!(reply.data(), &json!("hello"));
}

#[tokio::test]
async fn test_handler_populated_data_is_not_overwritten() {
    let dispatcher = dispatcher();
    let reply = dispatcher
        .spawn_service(request("expose", "data_in_response"))
        .await;

    assert_eq!(reply.status(), Some(OpalStatus::Complete));
    assert_eq!(reply.data(), &json!("blah"));
}

#[tokio::test]
async fn test_handler_failure_never_escapes_spawn_service() {
    let dispatcher = dispatcher();
    let reply = dispatcher
        .spawn_service(request("general", "failhandle"))
        .await;

    assert_eq!(reply.status(), Some(OpalStatus::Error));
    assert_eq!(
        error_message(reply.data()),
        "Intentional exception in handle"
    );
}

#[tokio::test]
async fn test_unsupported_operation_reported_by_name() {
    let dispatcher = dispatcher();
    let reply = dispatcher.spawn_service(request("general", "bogus")).await;

    assert_eq!(reply.status(), Some(OpalStatus::Error));
    let message = error_message(reply.data());
    assert!(
        message.contains("Unsupported operation: bogus"),
        "message was {:?}",
        message
    );
}

#[tokio::test]
async fn test_unknown_target_reported_as_error_envelope() {
    let dispatcher = dispatcher();
    let reply = dispatcher.spawn_service(request("nonesuch", "null")).await;

    assert_eq!(reply.status(), Some(OpalStatus::Error));
    let message = error_message(reply.data());
    assert!(message.contains("Unknown target"), "message was {:?}", message);
}

#[tokio::test]
async fn test_missing_operation_and_action_rejected() {
    let dispatcher = dispatcher();
    let req = OpalRequest::builder()
        .target("general")
        .field("payload", json!(1))
        .build()
        .unwrap();
    let reply = dispatcher.spawn_service(req).await;

    assert_eq!(reply.status(), Some(OpalStatus::Error));
    let message = error_message(reply.data());
    assert!(
        message.contains("Operation and action missing"),
        "message was {:?}",
        message
    );
}

#[tokio::test]
async fn test_action_only_dispatch() {
    let dispatcher = dispatcher();
    let req = OpalRequest::builder()
        .target("expose")
        .action("act")
        .build()
        .unwrap();
    let reply = dispatcher.spawn_service(req).await;

    assert_eq!(reply.status(), Some(OpalStatus::Complete));
    assert_eq!(reply.data(), &json!("action"));
}

#[tokio::test]
async fn test_single_candidate_dispatch_ignores_action() {
    let dispatcher = dispatcher();
    let req = OpalRequest::builder()
        .target("expose")
        .operation("valid_op")
        .action("NO-SUCH-VERB")
        .build()
        .unwrap();
    let reply = dispatcher.spawn_service(req).await;

    assert_eq!(reply.status(), Some(OpalStatus::Complete));
    assert_eq!(reply.data(), &json!("ok"));
}

#[tokio::test]
async fn test_multi_alias_dispatch() {
    let dispatcher = dispatcher();
    for operation in ["op1", "op2"] {
        let reply = dispatcher.spawn_service(request("expose", operation)).await;
        assert_eq!(reply.data(), &json!("multi"), "alias {}", operation);
    }
}

#[tokio::test]
async fn test_long_handler_two_phase_protocol() {
    let dispatcher = dispatcher();
    let req = OpalRequest::builder()
        .target("general")
        .operation("progress")
        .data(json!({"num_pauses": 5, "pause_sec": 0.05}))
        .build()
        .unwrap();
    let reply = dispatcher.spawn_service(req).await;

    // Immediate reply: in progress, nothing done yet, poll interval from
    // the validation pass.
    assert_eq!(reply.status(), Some(OpalStatus::InProgress));
    assert_eq!(reply.percent_complete(), Some(0.0));
    assert_eq!(reply.polling_interval(), Some(0.05));

    let snapshot = wait_for_terminal(&dispatcher, reply.txn_id()).await;
    assert_eq!(snapshot_status(&snapshot), "complete");
    assert_eq!(snapshot["progress"]["percentComplete"], json!(100.0));
}

#[tokio::test]
async fn test_long_operation_passes_through_intermediate_progress() {
    let dispatcher = dispatcher();
    let req = OpalRequest::builder()
        .target("general")
        .operation("progress")
        .data(json!({"num_pauses": 5, "pause_sec": 0.1}))
        .build()
        .unwrap();
    let reply = dispatcher.spawn_service(req).await;
    let txn_id = reply.txn_id().to_string();

    let mut observed = Vec::new();
    for _ in 0..500 {
        let snapshot = dispatcher.job_status(&txn_id);
        if let Some(pct) = snapshot["progress"]["percentComplete"].as_f64() {
            observed.push(pct);
        }
        if snapshot_status(&snapshot) == "complete" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(observed.last().copied(), Some(100.0));
    assert!(
        observed.iter().any(|pct| *pct > 0.0 && *pct < 100.0),
        "no intermediate progress seen in {:?}",
        observed
    );
}

#[tokio::test]
async fn test_single_phase_long_handler_gets_default_interval() {
    let dispatcher = dispatcher();
    let req = OpalRequest::builder()
        .target("general")
        .operation("echo_slow")
        .data(json!({"message": "later"}))
        .build()
        .unwrap();
    let reply = dispatcher.spawn_service(req).await;

    assert_eq!(reply.status(), Some(OpalStatus::InProgress));
    assert_eq!(reply.polling_interval(), Some(10.0));

    let snapshot = wait_for_terminal(&dispatcher, reply.txn_id()).await;
    assert_eq!(snapshot_status(&snapshot), "complete");
    assert_eq!(snapshot["data"], json!("later"));
    assert_eq!(snapshot["progress"]["percentComplete"], json!(100.0));
}

#[tokio::test]
async fn test_long_handler_error_in_complete_is_persisted() {
    let dispatcher = dispatcher();
    let reply = dispatcher
        .spawn_service(request("general", "failcomplete"))
        .await;
    assert_eq!(reply.status(), Some(OpalStatus::InProgress));

    let snapshot = wait_for_terminal(&dispatcher, reply.txn_id()).await;
    assert_eq!(snapshot_status(&snapshot), "error");
    assert_eq!(
        snapshot["data"][0]["data"],
        json!("Intentional exception in complete")
    );
}

#[tokio::test]
async fn test_long_handler_returning_error_response_keeps_error() {
    let dispatcher = dispatcher();
    let reply = dispatcher
        .spawn_service(request("general", "errorcomplete"))
        .await;

    let snapshot = wait_for_terminal(&dispatcher, reply.txn_id()).await;
    assert_eq!(snapshot_status(&snapshot), "error");
    assert_eq!(snapshot["data"][0]["data"], json!("some error happened"));
}

#[tokio::test]
async fn test_slow_op_runs_once_in_complete_phase() {
    let dispatcher = dispatcher();
    let reply = dispatcher.spawn_service(request("expose", "slow_op")).await;
    assert_eq!(reply.status(), Some(OpalStatus::InProgress));

    let snapshot = wait_for_terminal(&dispatcher, reply.txn_id()).await;
    assert_eq!(snapshot_status(&snapshot), "complete");
    assert_eq!(snapshot["progress"]["percentComplete"], json!(100.0));
}
