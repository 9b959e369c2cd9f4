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

use serde_json::json;

use opal::{OpalRequest, OpalResponse, OpalStatus};

fn request() -> OpalRequest {
    OpalRequest::builder()
        .target("general")
        .operation("echo")
        .txn_id("txn-1")
        .build()
        .unwrap()
}

#[test]
fn test_begin_captures_txn_and_empty_data() {
    let response = OpalResponse::begin(&request());
    assert_eq!(response.txn_id(), "txn-1");
    assert_eq!(response.status(), None);
    assert_eq!(response.data(), &json!([]));
    assert!(response.data_is_empty());
}

#[test]
fn test_complete_promotes_unset_status() {
    let mut response = OpalResponse::begin(&request());
    response.complete(None);
    assert_eq!(response.status(), Some(OpalStatus::Complete));
    let duration = response.duration().unwrap();
    assert!(duration >= 0.0);
}

#[test]
fn test_complete_promotes_in_progress_status() {
    let mut response = OpalResponse::begin(&request());
    response.set_status(OpalStatus::InProgress);
    response.complete(None);
    assert_eq!(response.status(), Some(OpalStatus::Complete));
}

#[test]
fn test_complete_never_clobbers_error() {
    let mut response = OpalResponse::begin(&request());
    response.error("boom");
    response.complete(None);
    assert_eq!(response.status(), Some(OpalStatus::Error));
}

#[test]
fn test_complete_with_explicit_state() {
    let mut response = OpalResponse::begin(&request());
    response.complete(Some(OpalStatus::Error));
    assert_eq!(response.status(), Some(OpalStatus::Error));
}

#[test]
fn test_error_wraps_cause_as_fragment() {
    let mut response = OpalResponse::begin(&request());
    response.set_data(json!(["partial"]));
    response.error("it broke");

    assert_eq!(response.status(), Some(OpalStatus::Error));
    assert_eq!(response.data(), &json!([{"data": "it broke"}]));
}

#[test]
fn test_exception_wraps_trace_fragment() {
    let mut response = OpalResponse::begin(&request());
    response.exception("trace text");
    assert_eq!(response.status(), Some(OpalStatus::Error));
    assert_eq!(response.data(), &json!([{"stack_trace": "trace text"}]));
}

#[test]
fn test_duration_is_end_minus_start() {
    let mut response = OpalResponse::begin(&request());
    std::thread::sleep(std::time::Duration::from_millis(20));
    response.complete(None);
    let duration = response.duration().unwrap();
    assert!(duration >= 0.02, "duration was {}", duration);
    assert!(duration < 10.0);
}

#[test]
fn test_progress_replaces_previous_block() {
    let mut response = OpalResponse::begin(&request());
    response.set_progress(30.0);
    response.set_progress(60.0);
    assert_eq!(response.percent_complete(), Some(60.0));
}

#[test]
fn test_wire_shape_field_names() {
    let mut response = OpalResponse::begin(&request());
    response.set_progress(50.0);
    response.set_status(OpalStatus::InProgress);
    response.set_polling_interval(5.0);

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["status"], json!("in-progress"));
    assert_eq!(value["txn_id"], json!("txn-1"));
    assert_eq!(value["progress"]["percentComplete"], json!(50.0));
    assert_eq!(value["polling_interval"], json!(5.0));
    assert!(value.get("starttime").is_some());
}

#[test]
fn test_display_mentions_status_and_txn() {
    let mut response = OpalResponse::begin(&request());
    response.complete(None);
    let rendered = response.to_string();
    assert!(rendered.contains("STATUS:complete"));
    assert!(rendered.contains("TXN:txn-1"));
}
