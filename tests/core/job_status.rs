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

use std::time::Duration;

use serde_json::json;

use opal::{
    snapshot_status, OpalJobStore, OpalMemoryJobStore, OpalRequest, OpalResponse, OpalStatus,
};

fn response(txn_id: &str) -> OpalResponse {
    let request = OpalRequest::builder()
        .target("general")
        .operation("echo")
        .txn_id(txn_id)
        .build()
        .unwrap();
    OpalResponse::begin(&request)
}

#[test]
fn test_update_then_get_round_trips_snapshot() {
    let store = OpalMemoryJobStore::new();
    let mut resp = response("txn-1");
    resp.set_progress(40.0);
    resp.set_status(OpalStatus::InProgress);
    store.update("txn-1", &resp);

    let snapshot = store.get("txn-1");
    assert_eq!(snapshot_status(&snapshot), "in-progress");
    assert_eq!(snapshot["progress"]["percentComplete"], json!(40.0));
    assert_eq!(snapshot["txn_id"], json!("txn-1"));
}

#[test]
fn test_get_unknown_txn_reads_not_found() {
    let store = OpalMemoryJobStore::new();
    let snapshot = store.get("nonesuch");
    assert_eq!(snapshot, json!({"status": "not_found"}));
}

#[test]
fn test_last_write_wins_per_key() {
    let store = OpalMemoryJobStore::new();
    let mut resp = response("txn-1");
    resp.set_progress(10.0);
    store.update("txn-1", &resp);
    resp.set_progress(90.0);
    resp.complete(None);
    store.update("txn-1", &resp);

    let snapshot = store.get("txn-1");
    assert_eq!(snapshot_status(&snapshot), "complete");
    assert_eq!(snapshot["progress"]["percentComplete"], json!(90.0));
}

#[test]
fn test_entries_age_out_after_retention_window() {
    let store = OpalMemoryJobStore::with_retention(Duration::from_millis(20));
    store.update("txn-1", &response("txn-1"));
    assert_eq!(snapshot_status(&store.get("txn-1")), "");

    std::thread::sleep(Duration::from_millis(40));
    let snapshot = store.get("txn-1");
    assert_eq!(snapshot_status(&snapshot), "not_found");
}

#[test]
fn test_retention_spares_fresh_entries() {
    let store = OpalMemoryJobStore::with_retention(Duration::from_secs(60));
    store.update("txn-1", &response("txn-1"));
    std::thread::sleep(Duration::from_millis(20));
    assert_ne!(snapshot_status(&store.get("txn-1")), "not_found");
}

#[test]
fn test_entries_are_independent_per_txn() {
    let store = OpalMemoryJobStore::new();
    let mut one = response("txn-1");
    one.complete(None);
    let mut two = response("txn-2");
    two.error("broken");
    store.update("txn-1", &one);
    store.update("txn-2", &two);

    assert_eq!(snapshot_status(&store.get("txn-1")), "complete");
    assert_eq!(snapshot_status(&store.get("txn-2")), "error");
}
