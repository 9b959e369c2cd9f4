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

//! # Opal Job Status Store
//!
//! Key-value store of transaction id to the latest response-envelope
//! snapshot. Long-running operations write a snapshot on every progress
//! update; pollers read them back until a terminal status appears. Entries
//! expire after a fixed retention window regardless of completion, as a
//! safety net against orphaned transactions.
//!
//! Semantics are last-write-wins per key, with exactly one actor owning
//! the writes for a given transaction id. Readers must tolerate an entry
//! that is not there yet (or already pruned): that reads as the
//! distinguished `not_found` status.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::api;
use crate::response::OpalResponse;

/// External interface to the job-status store. Any backing implementation
/// satisfying these two operations is acceptable.
pub trait OpalJobStore: Send + Sync {
    /// Stores `response` as the latest snapshot for `txn_id`, replacing any
    /// previous one.
    fn update(&self, txn_id: &str, response: &OpalResponse);

    /// Returns the latest snapshot for `txn_id`, or a `not_found` status
    /// value when none is stored.
    fn get(&self, txn_id: &str) -> Value;
}

/// The value returned for transactions the store knows nothing about.
pub fn not_found() -> Value {
    json!({ api::STATUS: api::STATUS_NOT_FOUND })
}

/// Status string of a stored snapshot, empty when absent.
pub fn snapshot_status(snapshot: &Value) -> &str {
    snapshot
        .get(api::STATUS)
        .and_then(Value::as_str)
        .unwrap_or("")
}

struct StoreEntry {
    updated_at: Instant,
    snapshot: Value,
}

/// In-memory implementation of [`OpalJobStore`], suitable for single-node
/// deployments and as the injectable double in tests. Expired entries are
/// pruned on access rather than by a background sweeper.
pub struct OpalMemoryJobStore {
    retention: Duration,
    entries: Mutex<HashMap<String, StoreEntry>>,
}

impl OpalMemoryJobStore {
    /// Store with the default one-day retention window.
    pub fn new() -> Self {
        Self::with_retention(Duration::from_secs(24 * 60 * 60))
    }

    pub fn with_retention(retention: Duration) -> Self {
        OpalMemoryJobStore {
            retention,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn prune(&self, entries: &mut HashMap<String, StoreEntry>) {
        entries.retain(|_, entry| entry.updated_at.elapsed() < self.retention);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoreEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for OpalMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OpalJobStore for OpalMemoryJobStore {
    fn update(&self, txn_id: &str, response: &OpalResponse) {
        let snapshot = match serde_json::to_value(response) {
            Ok(value) => value,
            Err(_) => Value::String(response.to_string()),
        };
        let mut entries = self.lock();
        self.prune(&mut entries);
        entries.insert(
            txn_id.to_string(),
            StoreEntry {
                updated_at: Instant::now(),
                snapshot,
            },
        );
    }

    fn get(&self, txn_id: &str) -> Value {
        let mut entries = self.lock();
        self.prune(&mut entries);
        entries
            .get(txn_id)
            .map(|entry| entry.snapshot.clone())
            .unwrap_or_else(not_found)
    }
}
