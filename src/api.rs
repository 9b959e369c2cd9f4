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

//! # Opal Wire Constants
//!
//! Key names and status values shared by the request/response envelopes,
//! the job-status store and the dispatch core. Everything that crosses the
//! wire is spelled exactly once, here.

/// Plugin-selecting field of a request.
pub const TARGET: &str = "target";
/// Verb hint (GET/PUT/POST/DELETE/...).
pub const ACTION: &str = "action";
/// Correlation identifier for a request and its follow-ups.
pub const TXN_ID: &str = "txn_id";
/// Restricts backend calls to one region.
pub const REGION: &str = "region";
/// Credential passed through to backend calls.
pub const AUTH_TOKEN: &str = "auth_token";
/// Nested operation-specific payload.
pub const DATA: &str = "data";
/// Drives localized error text.
pub const LANGUAGE: &str = "language";

/// Handler-selecting field, carried inside `data`.
pub const OPERATION: &str = "operation";
/// Optional API version requested by the caller, carried inside `data`.
pub const VERSION: &str = "version";
/// Marks a follow-up poll for an earlier long-running request.
pub const JOB_STATUS_REQUEST: &str = "job_status_request";

pub const STATUS: &str = "status";
pub const PROGRESS: &str = "progress";
pub const PERCENT_COMPLETE: &str = "percentComplete";
pub const POLLING_INTERVAL: &str = "polling_interval";
pub const STARTTIME: &str = "starttime";
pub const ENDTIME: &str = "endtime";
pub const DURATION: &str = "duration";
pub const STACK_TRACE: &str = "stack_trace";

pub const STATUS_INPROGRESS: &str = "in-progress";
pub const STATUS_COMPLETE: &str = "complete";
pub const STATUS_ERROR: &str = "error";
/// Read-side status for a transaction the store has no snapshot for.
pub const STATUS_NOT_FOUND: &str = "not_found";

/// Keys that live only at the top level of a request envelope and are never
/// mirrored into the nested `data` map.
pub const RESERVED: &[&str] = &[TARGET, ACTION, TXN_ID, REGION, AUTH_TOKEN, DATA, LANGUAGE];

/// Seconds between polls of a long-running operation, unless the operation's
/// validation pass suggests otherwise.
pub const DEFAULT_POLLING_INTERVAL: f64 = 10.0;

/// Returns true when `key` may not be mirrored between the top level of a
/// request and its `data` map.
pub fn is_reserved(key: &str) -> bool {
    RESERVED.contains(&key)
}
