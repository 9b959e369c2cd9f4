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

//! # Opal Response Envelope
//!
//! The response structure accumulated while a plugin actor services a
//! request, persisted to the job-status store for long-running operations,
//! and returned to the caller. Status transitions are monotone toward the
//! terminal states: `complete()` only promotes an unset or in-progress
//! status, and never overwrites an error a handler recorded explicitly.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::api;
use crate::request::OpalRequest;

/// Lifecycle status of a serviced request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpalStatus {
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "error")]
    Error,
    /// Read-side only: the job store has no snapshot for the transaction.
    #[serde(rename = "not_found")]
    NotFound,
}

impl OpalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpalStatus::InProgress => api::STATUS_INPROGRESS,
            OpalStatus::Complete => api::STATUS_COMPLETE,
            OpalStatus::Error => api::STATUS_ERROR,
            OpalStatus::NotFound => api::STATUS_NOT_FOUND,
        }
    }
}

impl fmt::Display for OpalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percent-complete plus any extra progress fields a handler attaches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpalProgress {
    #[serde(rename = "percentComplete")]
    pub percent_complete: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OpalProgress {
    pub fn new(percent_complete: f64) -> Self {
        OpalProgress {
            percent_complete,
            extra: Map::new(),
        }
    }
}

/// Response envelope for one serviced request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpalResponse {
    #[serde(rename = "starttime")]
    start_time: f64,
    #[serde(rename = "endtime", default, skip_serializing_if = "Option::is_none")]
    end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<OpalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    progress: Option<OpalProgress>,
    data: Value,
    txn_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    polling_interval: Option<f64>,
}

impl OpalResponse {
    /// Opens a response for the given request: captures the start time and
    /// transaction id, and initializes an empty result list.
    pub fn begin(request: &OpalRequest) -> Self {
        OpalResponse {
            start_time: now(),
            end_time: None,
            duration: None,
            status: None,
            progress: None,
            data: json!([]),
            txn_id: request.txn_id().to_string(),
            polling_interval: None,
        }
    }

    pub fn txn_id(&self) -> &str {
        &self.txn_id
    }

    pub fn status(&self) -> Option<OpalStatus> {
        self.status
    }

    pub fn set_status(&mut self, status: OpalStatus) {
        self.status = Some(status);
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn set_data(&mut self, data: Value) {
        self.data = data;
    }

    /// True when no handler has populated the data field yet: a missing,
    /// null or empty value.
    pub fn data_is_empty(&self) -> bool {
        match &self.data {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn progress(&self) -> Option<&OpalProgress> {
        self.progress.as_ref()
    }

    pub fn percent_complete(&self) -> Option<f64> {
        self.progress.as_ref().map(|p| p.percent_complete)
    }

    /// Replaces the progress block with the given percent-complete.
    pub fn set_progress(&mut self, percent_complete: f64) {
        self.progress = Some(OpalProgress::new(percent_complete));
    }

    pub fn polling_interval(&self) -> Option<f64> {
        self.polling_interval
    }

    pub fn set_polling_interval(&mut self, secs: f64) {
        self.polling_interval = Some(secs);
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Records the end time and duration, and settles the status. An
    /// explicit state is taken as given; otherwise an unset or in-progress
    /// status advances to complete, and a terminal status is left alone.
    pub fn complete(&mut self, state: Option<OpalStatus>) {
        let end = now();
        self.end_time = Some(end);
        self.duration = Some(end - self.start_time);

        match state {
            Some(state) => self.status = Some(state),
            None => {
                if self.status.is_none() || self.status == Some(OpalStatus::InProgress) {
                    self.status = Some(OpalStatus::Complete);
                }
            }
        }
    }

    /// Converts the response into a terminal error wrapping `cause` as the
    /// single data fragment. Returns `&mut self` so the result can be
    /// persisted in one expression.
    pub fn error(&mut self, cause: impl Into<Value>) -> &mut Self {
        self.status = Some(OpalStatus::Error);
        self.data = json!([{ api::DATA: cause.into() }]);
        self
    }

    /// Like [`error`](Self::error), but wraps a failure trace marker
    /// instead of a plain cause.
    pub fn exception(&mut self, trace: impl Into<String>) -> &mut Self {
        self.status = Some(OpalStatus::Error);
        self.data = json!([{ api::STACK_TRACE: trace.into() }]);
        self
    }
}

impl fmt::Display for OpalResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = &self.status {
            write!(f, "STATUS:{} ", status)?;
        }
        write!(f, "TXN:{} ", self.txn_id)?;
        if let Some(duration) = self.duration {
            write!(f, "DURATION:{:.0} ", duration)?;
        }
        if let Some(progress) = &self.progress {
            write!(f, "PROGRESS:{} ", progress.percent_complete)?;
        }
        Ok(())
    }
}

/// Wall-clock time in epoch seconds.
fn now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
