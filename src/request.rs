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

//! # Opal Request Envelope
//!
//! The canonical request structure every inbound payload and every derived
//! inter-plugin call is normalized into. A request holds a fixed set of
//! reserved fields (target, action, txn_id, region, auth_token, language,
//! data) plus an open map of operation-specific fields.
//!
//! Historically callers have supplied their parameters in three shapes:
//! directly at the top level, nested under a `data` map, and doubly nested
//! under `data.data`. To keep both old UIs and old plugins working, every
//! non-reserved field is populated both at the top level and inside the
//! `data` map. That mirroring happens once, as part of construction — a
//! built envelope is never resynchronized, and derived calls build a fresh
//! envelope rather than mutating one in place.
//!
//! ## Construction
//!
//! Envelopes are built in one of two ways:
//! 1. From a raw wire payload via [`OpalRequest::from_value`] — the external
//!    API path.
//! 2. Programmatically via [`OpalRequest::builder`] — tests and
//!    inter-plugin calls.
//!
//! Explicit builder arguments always win over values inherited from a
//! source envelope.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::api;
use crate::errors::{OpalError, Result};
use crate::util;

/// Canonical request envelope with reserved fields and an open extension
/// map. The extension map is flattened to the top level on the wire.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OpalRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    txn_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    data: Map<String, Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl OpalRequest {
    fn empty() -> Self {
        OpalRequest {
            target: None,
            action: None,
            txn_id: String::new(),
            region: None,
            auth_token: None,
            language: None,
            data: Map::new(),
            extra: Map::new(),
        }
    }

    /// Starts a programmatic envelope construction.
    pub fn builder() -> OpalRequestBuilder {
        OpalRequestBuilder::new()
    }

    /// Builds an envelope from a raw wire payload, running the full
    /// construction transform (data merge, operation placement, two-way
    /// mirroring, validation, txn synthesis).
    pub fn from_value(value: Value) -> Result<OpalRequest> {
        let obj = match value {
            Value::Object(obj) => obj,
            _ => {
                return Err(OpalError::invalid_request(
                    "Request payload must be a JSON object",
                ))
            }
        };
        let mut builder = OpalRequestBuilder::new();
        for (key, value) in obj {
            builder = builder.field(key, value);
        }
        builder.build()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn txn_id(&self) -> &str {
        &self.txn_id
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// The handler-selecting operation name, carried at `data.operation`.
    pub fn operation(&self) -> Option<&str> {
        self.data.get(api::OPERATION).and_then(Value::as_str)
    }

    /// The nested operation payload.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Top-level extension fields (the mirrored, non-reserved keys).
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Operation payload with the `operation` and `version` bookkeeping
    /// entries filtered out.
    pub fn get_data(&self) -> Map<String, Value> {
        self.extra
            .iter()
            .filter(|(key, _)| key.as_str() != api::OPERATION && key.as_str() != api::VERSION)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// A poll for the status of an earlier long-running request, rather
    /// than a fresh operation.
    pub fn is_job_status_request(&self) -> bool {
        self.extra
            .get(api::JOB_STATUS_REQUEST)
            .map(util::truthy)
            .unwrap_or(false)
    }

    pub fn is_service_request(&self) -> bool {
        !self.is_job_status_request()
    }

    /// Suggested poll interval carried by the request, if any.
    pub fn polling_interval(&self) -> Option<f64> {
        self.extra.get(api::POLLING_INTERVAL).and_then(Value::as_f64)
    }

    fn verify(&self) -> Result<()> {
        if self.target.is_none()
            && self.action.is_none()
            && self.region.is_none()
            && self.auth_token.is_none()
            && self.language.is_none()
            && self.txn_id.is_empty()
            && self.data.is_empty()
            && self.extra.is_empty()
        {
            return Err(OpalError::invalid_request("No request"));
        }

        // txn_id is required when requesting a job status update
        if self.is_job_status_request() && self.txn_id.is_empty() {
            return Err(OpalError::invalid_request("No txn_id"));
        }

        Ok(())
    }

    fn insert_top_level(&mut self, key: String, value: Value) {
        match key.as_str() {
            api::TARGET => self.target = value_as_string(value),
            api::ACTION => self.action = value_as_string(value),
            api::TXN_ID => {
                if let Some(txn_id) = value_as_string(value) {
                    self.txn_id = txn_id;
                }
            }
            api::REGION => self.region = value_as_string(value),
            api::AUTH_TOKEN => self.auth_token = value_as_string(value),
            api::LANGUAGE => self.language = value_as_string(value),
            api::DATA => {
                if let Value::Object(map) = value {
                    self.data.extend(map);
                }
            }
            _ => {
                self.extra.insert(key, value);
            }
        }
    }
}

fn value_as_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

impl fmt::Display for OpalRequest {
    /// Log rendering: target, action and the operation payload with secret
    /// values masked.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(target) = &self.target {
            write!(f, "TARGET:{} ", target)?;
        }
        if self.is_job_status_request() {
            write!(f, "STATUS_REQUEST ")?;
        }
        if let Some(action) = &self.action {
            write!(f, "ACTION:{} ", action)?;
        }

        if let Value::Object(data) = util::scrub_secrets(&Value::Object(self.data.clone())) {
            if let Some(op) = data.get(api::OPERATION) {
                write!(f, "OPERATION:{} ", util::value_to_string(op))?;
            }
            let mut keys: Vec<&String> = data.keys().collect();
            keys.sort();
            let fragments: Vec<String> = keys
                .iter()
                .filter(|key| key.as_str() != api::OPERATION)
                .map(|key| format!("{}:{}", key, util::value_to_string(&data[key.as_str()])))
                .collect();
            write!(f, "DATA:{{{}}} ", fragments.join(","))?;
        }

        write!(f, "TXN:{}", self.txn_id)
    }
}

/// Builder implementing the envelope construction transform.
///
/// Values are applied in priority order: open fields and the source
/// envelope seed the result, a `data` argument merges into the nested map,
/// the operation is placed at `data.operation`, non-reserved keys are
/// mirrored both ways, and the explicit named arguments are applied last
/// so they always win.
#[derive(Clone, Debug, Default)]
pub struct OpalRequestBuilder {
    base: Option<OpalRequest>,
    target: Option<String>,
    auth_token: Option<String>,
    operation: Option<String>,
    action: Option<String>,
    data: Option<Value>,
    txn_id: Option<String>,
    region: Option<String>,
    language: Option<String>,
    fields: Vec<(String, Value)>,
}

impl OpalRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the envelope from an existing request, as when one plugin
    /// derives a call to another.
    pub fn base(mut self, request: OpalRequest) -> Self {
        self.base = Some(request);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.auth_token = Some(auth_token.into());
        self
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Merges an object payload into the nested `data` map. Non-object
    /// values are ignored.
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn txn_id(mut self, txn_id: impl Into<String>) -> Self {
        self.txn_id = Some(txn_id.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Adds one open field at the top level of the envelope. Reserved keys
    /// are routed to their typed slots.
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    /// Runs the construction transform and validates the result.
    pub fn build(self) -> Result<OpalRequest> {
        let mut req = self.base.unwrap_or_else(OpalRequest::empty);

        for (key, value) in self.fields {
            req.insert_top_level(key, value);
        }

        if let Some(target) = self.target {
            req.target = Some(target);
        }

        if let Some(Value::Object(data)) = self.data {
            req.data.extend(data);
        }

        // Reserved keys never live inside the data map, whatever the wire
        // payload claimed.
        req.data.retain(|key, _| !api::is_reserved(key));

        // The operation may arrive as an explicit argument (inter-plugin
        // calls), at the top level (newer callers) or already nested at
        // data.operation (older UIs); it always ends up at data.operation.
        let operation = self
            .operation
            .or_else(|| {
                req.extra
                    .get(api::OPERATION)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .or_else(|| {
                req.data
                    .get(api::OPERATION)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
        if let Some(op) = operation {
            req.data.insert(api::OPERATION.to_string(), Value::String(op));
        }

        // Two-way mirroring for backward compatibility: older callers read
        // nested fields at the top level, older plugins read top-level
        // fields out of the data map. One pass in each direction.
        for (key, value) in req.data.clone() {
            if !api::is_reserved(&key) && !req.extra.contains_key(&key) {
                req.extra.insert(key, value);
            }
        }
        for (key, value) in req.extra.clone() {
            if !api::is_reserved(&key) && !req.data.contains_key(&key) {
                req.data.insert(key, value);
            }
        }

        // Explicit named arguments win over anything inherited
        if let Some(action) = self.action {
            req.action = Some(action);
        }
        if let Some(auth_token) = self.auth_token {
            req.auth_token = Some(auth_token);
        }
        if let Some(txn_id) = self.txn_id {
            req.txn_id = txn_id;
        }
        if let Some(region) = self.region {
            req.region = Some(region);
        }
        if let Some(language) = self.language {
            req.language = Some(language);
        }

        req.verify()?;

        if req.txn_id.is_empty() {
            req.txn_id = util::new_txn_id(None);
        }

        Ok(req)
    }
}
