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

//! # Opal Plugin Actor
//!
//! The unit of execution for one request. Each dispatched request gets its
//! own service instance — a plugin struct wrapping an [`OpalServiceBase`] —
//! which owns the request/response pair for its lifetime. State is never
//! shared between concurrent requests except through the job-status store.
//!
//! A request is serviced in up to two phases:
//!
//! 1. **handle** runs inline with the dispatcher call and must return
//!    quickly. Short operations run to completion here; long-running ones
//!    run their validation pass, persist an in-progress snapshot and return
//!    immediately.
//! 2. **complete** runs detached, after handle has returned. Long-running
//!    handlers do their real work here, publishing progress to the
//!    job-status store until the terminal snapshot is written.
//!
//! Plugins normally declare their operations in a registry table and let
//! the default `handle`/`complete` bodies drive dispatch; both methods can
//! be overridden outright for plugins that need their own protocol.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api;
use crate::dispatch::{self, OpalShared};
use crate::errors::{OpalError, Result};
use crate::registry::{resolve, OpalHandler, OpalLongReply, OpalOperation};
use crate::request::OpalRequest;
use crate::response::{OpalResponse, OpalStatus};
use crate::job_status::snapshot_status;
use crate::util;

/// Per-request actor state owned by every plugin instance: the request
/// being serviced, the response under construction, and the common fields
/// extracted from the request for convenient access.
pub struct OpalServiceBase {
    pub request: OpalRequest,
    pub response: OpalResponse,
    /// Credential forwarded to backend calls, when the request carried one.
    pub token: Option<String>,
    pub action: Option<String>,
    pub operation: Option<String>,
    pub api_version: Option<Value>,
    /// Operation payload with the bookkeeping entries stripped.
    pub data: Map<String, Value>,
    pub txn_id: String,
    pub region: Option<String>,
    pub language: String,
    pub(crate) shared: OpalShared,
}

impl OpalServiceBase {
    pub(crate) fn new(request: OpalRequest, shared: OpalShared) -> Self {
        let response = OpalResponse::begin(&request);
        let token = request.auth_token().map(str::to_string);
        let action = request.action().map(str::to_string);
        let txn_id = request.txn_id().to_string();
        let region = request.region().map(str::to_string);
        let language = request
            .language()
            .unwrap_or(&shared.config.default_language)
            .to_string();

        let mut operation = None;
        let mut api_version = None;
        let mut data = Map::new();
        for (key, value) in request.data() {
            match key.as_str() {
                api::OPERATION => operation = value.as_str().map(str::to_string),
                api::VERSION => api_version = Some(value.clone()),
                _ => {
                    data.insert(key.clone(), value.clone());
                }
            }
        }

        OpalServiceBase {
            request,
            response,
            token,
            action,
            operation,
            api_version,
            data,
            txn_id,
            region,
            language,
            shared,
        }
    }

    /// Stamps the given percent-complete on the response and writes the
    /// snapshot to the job-status store under this actor's transaction id.
    pub fn update_job_status(&mut self, percent_complete: f64) {
        self.response.set_progress(percent_complete);
        self.shared.jobs.update(&self.txn_id, &self.response);
    }

    /// Writes an arbitrary snapshot to the job-status store.
    pub fn put_resource(&self, txn_id: &str, response: &OpalResponse) {
        self.shared.jobs.update(txn_id, response);
    }

    /// Builds a request for a call to another plugin, inheriting from this
    /// actor in priority order: explicit call arguments first, then values
    /// from the call's base request, then the actor's own region and auth
    /// token. The language is always inherited and the transaction id is a
    /// fresh child of this actor's.
    pub fn build_request(&self, call: &OpalCall) -> Result<OpalRequest> {
        let txn_id = util::new_txn_id(Some(&self.txn_id));
        let language = self.request.language().map(str::to_string);

        let region = call
            .region
            .clone()
            .or_else(|| {
                call.request
                    .as_ref()
                    .and_then(|r| r.region().map(str::to_string))
            })
            .or_else(|| self.region.clone());

        let auth_token = call
            .auth_token
            .clone()
            .or_else(|| {
                call.request
                    .as_ref()
                    .and_then(|r| r.auth_token().map(str::to_string))
            })
            .or_else(|| self.token.clone());

        let mut builder = OpalRequest::builder().txn_id(txn_id);
        if let Some(request) = &call.request {
            builder = builder.base(request.clone());
        }
        if let Some(target) = &call.target {
            builder = builder.target(target.clone());
        }
        if let Some(operation) = &call.operation {
            builder = builder.operation(operation.clone());
        }
        if let Some(action) = &call.action {
            builder = builder.action(action.clone());
        }
        if let Some(data) = &call.data {
            builder = builder.data(data.clone());
        }
        if let Some(region) = region {
            builder = builder.region(region);
        }
        if let Some(auth_token) = auth_token {
            builder = builder.auth_token(auth_token);
        }
        if let Some(language) = language {
            builder = builder.language(language);
        }
        for (key, value) in &call.fields {
            builder = builder.field(key.clone(), value.clone());
        }
        builder.build()
    }

    /// Calls a synchronous operation in another plugin and waits for its
    /// immediate result. On a complete status the callee's data is returned
    /// directly; any other outcome is raised with the nested error message
    /// extracted.
    ///
    /// This waits only for the callee's handle phase, never for a detached
    /// complete phase — use it only against operations that finish their
    /// work in handle.
    pub async fn call_service(&self, call: OpalCall) -> Result<Value> {
        let request = self.build_request(&call)?;
        let response = dispatch::spawn_service(self.shared.clone(), request).await;

        if response.status() == Some(OpalStatus::Complete) {
            return Ok(response.data().clone());
        }

        let data = response.data();
        let message = data
            .get(0)
            .and_then(|fragment| fragment.get(api::DATA))
            .map(util::value_to_string)
            .unwrap_or_else(|| util::value_to_string(data));
        Err(OpalError::service_call(message))
    }

    /// Calls a long-running operation in another plugin and waits for it to
    /// finish, polling the job-status store between sleeps. Should itself
    /// only be called from within a long-running handler.
    ///
    /// Every percent-complete the callee publishes is rescaled by the
    /// caller-supplied `offset + scale * pct` and pushed into this actor's
    /// own job status, so a caller performing multiple steps keeps its
    /// overall percentage accurate through the whole call chain.
    ///
    /// The poll interval comes from the options, else from the base
    /// request, else from the configured default. With a nonzero
    /// `max_polls` the wait gives up after that many polls with a timeout
    /// error; errors reported by the callee are re-raised with their nested
    /// message extracted.
    pub async fn call_service_async(
        &mut self,
        call: OpalCall,
        opts: OpalAsyncOpts,
    ) -> Result<Value> {
        let polling_interval = opts
            .polling_interval
            .or_else(|| call.request.as_ref().and_then(|r| r.polling_interval()))
            .unwrap_or(self.shared.config.default_polling_interval);

        let request = self.build_request(&call)?;
        let request_desc = request.to_string();
        let target_name = request.target().unwrap_or("unknown").to_string();

        let handle_reply = dispatch::spawn_service(self.shared.clone(), request).await;
        let txn_id = handle_reply.txn_id().to_string();

        let pct_key = format!("{}.{}", api::PROGRESS, api::PERCENT_COMPLETE);

        let mut polls: u32 = 0;
        let mut reply = self.shared.jobs.get(&txn_id);
        loop {
            let in_flight = {
                let status = snapshot_status(&reply);
                status == api::STATUS_INPROGRESS || status == api::STATUS_NOT_FOUND
            };
            if !in_flight {
                break;
            }

            if opts.max_polls > 0 && polls >= opts.max_polls {
                return Err(OpalError::timeout(format!(
                    "Timed out waiting for {}",
                    request_desc
                )));
            }

            if let Some(pct) = util::get_f64(&reply, &pct_key) {
                if pct > 0.0 {
                    self.update_job_status(opts.offset + opts.scale * pct);
                }
            }

            tokio::time::sleep(Duration::from_secs_f64(polling_interval)).await;
            reply = self.shared.jobs.get(&txn_id);
            polls += 1;
        }

        let data = reply.get(api::DATA).cloned().unwrap_or(Value::Null);
        if snapshot_status(&reply) == api::STATUS_ERROR {
            let message = data
                .get(0)
                .and_then(|fragment| fragment.get(api::DATA))
                .map(util::value_to_string)
                .unwrap_or_else(|| {
                    if util::truthy(&data) {
                        util::value_to_string(&data)
                    } else {
                        format!("Failure calling {} service", target_name)
                    }
                });
            return Err(OpalError::service_call(message));
        }

        if let Some(pct) = util::get_f64(&reply, &pct_key) {
            if pct > 0.0 {
                self.update_job_status(opts.offset + opts.scale * pct);
            }
        }

        Ok(data)
    }
}

/// Parameters for a call to another plugin. Explicit values here override
/// anything inherited from the base request or the calling actor.
#[derive(Clone, Debug, Default)]
pub struct OpalCall {
    pub(crate) request: Option<OpalRequest>,
    pub(crate) target: Option<String>,
    pub(crate) auth_token: Option<String>,
    pub(crate) operation: Option<String>,
    pub(crate) action: Option<String>,
    pub(crate) data: Option<Value>,
    pub(crate) region: Option<String>,
    pub(crate) fields: Vec<(String, Value)>,
}

impl OpalCall {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing request as the basis of the call.
    pub fn request(mut self, request: OpalRequest) -> Self {
        self.request = Some(request);
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

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.push((key.into(), value));
        self
    }
}

/// Options for [`OpalServiceBase::call_service_async`].
#[derive(Clone, Debug)]
pub struct OpalAsyncOpts {
    /// Seconds between status polls; defaults to the base request's value,
    /// then the configured default.
    pub polling_interval: Option<f64>,
    /// Poll attempts before giving up; 0 means unlimited.
    pub max_polls: u32,
    /// Added to the callee's percent-complete when updating this actor.
    pub offset: f64,
    /// Multiplied into the callee's percent-complete when updating this
    /// actor.
    pub scale: f64,
}

impl Default for OpalAsyncOpts {
    fn default() -> Self {
        OpalAsyncOpts {
            polling_interval: None,
            max_polls: 0,
            offset: 0.0,
            scale: 1.0,
        }
    }
}

impl OpalAsyncOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polling_interval(mut self, secs: f64) -> Self {
        self.polling_interval = Some(secs);
        self
    }

    pub fn max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// Contract every plugin fulfills. Most plugins declare an operation table
/// and inherit the default `handle`/`complete` protocol; both can be
/// overridden for plugins that manage their own dispatch.
#[async_trait]
pub trait OpalService: Send + Sized + 'static {
    /// Constructs the plugin for one request.
    fn create(base: OpalServiceBase) -> Result<Self>;

    fn base(&self) -> &OpalServiceBase;

    fn base_mut(&mut self) -> &mut OpalServiceBase;

    /// The operations this plugin exposes, declared once per type.
    fn operations() -> &'static [OpalOperation<Self>];

    /// Backend services this plugin depends on, consulted by the default
    /// availability check. Listing the identity service is unnecessary; it
    /// is a precondition for any request arriving at all.
    fn needs_services() -> &'static [&'static str] {
        &[]
    }

    /// Whether the plugin's backend dependencies are all present. Consulted
    /// when a client asks for the list of usable plugins, not per request.
    fn is_available(available_services: &[String]) -> bool {
        Self::needs_services()
            .iter()
            .all(|needed| available_services.iter().any(|have| have == needed))
    }

    /// Handle the request by dispatching to the resolved handler. Short
    /// operations finish here; long-running ones return an in-progress
    /// envelope immediately.
    async fn handle(&mut self) -> Result<OpalResponse> {
        dispatch_handle(self).await
    }

    /// Complete the request: runs the long-running work after `handle` has
    /// returned. Short operations have nothing left to do here.
    async fn complete(&mut self) -> Result<Option<OpalResponse>> {
        dispatch_complete(self).await
    }
}

/// Dispatcher entry for the handle phase. Do not call from handlers.
pub async fn sc_handle<P: OpalService>(svc: &mut P) -> Result<OpalResponse> {
    log::debug!(
        "txn {} handling request: {}",
        svc.base().txn_id,
        svc.base().request
    );
    svc.handle().await
}

/// Dispatcher entry for the complete phase, run detached. Persists whatever
/// the phase produced — the completed response, or the failure converted to
/// an error snapshot — and releases the actor in all cases.
pub async fn sc_complete<P: OpalService>(mut svc: P) {
    let txn_id = svc.base().txn_id.clone();
    match svc.complete().await {
        Ok(Some(response)) => {
            svc.base().put_resource(&txn_id, &response);
        }
        Ok(None) => {}
        Err(err) => {
            log::error!("txn {} complete phase failed: {:?}", txn_id, err);
            let base = svc.base_mut();
            base.response.exception(format!("{:?}", err));
            let snapshot = base.response.error(err.to_string()).clone();
            base.put_resource(&txn_id, &snapshot);
        }
    }
}

/// Default handle-phase dispatch: resolve the handler, run it or start the
/// two-phase protocol.
pub(crate) async fn dispatch_handle<P: OpalService>(svc: &mut P) -> Result<OpalResponse> {
    let operation = svc.base().operation.clone();
    let action = svc.base().action.clone();

    if operation.is_none() && action.is_none() {
        return Err(OpalError::invalid_request("Operation and action missing"));
    }

    let entry = resolve(P::operations(), operation.as_deref(), action.as_deref())
        .ok_or_else(|| OpalError::unsupported_operation(operation.clone().unwrap_or_default()))?;

    match &entry.handler {
        OpalHandler::Short(run) => {
            let data = run(svc).await?;
            let base = svc.base_mut();
            // A few handlers populate the response themselves; the return
            // value only fills data when they have not.
            if base.response.data_is_empty() {
                base.response.set_data(data);
            }
            base.response.set_progress(100.0);
            base.response.complete(None);
            Ok(base.response.clone())
        }
        long => {
            {
                let base = svc.base_mut();
                base.response.set_progress(0.0);
                base.response.set_status(OpalStatus::InProgress);
            }

            let mut polling_interval = svc.base().shared.config.default_polling_interval;
            if let OpalHandler::TwoPhase { validate, .. } = long {
                if let Some(suggested) = validate(svc).await? {
                    if suggested > 0.0 {
                        polling_interval = suggested;
                    }
                }
            }

            let base = svc.base_mut();
            base.response.set_polling_interval(polling_interval);
            base.update_job_status(0.0);
            Ok(base.response.clone())
        }
    }
}

/// Default complete-phase dispatch: run the long handler's execute pass and
/// finalize the response.
pub(crate) async fn dispatch_complete<P: OpalService>(svc: &mut P) -> Result<Option<OpalResponse>> {
    let operation = svc.base().operation.clone();
    let action = svc.base().action.clone();

    if operation.is_none() && action.is_none() {
        return Ok(None);
    }

    let entry = match resolve(P::operations(), operation.as_deref(), action.as_deref()) {
        Some(entry) => entry,
        None => return Ok(None),
    };

    let execute = match &entry.handler {
        OpalHandler::Long(run) => run,
        OpalHandler::TwoPhase { execute, .. } => execute,
        OpalHandler::Short(_) => return Ok(None),
    };

    match execute(svc).await {
        Ok(OpalLongReply::Response(response)) => {
            svc.base_mut().response = response;
        }
        Ok(OpalLongReply::Data(value)) => {
            svc.base_mut().response.set_data(value);
        }
        Err(err) => {
            let base = svc.base_mut();
            base.response.error(err.to_string());
            return Ok(Some(base.response.clone()));
        }
    }

    let base = svc.base_mut();
    base.response.set_progress(100.0);
    base.response.complete(None);
    Ok(Some(base.response.clone()))
}
