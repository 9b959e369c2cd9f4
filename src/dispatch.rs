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

//! # Opal Dispatch Entry Point
//!
//! Plugin discovery and actor lifecycle. The catalog maps each target name
//! to a spawn function for its plugin type, registered once at startup;
//! dispatching a request looks up the target, constructs the actor, awaits
//! its handle phase for the immediate reply and detaches its complete
//! phase onto its own task.
//!
//! Nothing raises past [`spawn_service`]: lookup failures, constructor
//! failures and handler errors surfaced during the handle phase all
//! resolve to a terminal error envelope built from the original request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::config::OpalConfig;
use crate::errors::{OpalError, Result};
use crate::job_status::{OpalJobStore, OpalMemoryJobStore};
use crate::request::OpalRequest;
use crate::response::OpalResponse;
use crate::service::{self, OpalService, OpalServiceBase};

/// Monomorphized entry: construct the plugin actor for a request, run its
/// handle phase, detach its complete phase.
pub(crate) type SpawnFn = fn(OpalRequest, OpalShared) -> BoxFuture<'static, Result<OpalResponse>>;

/// Availability predicate over the backend services currently present.
pub type AvailableFn = fn(&[String]) -> bool;

/// Shared runtime handles threaded through every actor.
#[derive(Clone)]
pub(crate) struct OpalShared {
    pub(crate) catalog: Arc<OpalPluginCatalog>,
    pub(crate) jobs: Arc<dyn OpalJobStore>,
    pub(crate) config: OpalConfig,
}

/// One registered plugin.
pub struct OpalPluginEntry {
    name: String,
    spawn: SpawnFn,
    available: AvailableFn,
}

impl OpalPluginEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_available(&self, available_services: &[String]) -> bool {
        (self.available)(available_services)
    }
}

/// Registry of plugin constructors, keyed by the target name requests
/// select them with. Built once at startup.
#[derive(Default)]
pub struct OpalPluginCatalog {
    entries: HashMap<String, OpalPluginEntry>,
}

impl OpalPluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin type under the given target name.
    pub fn register<P: OpalService>(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.entries.insert(
            name.clone(),
            OpalPluginEntry {
                name,
                spawn: spawn_actor::<P>,
                available: P::is_available,
            },
        );
    }

    pub fn lookup(&self, target: &str) -> Option<&OpalPluginEntry> {
        self.entries.get(target)
    }

    /// All registered plugins, sorted by name.
    pub fn list_all(&self) -> Vec<&OpalPluginEntry> {
        let mut entries: Vec<&OpalPluginEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Names of the plugins whose backend dependencies are all present.
    pub fn available_plugins(&self, available_services: &[String]) -> Vec<String> {
        self.list_all()
            .into_iter()
            .filter(|entry| entry.is_available(available_services))
            .map(|entry| entry.name.clone())
            .collect()
    }
}

fn spawn_actor<P: OpalService>(
    request: OpalRequest,
    shared: OpalShared,
) -> BoxFuture<'static, Result<OpalResponse>> {
    Box::pin(run_service::<P>(request, shared))
}

async fn run_service<P: OpalService>(
    request: OpalRequest,
    shared: OpalShared,
) -> Result<OpalResponse> {
    let base = OpalServiceBase::new(request, shared);
    let mut svc = P::create(base)?;
    let reply = service::sc_handle(&mut svc).await?;
    // Fire and forget: the complete phase reports through the job store.
    let _ = tokio::spawn(service::sc_complete(svc));
    Ok(reply)
}

/// The dispatch front door: owns the plugin catalog, the job-status store
/// and the runtime configuration.
#[derive(Clone)]
pub struct OpalDispatcher {
    shared: OpalShared,
}

impl OpalDispatcher {
    pub fn new(catalog: OpalPluginCatalog) -> Self {
        Self::with_config(catalog, OpalConfig::default())
    }

    pub fn with_config(catalog: OpalPluginCatalog, config: OpalConfig) -> Self {
        let jobs: Arc<dyn OpalJobStore> = Arc::new(OpalMemoryJobStore::with_retention(
            Duration::from_secs(config.job_retention_secs),
        ));
        Self::with_store(catalog, jobs, config)
    }

    /// Uses an externally supplied job-status store, e.g. a database-backed
    /// one for clustered deployments.
    pub fn with_store(
        catalog: OpalPluginCatalog,
        jobs: Arc<dyn OpalJobStore>,
        config: OpalConfig,
    ) -> Self {
        OpalDispatcher {
            shared: OpalShared {
                catalog: Arc::new(catalog),
                jobs,
                config,
            },
        }
    }

    /// Dispatches one request to the plugin its `target` field selects and
    /// returns the immediate reply — the terminal response for short
    /// operations, an in-progress envelope for long-running ones.
    ///
    /// Never raises: every failure mode resolves to an error-status
    /// envelope.
    pub async fn spawn_service(&self, request: OpalRequest) -> OpalResponse {
        spawn_service(self.shared.clone(), request).await
    }

    /// Latest job-status snapshot for a transaction, for top-level pollers.
    pub fn job_status(&self, txn_id: &str) -> Value {
        self.shared.jobs.get(txn_id)
    }

    pub fn job_store(&self) -> Arc<dyn OpalJobStore> {
        self.shared.jobs.clone()
    }

    pub fn available_plugins(&self, available_services: &[String]) -> Vec<String> {
        self.shared.catalog.available_plugins(available_services)
    }
}

pub(crate) async fn spawn_service(shared: OpalShared, request: OpalRequest) -> OpalResponse {
    let target = request.target().unwrap_or("").to_string();
    let spawn = shared.catalog.lookup(&target).map(|entry| entry.spawn);

    let result = match spawn {
        Some(spawn) => spawn(request.clone(), shared.clone()).await,
        None => Err(OpalError::invalid_request(format!(
            "Unknown target: {}",
            target
        ))),
    };

    match result {
        Ok(response) => response,
        Err(err) => {
            log::error!("spawn_service failed for {}: {:?}", request, err);
            let message = match err.overview() {
                Some(prefix) => format!("{}: {}", prefix, err),
                None => err.to_string(),
            };
            let mut response = OpalResponse::begin(&request);
            response.error(Value::String(message.trim_end().to_string()));
            response
        }
    }
}
