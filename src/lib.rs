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

//! # Opal Core Library
//!
//! Opal is the request-dispatch and asynchronous job-execution core of a
//! business-logic aggregation layer: the piece that sits between a UI and
//! a constellation of backend services and turns heterogeneous inbound
//! payloads into dispatched plugin operations, short ones serviced inline
//! and long-running ones driven through a polled two-phase protocol.
//!
//! ## Module Overview
//!
//! - **api**: wire constants shared by every envelope
//! - **request**: the canonical request envelope and its construction
//!   transform
//! - **response**: the response envelope with terminal-state transitions
//! - **job_status**: the job-status store interface and in-memory backing
//! - **registry**: per-plugin operation tables and the router
//! - **service**: the plugin actor — handle/complete phases, job-status
//!   updates, inter-plugin calls
//! - **dispatch**: plugin catalog and the dispatch entry point
//! - **config**: runtime configuration
//! - **errors**: the canonical error enumeration
//! - **util**: transaction ids, dotted-path lookup, secret scrubbing
//!
//! ## Quick Start
//!
//! ```rust
//! use opal::{OpalDispatcher, OpalPluginCatalog, OpalRequest};
//!
//! let mut catalog = OpalPluginCatalog::new();
//! catalog.register::<MySvc>("my_service");
//! let dispatcher = OpalDispatcher::new(catalog);
//!
//! let request = OpalRequest::builder()
//!     .target("my_service")
//!     .operation("status")
//!     .build()?;
//!
//! let reply = dispatcher.spawn_service(request).await;
//! ```
//!
//! ## Architecture
//!
//! Each inbound request becomes one actor: a plugin instance owning one
//! request/response pair. The dispatcher awaits the actor's handle phase
//! for the immediate reply and detaches the complete phase onto its own
//! task; long-running work reports progress through the shared job-status
//! store, which pollers read until a terminal snapshot appears. Plugins
//! call each other through derived requests that inherit credentials,
//! region, language and a child transaction id.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, OpalError>`; nothing raises past the
//! dispatch entry point, which converts every failure into a terminal
//! error envelope.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod job_status;
pub mod registry;
pub mod request;
pub mod response;
pub mod service;
pub mod util;

pub use config::OpalConfig;
pub use dispatch::{AvailableFn, OpalDispatcher, OpalPluginCatalog, OpalPluginEntry};
pub use errors::{OpalError, Result};
pub use job_status::{snapshot_status, OpalJobStore, OpalMemoryJobStore};
pub use registry::{resolve, LongFn, OpalHandler, OpalLongReply, OpalOperation, ShortFn, ValidateFn};
pub use request::{OpalRequest, OpalRequestBuilder};
pub use response::{OpalProgress, OpalResponse, OpalStatus};
pub use service::{
    sc_complete, sc_handle, OpalAsyncOpts, OpalCall, OpalService, OpalServiceBase,
};
pub use util::{get_val, new_txn_id};
