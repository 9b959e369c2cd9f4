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

//! # Opal Operation Registry
//!
//! Declarative per-plugin tables mapping operation names and action verbs
//! to handler functions, and the router that resolves a request against
//! them. Each plugin type declares its table once, as a `'static` slice;
//! the router scans it per request. A handler may answer to several
//! operation aliases, and an entry with no action verb matches any.
//!
//! Handler kinds:
//!
//! - **Short**: runs to completion during the handle phase; its return
//!   value becomes the response data unless the handler populated the
//!   response itself.
//! - **Long**: a long-running operation with no validation pass. It runs
//!   exactly once, during the detached complete phase.
//! - **TwoPhase**: a long-running operation with a validation pass. The
//!   validate function runs during handle and may suggest a polling
//!   interval; the execute function runs during the complete phase.

use std::fmt;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::errors::Result;
use crate::response::OpalResponse;

/// Short-handler signature: produce the response data.
pub type ShortFn<P> = for<'a> fn(&'a mut P) -> BoxFuture<'a, Result<Value>>;

/// Validation-pass signature: vet the request and optionally suggest a
/// polling interval in seconds.
pub type ValidateFn<P> = for<'a> fn(&'a mut P) -> BoxFuture<'a, Result<Option<f64>>>;

/// Long-handler signature: perform the work and reply with either plain
/// data or a full replacement envelope.
pub type LongFn<P> = for<'a> fn(&'a mut P) -> BoxFuture<'a, Result<OpalLongReply>>;

/// What a long-running handler hands back from its execute phase.
pub enum OpalLongReply {
    /// Folded into the data field of the actor's response.
    Data(Value),
    /// Replaces the actor's response wholesale.
    Response(OpalResponse),
}

/// Handler reference plus its execution protocol.
pub enum OpalHandler<P> {
    Short(ShortFn<P>),
    Long(LongFn<P>),
    TwoPhase {
        validate: ValidateFn<P>,
        execute: LongFn<P>,
    },
}

impl<P> OpalHandler<P> {
    /// Long-running handlers return an immediate in-progress reply from the
    /// handle phase and do their work detached.
    pub fn is_long(&self) -> bool {
        !matches!(self, OpalHandler::Short(_))
    }
}

impl<P> fmt::Debug for OpalHandler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpalHandler::Short(_) => f.write_str("Short"),
            OpalHandler::Long(_) => f.write_str("Long"),
            OpalHandler::TwoPhase { .. } => f.write_str("TwoPhase"),
        }
    }
}

/// One exposed operation of a plugin.
pub struct OpalOperation<P> {
    /// Operation names this handler answers to.
    pub aliases: &'static [&'static str],
    /// Action verb matched when several handlers share an operation name;
    /// `None` matches any verb.
    pub action: Option<&'static str>,
    pub handler: OpalHandler<P>,
}

impl<P> fmt::Debug for OpalOperation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpalOperation")
            .field("aliases", &self.aliases)
            .field("action", &self.action)
            .field("handler", &self.handler)
            .finish()
    }
}

/// Resolves the handler for an operation/action pair against a plugin's
/// table.
///
/// All entries whose alias set contains the operation are candidates (all
/// entries, when no operation is given). A single candidate is returned
/// regardless of the action verb. Among several candidates the first whose
/// declared action equals the requested one wins; if none does, resolution
/// fails and the caller reports the operation as unsupported.
pub fn resolve<'t, P>(
    table: &'t [OpalOperation<P>],
    operation: Option<&str>,
    action: Option<&str>,
) -> Option<&'t OpalOperation<P>> {
    let candidates: Vec<&OpalOperation<P>> = table
        .iter()
        .filter(|entry| match operation {
            Some(name) => entry.aliases.contains(&name),
            None => true,
        })
        .collect();

    match candidates.as_slice() {
        [] => None,
        [single] => Some(*single),
        many => many.iter().copied().find(|entry| entry.action == action),
    }
}
