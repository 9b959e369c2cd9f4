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

//! # Opal Error Module
//!
//! This module defines the error types used throughout the Opal dispatch
//! core for consistent error handling and reporting.
//!
//! ## Error Handling Philosophy
//!
//! Opal uses a structured error approach with the following principles:
//!
//! - **Explicit Error Kinds**: each variant represents a specific category
//!   of failure, so callers discriminate by kind rather than by parsing
//!   message text
//! - **Message Compatibility**: the human-readable message carried by each
//!   variant is what ends up in the `data` fragments of an error response,
//!   so message content is part of the wire contract
//! - **Contained**: errors never escape the dispatch entry point; every
//!   failure mode resolves to a terminal error response envelope
//!
//! ## Error Categories
//!
//! - **InvalidRequest**: malformed envelopes rejected before any handler runs
//! - **UnsupportedOperation**: the router found no handler for the request
//! - **Handler**: a failure raised inside a plugin handler
//! - **ServiceCall**: a called sibling plugin reported an error status
//! - **Timeout**: an asynchronous inter-plugin call exhausted its poll budget
//! - **Serde**: serialization/deserialization failures
//! - **Internal**: unexpected internal failures

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout Opal.
pub type Result<T> = std::result::Result<T, OpalError>;

/// Canonical error enumeration for the Opal dispatch core.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum OpalError {
    /// Malformed request envelopes, rejected before dispatch.
    #[error("{message}")]
    InvalidRequest { message: String },

    /// The router resolved no handler for the requested operation.
    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    /// Any failure raised by a plugin handler implementation.
    #[error("{message}")]
    Handler { message: String },

    /// A called plugin returned an error-status envelope.
    #[error("{message}")]
    ServiceCall { message: String },

    /// An asynchronous inter-plugin call exceeded its poll limit.
    #[error("{message}")]
    Timeout { message: String },

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for OpalError {
    fn from(err: serde_json::Error) -> Self {
        OpalError::Serde(err.to_string())
    }
}

impl OpalError {
    /// Helper to construct invalid-request errors.
    pub fn invalid_request<T: Into<String>>(message: T) -> Self {
        OpalError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Helper to construct unsupported-operation errors.
    pub fn unsupported_operation<T: Into<String>>(operation: T) -> Self {
        OpalError::UnsupportedOperation {
            operation: operation.into(),
        }
    }

    /// Helper to construct handler errors.
    pub fn handler<T: Into<String>>(message: T) -> Self {
        OpalError::Handler {
            message: message.into(),
        }
    }

    /// Helper to construct inter-plugin call errors.
    pub fn service_call<T: Into<String>>(message: T) -> Self {
        OpalError::ServiceCall {
            message: message.into(),
        }
    }

    /// Helper to construct poll-timeout errors.
    pub fn timeout<T: Into<String>>(message: T) -> Self {
        OpalError::Timeout {
            message: message.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        OpalError::Internal(message.into())
    }

    /// One-line category overview, prefixed to the message by the dispatch
    /// entry point for error kinds the platform itself raises. Handler and
    /// backend messages surface verbatim and return `None`.
    pub fn overview(&self) -> Option<&'static str> {
        match self {
            OpalError::InvalidRequest { .. } | OpalError::UnsupportedOperation { .. } => {
                Some("Invalid request")
            }
            OpalError::Handler { .. }
            | OpalError::ServiceCall { .. }
            | OpalError::Timeout { .. }
            | OpalError::Serde(_)
            | OpalError::Internal(_) => None,
        }
    }
}
