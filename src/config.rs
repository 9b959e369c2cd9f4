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

use crate::api;

/// Runtime configuration for the dispatch core.
#[derive(Clone, Debug)]
pub struct OpalConfig {
    /// Seconds between polls of a long-running operation when the operation
    /// itself suggests no interval.
    pub default_polling_interval: f64,
    /// Age after which job-status entries are pruned, completed or not.
    pub job_retention_secs: u64,
    /// Language assumed when a request carries none.
    pub default_language: String,
}

impl Default for OpalConfig {
    fn default() -> Self {
        Self {
            default_polling_interval: api::DEFAULT_POLLING_INTERVAL,
            job_retention_secs: 24 * 60 * 60,
            default_language: "en".to_string(),
        }
    }
}

impl OpalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_polling_interval(mut self, secs: f64) -> Self {
        self.default_polling_interval = secs;
        self
    }

    pub fn job_retention_secs(mut self, secs: u64) -> Self {
        self.job_retention_secs = secs;
        self
    }

    pub fn default_language(mut self, language: &str) -> Self {
        self.default_language = language.to_string();
        self
    }
}
