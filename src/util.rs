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

//! # Opal Utility Module
//!
//! Small helpers shared across the dispatch core: dotted-path lookup into
//! JSON snapshots, transaction-id generation, and secret masking for log
//! output.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use serde_json::{Map, Value};

/// Traverse through the levels of a JSON value to obtain the specified key,
/// safely handling any missing levels. For example, with the key
/// `"progress.percentComplete"` it will find the `percentComplete` entry in
/// the `progress` object; if either level is missing, `None` is returned.
pub fn get_val<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return None;
    }
    let mut current = value;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// Numeric convenience wrapper over [`get_val`].
pub fn get_f64(value: &Value, key: &str) -> Option<f64> {
    get_val(value, key).and_then(Value::as_f64)
}

/// Create a new txn id, optionally derived from an existing transaction id.
///
/// A derived id is a concatenation of the existing id's leading segment and
/// a fresh short unique suffix, separated by a delimiter. Transaction ids
/// are the keys under which long-running job status is stored, so each call
/// needs a unique one; deriving them from the original id keeps a whole
/// chain of inter-plugin calls correlated to the inbound request.
pub fn new_txn_id(parent: Option<&str>) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => {
            let root = parent.split('.').next().unwrap_or(parent);
            format!("{}.{}", root, short_uid())
        }
        _ => random_txn_id(),
    }
}

/// Eight hex characters, unique within this process. A random per-process
/// seed plus a wrapping counter gives the same uniqueness a timestamp-based
/// uuid1 prefix would, without a uuid dependency.
fn short_uid() -> String {
    static SEED: OnceLock<u32> = OnceLock::new();
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let seed = *SEED.get_or_init(rand::random::<u32>);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:08x}", seed.wrapping_add(count))
}

/// Fresh random id in the canonical 8-4-4-4-12 layout.
fn random_txn_id() -> String {
    let bytes: [u8; 16] = rand::random();
    let hex = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    )
}

/// Returns a copy of `value` with secret-bearing entries masked, suitable
/// for logging. Keys containing `password` or `cert` have their values
/// four-starred; keys containing `token` keep only their last four
/// characters. The walk recurses through objects and arrays.
pub fn scrub_secrets(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                let lower = key.to_lowercase();
                let scrubbed = if lower.contains("password") || lower.contains("cert") {
                    Value::String("****".to_string())
                } else if lower.contains("token") {
                    Value::String(mask_token(val))
                } else {
                    scrub_secrets(val)
                };
                out.insert(key.clone(), scrubbed);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(scrub_secrets).collect()),
        other => other.clone(),
    }
}

fn mask_token(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let chars: Vec<char> = text.chars().collect();
    let keep = chars.len().min(4);
    let masked = "*".repeat(chars.len() - keep);
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{}{}", masked, tail)
}

/// Python-style truthiness for JSON values: null, false, zero and empty
/// containers are all falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Plain-text rendering of a JSON value for log output: strings unquoted,
/// everything else in its JSON form.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
