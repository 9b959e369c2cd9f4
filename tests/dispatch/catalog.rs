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

#[path = "../support/mod.rs"]
mod support;

use support::catalog;

#[test]
fn test_lookup_finds_registered_plugins() {
    let catalog = catalog();
    assert!(catalog.lookup("general").is_some());
    assert!(catalog.lookup("expose").is_some());
    assert!(catalog.lookup("nonesuch").is_none());
}

#[test]
fn test_list_all_is_sorted_by_name() {
    let catalog = catalog();
    let names: Vec<&str> = catalog.list_all().iter().map(|entry| entry.name()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(names.contains(&"general"));
    assert!(names.contains(&"unavailable"));
}

#[test]
fn test_availability_tracks_needed_services() {
    let catalog = catalog();

    let nothing_present: Vec<String> = vec![];
    let available = catalog.available_plugins(&nothing_present);
    assert!(available.contains(&"general".to_string()));
    assert!(!available.contains(&"unavailable".to_string()));

    let with_dependency = vec!["SomeMissingService".to_string()];
    let available = catalog.available_plugins(&with_dependency);
    assert!(available.contains(&"unavailable".to_string()));
}

#[test]
fn test_entry_predicates_are_directly_consultable() {
    let catalog = catalog();
    let entry = catalog.lookup("unavailable").expect("registered");
    assert!(!entry.is_available(&[]));
    assert!(entry.is_available(&["SomeMissingService".to_string()]));
}
