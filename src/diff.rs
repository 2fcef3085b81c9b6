// This file is part of the terraform-provider-okta project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reconciliation of desired and current string collections

use std::collections::HashSet;

/// Split the difference between `desired` and `current` into what must be granted
/// (desired but absent) and what must be revoked (present but not desired).
///
/// Both lists keep the order of their input and contain no duplicates.
pub fn grant_revoke(desired: &[String], current: &[String]) -> (Vec<String>, Vec<String>) {
    let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();
    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();

    let mut seen = HashSet::new();
    let grant = desired
        .iter()
        .map(String::as_str)
        .filter(|item| !current_set.contains(item) && seen.insert(*item))
        .map(str::to_owned)
        .collect();
    let mut seen = HashSet::new();
    let revoke = current
        .iter()
        .map(String::as_str)
        .filter(|item| !desired_set.contains(item) && seen.insert(*item))
        .map(str::to_owned)
        .collect();

    (grant, revoke)
}

/// Order `current` like `prior`: values already known keep their position,
/// new values are appended in the order they were received.
pub fn keep_order(prior: &[String], current: &[String]) -> Vec<String> {
    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();

    prior
        .iter()
        .chain(current.iter())
        .filter(|item| current_set.contains(item.as_str()) && seen.insert(item.as_str()))
        .cloned()
        .collect()
}
