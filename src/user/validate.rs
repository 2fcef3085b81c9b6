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

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tf_provider::{AttributePath, Diagnostics, Value};

use crate::client::models::{
    STATUS_ACTIVE, USER_STATUS_DEPROVISIONED, USER_STATUS_STAGED, USER_STATUS_SUSPENDED,
    VALID_ADMIN_ROLES,
};
use crate::utils::{set_strings, WithValidate};

use super::profile::parse_custom_attributes;
use super::state::UserState;

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$").unwrap();
}

const VALID_STATUSES: &[&str] = &[
    STATUS_ACTIVE,
    USER_STATUS_STAGED,
    USER_STATUS_DEPROVISIONED,
    USER_STATUS_SUSPENDED,
];

#[async_trait]
impl<'a> WithValidate for UserState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(email) = &self.email {
            if !EMAIL.is_match(email) {
                diags.error(
                    "Invalid email address",
                    format!("`{email}` is not a valid email address."),
                    attr_path.clone().attribute("email"),
                );
            }
        }

        if let Value::Value(status) = &self.status {
            if !VALID_STATUSES.contains(&status.as_ref()) {
                diags.error(
                    "Invalid user status",
                    format!(
                        "`{status}` is not a valid status, expected one of {}.",
                        VALID_STATUSES.join(", ")
                    ),
                    attr_path.clone().attribute("status"),
                );
            }
        }

        if let Value::Value(answer) = &self.recovery_answer {
            let len = answer.chars().count();
            if !(4..=1000).contains(&len) {
                diags.error_short(
                    "The recovery answer must be between 4 and 1000 characters long",
                    attr_path.clone().attribute("recovery_answer"),
                );
            }
        }

        if let Value::Value(_) = &self.custom_profile_attributes {
            if let Err(err) = parse_custom_attributes(&self.custom_profile_attributes) {
                diags.error(
                    "Invalid custom profile attributes",
                    format!("`custom_profile_attributes` must be a JSON object: {err}"),
                    attr_path.clone().attribute("custom_profile_attributes"),
                );
            }
        }

        for role in set_strings(&self.admin_roles).unwrap_or_default() {
            if !VALID_ADMIN_ROLES.contains(&role.as_str()) {
                diags.error(
                    "Invalid admin role",
                    format!(
                        "`{role}` is not a valid admin role, expected one of {}.",
                        VALID_ADMIN_ROLES.join(", ")
                    ),
                    attr_path.clone().attribute("admin_roles"),
                );
            }
        }
    }
}
