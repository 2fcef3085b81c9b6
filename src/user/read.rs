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

use crate::client::models::{PasswordCredential, RecoveryQuestion, User, UserCredentials};
use crate::client::{OktaClient, OktaError};
use crate::utils::{as_str, non_empty, read_set, string_set, string_value, StepContext, StepError};

use super::lifecycle::user_groups;
use super::profile::{build_profile, flatten_profile, map_status, status_satisfies};
use super::state::UserState;

impl<'a> UserState<'a> {
    /// Body of a user creation or update
    pub(super) fn to_user(&self, with_credentials: bool) -> serde_json::Result<User> {
        Ok(User {
            profile: build_profile(self)?,
            credentials: if with_credentials {
                self.credentials()
            } else {
                None
            },
            ..Default::default()
        })
    }

    pub(super) fn credentials(&self) -> Option<UserCredentials> {
        let password = non_empty(&self.password).map(|value| PasswordCredential {
            value: value.to_owned(),
        });
        let recovery_question = non_empty(&self.recovery_question).map(|question| RecoveryQuestion {
            question: question.to_owned(),
            answer: as_str(&self.recovery_answer).to_owned(),
        });
        if password.is_none() && recovery_question.is_none() {
            None
        } else {
            Some(UserCredentials {
                password,
                recovery_question,
            })
        }
    }

    /// Refresh the state from Okta, `false` if the user does not exist anymore
    pub(super) async fn refresh(&mut self, client: &OktaClient) -> Result<bool, StepError> {
        let user = match client.get_user(as_str(&self.id)).await {
            Err(err) if err.is_not_found() => return Ok(false),
            result => result.step("Failed to get user")?,
        };

        self.id = string_value(user.id.as_str());
        let status = map_status(&user.status);
        if !status_satisfies(as_str(&self.status), status) {
            self.status = string_value(status);
        }
        self.raw_status = string_value(user.status.as_str());
        flatten_profile(self, &user)
            .map_err(OktaError::from)
            .step("Failed to read user profile")?;

        let roles = client
            .list_user_roles(&user.id)
            .await
            .step("Failed to list user admin roles")?;
        self.admin_roles = read_set(
            &self.admin_roles,
            roles.into_iter().map(|role| role.role_type).collect(),
        );

        // Memberships are only synced when managed, an empty set removes them all
        if !self.group_memberships.is_null() {
            let groups = user_groups(client, &user.id)
                .await
                .step("Failed to list user groups")?;
            self.group_memberships = string_set(groups);
        }

        Ok(true)
    }
}
