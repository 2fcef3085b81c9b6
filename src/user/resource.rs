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
use tf_provider::{AttributePath, Diagnostics, Resource, Schema, Value, ValueEmpty, ValueString};
use tracing::{info, warn};

use crate::client::models::{
    PasswordCredential, RecoveryQuestion, UserCredentials, STATUS_ACTIVE,
    USER_STATUS_DEPROVISIONED, USER_STATUS_STAGED, USER_STATUS_SUSPENDED,
};
use crate::client::{ClientHandle, OktaClient};
use crate::utils::{
    as_str, non_empty, ok_or_report, require, set_strings, string_value, StepContext,
    StepError, WithNormalize, WithSchema, WithValidate,
};

use super::lifecycle::{ensure_user_deleted, sync_admin_roles, sync_groups, update_user_status};
use super::profile::{map_status, profile_changed, status_satisfies};
use super::state::UserState;

#[derive(Debug, Default, Clone)]
pub struct UserResource {
    pub(crate) client: ClientHandle,
}

impl UserResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

impl<'a> UserState<'a> {
    /// Steps of a creation once the user exists in Okta
    async fn complete_creation(&self, client: &OktaClient) -> Result<(), StepError> {
        let id = as_str(&self.id);
        if let Some(roles) = set_strings(&self.admin_roles) {
            sync_admin_roles(client, id, &roles)
                .await
                .step("Failed to assign admin roles to user")?;
        }
        if let Some(groups) = set_strings(&self.group_memberships) {
            sync_groups(client, id, &groups)
                .await
                .step("Failed to assign user to groups")?;
        }
        let status = as_str(&self.status);
        if status == USER_STATUS_SUSPENDED || status == USER_STATUS_DEPROVISIONED {
            update_user_status(client, id, status)
                .await
                .step("Failed to update user status")?;
        }
        Ok(())
    }

    /// Apply the difference with `prior`, the status first as it conditions every other change
    async fn apply_update(
        &self,
        diags: &mut Diagnostics,
        prior: &UserState<'_>,
        client: &OktaClient,
    ) -> Option<()> {
        let id = as_str(&self.id);
        let status = as_str(&self.status);

        if self.status != prior.status {
            ok_or_report(
                diags,
                "Failed to update user status",
                update_user_status(client, id, status).await,
            )?;
        }

        let profile = profile_changed(prior, self);
        let credentials = self.password != prior.password
            || self.recovery_question != prior.recovery_question
            || self.recovery_answer != prior.recovery_answer;
        if status == USER_STATUS_DEPROVISIONED && (profile || credentials) {
            diags.root_error(
                "Cannot update a deprovisioned user",
                "Only the status of a DEPROVISIONED user can be updated, activate the user first.",
            );
            return None;
        }

        if profile {
            let body = ok_or_report(
                diags,
                "Invalid custom profile attributes",
                self.to_user(false).map_err(Into::into),
            )?;
            ok_or_report(
                diags,
                "Failed to update user",
                client.update_user(id, &body).await.map(drop),
            )?;
        }

        if self.admin_roles != prior.admin_roles {
            let roles = set_strings(&self.admin_roles).unwrap_or_default();
            ok_or_report(
                diags,
                "Failed to update user admin roles",
                sync_admin_roles(client, id, &roles).await,
            )?;
        }

        if self.group_memberships != prior.group_memberships {
            let groups = set_strings(&self.group_memberships).unwrap_or_default();
            ok_or_report(
                diags,
                "Failed to update user group memberships",
                sync_groups(client, id, &groups).await,
            )?;
        }

        if self.password != prior.password {
            if let Some(new_password) = non_empty(&self.password) {
                ok_or_report(
                    diags,
                    "Failed to change user password",
                    client
                        .change_password(id, as_str(&prior.password), new_password)
                        .await,
                )?;
            }
        }

        if self.recovery_question != prior.recovery_question
            || self.recovery_answer != prior.recovery_answer
        {
            if let Some(question) = non_empty(&self.recovery_question) {
                let credentials = UserCredentials {
                    password: Some(PasswordCredential {
                        value: as_str(&self.password).to_owned(),
                    }),
                    recovery_question: Some(RecoveryQuestion {
                        question: question.to_owned(),
                        answer: as_str(&self.recovery_answer).to_owned(),
                    }),
                };
                ok_or_report(
                    diags,
                    "Failed to change user recovery question",
                    client.change_recovery_question(id, &credentials).await,
                )?;
            }
        }

        Some(())
    }

    /// Read back after a create or an update
    async fn read_back(&mut self, diags: &mut Diagnostics, client: &OktaClient) {
        match self.refresh(client).await {
            Ok(true) => (),
            Ok(false) => diags.root_error(
                "User disappeared",
                format!("The user `{}` could not be read back from Okta.", as_str(&self.id)),
            ),
            Err(err) => err.report(diags),
        }
    }
}

#[async_trait]
impl Resource for UserResource {
    type State<'a> = Value<UserState<'a>>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(UserState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if let Value::Value(config) = &config {
            config.validate(diags, Default::default()).await;
        }

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = require(diags, state)?;
        let client = self.client.get(diags).await?;

        match state.refresh(&client).await {
            Ok(true) => Some((Value::Value(state), private_state)),
            Ok(false) => {
                warn!(id = as_str(&state.id), "User not found, removing it from state");
                Some((Value::Null, private_state))
            }
            Err(err) => {
                err.report(diags);
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = require(diags, proposed_state)?;
        state.normalize(diags);
        state.id = ValueString::Unknown;
        state.raw_status = ValueString::Unknown;

        Some((Value::Value(state), Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(
        Self::State<'a>,
        Self::PrivateState<'a>,
        Vec<AttributePath>,
    )> {
        let prior = require(diags, prior_state)?;
        let mut state = require(diags, proposed_state)?;
        state.normalize(diags);
        state.id = prior.id.clone();

        // A PROVISIONED or PASSWORD_EXPIRED user is already as active as it can be made
        if as_str(&state.status) == STATUS_ACTIVE
            && status_satisfies(STATUS_ACTIVE, map_status(as_str(&prior.status)))
        {
            state.status = prior.status.clone();
        }

        if state.status != prior.status {
            if as_str(&state.status) == USER_STATUS_STAGED {
                diags.error_short(
                    "Okta will not allow a user to be updated to STAGED",
                    AttributePath::new("status"),
                );
                return None;
            }
            state.raw_status = ValueString::Unknown;
        } else {
            state.raw_status = prior.raw_status.clone();
        }

        let mut trigger_replace = Vec::new();
        if state.login != prior.login {
            trigger_replace.push(AttributePath::new("login"));
        }

        Some((Value::Value(state), prior_private_state, trigger_replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        _prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        Some(())
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = require(diags, planned_state)?;
        let client = self.client.get(diags).await?;
        state.normalize(diags);

        let body = ok_or_report(
            diags,
            "Invalid custom profile attributes",
            state.to_user(true).map_err(Into::into),
        )?;
        let activate = as_str(&state.status) != USER_STATUS_STAGED;
        info!(login = as_str(&state.login), activate, "Create user");
        let user = ok_or_report(
            diags,
            "Failed to create user",
            client.create_user(&body, activate).await,
        )?;

        // From now on, the user exists and must be kept in the state
        state.id = string_value(user.id.as_str());
        state.raw_status = string_value(user.status.as_str());

        match state.complete_creation(&client).await {
            Ok(()) => state.read_back(diags, &client).await,
            Err(err) => err.report(diags),
        }

        Some((Value::Value(state), private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let prior = require(diags, prior_state)?;
        let mut state = require(diags, planned_state)?;
        let client = self.client.get(diags).await?;
        state.id = prior.id.clone();
        info!(id = as_str(&state.id), "Update user");

        if state.apply_update(diags, &prior, &client).await.is_none() {
            // The next refresh picks up whatever was applied
            return Some((Value::Value(prior), private_state));
        }

        state.read_back(diags, &client).await;
        Some((Value::Value(state), private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let state = require(diags, state)?;
        let client = self.client.get(diags).await?;
        let id = as_str(&state.id);
        info!(id, "Delete user");

        ok_or_report(
            diags,
            "Failed to delete user",
            ensure_user_deleted(&client, id, as_str(&state.raw_status)).await,
        )
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.client.get(diags).await?;

        // Users can be imported by login as well, the id is normalized by the refresh
        let mut state = UserState {
            id: string_value(id.as_str()),
            ..Default::default()
        };
        match state.refresh(&client).await {
            Ok(true) => Some((Value::Value(state), Default::default())),
            Ok(false) => {
                diags.root_error(
                    "User not found",
                    format!("No user matches `{id}` in Okta."),
                );
                None
            }
            Err(err) => {
                err.report(diags);
                None
            }
        }
    }
}
