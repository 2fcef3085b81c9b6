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
use serde::{Deserialize, Serialize};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Resource, Schema, Value, ValueEmpty, ValueString,
};
use tracing::{info, warn};

use crate::client::models::{VALID_ADMIN_ROLES, VALID_ADMIN_ROLES_FOR_GROUP_TARGET};
use crate::client::{suppress_not_found, ClientHandle, OktaClient, OktaResult};
use crate::diff::grant_revoke;
use crate::utils::{
    as_str, for_each_concurrent, ok_or_report, read_set, require, set_strings, string_value,
    StepContext, StepError, ValueStringSet, WithSchema, WithValidate,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupRoleState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub group_id: ValueString<'a>,
    pub role_type: ValueString<'a>,
    pub target_group_list: ValueStringSet<'a>,
}

fn supports_targets(role_type: &str) -> bool {
    VALID_ADMIN_ROLES_FOR_GROUP_TARGET.contains(&role_type)
}

impl<'a> WithSchema for GroupRoleState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("Admin role assigned to an Okta group"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("ID of the role assignment"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "group_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("ID of group to attach admin roles to"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "role_type" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Type of Role to assign"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "target_group_list" => Attribute {
                        attr_type: AttributeType::Set(AttributeType::String.into()),
                        description: Description::plain("Groups the role applies to, only for USER_ADMIN and HELP_DESK_ADMIN roles"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                },
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl<'a> WithValidate for GroupRoleState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        let Value::Value(role_type) = &self.role_type else {
            return;
        };
        if !VALID_ADMIN_ROLES.contains(&role_type.as_ref()) {
            diags.error(
                "Invalid admin role",
                format!(
                    "`{role_type}` is not a valid admin role, expected one of {}.",
                    VALID_ADMIN_ROLES.join(", ")
                ),
                attr_path.clone().attribute("role_type"),
            );
        }
        let has_targets = matches!(&self.target_group_list, Value::Value(targets) if !targets.is_empty());
        if has_targets && !supports_targets(role_type) {
            diags.error(
                "Group targets are not supported by this role",
                format!(
                    "`target_group_list` can only be set for the roles {}.",
                    VALID_ADMIN_ROLES_FOR_GROUP_TARGET.join(", ")
                ),
                attr_path.attribute("target_group_list"),
            );
        }
    }
}

async fn role_targets(client: &OktaClient, group_id: &str, role_id: &str) -> OktaResult<Vec<String>> {
    Ok(client
        .list_group_role_targets(group_id, role_id)
        .await?
        .into_iter()
        .map(|target| target.id)
        .collect())
}

/// Add the missing targets before removing the others, a role without target applies to every group
async fn sync_targets(client: &OktaClient, group_id: &str, role_id: &str, desired: &[String]) -> OktaResult<()> {
    let current = role_targets(client, group_id, role_id).await?;
    let (add, remove) = grant_revoke(desired, &current);

    for_each_concurrent(client.parallelism(), add, |target| async move {
        client.add_group_role_target(group_id, role_id, &target).await
    })
    .await?;
    for_each_concurrent(client.parallelism(), remove, |target| async move {
        suppress_not_found(client.remove_group_role_target(group_id, role_id, &target).await)
    })
    .await
}

impl<'a> GroupRoleState<'a> {
    /// Refresh the state from Okta, `false` if the role is not assigned anymore
    async fn refresh(&mut self, client: &OktaClient) -> Result<bool, StepError> {
        let group_id = as_str(&self.group_id).to_owned();
        let roles = match client.list_group_roles(&group_id).await {
            Err(err) if err.is_not_found() => return Ok(false),
            result => result.step("Failed to list group roles")?,
        };
        let Some(role) = roles.into_iter().find(|role| role.id == as_str(&self.id)) else {
            return Ok(false);
        };
        self.role_type = string_value(role.role_type.as_str());

        if supports_targets(&role.role_type) {
            let targets = role_targets(client, &group_id, &role.id)
                .await
                .step("Failed to list group role targets")?;
            self.target_group_list = read_set(&self.target_group_list, targets);
        }
        Ok(true)
    }
}

#[derive(Debug, Default, Clone)]
pub struct GroupRoleResource {
    pub(crate) client: ClientHandle,
}

impl GroupRoleResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for GroupRoleResource {
    type State<'a> = Value<GroupRoleState<'a>>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(GroupRoleState::schema())
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
                warn!(
                    group_id = as_str(&state.group_id),
                    role_id = as_str(&state.id),
                    "Group role not found, removing it from state"
                );
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
        state.id = ValueString::Unknown;

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

        let mut trigger_replace = Vec::new();
        if state.group_id != prior.group_id {
            trigger_replace.push(AttributePath::new("group_id"));
        }
        if state.role_type != prior.role_type {
            trigger_replace.push(AttributePath::new("role_type"));
        }
        state.id = if trigger_replace.is_empty() {
            prior.id.clone()
        } else {
            ValueString::Unknown
        };

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
        let group_id = as_str(&state.group_id).to_owned();
        info!(%group_id, role_type = as_str(&state.role_type), "Assign admin role to group");

        let role = ok_or_report(
            diags,
            "Failed to assign admin role to group",
            client
                .create_group_role(&group_id, as_str(&state.role_type))
                .await,
        )?;
        state.id = string_value(role.id.as_str());

        if let Some(targets) = set_strings(&state.target_group_list) {
            let result = sync_targets(&client, &group_id, &role.id, &targets).await;
            if let Err(err) = result {
                StepError {
                    summary: "Failed to add group role targets",
                    source: err,
                }
                .report(diags);
                return Some((Value::Value(state), private_state));
            }
        }

        match state.refresh(&client).await {
            Ok(true) => (),
            Ok(false) => diags.root_error(
                "Group role disappeared",
                format!("The role `{}` could not be read back from Okta.", role.id),
            ),
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

        if supports_targets(as_str(&state.role_type)) {
            let targets = set_strings(&state.target_group_list).unwrap_or_default();
            ok_or_report(
                diags,
                "Failed to update group role targets",
                sync_targets(
                    &client,
                    as_str(&state.group_id),
                    as_str(&state.id),
                    &targets,
                )
                .await,
            )?;
        }

        match state.refresh(&client).await {
            Ok(true) => (),
            Ok(false) => diags.root_error(
                "Group role disappeared",
                format!("The role `{}` could not be read back from Okta.", as_str(&state.id)),
            ),
            Err(err) => err.report(diags),
        }
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
        info!(
            group_id = as_str(&state.group_id),
            role_id = as_str(&state.id),
            "Remove admin role from group"
        );

        ok_or_report(
            diags,
            "Failed to remove admin role from group",
            suppress_not_found(
                client
                    .delete_group_role(as_str(&state.group_id), as_str(&state.id))
                    .await,
            ),
        )
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Some((group_id, role_id)) = id.split_once('/') else {
            diags.root_error(
                "Invalid import id",
                format!("Expected `<group_id>/<role_id>`, got `{id}`."),
            );
            return None;
        };
        let client = self.client.get(diags).await?;

        let mut state = GroupRoleState {
            id: string_value(role_id),
            group_id: string_value(group_id),
            target_group_list: Value::Null,
            ..Default::default()
        };
        match state.refresh(&client).await {
            Ok(true) => Some((Value::Value(state), Default::default())),
            Ok(false) => {
                diags.root_error(
                    "Group role not found",
                    format!("Group `{group_id}` has no role `{role_id}`."),
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

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::tests::test_client;
    use crate::utils::string_set;

    #[tokio::test]
    async fn targets_only_for_user_and_help_desk_admins() {
        let state = GroupRoleState {
            group_id: string_value("00g1"),
            role_type: string_value("APP_ADMIN"),
            target_group_list: string_set(["00g2"]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, Default::default()).await;
        assert_eq!(diags.errors.len(), 1);

        let state = GroupRoleState {
            role_type: string_value("HELP_DESK_ADMIN"),
            ..state
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, Default::default()).await;
        assert!(diags.errors.is_empty());

        let state = GroupRoleState {
            role_type: string_value("GOD_MODE"),
            target_group_list: Value::Null,
            ..state
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, Default::default()).await;
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn create_adds_targets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/groups/00g1/roles"))
            .and(body_json(json!({"type": "USER_ADMIN"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "irb1", "type": "USER_ADMIN", "status": "ACTIVE"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/groups/00g1/roles/irb1/targets/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/groups/00g1/roles/irb1/targets/groups/00g2"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/groups/00g1/roles/irb1/targets/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "00g2"}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/groups/00g1/roles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "irb1", "type": "USER_ADMIN", "status": "ACTIVE"}
            ])))
            .mount(&server)
            .await;

        let resource = GroupRoleResource::new(ClientHandle::with_client(test_client(&server)));
        let planned = GroupRoleState {
            group_id: string_value("00g1"),
            role_type: string_value("USER_ADMIN"),
            target_group_list: string_set(["00g2"]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .create(
                &mut diags,
                Value::Value(planned.clone()),
                Value::Value(planned),
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();

        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        let Value::Value(state) = state else {
            panic!("role state must be known");
        };
        assert_eq!(as_str(&state.id), "irb1");
        assert_eq!(state.target_group_list, string_set(["00g2"]));
    }

    #[tokio::test]
    async fn import_requires_group_and_role() {
        let resource = GroupRoleResource::default();
        let mut diags = Diagnostics::default();
        assert!(resource.import(&mut diags, "00g1".into()).await.is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn update_adds_new_targets_before_removing_old_ones() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/groups/00g1/roles/irb1/targets/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "00g2"}])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/groups/00g1/roles/irb1/targets/groups/00g3"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/groups/00g1/roles/irb1/targets/groups/00g2"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/groups/00g1/roles/irb1/targets/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "00g3"}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/groups/00g1/roles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "irb1", "type": "USER_ADMIN", "status": "ACTIVE"}
            ])))
            .mount(&server)
            .await;

        let resource = GroupRoleResource::new(ClientHandle::with_client(test_client(&server)));
        let prior = GroupRoleState {
            id: string_value("irb1"),
            group_id: string_value("00g1"),
            role_type: string_value("USER_ADMIN"),
            target_group_list: string_set(["00g2"]),
        };
        let planned = GroupRoleState {
            target_group_list: string_set(["00g3"]),
            ..prior.clone()
        };
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .update(
                &mut diags,
                Value::Value(prior),
                Value::Value(planned.clone()),
                Value::Value(planned),
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();

        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        let Value::Value(state) = state else {
            panic!("role state must be known");
        };
        assert_eq!(state.target_group_list, string_set(["00g3"]));

        let changes: Vec<String> = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.method.to_string() != "GET")
            .map(|request| format!("{} {}", request.method, request.url.path()))
            .collect();
        assert_eq!(
            changes,
            [
                "PUT /api/v1/groups/00g1/roles/irb1/targets/groups/00g3",
                "DELETE /api/v1/groups/00g1/roles/irb1/targets/groups/00g2",
            ]
        );
    }

    #[tokio::test]
    async fn destroy_deletes_the_role() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/groups/00g1/roles/irb1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/groups/00g1/roles/irb2"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errorCode": "E0000007",
                "errorSummary": "Not found: Resource not found: irb2 (Role)",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resource = GroupRoleResource::new(ClientHandle::with_client(test_client(&server)));
        for role_id in ["irb1", "irb2"] {
            let state = GroupRoleState {
                id: string_value(role_id),
                group_id: string_value("00g1"),
                role_type: string_value("APP_ADMIN"),
                target_group_list: Value::Null,
            };
            let mut diags = Diagnostics::default();
            let result = resource
                .destroy(&mut diags, Value::Value(state), Default::default())
                .await;
            assert!(result.is_some());
            assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        }
    }
}
