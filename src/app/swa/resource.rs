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

use crate::app::assignments::{app_groups, app_users, sync_app_groups, sync_app_users};
use crate::app::{ensure_app_deleted, set_app_status};
use crate::client::models::STATUS_ACTIVE;
use crate::client::{ClientHandle, OktaClient};
use crate::utils::{
    as_str, ok_or_report, require, set_strings, string_set, string_value, StepContext, StepError,
    WithNormalize, WithSchema, WithValidate,
};

use super::state::SwaAppState;

#[derive(Debug, Default, Clone)]
pub struct SwaAppResource {
    pub(crate) client: ClientHandle,
}

impl SwaAppResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

impl<'a> SwaAppState<'a> {
    /// Refresh the state from Okta, `false` if the application does not exist anymore
    async fn refresh(&mut self, client: &OktaClient) -> Result<bool, StepError> {
        let app = match client.get_app(as_str(&self.id)).await {
            Err(err) if err.is_not_found() => return Ok(false),
            result => result.step("Failed to get SWA application")?,
        };
        self.apply_application(&app);

        if !self.groups.is_null() {
            let groups = app_groups(client, &app.id)
                .await
                .step("Failed to list application groups")?;
            self.groups = string_set(groups);
        }
        if !self.users().is_empty() {
            let users = app_users(client, &app.id)
                .await
                .step("Failed to list application users")?;
            self.apply_users(users);
        }

        Ok(true)
    }

    async fn sync_assignments(
        &self,
        client: &OktaClient,
        prior: Option<&SwaAppState<'_>>,
    ) -> Result<(), StepError> {
        let id = as_str(&self.id);
        let groups_changed = prior.map_or(!self.groups.is_null(), |prior| prior.groups != self.groups);
        if groups_changed {
            let groups = set_strings(&self.groups).unwrap_or_default();
            sync_app_groups(client, id, &groups)
                .await
                .step("Failed to assign groups to application")?;
        }

        let users = self.user_assignments();
        let users_changed = match prior {
            Some(prior) => prior.user_assignments() != users,
            None => !users.is_empty(),
        };
        if users_changed {
            sync_app_users(client, id, &users)
                .await
                .step("Failed to assign users to application")?;
        }
        Ok(())
    }

    async fn read_back(&mut self, diags: &mut Diagnostics, client: &OktaClient) {
        match self.refresh(client).await {
            Ok(true) => (),
            Ok(false) => diags.root_error(
                "SWA application disappeared",
                format!(
                    "The application `{}` could not be read back from Okta.",
                    as_str(&self.id)
                ),
            ),
            Err(err) => err.report(diags),
        }
    }
}

#[async_trait]
impl Resource for SwaAppResource {
    type State<'a> = Value<SwaAppState<'a>>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(SwaAppState::schema())
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
                warn!(id = as_str(&state.id), "SWA application not found, removing it from state");
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
        state.name = ValueString::Unknown;
        state.sign_on_mode = ValueString::Unknown;

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
        if state.preconfigured_app == prior.preconfigured_app {
            state.name = prior.name.clone();
            state.sign_on_mode = prior.sign_on_mode.clone();
        } else {
            state.name = ValueString::Unknown;
            state.sign_on_mode = ValueString::Unknown;
        }

        Some((Value::Value(state), prior_private_state, Vec::new()))
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

        let activate = as_str(&state.status) == STATUS_ACTIVE;
        info!(label = as_str(&state.label), activate, "Create SWA application");
        let app = ok_or_report(
            diags,
            "Failed to create SWA application",
            client.create_app(&state.to_application(), activate).await,
        )?;
        state.id = string_value(app.id.as_str());

        match state.sync_assignments(&client, None).await {
            Ok(()) => state.read_back(diags, &client).await,
            Err(err) => {
                err.report(diags);
                state.apply_application(&app);
            }
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
        let id = as_str(&prior.id);
        info!(id, "Update SWA application");

        let applied = async {
            client
                .update_app(id, &state.to_application())
                .await
                .step("Failed to update SWA application")?;
            set_app_status(&client, id, as_str(&prior.status), as_str(&state.status))
                .await
                .step("Failed to set SWA application status")?;
            state.sync_assignments(&client, Some(&prior)).await
        }
        .await;
        if let Err(err) = applied {
            err.report(diags);
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
        info!(id, "Delete SWA application");

        ok_or_report(
            diags,
            "Failed to delete SWA application",
            ensure_app_deleted(&client, id, as_str(&state.status)).await,
        )
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.client.get(diags).await?;

        let mut state = SwaAppState {
            id: string_value(id.as_str()),
            ..Default::default()
        };
        match state.refresh(&client).await {
            Ok(true) => Some((Value::Value(state), Default::default())),
            Ok(false) => {
                diags.root_error(
                    "SWA application not found",
                    format!("No application matches `{id}` in Okta."),
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
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::state::SwaUserState;
    use super::*;
    use crate::client::tests::test_client;

    fn okta_app(status: &str) -> serde_json::Value {
        json!({
            "id": "0oa1",
            "name": "template_swa",
            "label": "Intranet",
            "status": status,
            "signOnMode": "BROWSER_PLUGIN",
            "accessibility": {"selfService": false},
            "visibility": {"autoSubmitToolbar": false, "hide": {"iOS": false, "web": false}},
            "credentials": {"userNameTemplate": {"template": "${source.login}", "type": "BUILT_IN"}},
            "settings": {"app": {"url": "https://intranet.example.com/login"}},
        })
    }

    fn planned() -> SwaAppState<'static> {
        let mut state = SwaAppState {
            label: string_value("Intranet"),
            url: string_value("https://intranet.example.com/login"),
            groups: string_set(["00g1"]),
            ..Default::default()
        };
        state.normalize(&mut Diagnostics::default());
        state
    }

    #[tokio::test]
    async fn create_assigns_groups() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/apps"))
            .and(query_param("activate", "true"))
            .and(body_partial_json(json!({
                "name": "template_swa",
                "signOnMode": "BROWSER_PLUGIN",
                "label": "Intranet",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(okta_app("ACTIVE")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(okta_app("ACTIVE")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/apps/0oa1/groups/00g1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "00g1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "00g1"}])))
            .mount(&server)
            .await;

        let resource = SwaAppResource::new(ClientHandle::with_client(test_client(&server)));
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .create(
                &mut diags,
                Value::Value(planned()),
                Value::Value(planned()),
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();

        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        let Value::Value(state) = state else {
            panic!("application state must be known");
        };
        assert_eq!(as_str(&state.id), "0oa1");
        assert_eq!(as_str(&state.name), "template_swa");
        assert_eq!(state.groups, string_set(["00g1"]));
        assert!(state.button_field.is_null());
    }

    #[tokio::test]
    async fn delete_deactivates_active_application() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/apps/0oa1/lifecycle/deactivate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/apps/0oa1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let resource = SwaAppResource::new(ClientHandle::with_client(test_client(&server)));
        let state = SwaAppState {
            id: string_value("0oa1"),
            ..planned()
        };
        let mut diags = Diagnostics::default();
        let result = resource
            .destroy(
                &mut diags,
                Value::Value(state),
                Default::default(),
            )
            .await;

        assert!(result.is_some());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn update_toggles_status() {
        for (from, to, operation, other) in [
            ("ACTIVE", "INACTIVE", "deactivate", "activate"),
            ("INACTIVE", "ACTIVE", "activate", "deactivate"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("PUT"))
                .and(path("/api/v1/apps/0oa1"))
                .and(body_partial_json(json!({"label": "Intranet"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(okta_app(from)))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path(format!("/api/v1/apps/0oa1/lifecycle/{operation}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path(format!("/api/v1/apps/0oa1/lifecycle/{other}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
                .expect(0)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/api/v1/apps/0oa1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(okta_app(to)))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/api/v1/apps/0oa1/groups"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "00g1"}])))
                .mount(&server)
                .await;

            let resource = SwaAppResource::new(ClientHandle::with_client(test_client(&server)));
            let prior = SwaAppState {
                id: string_value("0oa1"),
                status: string_value(from),
                ..planned()
            };
            let planned = SwaAppState {
                status: string_value(to),
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
                panic!("application state must be known");
            };
            assert_eq!(as_str(&state.status), to);
        }
    }

    #[tokio::test]
    async fn read_skips_users_assigned_through_groups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(okta_app("ACTIVE")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "00u1", "scope": "USER", "credentials": {"userName": "jdoe"}},
                {"id": "00u2", "scope": "GROUP", "credentials": {"userName": "asmith"}},
            ])))
            .mount(&server)
            .await;

        let resource = SwaAppResource::new(ClientHandle::with_client(test_client(&server)));
        let state = SwaAppState {
            id: string_value("0oa1"),
            groups: Value::Null,
            users: Value::Value(vec![Value::Value(SwaUserState {
                id: string_value("00u1"),
                username: string_value("jdoe"),
                password: Value::Null,
            })]),
            ..planned()
        };
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .read(&mut diags, Value::Value(state), Default::default(), Default::default())
            .await
            .unwrap();

        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        let Value::Value(state) = state else {
            panic!("application state must be known");
        };
        let users: Vec<&str> = state.users().into_iter().map(|user| as_str(&user.id)).collect();
        assert_eq!(users, ["00u1"]);
    }
}
