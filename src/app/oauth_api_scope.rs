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

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Resource, Schema, Value, ValueEmpty, ValueString,
};
use tracing::{info, warn};

use crate::client::models::ScopeConsentGrant;
use crate::client::{suppress_not_found, ClientHandle, OktaClient, OktaResult};
use crate::diff::{grant_revoke, keep_order};
use crate::utils::{
    as_str, list_strings, ok_or_report, require, string_list, string_value, ValueStringList,
    WithSchema,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthApiScopeState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub app_id: ValueString<'a>,
    pub issuer: ValueString<'a>,
    pub scopes: ValueStringList<'a>,
}

impl<'a> WithSchema for OAuthApiScopeState<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("Consent grants of OAuth API scopes to an application"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("ID of the application"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "app_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("ID of the application."),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "issuer" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The issuer of your Org Authorization Server, your Org URL."),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "scopes" => Attribute {
                        attr_type: AttributeType::List(AttributeType::String.into()),
                        description: Description::plain("Scopes of the application for which consent is granted."),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                },
                ..Default::default()
            },
        }
    }
}

/// Scopes granted to an application, `None` when the application is gone
async fn granted_scopes(client: &OktaClient, app_id: &str) -> OktaResult<Option<Vec<ScopeConsentGrant>>> {
    match client.list_scope_consent_grants(app_id).await {
        Err(err) if err.is_not_found() => Ok(None),
        result => result.map(Some),
    }
}

async fn grant_scopes(client: &OktaClient, app_id: &str, issuer: &str, scopes: &[String]) -> OktaResult<()> {
    // Grants are issued one after the other, in the declared order
    for scope in scopes {
        info!(app_id, %scope, "Grant scope consent");
        client.grant_consent_to_scope(app_id, issuer, scope).await?;
    }
    Ok(())
}

/// Revoke scopes by name, the grant ids being looked up just before
async fn revoke_scopes(client: &OktaClient, app_id: &str, scopes: &[String]) -> OktaResult<()> {
    if scopes.is_empty() {
        return Ok(());
    }
    let grants: HashMap<String, String> = suppress_list(client.list_scope_consent_grants(app_id).await)?
        .into_iter()
        .map(|grant| (grant.scope_id, grant.id))
        .collect();
    for scope in scopes {
        let Some(grant_id) = grants.get(scope) else {
            continue;
        };
        info!(app_id, %scope, "Revoke scope consent");
        suppress_not_found(client.revoke_scope_consent_grant(app_id, grant_id).await)?;
    }
    Ok(())
}

fn suppress_list<T>(result: OktaResult<Vec<T>>) -> OktaResult<Vec<T>> {
    match result {
        Err(err) if err.is_not_found() => Ok(Vec::new()),
        result => result,
    }
}

impl<'a> OAuthApiScopeState<'a> {
    fn apply_grants(&mut self, grants: &[ScopeConsentGrant]) {
        let current: Vec<String> = grants.iter().map(|grant| grant.scope_id.clone()).collect();
        self.id = self.app_id.clone();
        self.scopes = string_list(keep_order(&list_strings(&self.scopes), &current));
    }
}

#[derive(Debug, Default, Clone)]
pub struct OAuthApiScopeResource {
    pub(crate) client: ClientHandle,
}

impl OAuthApiScopeResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }

    async fn read_back<'a>(
        &self,
        diags: &mut Diagnostics,
        client: &OktaClient,
        mut state: OAuthApiScopeState<'a>,
    ) -> Option<OAuthApiScopeState<'a>> {
        let grants = ok_or_report(
            diags,
            "Failed to get application scope consent grants",
            granted_scopes(client, as_str(&state.app_id)).await,
        )?;
        state.apply_grants(grants.as_deref().unwrap_or_default());
        Some(state)
    }
}

#[async_trait]
impl Resource for OAuthApiScopeResource {
    type State<'a> = Value<OAuthApiScopeState<'a>>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(OAuthApiScopeState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if let Value::Value(config) = &config {
            if let Value::Value(scopes) = &config.scopes {
                if scopes.is_empty() {
                    diags.error_short(
                        "At least one scope must be granted",
                        AttributePath::new("scopes"),
                    );
                }
            }
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

        let grants = ok_or_report(
            diags,
            "Failed to get application scope consent grants",
            granted_scopes(&client, as_str(&state.app_id)).await,
        )?;
        match grants {
            Some(grants) => {
                state.apply_grants(&grants);
                Some((Value::Value(state), private_state))
            }
            None => {
                warn!(app_id = as_str(&state.app_id), "Application not found, removing the resource from state");
                Some((Value::Null, private_state))
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
        state.id = state.app_id.clone();

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
        state.id = state.app_id.clone();

        let mut trigger_replace = Vec::new();
        if state.app_id != prior.app_id {
            trigger_replace.push(AttributePath::new("app_id"));
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
        let state = require(diags, planned_state)?;
        let client = self.client.get(diags).await?;

        let scopes = list_strings(&state.scopes);
        ok_or_report(
            diags,
            "Failed to create application scope consent grant",
            grant_scopes(
                &client,
                as_str(&state.app_id),
                as_str(&state.issuer),
                &scopes,
            )
            .await,
        )?;

        let state = self.read_back(diags, &client, state).await?;
        Some((Value::Value(state), private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = require(diags, planned_state)?;
        let client = self.client.get(diags).await?;
        let app_id = as_str(&state.app_id);

        let current: Vec<String> = ok_or_report(
            diags,
            "Failed to get application scope consent grants",
            client.list_scope_consent_grants(app_id).await,
        )?
        .into_iter()
        .map(|grant| grant.scope_id)
        .collect();
        let desired = list_strings(&state.scopes);
        let (grant, revoke) = grant_revoke(&desired, &current);

        ok_or_report(
            diags,
            "Failed to create application scope consent grant",
            grant_scopes(&client, app_id, as_str(&state.issuer), &grant).await,
        )?;
        ok_or_report(
            diags,
            "Failed to revoke application scope consent grant",
            revoke_scopes(&client, app_id, &revoke).await,
        )?;

        let state = self.read_back(diags, &client, state).await?;
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

        let scopes = list_strings(&state.scopes);
        ok_or_report(
            diags,
            "Failed to revoke application scope consent grant",
            revoke_scopes(&client, as_str(&state.app_id), &scopes).await,
        )
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.client.get(diags).await?;

        let grants = ok_or_report(
            diags,
            "Failed to get application scope consent grants",
            client.list_scope_consent_grants(&id).await,
        )?;
        // Every scope is assumed to be granted by the same issuer
        let Some(first) = grants.first() else {
            diags.root_error(
                "Failed to import application scopes",
                "no application scope found",
            );
            return None;
        };

        let mut state = OAuthApiScopeState {
            app_id: string_value(id.as_str()),
            issuer: string_value(first.issuer.as_str()),
            ..Default::default()
        };
        state.apply_grants(&grants);
        Some((Value::Value(state), Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::tests::test_client;

    const ISSUER: &str = "https://example.okta.com";

    fn grant(id: &str, scope: &str) -> serde_json::Value {
        json!({"id": id, "issuer": ISSUER, "scopeId": scope})
    }

    fn state(scopes: &[&str]) -> OAuthApiScopeState<'static> {
        OAuthApiScopeState {
            id: string_value("0oa1"),
            app_id: string_value("0oa1"),
            issuer: string_value(ISSUER),
            scopes: string_list(scopes.iter().copied()),
        }
    }

    #[tokio::test]
    async fn update_grants_then_revokes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/grants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                grant("oag1", "okta.users.read"),
                grant("oag2", "okta.groups.read"),
            ])))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/apps/0oa1/grants"))
            .and(body_json(json!({"issuer": ISSUER, "scopeId": "okta.apps.read"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant("oag3", "okta.apps.read")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/apps/0oa1/grants/oag2"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/grants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                grant("oag3", "okta.apps.read"),
                grant("oag1", "okta.users.read"),
            ])))
            .mount(&server)
            .await;

        let resource = OAuthApiScopeResource::new(ClientHandle::with_client(test_client(&server)));
        let planned = state(&["okta.users.read", "okta.apps.read"]);
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .update(
                &mut diags,
                Value::Value(state(&["okta.users.read", "okta.groups.read"])),
                Value::Value(planned.clone()),
                Value::Value(planned),
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();

        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
        let Value::Value(state) = state else {
            panic!("scope state must be known");
        };
        assert_eq!(
            list_strings(&state.scopes),
            ["okta.users.read", "okta.apps.read"]
        );
    }

    #[tokio::test]
    async fn import_without_grants_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/grants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let resource = OAuthApiScopeResource::new(ClientHandle::with_client(test_client(&server)));
        let mut diags = Diagnostics::default();
        assert!(resource.import(&mut diags, "0oa1".into()).await.is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn import_takes_issuer_from_first_grant() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/grants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                grant("oag1", "okta.users.read"),
                grant("oag2", "okta.groups.read"),
            ])))
            .mount(&server)
            .await;

        let resource = OAuthApiScopeResource::new(ClientHandle::with_client(test_client(&server)));
        let mut diags = Diagnostics::default();
        let (state, _) = resource.import(&mut diags, "0oa1".into()).await.unwrap();
        let Value::Value(state) = state else {
            panic!("scope state must be known");
        };
        assert_eq!(as_str(&state.id), "0oa1");
        assert_eq!(as_str(&state.issuer), ISSUER);
        assert_eq!(
            list_strings(&state.scopes),
            ["okta.users.read", "okta.groups.read"]
        );
    }

    #[tokio::test]
    async fn read_keeps_an_empty_grant_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/grants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa2/grants"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errorCode": "E0000007",
                "errorSummary": "Not found: Resource not found: 0oa2 (AppInstance)",
            })))
            .mount(&server)
            .await;

        let resource = OAuthApiScopeResource::new(ClientHandle::with_client(test_client(&server)));
        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .read(&mut diags, Value::Value(state(&["okta.users.read"])), Default::default(), Default::default())
            .await
            .unwrap();
        let Value::Value(state) = state else {
            panic!("an application without grants stays in state");
        };
        assert!(matches!(&state.scopes, Value::Value(scopes) if scopes.is_empty()));

        let gone = OAuthApiScopeState {
            id: string_value("0oa2"),
            app_id: string_value("0oa2"),
            ..state
        };
        let (state, _) = resource
            .read(&mut diags, Value::Value(gone), Default::default(), Default::default())
            .await
            .unwrap();
        assert!(state.is_null());
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
    }

    #[tokio::test]
    async fn create_grants_every_scope() {
        let server = MockServer::start().await;
        for (id, scope) in [("oag1", "okta.users.read"), ("oag2", "okta.groups.read")] {
            Mock::given(method("POST"))
                .and(path("/api/v1/apps/0oa1/grants"))
                .and(body_json(json!({"issuer": ISSUER, "scopeId": scope})))
                .respond_with(ResponseTemplate::new(200).set_body_json(grant(id, scope)))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/grants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                grant("oag2", "okta.groups.read"),
                grant("oag1", "okta.users.read"),
            ])))
            .mount(&server)
            .await;

        let resource = OAuthApiScopeResource::new(ClientHandle::with_client(test_client(&server)));
        let planned = OAuthApiScopeState {
            id: Value::Unknown,
            ..state(&["okta.users.read", "okta.groups.read"])
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
            panic!("scope state must be known");
        };
        assert_eq!(as_str(&state.id), "0oa1");
        assert_eq!(
            list_strings(&state.scopes),
            ["okta.users.read", "okta.groups.read"]
        );
    }

    #[tokio::test]
    async fn destroy_revokes_scopes_in_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/grants"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                grant("oag1", "okta.users.read"),
                grant("oag2", "okta.groups.read"),
                grant("oag3", "okta.apps.read"),
            ])))
            .mount(&server)
            .await;
        for grant_id in ["oag1", "oag2"] {
            Mock::given(method("DELETE"))
                .and(path(format!("/api/v1/apps/0oa1/grants/{grant_id}")))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("DELETE"))
            .and(path("/api/v1/apps/0oa1/grants/oag3"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let resource = OAuthApiScopeResource::new(ClientHandle::with_client(test_client(&server)));
        let mut diags = Diagnostics::default();
        resource
            .destroy(
                &mut diags,
                Value::Value(state(&["okta.users.read", "okta.groups.read"])),
                Default::default(),
            )
            .await
            .unwrap();
        assert!(diags.errors.is_empty(), "{:?}", diags.errors);
    }
}
