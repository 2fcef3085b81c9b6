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
use tf_provider::data_source::DynamicDataSource;
use tf_provider::resource::DynamicResource;
use tf_provider::{map, AttributePath, Diagnostics, Provider, Schema, ValueEmpty};
use tracing::{debug, info};

use crate::app::{OAuthApiScopeResource, SwaAppResource};
use crate::client::{ClientHandle, OktaClient};
use crate::config::ProviderConfig;
use crate::group_role::GroupRoleResource;
use crate::user::{UserResource, UsersDataSource};
use crate::utils::{WithSchema, WithValidate};

#[derive(Debug, Default, Clone)]
pub struct OktaProvider {
    client: ClientHandle,
}

#[async_trait]
impl Provider for OktaProvider {
    type Config<'a> = ProviderConfig<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ProviderConfig::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        config.validate(diags, AttributePath::default()).await;

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        debug!(%terraform_version, "Configure provider");
        let settings = config.settings(diags, |name| std::env::var(name).ok())?;
        info!(org_url = %settings.org_url, "Connect to Okta");

        match OktaClient::new(settings) {
            Ok(client) => {
                self.client.set(client).await;
                Some(())
            }
            Err(err) => {
                diags.root_error("Failed to create the Okta client", err.to_string());
                None
            }
        }
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicResource>>> {
        Some(map! {
            "user" => UserResource::new(self.client.clone()),
            "app_swa" => SwaAppResource::new(self.client.clone()),
            "app_oauth_api_scope" => OAuthApiScopeResource::new(self.client.clone()),
            "group_role" => GroupRoleResource::new(self.client.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicDataSource>>> {
        Some(map! {
            "users" => UsersDataSource::new(self.client.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_resource() {
        let provider = OktaProvider::default();
        let mut diags = Diagnostics::default();

        let mut resources: Vec<String> = provider
            .get_resources(&mut diags)
            .unwrap()
            .into_keys()
            .collect();
        resources.sort();
        assert_eq!(resources, ["app_oauth_api_scope", "app_swa", "group_role", "user"]);

        let data_sources: Vec<String> = provider
            .get_data_sources(&mut diags)
            .unwrap()
            .into_keys()
            .collect();
        assert_eq!(data_sources, ["users"]);
    }
}
