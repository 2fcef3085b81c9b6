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

use reqwest::Method;

use super::models::{AppUser, Application, GroupRef, ScopeConsentGrant};
use super::{OktaClient, OktaResult};

const NO_BODY: Option<&()> = None;

impl OktaClient {
    pub async fn create_app(&self, app: &Application, activate: bool) -> OktaResult<Application> {
        self.call(
            Method::POST,
            "/api/v1/apps",
            &[("activate", if activate { "true" } else { "false" })],
            Some(app),
        )
        .await
    }

    pub async fn get_app(&self, id: &str) -> OktaResult<Application> {
        self.call(Method::GET, &format!("/api/v1/apps/{id}"), &[], NO_BODY)
            .await
    }

    pub async fn update_app(&self, id: &str, app: &Application) -> OktaResult<Application> {
        self.call(Method::PUT, &format!("/api/v1/apps/{id}"), &[], Some(app))
            .await
    }

    pub async fn activate_app(&self, id: &str) -> OktaResult<()> {
        self.execute(
            Method::POST,
            &format!("/api/v1/apps/{id}/lifecycle/activate"),
            &[],
            NO_BODY,
        )
        .await
    }

    pub async fn deactivate_app(&self, id: &str) -> OktaResult<()> {
        self.execute(
            Method::POST,
            &format!("/api/v1/apps/{id}/lifecycle/deactivate"),
            &[],
            NO_BODY,
        )
        .await
    }

    /// Only inactive applications can be deleted
    pub async fn delete_app(&self, id: &str) -> OktaResult<()> {
        self.execute(Method::DELETE, &format!("/api/v1/apps/{id}"), &[], NO_BODY)
            .await
    }

    pub async fn list_app_groups(&self, id: &str) -> OktaResult<Vec<GroupRef>> {
        self.list(&format!("/api/v1/apps/{id}/groups"), &[("limit", "200")])
            .await
    }

    pub async fn assign_app_group(&self, id: &str, group_id: &str) -> OktaResult<()> {
        self.execute(
            Method::PUT,
            &format!("/api/v1/apps/{id}/groups/{group_id}"),
            &[],
            Some(&serde_json::json!({})),
        )
        .await
    }

    pub async fn remove_app_group(&self, id: &str, group_id: &str) -> OktaResult<()> {
        self.execute(
            Method::DELETE,
            &format!("/api/v1/apps/{id}/groups/{group_id}"),
            &[],
            NO_BODY,
        )
        .await
    }

    pub async fn list_app_users(&self, id: &str) -> OktaResult<Vec<AppUser>> {
        self.list(&format!("/api/v1/apps/{id}/users"), &[("limit", "200")])
            .await
    }

    /// Assign a user to an application, or update the credentials of an assigned user
    pub async fn assign_app_user(&self, id: &str, user: &AppUser, assigned: bool) -> OktaResult<()> {
        let path = if assigned {
            format!("/api/v1/apps/{id}/users/{}", user.id)
        } else {
            format!("/api/v1/apps/{id}/users")
        };
        self.execute(Method::POST, &path, &[], Some(user)).await
    }

    pub async fn remove_app_user(&self, id: &str, user_id: &str) -> OktaResult<()> {
        self.execute(
            Method::DELETE,
            &format!("/api/v1/apps/{id}/users/{user_id}"),
            &[],
            NO_BODY,
        )
        .await
    }

    pub async fn list_scope_consent_grants(&self, app_id: &str) -> OktaResult<Vec<ScopeConsentGrant>> {
        self.list(&format!("/api/v1/apps/{app_id}/grants"), &[])
            .await
    }

    pub async fn grant_consent_to_scope(
        &self,
        app_id: &str,
        issuer: &str,
        scope_id: &str,
    ) -> OktaResult<ScopeConsentGrant> {
        let grant = ScopeConsentGrant {
            id: String::new(),
            issuer: issuer.to_owned(),
            scope_id: scope_id.to_owned(),
        };
        self.call(
            Method::POST,
            &format!("/api/v1/apps/{app_id}/grants"),
            &[],
            Some(&grant),
        )
        .await
    }

    pub async fn revoke_scope_consent_grant(&self, app_id: &str, grant_id: &str) -> OktaResult<()> {
        self.execute(
            Method::DELETE,
            &format!("/api/v1/apps/{app_id}/grants/{grant_id}"),
            &[],
            NO_BODY,
        )
        .await
    }
}
