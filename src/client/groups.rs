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

use super::models::{Group, GroupRef, Role};
use super::{OktaClient, OktaResult};

const NO_BODY: Option<&()> = None;

impl OktaClient {
    pub async fn list_user_groups(&self, user_id: &str) -> OktaResult<Vec<Group>> {
        self.list(&format!("/api/v1/users/{user_id}/groups"), &[])
            .await
    }

    pub async fn add_user_to_group(&self, group_id: &str, user_id: &str) -> OktaResult<()> {
        self.execute(
            Method::PUT,
            &format!("/api/v1/groups/{group_id}/users/{user_id}"),
            &[],
            NO_BODY,
        )
        .await
    }

    pub async fn remove_user_from_group(&self, group_id: &str, user_id: &str) -> OktaResult<()> {
        self.execute(
            Method::DELETE,
            &format!("/api/v1/groups/{group_id}/users/{user_id}"),
            &[],
            NO_BODY,
        )
        .await
    }

    pub async fn list_group_roles(&self, group_id: &str) -> OktaResult<Vec<Role>> {
        self.list(&format!("/api/v1/groups/{group_id}/roles"), &[])
            .await
    }

    pub async fn create_group_role(&self, group_id: &str, role_type: &str) -> OktaResult<Role> {
        let role = Role {
            role_type: role_type.to_owned(),
            ..Default::default()
        };
        self.call(
            Method::POST,
            &format!("/api/v1/groups/{group_id}/roles"),
            &[],
            Some(&role),
        )
        .await
    }

    pub async fn delete_group_role(&self, group_id: &str, role_id: &str) -> OktaResult<()> {
        self.execute(
            Method::DELETE,
            &format!("/api/v1/groups/{group_id}/roles/{role_id}"),
            &[],
            NO_BODY,
        )
        .await
    }

    pub async fn list_group_role_targets(
        &self,
        group_id: &str,
        role_id: &str,
    ) -> OktaResult<Vec<GroupRef>> {
        self.list(
            &format!("/api/v1/groups/{group_id}/roles/{role_id}/targets/groups"),
            &[],
        )
        .await
    }

    pub async fn add_group_role_target(
        &self,
        group_id: &str,
        role_id: &str,
        target_group_id: &str,
    ) -> OktaResult<()> {
        self.execute(
            Method::PUT,
            &format!("/api/v1/groups/{group_id}/roles/{role_id}/targets/groups/{target_group_id}"),
            &[],
            NO_BODY,
        )
        .await
    }

    pub async fn remove_group_role_target(
        &self,
        group_id: &str,
        role_id: &str,
        target_group_id: &str,
    ) -> OktaResult<()> {
        self.execute(
            Method::DELETE,
            &format!("/api/v1/groups/{group_id}/roles/{role_id}/targets/groups/{target_group_id}"),
            &[],
            NO_BODY,
        )
        .await
    }
}
