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

use super::models::{
    ChangePassword, PasswordCredential, Role, User, UserCredentials,
};
use super::{OktaClient, OktaResult};

const NO_BODY: Option<&()> = None;

/// Lifecycle operations of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLifecycle {
    Activate,
    Deactivate,
    Suspend,
    Unsuspend,
}

impl UserLifecycle {
    fn as_str(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Suspend => "suspend",
            Self::Unsuspend => "unsuspend",
        }
    }
}

impl OktaClient {
    pub async fn create_user(&self, user: &User, activate: bool) -> OktaResult<User> {
        self.call(
            Method::POST,
            "/api/v1/users",
            &[("activate", if activate { "true" } else { "false" })],
            Some(user),
        )
        .await
    }

    /// Get a user from its id or its login
    pub async fn get_user(&self, id: &str) -> OktaResult<User> {
        self.call(Method::GET, &format!("/api/v1/users/{id}"), &[], NO_BODY)
            .await
    }

    pub async fn update_user(&self, id: &str, user: &User) -> OktaResult<User> {
        self.call(Method::PUT, &format!("/api/v1/users/{id}"), &[], Some(user))
            .await
    }

    pub async fn list_users(&self, search: &str) -> OktaResult<Vec<User>> {
        let mut query = vec![("limit", "200")];
        if !search.is_empty() {
            query.push(("search", search));
        }
        self.list("/api/v1/users", &query).await
    }

    pub async fn change_password(&self, id: &str, old: &str, new: &str) -> OktaResult<()> {
        let body = ChangePassword {
            old_password: PasswordCredential {
                value: old.to_owned(),
            },
            new_password: PasswordCredential {
                value: new.to_owned(),
            },
        };
        self.execute(
            Method::POST,
            &format!("/api/v1/users/{id}/credentials/change_password"),
            &[],
            Some(&body),
        )
        .await
    }

    pub async fn change_recovery_question(
        &self,
        id: &str,
        credentials: &UserCredentials,
    ) -> OktaResult<()> {
        self.execute(
            Method::POST,
            &format!("/api/v1/users/{id}/credentials/change_recovery_question"),
            &[],
            Some(credentials),
        )
        .await
    }

    pub async fn user_lifecycle(&self, id: &str, operation: UserLifecycle) -> OktaResult<()> {
        let query: &[(&str, &str)] = match operation {
            UserLifecycle::Activate => &[("sendEmail", "false")],
            _ => &[],
        };
        self.execute(
            Method::POST,
            &format!("/api/v1/users/{id}/lifecycle/{}", operation.as_str()),
            query,
            NO_BODY,
        )
        .await
    }

    /// Deactivate an active user, or delete a deactivated one
    pub async fn deactivate_or_delete_user(&self, id: &str) -> OktaResult<()> {
        self.execute(Method::DELETE, &format!("/api/v1/users/{id}"), &[], NO_BODY)
            .await
    }

    pub async fn list_user_roles(&self, id: &str) -> OktaResult<Vec<Role>> {
        self.list(&format!("/api/v1/users/{id}/roles"), &[]).await
    }

    pub async fn assign_user_role(&self, id: &str, role_type: &str) -> OktaResult<Role> {
        let role = Role {
            role_type: role_type.to_owned(),
            ..Default::default()
        };
        self.call(
            Method::POST,
            &format!("/api/v1/users/{id}/roles"),
            &[],
            Some(&role),
        )
        .await
    }

    pub async fn remove_user_role(&self, id: &str, role_id: &str) -> OktaResult<()> {
        self.execute(
            Method::DELETE,
            &format!("/api/v1/users/{id}/roles/{role_id}"),
            &[],
            NO_BODY,
        )
        .await
    }
}
