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

use crate::client::models::{AppUser, AppUserCredentials, PasswordCredential, APP_USER_SCOPE_USER};
use crate::client::{OktaClient, OktaResult};
use crate::diff::grant_revoke;
use crate::utils::for_each_concurrent;

/// Assign the application to the `desired` groups only
pub(crate) async fn sync_app_groups(client: &OktaClient, app_id: &str, desired: &[String]) -> OktaResult<()> {
    let current = app_groups(client, app_id).await?;
    let (assign, remove) = grant_revoke(desired, &current);

    for_each_concurrent(client.parallelism(), remove, |group_id| async move {
        client.remove_app_group(app_id, &group_id).await
    })
    .await?;
    for_each_concurrent(client.parallelism(), assign, |group_id| async move {
        client.assign_app_group(app_id, &group_id).await
    })
    .await
}

pub(crate) async fn app_groups(client: &OktaClient, app_id: &str) -> OktaResult<Vec<String>> {
    Ok(client
        .list_app_groups(app_id)
        .await?
        .into_iter()
        .map(|group| group.id)
        .collect())
}

/// User to assign to an application, with its application credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AppUserAssignment {
    pub id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AppUserAssignment {
    fn to_app_user(&self) -> AppUser {
        let credentials = if self.username.is_none() && self.password.is_none() {
            None
        } else {
            Some(AppUserCredentials {
                user_name: self.username.clone(),
                password: self
                    .password
                    .clone()
                    .map(|value| PasswordCredential { value }),
            })
        };
        AppUser {
            id: self.id.clone(),
            scope: APP_USER_SCOPE_USER.to_owned(),
            credentials,
        }
    }
}

/// Assign the `desired` users to the application, update the credentials of those already
/// assigned, and unassign the others
pub(crate) async fn sync_app_users(
    client: &OktaClient,
    app_id: &str,
    desired: &[AppUserAssignment],
) -> OktaResult<()> {
    let current: HashMap<String, AppUser> = direct_app_users(client, app_id)
        .await?
        .into_iter()
        .map(|user| (user.id.clone(), user))
        .collect();
    let current_ids: Vec<String> = current.keys().cloned().collect();
    let desired_ids: Vec<String> = desired.iter().map(|user| user.id.clone()).collect();
    let (_, remove) = grant_revoke(&desired_ids, &current_ids);

    for_each_concurrent(client.parallelism(), remove, |user_id| async move {
        client.remove_app_user(app_id, &user_id).await
    })
    .await?;

    let mut changed = Vec::new();
    for user in desired {
        let assigned = match current.get(&user.id) {
            None => false,
            Some(assigned) => {
                let username = assigned
                    .credentials
                    .as_ref()
                    .and_then(|credentials| credentials.user_name.as_ref());
                // Passwords are never returned, so they are always sent again
                if username == user.username.as_ref() && user.password.is_none() {
                    continue;
                }
                true
            }
        };
        changed.push((user.to_app_user(), assigned));
    }
    for_each_concurrent(client.parallelism(), changed, |(user, assigned)| async move {
        client.assign_app_user(app_id, &user, assigned).await
    })
    .await
}

/// Users assigned to the application on their own, group assignments are left to the groups
async fn direct_app_users(client: &OktaClient, app_id: &str) -> OktaResult<Vec<AppUser>> {
    Ok(client
        .list_app_users(app_id)
        .await?
        .into_iter()
        .filter(|user| user.scope == APP_USER_SCOPE_USER)
        .collect())
}

/// Users assigned to the application, with their application username
pub(crate) async fn app_users(client: &OktaClient, app_id: &str) -> OktaResult<Vec<(String, Option<String>)>> {
    Ok(direct_app_users(client, app_id)
        .await?
        .into_iter()
        .map(|user| {
            let username = user.credentials.and_then(|credentials| credentials.user_name);
            (user.id, username)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::tests::test_client;

    #[tokio::test]
    async fn groups_are_reconciled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/groups"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": "00g1"}, {"id": "00g2"}])),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/apps/0oa1/groups/00g1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/apps/0oa1/groups/00g3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "00g3"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let desired = vec!["00g2".to_owned(), "00g3".to_owned()];
        sync_app_groups(&client, "0oa1", &desired).await.unwrap();
    }

    #[tokio::test]
    async fn users_are_assigned_updated_and_removed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "00u1", "scope": "USER", "credentials": {"userName": "jdoe"}},
                {"id": "00u2", "scope": "USER", "credentials": {"userName": "old"}},
                {"id": "00u3", "scope": "USER", "credentials": {"userName": "gone"}},
            ])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/apps/0oa1/users/00u3"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/apps/0oa1/users/00u2"))
            .and(body_partial_json(json!({"credentials": {"userName": "new"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "00u2"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/apps/0oa1/users"))
            .and(body_partial_json(json!({"id": "00u4", "scope": "USER"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "00u4"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/apps/0oa1/users/00u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "00u1"})))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let desired = vec![
            AppUserAssignment {
                id: "00u1".into(),
                username: Some("jdoe".into()),
                password: None,
            },
            AppUserAssignment {
                id: "00u2".into(),
                username: Some("new".into()),
                password: None,
            },
            AppUserAssignment {
                id: "00u4".into(),
                username: None,
                password: None,
            },
        ];
        sync_app_users(&client, "0oa1", &desired).await.unwrap();
    }

    #[tokio::test]
    async fn group_assigned_users_are_left_alone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/apps/0oa1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "00u1", "scope": "USER", "credentials": {"userName": "jdoe"}},
                {"id": "00u2", "scope": "GROUP", "credentials": {"userName": "asmith"}},
            ])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/apps/0oa1/users/00u2"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "errorCode": "E0000038",
                "errorSummary": "user assigned via group",
            })))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert_eq!(
            app_users(&client, "0oa1").await.unwrap(),
            vec![("00u1".to_owned(), Some("jdoe".to_owned()))]
        );

        let desired = vec![AppUserAssignment {
            id: "00u1".into(),
            username: Some("jdoe".into()),
            password: None,
        }];
        sync_app_users(&client, "0oa1", &desired).await.unwrap();
    }
}
