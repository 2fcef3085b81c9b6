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

use std::time::Duration;

use tracing::{debug, info};

use crate::client::models::{
    GROUP_TYPE_BUILT_IN, STATUS_ACTIVE, USER_STATUS_DEPROVISIONED, USER_STATUS_SUSPENDED,
};
use crate::client::{OktaClient, OktaError, OktaResult, UserLifecycle};
use crate::diff::grant_revoke;
use crate::utils::for_each_concurrent;

use super::profile::{map_status, status_satisfies};

const TRANSITION_POLLS: u32 = 30;
const TRANSITION_INTERVAL: Duration = Duration::from_secs(1);

/// Move a user to the desired status, and wait for Okta to settle
pub(crate) async fn update_user_status(client: &OktaClient, id: &str, desired: &str) -> OktaResult<()> {
    let user = client.get_user(id).await?;
    if status_satisfies(desired, map_status(&user.status)) {
        return Ok(());
    }

    let operation = match desired {
        USER_STATUS_SUSPENDED => UserLifecycle::Suspend,
        USER_STATUS_DEPROVISIONED => UserLifecycle::Deactivate,
        STATUS_ACTIVE if user.status == USER_STATUS_SUSPENDED => UserLifecycle::Unsuspend,
        STATUS_ACTIVE => UserLifecycle::Activate,
        _ => return Ok(()),
    };
    info!(id, from = %user.status, to = desired, "Update user status");
    client.user_lifecycle(id, operation).await?;

    wait_for_status_transition(client, id).await
}

async fn wait_for_status_transition(client: &OktaClient, id: &str) -> OktaResult<()> {
    let mut pending = String::new();
    for _ in 0..TRANSITION_POLLS {
        let user = client.get_user(id).await?;
        match user.transitioning_to_status {
            Some(status) if !status.is_empty() => {
                debug!(id, %status, "User is transitioning");
                pending = status;
                tokio::time::sleep(TRANSITION_INTERVAL).await;
            }
            _ => return Ok(()),
        }
    }
    Err(OktaError::StatusTransition {
        id: id.to_owned(),
        status: pending,
    })
}

/// Grant and revoke admin roles so the user has exactly `desired`
pub(crate) async fn sync_admin_roles(client: &OktaClient, id: &str, desired: &[String]) -> OktaResult<()> {
    let roles = client.list_user_roles(id).await?;
    let current: Vec<String> = roles.iter().map(|role| role.role_type.clone()).collect();
    let (grant, revoke) = grant_revoke(desired, &current);

    let revoke_ids: Vec<String> = roles
        .into_iter()
        .filter(|role| revoke.contains(&role.role_type))
        .map(|role| role.id)
        .collect();
    for_each_concurrent(client.parallelism(), revoke_ids, |role_id| async move {
        client.remove_user_role(id, &role_id).await
    })
    .await?;

    for_each_concurrent(client.parallelism(), grant, |role_type| async move {
        client.assign_user_role(id, &role_type).await.map(drop)
    })
    .await
}

/// Assign the user to the `desired` groups, and remove it from the others
pub(crate) async fn sync_groups(client: &OktaClient, id: &str, desired: &[String]) -> OktaResult<()> {
    let current = user_groups(client, id).await?;
    let (add, remove) = grant_revoke(desired, &current);

    for_each_concurrent(client.parallelism(), remove, |group_id| async move {
        client.remove_user_from_group(&group_id, id).await
    })
    .await?;
    for_each_concurrent(client.parallelism(), add, |group_id| async move {
        client.add_user_to_group(&group_id, id).await
    })
    .await
}

/// Groups the user is member of, without the built-in Everyone group
pub(crate) async fn user_groups(client: &OktaClient, id: &str) -> OktaResult<Vec<String>> {
    Ok(client
        .list_user_groups(id)
        .await?
        .into_iter()
        .filter(|group| group.group_type != GROUP_TYPE_BUILT_IN)
        .map(|group| group.id)
        .collect())
}

/// Only deprovisioned users can be deleted: an active user is deactivated by the first call
pub(crate) async fn ensure_user_deleted(client: &OktaClient, id: &str, status: &str) -> OktaResult<()> {
    let passes = if status == USER_STATUS_DEPROVISIONED { 1 } else { 2 };
    for _ in 0..passes {
        match client.deactivate_or_delete_user(id).await {
            Err(err) if err.is_not_found() => return Ok(()),
            result => result?,
        }
    }
    Ok(())
}
