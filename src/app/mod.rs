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

//! Okta applications

mod assignments;
mod oauth_api_scope;
mod swa;

pub use oauth_api_scope::OAuthApiScopeResource;
pub use swa::SwaAppResource;

use tracing::info;

use crate::client::models::{STATUS_ACTIVE, STATUS_INACTIVE};
use crate::client::{OktaClient, OktaResult};

/// Activate or deactivate an application when its status differs from the desired one
pub(crate) async fn set_app_status(
    client: &OktaClient,
    id: &str,
    current: &str,
    desired: &str,
) -> OktaResult<()> {
    if current == desired {
        return Ok(());
    }
    info!(id, from = current, to = desired, "Update application status");
    match desired {
        STATUS_ACTIVE => client.activate_app(id).await,
        STATUS_INACTIVE => client.deactivate_app(id).await,
        _ => Ok(()),
    }
}

/// Applications must be inactive to be deleted, and a missing application is already deleted
pub(crate) async fn ensure_app_deleted(client: &OktaClient, id: &str, status: &str) -> OktaResult<()> {
    if status == STATUS_ACTIVE {
        match client.deactivate_app(id).await {
            Err(err) if err.is_not_found() => return Ok(()),
            result => result?,
        }
    }
    match client.delete_app(id).await {
        Err(err) if err.is_not_found() => Ok(()),
        result => result,
    }
}
