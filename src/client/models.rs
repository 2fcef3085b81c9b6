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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_INACTIVE: &str = "INACTIVE";
pub const USER_STATUS_STAGED: &str = "STAGED";
pub const USER_STATUS_PROVISIONED: &str = "PROVISIONED";
pub const USER_STATUS_DEPROVISIONED: &str = "DEPROVISIONED";
pub const USER_STATUS_SUSPENDED: &str = "SUSPENDED";
pub const USER_STATUS_PASSWORD_EXPIRED: &str = "PASSWORD_EXPIRED";
pub const USER_STATUS_RECOVERY: &str = "RECOVERY";

pub const GROUP_TYPE_BUILT_IN: &str = "BUILT_IN";
pub const APP_USER_SCOPE_USER: &str = "USER";

pub const VALID_ADMIN_ROLES: &[&str] = &[
    "SUPER_ADMIN",
    "ORG_ADMIN",
    "API_ACCESS_MANAGEMENT_ADMIN",
    "APP_ADMIN",
    "USER_ADMIN",
    "MOBILE_ADMIN",
    "READ_ONLY_ADMIN",
    "HELP_DESK_ADMIN",
];
pub const VALID_ADMIN_ROLES_FOR_GROUP_TARGET: &[&str] = &["USER_ADMIN", "HELP_DESK_ADMIN"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing)]
    pub transitioning_to_status: Option<String>,
    #[serde(default)]
    pub profile: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<UserCredentials>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_question: Option<RecoveryQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCredential {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    pub old_password: PasswordCredential,
    pub new_password: PasswordCredential,
}

/// Administrator role assigned to a user or a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type")]
    pub role_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub assignment_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default, rename = "type")]
    pub group_type: String,
}

/// Group target of an administrator role, or group assigned to an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sign_on_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<Accessibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ApplicationCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SwaSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessibility {
    #[serde(default)]
    pub self_service: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_redirect_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    #[serde(default)]
    pub auto_submit_toolbar: bool,
    #[serde(default)]
    pub hide: Hide,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hide {
    #[serde(default, rename = "iOS")]
    pub ios: bool,
    #[serde(default)]
    pub web: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name_template: Option<UserNameTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNameTemplate {
    #[serde(default)]
    pub template: String,
    #[serde(default, rename = "type")]
    pub template_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwaSettings {
    #[serde(default)]
    pub app: SwaSettingsApp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwaSettingsApp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url_regex: Option<String>,
}

/// User assigned to an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<AppUserCredentials>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUserCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordCredential>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeConsentGrant {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub issuer: String,
    pub scope_id: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn user_keeps_unknown_profile_keys() {
        let user: User = serde_json::from_value(json!({
            "id": "00u1",
            "status": "ACTIVE",
            "transitioningToStatus": null,
            "profile": {"login": "jdoe@example.com", "badgeNumber": 42},
            "_links": {}
        }))
        .unwrap();
        assert_eq!(user.id, "00u1");
        assert_eq!(user.profile["badgeNumber"], json!(42));
        assert!(user.transitioning_to_status.is_none());
    }

    #[test]
    fn application_serializes_okta_names() {
        let app = Application {
            label: "Intranet".into(),
            name: "template_swa".into(),
            sign_on_mode: "BROWSER_PLUGIN".into(),
            visibility: Some(Visibility {
                auto_submit_toolbar: true,
                hide: Hide {
                    ios: true,
                    web: false,
                },
            }),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&app).unwrap(),
            json!({
                "name": "template_swa",
                "label": "Intranet",
                "signOnMode": "BROWSER_PLUGIN",
                "visibility": {"autoSubmitToolbar": true, "hide": {"iOS": true, "web": false}}
            })
        );
    }
}
