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
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tf_provider::schema::NestedBlock;
use tf_provider::value::ValueList;
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Schema, Value, ValueString,
};

use crate::app::assignments::AppUserAssignment;
use crate::client::models::{
    Accessibility, Application, ApplicationCredentials, Hide, SwaSettings, SwaSettingsApp,
    UserNameTemplate, Visibility, STATUS_ACTIVE, STATUS_INACTIVE,
};
use crate::diff::keep_order;
use crate::utils::{
    as_str, non_empty, optional_string, string_value, ValueStringSet, WithNormalize, WithSchema,
    WithValidate,
};

pub(super) const CUSTOM_APP_NAME: &str = "template_swa";
pub(super) const CUSTOM_SIGN_ON_MODE: &str = "BROWSER_PLUGIN";
pub(super) const PRECONFIGURED_SIGN_ON_MODE: &str = "AUTO_LOGIN";
const DEFAULT_USER_NAME_TEMPLATE: &str = "${source.login}";
const DEFAULT_USER_NAME_TEMPLATE_TYPE: &str = "BUILT_IN";
const USER_NAME_TEMPLATE_TYPES: &[&str] = &["NONE", "CUSTOM", "BUILT_IN"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwaUserState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub username: ValueString<'a>,
    pub password: ValueString<'a>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwaAppState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub label: ValueString<'a>,
    pub name: ValueString<'a>,
    pub sign_on_mode: ValueString<'a>,
    pub status: ValueString<'a>,
    pub preconfigured_app: ValueString<'a>,
    pub button_field: ValueString<'a>,
    pub password_field: ValueString<'a>,
    pub username_field: ValueString<'a>,
    pub url: ValueString<'a>,
    pub url_regex: ValueString<'a>,
    pub accessibility_self_service: Value<bool>,
    pub accessibility_error_redirect_url: ValueString<'a>,
    pub auto_submit_toolbar: Value<bool>,
    pub hide_ios: Value<bool>,
    pub hide_web: Value<bool>,
    pub user_name_template: ValueString<'a>,
    pub user_name_template_type: ValueString<'a>,
    pub user_name_template_suffix: ValueString<'a>,
    pub groups: ValueStringSet<'a>,
    pub users: ValueList<Value<SwaUserState<'a>>>,
}

fn attribute(attr_type: AttributeType, constraint: AttributeConstraint, description: &str) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

fn optional_string_attribute(description: &str) -> Attribute {
    attribute(AttributeType::String, AttributeConstraint::Optional, description)
}

fn defaulted_bool(description: &str) -> Attribute {
    attribute(AttributeType::Bool, AttributeConstraint::OptionalComputed, description)
}

impl<'a> WithSchema for SwaAppState<'a> {
    fn schema() -> Schema {
        let users = Block {
            description: Description::plain("Users assigned to the application, with their application credentials"),
            attributes: map! {
                "id" => attribute(AttributeType::String, AttributeConstraint::Required, "User ID"),
                "username" => optional_string_attribute("Username of the user in the application"),
                "password" => Attribute {
                    sensitive: true,
                    ..optional_string_attribute("Password of the user in the application")
                },
            },
            ..Default::default()
        };

        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("Okta SWA application"),
                attributes: map! {
                    "id" => attribute(AttributeType::String, AttributeConstraint::Computed, "Okta identifier of the application"),
                    "label" => attribute(AttributeType::String, AttributeConstraint::Required, "Pretty name of app"),
                    "name" => attribute(AttributeType::String, AttributeConstraint::Computed, "Name assigned to the application by Okta"),
                    "sign_on_mode" => attribute(AttributeType::String, AttributeConstraint::Computed, "Sign on mode of application"),
                    "status" => attribute(AttributeType::String, AttributeConstraint::OptionalComputed, "Status of application: ACTIVE or INACTIVE. Defaults to ACTIVE."),
                    "preconfigured_app" => optional_string_attribute("Preconfigured app name"),
                    "button_field" => optional_string_attribute("Login button field"),
                    "password_field" => optional_string_attribute("Login password field"),
                    "username_field" => optional_string_attribute("Login username field"),
                    "url" => optional_string_attribute("Login URL"),
                    "url_regex" => optional_string_attribute("A regex that further restricts URL to the specified regex"),
                    "accessibility_self_service" => defaulted_bool("Enable self service. Defaults to false."),
                    "accessibility_error_redirect_url" => optional_string_attribute("Custom error page URL"),
                    "auto_submit_toolbar" => defaulted_bool("Display auto submit toolbar. Defaults to false."),
                    "hide_ios" => defaulted_bool("Do not display application icon on mobile app. Defaults to false."),
                    "hide_web" => defaulted_bool("Do not display application icon to users. Defaults to false."),
                    "user_name_template" => attribute(AttributeType::String, AttributeConstraint::OptionalComputed, "Username template. Defaults to ${source.login}."),
                    "user_name_template_type" => attribute(AttributeType::String, AttributeConstraint::OptionalComputed, "Username template type: NONE, CUSTOM or BUILT_IN. Defaults to BUILT_IN."),
                    "user_name_template_suffix" => optional_string_attribute("Username template suffix"),
                    "groups" => attribute(AttributeType::Set(AttributeType::String.into()), AttributeConstraint::Optional, "Groups associated with the application. Assignments are only managed when set."),
                },
                blocks: map! {
                    "users" => NestedBlock::List(users),
                },
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl<'a> WithValidate for SwaAppState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(status) = &self.status {
            if status != STATUS_ACTIVE && status != STATUS_INACTIVE {
                diags.error(
                    "Invalid application status",
                    format!("`{status}` is not a valid status, expected ACTIVE or INACTIVE."),
                    attr_path.clone().attribute("status"),
                );
            }
        }

        if let Value::Value(url) = &self.url {
            let valid = Url::parse(url).map_or(false, |url| matches!(url.scheme(), "http" | "https"));
            if !valid {
                diags.error(
                    "Invalid login URL",
                    format!("`{url}` is not a valid http or https URL."),
                    attr_path.clone().attribute("url"),
                );
            }
        }

        if let Value::Value(template_type) = &self.user_name_template_type {
            if !USER_NAME_TEMPLATE_TYPES.contains(&template_type.as_ref()) {
                diags.error(
                    "Invalid username template type",
                    format!(
                        "`{template_type}` is not a valid username template type, expected one of {}.",
                        USER_NAME_TEMPLATE_TYPES.join(", ")
                    ),
                    attr_path.clone().attribute("user_name_template_type"),
                );
            }
        }

        let mut seen = HashMap::new();
        for (i, user) in self.users().iter().enumerate() {
            if let Value::Value(id) = &user.id {
                if let Some(first) = seen.insert(id.to_string(), i) {
                    diags.error(
                        "Duplicate application user",
                        format!("User `{id}` is already assigned by the block #{first}."),
                        attr_path.clone().attribute("users").index(i as i64).attribute("id"),
                    );
                }
            }
        }
    }
}

impl<'a> WithNormalize for SwaAppState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        if self.status.is_null() {
            self.status = string_value(STATUS_ACTIVE);
        }
        if self.user_name_template.is_null() {
            self.user_name_template = string_value(DEFAULT_USER_NAME_TEMPLATE);
        }
        if self.user_name_template_type.is_null() {
            self.user_name_template_type = string_value(DEFAULT_USER_NAME_TEMPLATE_TYPE);
        }
        for value in [
            &mut self.accessibility_self_service,
            &mut self.auto_submit_toolbar,
            &mut self.hide_ios,
            &mut self.hide_web,
        ] {
            if value.is_null() {
                *value = Value::Value(false);
            }
        }
    }
}

fn flag(value: &Value<bool>) -> bool {
    matches!(value, Value::Value(true))
}

fn owned(value: &ValueString<'_>) -> Option<String> {
    non_empty(value).map(str::to_owned)
}

impl<'a> SwaAppState<'a> {
    /// Known users of the `users` blocks
    pub(super) fn users(&self) -> Vec<&SwaUserState<'a>> {
        match &self.users {
            Value::Value(users) => users
                .iter()
                .filter_map(|user| match user {
                    Value::Value(user) => Some(user),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub(super) fn user_assignments(&self) -> Vec<AppUserAssignment> {
        self.users()
            .into_iter()
            .map(|user| AppUserAssignment {
                id: as_str(&user.id).to_owned(),
                username: owned(&user.username),
                password: owned(&user.password),
            })
            .collect()
    }

    /// Body of an application creation or update
    pub(super) fn to_application(&self) -> Application {
        let (name, sign_on_mode) = match non_empty(&self.preconfigured_app) {
            // Preconfigured applications may support several sign on modes
            Some(name) => (name, PRECONFIGURED_SIGN_ON_MODE),
            None => (CUSTOM_APP_NAME, CUSTOM_SIGN_ON_MODE),
        };

        Application {
            name: name.to_owned(),
            label: as_str(&self.label).to_owned(),
            sign_on_mode: sign_on_mode.to_owned(),
            accessibility: Some(Accessibility {
                self_service: flag(&self.accessibility_self_service),
                error_redirect_url: owned(&self.accessibility_error_redirect_url),
            }),
            visibility: Some(Visibility {
                auto_submit_toolbar: flag(&self.auto_submit_toolbar),
                hide: Hide {
                    ios: flag(&self.hide_ios),
                    web: flag(&self.hide_web),
                },
            }),
            credentials: Some(ApplicationCredentials {
                user_name_template: Some(UserNameTemplate {
                    template: as_str(&self.user_name_template).to_owned(),
                    template_type: as_str(&self.user_name_template_type).to_owned(),
                    suffix: owned(&self.user_name_template_suffix),
                }),
            }),
            settings: Some(SwaSettings {
                app: SwaSettingsApp {
                    button_field: owned(&self.button_field),
                    password_field: owned(&self.password_field),
                    username_field: owned(&self.username_field),
                    url: owned(&self.url),
                    login_url_regex: owned(&self.url_regex),
                },
            }),
            ..Default::default()
        }
    }

    /// Copy the attributes of an application read from Okta
    pub(super) fn apply_application(&mut self, app: &Application) {
        self.id = string_value(app.id.as_str());
        self.name = string_value(app.name.as_str());
        self.label = string_value(app.label.as_str());
        self.status = string_value(app.status.as_str());
        self.sign_on_mode = string_value(app.sign_on_mode.as_str());

        let settings = app
            .settings
            .as_ref()
            .map(|settings| settings.app.clone())
            .unwrap_or_default();
        self.button_field = optional_string(settings.button_field.as_deref());
        self.password_field = optional_string(settings.password_field.as_deref());
        self.username_field = optional_string(settings.username_field.as_deref());
        self.url = optional_string(settings.url.as_deref());
        self.url_regex = optional_string(settings.login_url_regex.as_deref());

        let template = app
            .credentials
            .as_ref()
            .and_then(|credentials| credentials.user_name_template.clone())
            .unwrap_or_default();
        self.user_name_template = string_value(template.template);
        self.user_name_template_type = string_value(template.template_type);
        self.user_name_template_suffix = optional_string(template.suffix.as_deref());

        let accessibility = app.accessibility.clone().unwrap_or_default();
        self.accessibility_self_service = Value::Value(accessibility.self_service);
        self.accessibility_error_redirect_url =
            optional_string(accessibility.error_redirect_url.as_deref());

        let visibility = app.visibility.clone().unwrap_or_default();
        self.auto_submit_toolbar = Value::Value(visibility.auto_submit_toolbar);
        self.hide_ios = Value::Value(visibility.hide.ios);
        self.hide_web = Value::Value(visibility.hide.web);
    }

    /// Replace the users with those read from Okta, in the order of the blocks
    ///
    /// Passwords are never returned by Okta and are kept from the prior state.
    pub(super) fn apply_users(&mut self, current: Vec<(String, Option<String>)>) {
        let prior: HashMap<String, SwaUserState<'a>> = self
            .users()
            .into_iter()
            .map(|user| (as_str(&user.id).to_owned(), user.clone()))
            .collect();
        let prior_ids: Vec<String> = self
            .users()
            .iter()
            .map(|user| as_str(&user.id).to_owned())
            .collect();
        let mut usernames: HashMap<String, Option<String>> = current.into_iter().collect();
        let current_ids: Vec<String> = usernames.keys().cloned().collect();

        let users = keep_order(&prior_ids, &current_ids)
            .into_iter()
            .map(|id| {
                let username = usernames.remove(&id).flatten();
                let password = prior
                    .get(&id)
                    .map(|user| user.password.clone())
                    .unwrap_or(Value::Null);
                Value::Value(SwaUserState {
                    id: string_value(id),
                    username: optional_string(username.as_deref()),
                    password,
                })
            })
            .collect();
        self.users = Value::Value(users);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn state() -> SwaAppState<'static> {
        SwaAppState {
            label: string_value("Intranet"),
            url: string_value("https://intranet.example.com/login"),
            button_field: string_value("btn-login"),
            password_field: string_value("txtbox-password"),
            username_field: string_value("txtbox-username"),
            ..Default::default()
        }
    }

    #[test]
    fn custom_application_body() {
        let mut state = state();
        state.normalize(&mut Diagnostics::default());
        let body = serde_json::to_value(state.to_application()).unwrap();

        assert_eq!(body["name"], json!(CUSTOM_APP_NAME));
        assert_eq!(body["signOnMode"], json!(CUSTOM_SIGN_ON_MODE));
        assert_eq!(body["settings"]["app"]["buttonField"], json!("btn-login"));
        assert_eq!(
            body["credentials"]["userNameTemplate"],
            json!({"template": "${source.login}", "type": "BUILT_IN"})
        );
        assert_eq!(body["visibility"]["hide"], json!({"iOS": false, "web": false}));
    }

    #[test]
    fn preconfigured_application_body() {
        let state = SwaAppState {
            preconfigured_app: string_value("dropbox_for_business"),
            ..state()
        };
        let app = state.to_application();
        assert_eq!(app.name, "dropbox_for_business");
        assert_eq!(app.sign_on_mode, PRECONFIGURED_SIGN_ON_MODE);
    }

    #[tokio::test]
    async fn validation() {
        let mut diags = Diagnostics::default();
        state().validate(&mut diags, Default::default()).await;
        assert!(diags.errors.is_empty());

        let invalid = SwaAppState {
            status: string_value("DELETED"),
            url: string_value("ftp://intranet.example.com"),
            user_name_template_type: string_value("SOMETIMES"),
            users: Value::Value(vec![
                Value::Value(SwaUserState {
                    id: string_value("00u1"),
                    ..Default::default()
                }),
                Value::Value(SwaUserState {
                    id: string_value("00u1"),
                    ..Default::default()
                }),
            ]),
            ..state()
        };
        let mut diags = Diagnostics::default();
        invalid.validate(&mut diags, Default::default()).await;
        assert_eq!(diags.errors.len(), 4);
    }

    #[test]
    fn users_keep_block_order_and_passwords() {
        let mut state = SwaAppState {
            users: Value::Value(vec![
                Value::Value(SwaUserState {
                    id: string_value("00u2"),
                    username: string_value("old"),
                    password: string_value("secret"),
                }),
                Value::Value(SwaUserState {
                    id: string_value("00u1"),
                    ..Default::default()
                }),
            ]),
            ..state()
        };
        state.apply_users(vec![
            ("00u1".to_owned(), None),
            ("00u2".to_owned(), Some("new".to_owned())),
            ("00u3".to_owned(), Some("other".to_owned())),
        ]);

        let users = state.users();
        let ids: Vec<&str> = users.iter().map(|user| as_str(&user.id)).collect();
        assert_eq!(ids, ["00u2", "00u1", "00u3"]);
        assert_eq!(as_str(&users[0].username), "new");
        assert_eq!(as_str(&users[0].password), "secret");
        assert!(users[2].password.is_null());
    }
}
