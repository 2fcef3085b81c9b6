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
use std::fmt;

use async_trait::async_trait;
use crypto::digest::Digest;
use crypto::sha2::Sha256;
use serde::{Deserialize, Serialize};
use tf_provider::schema::NestedBlock;
use tf_provider::value::ValueList;
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, DataSource,
    Description, Diagnostics, Schema, Value, ValueEmpty, ValueString,
};
use tracing::info;

use crate::client::models::User;
use crate::client::{ClientHandle, OktaError};
use crate::utils::{as_str, ok_or_report, string_value, DisplayJoinable, WithSchema, WithValidate};

use super::profile::{
    flatten_profile, impl_profile_fields, map_status, with_profile_attributes, PROFILE_ATTRIBUTES,
};

const COMPARISONS: &[&str] = &["eq", "lt", "gt", "sw"];
const DEFAULT_COMPARISON: &str = "eq";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState<'a> {
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    pub value: ValueString<'a>,
    pub comparison: ValueString<'a>,
}

/// Search term in the Okta expression language: `name comparison "value"`
impl<'a> fmt::Display for SearchState<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let comparison = match as_str(&self.comparison) {
            "" => DEFAULT_COMPARISON.to_owned(),
            comparison => comparison.to_lowercase(),
        };
        write!(
            f,
            "{} {comparison} \"{}\"",
            as_str(&self.name),
            as_str(&self.value).replace('"', "\\\"")
        )
    }
}

macro_rules! user_data {
    ([] $($field:ident => $key:literal, $required:literal, $description:literal;)*) => {
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        pub struct UserData<'a> {
            #[serde(borrow = "'a")]
            pub id: ValueString<'a>,
            pub status: ValueString<'a>,
            pub raw_status: ValueString<'a>,
            pub custom_profile_attributes: ValueString<'a>,
            $(pub $field: ValueString<'a>,)*
        }
    };
}
with_profile_attributes!(user_data);
with_profile_attributes!(impl_profile_fields, UserData);

impl<'a> UserData<'a> {
    fn from_user(user: &User) -> serde_json::Result<Self> {
        let mut data = UserData {
            id: string_value(user.id.as_str()),
            status: string_value(map_status(&user.status)),
            raw_status: string_value(user.status.as_str()),
            ..Default::default()
        };
        flatten_profile(&mut data, user)?;
        Ok(data)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersDataSourceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub search: ValueList<Value<SearchState<'a>>>,
    pub users: ValueList<Value<UserData<'a>>>,
}

impl<'a> UsersDataSourceState<'a> {
    fn searches(&self) -> impl Iterator<Item = &SearchState<'a>> {
        let searches = match &self.search {
            Value::Value(searches) => searches.as_slice(),
            _ => &[],
        };
        searches.iter().filter_map(|search| match search {
            Value::Value(search) => Some(search),
            _ => None,
        })
    }

    /// Every search term, joined with `and`
    pub fn search_expression(&self) -> String {
        self.searches().join_with(" and ").to_string()
    }
}

impl<'a> WithSchema for UsersDataSourceState<'a> {
    fn schema() -> Schema {
        let mut user_attributes: HashMap<String, AttributeType> = PROFILE_ATTRIBUTES
            .iter()
            .map(|profile| (profile.name.to_owned(), AttributeType::String))
            .collect();
        for name in ["id", "status", "raw_status", "custom_profile_attributes"] {
            user_attributes.insert(name.to_owned(), AttributeType::String);
        }

        let search = Block {
            description: Description::plain("Filter to find a user, each filter will be concatenated with an AND clause. Profile properties must match what is in Okta, which is likely camel case"),
            attributes: map! {
                "name" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Property name to search for. This requires the search feature be on."),
                    constraint: AttributeConstraint::Required,
                    ..Default::default()
                },
                "value" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Value to compare the property with"),
                    constraint: AttributeConstraint::Required,
                    ..Default::default()
                },
                "comparison" => Attribute {
                    attr_type: AttributeType::String,
                    description: Description::plain("Comparison operator: eq, lt, gt or sw. Defaults to eq."),
                    constraint: AttributeConstraint::OptionalComputed,
                    ..Default::default()
                },
            },
            ..Default::default()
        };

        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("Search Okta users"),
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Hash of the search query"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "users" => Attribute {
                        attr_type: AttributeType::List(AttributeType::Object(user_attributes).into()),
                        description: Description::plain("Users matching the search"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                },
                blocks: map! {
                    "search" => NestedBlock::List(search),
                },
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl<'a> WithValidate for UsersDataSourceState<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(searches) = &self.search {
            if searches.is_empty() {
                diags.error_short(
                    "At least one search block is required",
                    attr_path.clone().attribute("search"),
                );
            }
        }

        for (i, search) in self.searches().enumerate() {
            if let Value::Value(comparison) = &search.comparison {
                if !COMPARISONS.contains(&comparison.to_lowercase().as_str()) {
                    diags.error(
                        "Invalid comparison",
                        format!(
                            "`{comparison}` is not a valid comparison, expected one of {}.",
                            COMPARISONS.join(", ")
                        ),
                        attr_path
                            .clone()
                            .attribute("search")
                            .index(i as i64)
                            .attribute("comparison"),
                    );
                }
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct UsersDataSource {
    pub(crate) client: ClientHandle,
}

impl UsersDataSource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for UsersDataSource {
    type State<'a> = UsersDataSourceState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(UsersDataSourceState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config.validate(diags, AttributePath::default()).await;

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = self.client.get(diags).await?;
        let mut state = config;

        if let Value::Value(searches) = &mut state.search {
            for search in searches.iter_mut() {
                if let Value::Value(search) = search {
                    if search.comparison.is_null() {
                        search.comparison = string_value(DEFAULT_COMPARISON);
                    }
                }
            }
        }

        let search = state.search_expression();
        info!(%search, "Search users");
        let users = ok_or_report(diags, "Failed to list users", client.list_users(&search).await)?;

        let users = ok_or_report(
            diags,
            "Failed to read user profiles",
            users
                .iter()
                .map(|user| UserData::from_user(user).map(Value::Value))
                .collect::<Result<Vec<_>, _>>()
                .map_err(OktaError::from),
        )?;

        let mut hasher = Sha256::new();
        hasher.input_str(&format!("search={search}&limit=200"));
        state.id = string_value(hasher.result_str());
        state.users = Value::Value(users);

        Some(state)
    }
}
