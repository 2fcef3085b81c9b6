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

use serde::{Deserialize, Serialize};
use tf_provider::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema, ValueString,
};

use crate::utils::{ValueStringSet, WithSchema};

use super::profile::{impl_profile_fields, with_profile_attributes, PROFILE_ATTRIBUTES};

macro_rules! user_state {
    ([] $($field:ident => $key:literal, $required:literal, $description:literal;)*) => {
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        pub struct UserState<'a> {
            #[serde(borrow = "'a")]
            pub id: ValueString<'a>,
            pub status: ValueString<'a>,
            pub raw_status: ValueString<'a>,
            pub admin_roles: ValueStringSet<'a>,
            pub group_memberships: ValueStringSet<'a>,
            pub custom_profile_attributes: ValueString<'a>,
            pub password: ValueString<'a>,
            pub recovery_question: ValueString<'a>,
            pub recovery_answer: ValueString<'a>,
            $(pub $field: ValueString<'a>,)*
        }
    };
}
with_profile_attributes!(user_state);
with_profile_attributes!(impl_profile_fields, UserState);

fn attribute(
    attr_type: AttributeType,
    constraint: AttributeConstraint,
    description: &str,
) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

impl<'a> WithSchema for UserState<'a> {
    fn schema() -> Schema {
        let string_set = || AttributeType::Set(AttributeType::String.into());

        let mut attributes: HashMap<String, Attribute> = PROFILE_ATTRIBUTES
            .iter()
            .map(|profile| {
                (
                    profile.name.to_owned(),
                    attribute(
                        AttributeType::String,
                        if profile.required {
                            AttributeConstraint::Required
                        } else {
                            AttributeConstraint::Optional
                        },
                        profile.description,
                    ),
                )
            })
            .collect();

        attributes.extend([
            (
                "id".to_owned(),
                attribute(
                    AttributeType::String,
                    AttributeConstraint::Computed,
                    "Okta identifier of the user",
                ),
            ),
            (
                "admin_roles".to_owned(),
                attribute(
                    string_set(),
                    AttributeConstraint::Optional,
                    "User Okta admin roles - ie. ['APP_ADMIN', 'USER_ADMIN']",
                ),
            ),
            (
                "group_memberships".to_owned(),
                attribute(
                    string_set(),
                    AttributeConstraint::Optional,
                    "The groups that you want this user to be a part of. Membership is only managed when set, an empty set removes every membership.",
                ),
            ),
            (
                "status".to_owned(),
                attribute(
                    AttributeType::String,
                    AttributeConstraint::OptionalComputed,
                    "The status of the User in Okta: ACTIVE, STAGED, DEPROVISIONED or SUSPENDED. Defaults to ACTIVE.",
                ),
            ),
            (
                "raw_status".to_owned(),
                attribute(
                    AttributeType::String,
                    AttributeConstraint::Computed,
                    "The raw status of the User in Okta - (status is mapped)",
                ),
            ),
            (
                "custom_profile_attributes".to_owned(),
                attribute(
                    AttributeType::String,
                    AttributeConstraint::OptionalComputed,
                    "JSON formatted custom attributes for a user. It must be JSON due to various types Okta allows.",
                ),
            ),
            (
                "password".to_owned(),
                Attribute {
                    sensitive: true,
                    ..attribute(
                        AttributeType::String,
                        AttributeConstraint::Optional,
                        "User Password",
                    )
                },
            ),
            (
                "recovery_question".to_owned(),
                attribute(
                    AttributeType::String,
                    AttributeConstraint::Optional,
                    "User Password Recovery Question",
                ),
            ),
            (
                "recovery_answer".to_owned(),
                Attribute {
                    sensitive: true,
                    ..attribute(
                        AttributeType::String,
                        AttributeConstraint::Optional,
                        "User Password Recovery Answer",
                    )
                },
            ),
        ]);

        Schema {
            version: 1,
            block: Block {
                version: 1,
                description: Description::plain("Okta user"),
                attributes,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_exposes_profile_and_credentials() {
        let schema = UserState::schema();
        let attributes = &schema.block.attributes;
        assert_eq!(attributes.len(), PROFILE_ATTRIBUTES.len() + 9);
        assert!(attributes["password"].sensitive);
        assert!(attributes["recovery_answer"].sensitive);
        assert!(!attributes["recovery_question"].sensitive);
        assert!(matches!(
            attributes["login"].constraint,
            AttributeConstraint::Required
        ));
        assert!(matches!(
            attributes["city"].constraint,
            AttributeConstraint::Optional
        ));
    }
}
