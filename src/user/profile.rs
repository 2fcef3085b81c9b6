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

use serde_json::{Map, Value as Json};
use tf_provider::{Value, ValueString};

use crate::client::models::{
    User, STATUS_ACTIVE, USER_STATUS_PASSWORD_EXPIRED, USER_STATUS_PROVISIONED,
    USER_STATUS_RECOVERY,
};
use crate::utils::{as_str, non_empty, string_value};

/// Calls `$m!` with the extra arguments between brackets, followed by every profile attribute:
/// `name => "okta key", required, "description";`
macro_rules! with_profile_attributes {
    ($m:ident $(, $arg:ident)*) => {
        $m! {
            [$($arg)*]
            city => "city", false, "User city";
            cost_center => "costCenter", false, "User cost center";
            country_code => "countryCode", false, "User country code";
            department => "department", false, "User department";
            display_name => "displayName", false, "User display name, suitable to show end users";
            division => "division", false, "User division";
            email => "email", true, "User primary email address";
            employee_number => "employeeNumber", false, "User employee number";
            first_name => "firstName", true, "User first name";
            honorific_prefix => "honorificPrefix", false, "User honorific prefix";
            honorific_suffix => "honorificSuffix", false, "User honorific suffix";
            last_name => "lastName", true, "User last name";
            locale => "locale", false, "User default location";
            login => "login", true, "User Okta login";
            manager => "manager", false, "Manager of User";
            manager_id => "managerId", false, "Manager ID of User";
            middle_name => "middleName", false, "User middle name";
            mobile_phone => "mobilePhone", false, "User mobile phone number";
            nick_name => "nickName", false, "User nickname";
            organization => "organization", false, "User organization";
            postal_address => "postalAddress", false, "User mailing address";
            preferred_language => "preferredLanguage", false, "User preferred language";
            primary_phone => "primaryPhone", false, "User primary phone number";
            profile_url => "profileUrl", false, "User online profile (web page)";
            second_email => "secondEmail", false, "User secondary email address, used for account recovery";
            state => "state", false, "User state or region";
            street_address => "streetAddress", false, "User street address";
            timezone => "timezone", false, "User default timezone";
            title => "title", false, "User title";
            user_type => "userType", false, "User employee type";
            zip_code => "zipCode", false, "User zipcode or postal code";
        }
    };
}
pub(crate) use with_profile_attributes;

/// Profile attribute of a user, as exposed in the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProfileAttribute {
    pub name: &'static str,
    pub key: &'static str,
    pub required: bool,
    pub description: &'static str,
}

macro_rules! profile_attribute_table {
    ([] $($field:ident => $key:literal, $required:literal, $description:literal;)*) => {
        pub(crate) const PROFILE_ATTRIBUTES: &[ProfileAttribute] = &[
            $(ProfileAttribute {
                name: stringify!($field),
                key: $key,
                required: $required,
                description: $description,
            },)*
        ];
    };
}
with_profile_attributes!(profile_attribute_table);

/// States holding the flattened profile of a user
pub(crate) trait ProfileFields<'a> {
    fn profile_fields(&self) -> Vec<(&'static str, &ValueString<'a>)>;
    fn profile_fields_mut(&mut self) -> Vec<(&'static str, &mut ValueString<'a>)>;
    fn custom_profile_attributes(&self) -> &ValueString<'a>;
    fn custom_profile_attributes_mut(&mut self) -> &mut ValueString<'a>;
}

/// Implement [`ProfileFields`] for a state declaring every profile attribute,
/// to be called through [`with_profile_attributes`]
macro_rules! impl_profile_fields {
    ([$state:ident] $($field:ident => $key:literal, $required:literal, $description:literal;)*) => {
        impl<'a> $crate::user::profile::ProfileFields<'a> for $state<'a> {
            fn profile_fields(&self) -> Vec<(&'static str, &::tf_provider::ValueString<'a>)> {
                vec![$(($key, &self.$field),)*]
            }
            fn profile_fields_mut(&mut self) -> Vec<(&'static str, &mut ::tf_provider::ValueString<'a>)> {
                vec![$(($key, &mut self.$field),)*]
            }
            fn custom_profile_attributes(&self) -> &::tf_provider::ValueString<'a> {
                &self.custom_profile_attributes
            }
            fn custom_profile_attributes_mut(&mut self) -> &mut ::tf_provider::ValueString<'a> {
                &mut self.custom_profile_attributes
            }
        }
    };
}
pub(crate) use impl_profile_fields;

/// PASSWORD_EXPIRED and RECOVERY are effectively ACTIVE
pub(crate) fn map_status(status: &str) -> &str {
    if status == USER_STATUS_PASSWORD_EXPIRED || status == USER_STATUS_RECOVERY {
        STATUS_ACTIVE
    } else {
        status
    }
}

/// A PROVISIONED user is as active as the configuration can ask for
pub(crate) fn status_satisfies(desired: &str, status: &str) -> bool {
    desired == status || (desired == STATUS_ACTIVE && status == USER_STATUS_PROVISIONED)
}

/// Parse the custom profile attributes, which must be a JSON object
pub(crate) fn parse_custom_attributes(value: &ValueString<'_>) -> serde_json::Result<Map<String, Json>> {
    match non_empty(value) {
        Some(json) => serde_json::from_str(json),
        None => Ok(Map::new()),
    }
}

/// Build the profile sent to Okta from the state
pub(crate) fn build_profile<'a, S: ProfileFields<'a>>(state: &S) -> serde_json::Result<Map<String, Json>> {
    let mut profile = parse_custom_attributes(state.custom_profile_attributes())?;
    for (key, value) in state.profile_fields() {
        if let Some(value) = non_empty(value) {
            profile.insert(key.to_owned(), Json::String(value.to_owned()));
        } else {
            profile.remove(key);
        }
    }
    Ok(profile)
}

/// Flatten the profile of a user read from Okta into the state
///
/// Keys without a dedicated attribute are gathered as custom profile attributes.
/// The previous custom attributes are kept verbatim when they are equivalent.
/// Okta drops empty attributes, so an attribute set to `""` stays so while Okta has none.
pub(crate) fn flatten_profile<'a, S: ProfileFields<'a>>(state: &mut S, user: &User) -> serde_json::Result<()> {
    let mut custom = user.profile.clone();
    for (key, value) in state.profile_fields_mut() {
        let was_empty = matches!(value, Value::Value(prior) if prior.is_empty());
        *value = match custom.remove(key) {
            Some(Json::String(s)) if !s.is_empty() => string_value(s),
            Some(Json::Null) | Some(Json::String(_)) | None if was_empty => string_value(""),
            Some(Json::Null) | Some(Json::String(_)) | None => Value::Null,
            Some(other) => string_value(other.to_string()),
        };
    }

    let prior = state.custom_profile_attributes();
    let unchanged = !prior.is_null()
        && parse_custom_attributes(prior).map_or(false, |prior| prior == custom);
    if !unchanged {
        *state.custom_profile_attributes_mut() = string_value(serde_json::to_string(&custom)?);
    }
    Ok(())
}

/// Whether two states have a different profile
pub(crate) fn profile_changed<'a, S: ProfileFields<'a>>(prior: &S, planned: &S) -> bool {
    prior
        .profile_fields()
        .into_iter()
        .zip(planned.profile_fields())
        .any(|((_, prior), (_, planned))| as_str(prior) != as_str(planned))
        || parse_custom_attributes(prior.custom_profile_attributes()).ok()
            != parse_custom_attributes(planned.custom_profile_attributes()).ok()
}
