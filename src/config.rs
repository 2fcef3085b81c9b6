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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::{
    map, Attribute, AttributeConstraint, AttributePath, AttributeType, Block, Description,
    Diagnostics, Schema, Value, ValueNumber, ValueString,
};

use crate::client::{ClientSettings, RetryPolicy};
use crate::utils::{non_empty, WithSchema, WithValidate};

const DEFAULT_BASE_URL: &str = "okta.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig<'a> {
    #[serde(borrow = "'a")]
    pub org_name: ValueString<'a>,
    pub base_url: ValueString<'a>,
    pub api_token: ValueString<'a>,
    pub backoff: Value<bool>,
    pub min_wait_seconds: ValueNumber,
    pub max_wait_seconds: ValueNumber,
    pub max_retries: ValueNumber,
    pub request_timeout: ValueNumber,
    pub max_api_capacity: ValueNumber,
    pub parallelism: ValueNumber,
}

fn optional(attr_type: AttributeType, description: &str) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint: AttributeConstraint::Optional,
        ..Default::default()
    }
}

impl<'a> WithSchema for ProviderConfig<'a> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                description: Description::plain("Okta identity management"),
                attributes: map! {
                    "org_name" => optional(AttributeType::String, "The organization to manage in Okta. Defaults to OKTA_ORG_NAME."),
                    "base_url" => optional(AttributeType::String, "The Okta url, ie: oktapreview.com or okta.com. Defaults to OKTA_BASE_URL, then okta.com."),
                    "api_token" => Attribute {
                        sensitive: true,
                        ..optional(AttributeType::String, "API token granting privileges to the Okta API. Defaults to OKTA_API_TOKEN.")
                    },
                    "backoff" => optional(AttributeType::Bool, "Use exponential back off strategy for rate limits. Defaults to true."),
                    "min_wait_seconds" => optional(AttributeType::Number, "Minimum seconds to wait when rate limit is hit. Defaults to 30."),
                    "max_wait_seconds" => optional(AttributeType::Number, "Maximum seconds to wait when rate limit is hit. Defaults to 300."),
                    "max_retries" => optional(AttributeType::Number, "Maximum number of retries to attempt before erroring out. Defaults to 5, at most 100."),
                    "request_timeout" => optional(AttributeType::Number, "Timeout of a single request in seconds, 0 for none. Defaults to 0, at most 300."),
                    "max_api_capacity" => optional(AttributeType::Number, "Percentage of the rate limit window the provider may consume, between 1 and 100. Defaults to 100."),
                    "parallelism" => optional(AttributeType::Number, "Number of concurrent requests used to assign groups, roles and scopes. Defaults to 1."),
                },
                ..Default::default()
            },
        }
    }
}

fn check_range(
    diags: &mut Diagnostics,
    attr_path: &AttributePath,
    name: &'static str,
    value: &ValueNumber,
    min: i64,
    max: i64,
) {
    if let Value::Value(value) = value {
        if *value < min || *value > max {
            diags.error(
                format!("`{name}` is out of range"),
                format!("`{name}` must be between {min} and {max}, got {value}."),
                attr_path.clone().attribute(name),
            );
        }
    }
}

#[async_trait]
impl<'a> WithValidate for ProviderConfig<'a> {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_range(diags, &attr_path, "min_wait_seconds", &self.min_wait_seconds, 0, 3600);
        check_range(diags, &attr_path, "max_wait_seconds", &self.max_wait_seconds, 0, 3600);
        check_range(diags, &attr_path, "max_retries", &self.max_retries, 0, 100);
        check_range(diags, &attr_path, "request_timeout", &self.request_timeout, 0, 300);
        check_range(diags, &attr_path, "max_api_capacity", &self.max_api_capacity, 1, 100);
        check_range(diags, &attr_path, "parallelism", &self.parallelism, 1, 100);

        if let (Value::Value(min), Value::Value(max)) = (&self.min_wait_seconds, &self.max_wait_seconds) {
            if min > max {
                diags.error(
                    "`min_wait_seconds` is greater than `max_wait_seconds`",
                    format!("The minimum wait ({min}s) cannot exceed the maximum wait ({max}s)."),
                    attr_path.attribute("min_wait_seconds"),
                );
            }
        }
    }
}

impl<'a> ProviderConfig<'a> {
    /// Resolve the client settings, falling back on the environment for the connection values
    pub fn settings<E>(&self, diags: &mut Diagnostics, env: E) -> Option<ClientSettings>
    where
        E: Fn(&str) -> Option<String>,
    {
        let resolve = |value: &ValueString, var: &str| {
            non_empty(value)
                .map(str::to_owned)
                .or_else(|| env(var).filter(|value| !value.is_empty()))
        };

        let org_name = resolve(&self.org_name, "OKTA_ORG_NAME");
        let base_url =
            resolve(&self.base_url, "OKTA_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let api_token = resolve(&self.api_token, "OKTA_API_TOKEN");

        if org_name.is_none() {
            diags.error(
                "Missing organization name",
                "`org_name` must be set in the provider block, or with the OKTA_ORG_NAME environment variable.",
                AttributePath::new("org_name"),
            );
        }
        if api_token.is_none() {
            diags.error(
                "Missing API token",
                "`api_token` must be set in the provider block, or with the OKTA_API_TOKEN environment variable.",
                AttributePath::new("api_token"),
            );
        }
        let (Some(org_name), Some(api_token)) = (org_name, api_token) else {
            return None;
        };

        let number = |value: &ValueNumber, default: i64| match value {
            Value::Value(value) => *value,
            _ => default,
        };
        let request_timeout = number(&self.request_timeout, 0);

        Some(ClientSettings {
            org_url: format!("https://{org_name}.{base_url}"),
            api_token,
            retry: RetryPolicy {
                backoff: match self.backoff {
                    Value::Value(backoff) => backoff,
                    _ => true,
                },
                max_retries: number(&self.max_retries, 5).max(0) as u32,
                min_wait: Duration::from_secs(number(&self.min_wait_seconds, 30).max(0) as u64),
                max_wait: Duration::from_secs(number(&self.max_wait_seconds, 300).max(0) as u64),
            },
            request_timeout: (request_timeout > 0).then(|| Duration::from_secs(request_timeout as u64)),
            max_api_capacity: number(&self.max_api_capacity, 100),
            parallelism: number(&self.parallelism, 1).max(1) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::utils::string_value;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn settings_from_block() {
        let config = ProviderConfig {
            org_name: string_value("dev-123"),
            base_url: string_value("oktapreview.com"),
            api_token: string_value("secret"),
            backoff: Value::Value(false),
            max_retries: Value::Value(2),
            request_timeout: Value::Value(60),
            parallelism: Value::Value(4),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let settings = config.settings(&mut diags, env(&[])).unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(settings.org_url, "https://dev-123.oktapreview.com");
        assert_eq!(settings.api_token, "secret");
        assert!(!settings.retry.backoff);
        assert_eq!(settings.retry.max_retries, 2);
        assert_eq!(settings.retry.min_wait, Duration::from_secs(30));
        assert_eq!(settings.retry.max_wait, Duration::from_secs(300));
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(60)));
        assert_eq!(settings.max_api_capacity, 100);
        assert_eq!(settings.parallelism, 4);
    }

    #[test]
    fn settings_from_environment() {
        let mut diags = Diagnostics::default();
        let settings = ProviderConfig::default()
            .settings(
                &mut diags,
                env(&[("OKTA_ORG_NAME", "acme"), ("OKTA_API_TOKEN", "from-env")]),
            )
            .unwrap();

        assert_eq!(settings.org_url, "https://acme.okta.com");
        assert_eq!(settings.api_token, "from-env");
        assert_eq!(settings.request_timeout, None);
        assert!(settings.retry.backoff);
    }

    #[test]
    fn missing_credentials() {
        let mut diags = Diagnostics::default();
        assert!(ProviderConfig::default()
            .settings(&mut diags, env(&[("OKTA_ORG_NAME", "acme")]))
            .is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn ranges_are_validated() {
        let config = ProviderConfig {
            max_retries: Value::Value(101),
            max_api_capacity: Value::Value(0),
            min_wait_seconds: Value::Value(60),
            max_wait_seconds: Value::Value(10),
            request_timeout: Value::Unknown,
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        config.validate(&mut diags, AttributePath::default()).await;
        assert_eq!(diags.errors.len(), 3);
    }
}
