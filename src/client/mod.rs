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

use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tf_provider::Diagnostics;
use tokio::sync::RwLock;
use tracing::{debug, warn};

mod apps;
mod error;
mod groups;
pub mod models;
mod rate_limit;
mod users;

pub use error::{suppress_not_found, OktaError, OktaResult};
pub use rate_limit::{RetryPolicy, Throttle};
pub use users::UserLifecycle;

const USER_AGENT: &str = concat!("okta-terraform/", env!("CARGO_PKG_VERSION"));

lazy_static! {
    static ref NEXT_LINK: Regex = Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).unwrap();
}

/// Settings the client is built from, resolved from the provider block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub org_url: String,
    pub api_token: String,
    pub retry: RetryPolicy,
    pub request_timeout: Option<Duration>,
    pub max_api_capacity: i64,
    pub parallelism: usize,
}

/// HTTP client for the Okta management API
#[derive(Debug)]
pub struct OktaClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    retry: RetryPolicy,
    throttle: Throttle,
    parallelism: usize,
}

impl OktaClient {
    pub fn new(settings: ClientSettings) -> OktaResult<Self> {
        let base_url = Url::parse(&settings.org_url)
            .map_err(|err| OktaError::Config(format!("invalid org URL `{}`: {err}", settings.org_url)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            token: settings.api_token,
            retry: settings.retry,
            throttle: Throttle::new(settings.max_api_capacity),
            parallelism: settings.parallelism.max(1),
        })
    }

    /// Number of assignment requests that may run concurrently
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> OktaResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| OktaError::Config(format!("invalid API path `{path}`: {err}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> OktaResult<reqwest::Response> {
        let mut attempt = 0;
        loop {
            self.throttle.wait().await;

            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header(AUTHORIZATION, format!("SSWS {}", self.token));
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(%method, %url, attempt, "Okta request");
            let response = request.send().await?;
            self.throttle.observe(response.headers()).await;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            if self.retry.should_retry(status, attempt) {
                let delay = self.retry.delay_for(attempt, response.headers());
                warn!(
                    %method, %url, %status,
                    "Request failed, retry {}/{} in {delay:?}",
                    attempt + 1,
                    self.retry.max_retries
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && self.retry.backoff {
                return Err(OktaError::RateLimited {
                    attempts: attempt + 1,
                });
            }
            return Err(OktaError::from_response(response).await);
        }
    }

    fn body<B: Serialize>(body: Option<&B>) -> OktaResult<Option<serde_json::Value>> {
        body.map(serde_json::to_value).transpose().map_err(Into::into)
    }

    /// Send a request and decode the JSON answer
    pub(crate) async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> OktaResult<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let body = Self::body(body)?;
        let response = self
            .send(method, self.url(path, query)?, body.as_ref())
            .await?;
        Ok(response.json().await?)
    }

    /// Send a request whose answer carries nothing of interest
    pub(crate) async fn execute<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> OktaResult<()> {
        let body = Self::body(body)?;
        self.send(method, self.url(path, query)?, body.as_ref())
            .await?;
        Ok(())
    }

    /// GET every page of a collection, following `rel="next"` links
    pub(crate) async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> OktaResult<Vec<T>> {
        let mut url = self.url(path, query)?;
        let mut items = Vec::new();
        loop {
            let response = self.send(Method::GET, url.clone(), None).await?;
            let next = next_link(response.headers());
            let mut page: Vec<T> = response.json().await?;
            debug!(%url, count = page.len(), "Fetched page");
            items.append(&mut page);

            match next {
                Some(next) if next != url => url = next,
                _ => return Ok(items),
            }
        }
    }
}

fn next_link(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|link| NEXT_LINK.captures(link))
        .and_then(|captures| Url::parse(&captures[1]).ok())
}

/// Client shared between the provider and its resources, set once the provider is configured
#[derive(Debug, Default, Clone)]
pub struct ClientHandle(Arc<RwLock<Option<Arc<OktaClient>>>>);

impl ClientHandle {
    pub async fn set(&self, client: OktaClient) {
        *self.0.write().await = Some(Arc::new(client));
    }

    /// Get the configured client, or report that the provider is not configured
    pub async fn get(&self, diags: &mut Diagnostics) -> Option<Arc<OktaClient>> {
        let client = self.0.read().await.clone();
        if client.is_none() {
            diags.root_error(
                "Provider not configured",
                "The Okta client is not available: the provider block has not been configured.",
            );
        }
        client
    }

    #[cfg(test)]
    pub(crate) fn with_client(client: OktaClient) -> Self {
        Self(Arc::new(RwLock::new(Some(Arc::new(client)))))
    }
}
