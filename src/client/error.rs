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

#[cfg(test)]
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub type OktaResult<T> = Result<T, OktaError>;

#[derive(Debug, Error)]
pub enum OktaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error answered by the Okta API
    #[error("the API returned an error: {status}, {code}: {summary}{}", format_causes(.causes))]
    Api {
        status: u16,
        code: String,
        summary: String,
        causes: Vec<String>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("rate limit still exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("user {id} is still transitioning to {status}")]
    StatusTransition { id: String, status: String },
}

impl OktaError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    pub(super) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return Self::Http(err),
        };
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(error) => Self::Api {
                status: status.as_u16(),
                code: error.error_code,
                summary: error.error_summary,
                causes: error
                    .error_causes
                    .into_iter()
                    .map(|cause| cause.error_summary)
                    .collect(),
            },
            Err(_) => Self::Api {
                status: status.as_u16(),
                code: status
                    .canonical_reason()
                    .unwrap_or_default()
                    .to_owned(),
                summary: body,
                causes: Vec::new(),
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => StatusCode::from_u16(*status).ok(),
            Self::Http(err) => err.status(),
            _ => None,
        }
    }
}

/// Turn a 404 into success, for removals of things already gone
pub fn suppress_not_found(result: OktaResult<()>) -> OktaResult<()> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        result => result,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_summary: String,
    #[serde(default)]
    error_causes: Vec<ErrorCause>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorCause {
    #[serde(default)]
    error_summary: String,
}

fn format_causes(causes: &[String]) -> String {
    if causes.is_empty() {
        String::new()
    } else {
        format!(", causes: {}", causes.join("; "))
    }
}
