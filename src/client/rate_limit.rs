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

use rand::{thread_rng, Rng};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

const LIMIT_HEADER: &str = "X-Rate-Limit-Limit";
const REMAINING_HEADER: &str = "X-Rate-Limit-Remaining";
const RESET_HEADER: &str = "X-Rate-Limit-Reset";

fn header_number(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// How requests answered with a rate-limit or a transient error are retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: bool,
    pub max_retries: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: true,
            max_retries: 5,
            min_wait: Duration::from_secs(30),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn should_retry(&self, status: StatusCode, attempt: u32) -> bool {
        self.backoff
            && attempt < self.max_retries
            && matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            )
    }

    /// Wait until the rate-limit window resets when the server tells when it does,
    /// exponential backoff with jitter otherwise.
    pub fn delay_for(&self, attempt: u32, headers: &HeaderMap) -> Duration {
        let delay = match header_number(headers, RESET_HEADER) {
            Some(reset) => Duration::from_secs((reset - now() + 1).max(0) as u64),
            None => {
                let factor = 2u32.saturating_pow(attempt);
                self.min_wait.saturating_mul(factor)
                    + Duration::from_millis(thread_rng().gen_range(0..1000))
            }
        };
        delay.max(self.min_wait).min(self.max_wait)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RateWindow {
    limit: i64,
    remaining: i64,
    reset: i64,
}

/// Keeps the provider under a share of the org rate limit
#[derive(Debug)]
pub struct Throttle {
    capacity: i64,
    window: Mutex<Option<RateWindow>>,
}

impl Throttle {
    /// `capacity` is the percentage of each rate-limit window the provider may use
    pub fn new(capacity: i64) -> Self {
        Self {
            capacity: capacity.clamp(1, 100),
            window: Mutex::new(None),
        }
    }

    fn pause(&self, window: &RateWindow, now: i64) -> Option<Duration> {
        if self.capacity >= 100 || window.reset <= now {
            return None;
        }
        let reserved = window.limit * (100 - self.capacity) / 100;
        if window.remaining <= reserved {
            Some(Duration::from_secs((window.reset - now) as u64))
        } else {
            None
        }
    }

    pub async fn wait(&self) {
        let mut window = self.window.lock().await;
        let Some(current) = *window else {
            return;
        };
        if let Some(delay) = self.pause(&current, now()) {
            debug!(
                remaining = current.remaining,
                limit = current.limit,
                "Rate-limit budget used, waiting {delay:?} for the window to reset"
            );
            tokio::time::sleep(delay).await;
            *window = None;
        }
    }

    pub async fn observe(&self, headers: &HeaderMap) {
        if self.capacity >= 100 {
            return;
        }
        if let (Some(limit), Some(remaining), Some(reset)) = (
            header_number(headers, LIMIT_HEADER),
            header_number(headers, REMAINING_HEADER),
            header_number(headers, RESET_HEADER),
        ) {
            *self.window.lock().await = Some(RateWindow {
                limit,
                remaining,
                reset,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            backoff: true,
            max_retries: 3,
            min_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(60),
        }
    }

    #[test]
    fn retries_rate_limits_and_transient_errors() {
        let policy = policy();
        assert!(policy.should_retry(StatusCode::TOO_MANY_REQUESTS, 0));
        assert!(policy.should_retry(StatusCode::SERVICE_UNAVAILABLE, 2));
        assert!(!policy.should_retry(StatusCode::TOO_MANY_REQUESTS, 3));
        assert!(!policy.should_retry(StatusCode::BAD_REQUEST, 0));
        assert!(!policy.should_retry(StatusCode::NOT_FOUND, 0));

        let no_backoff = RetryPolicy {
            backoff: false,
            ..policy
        };
        assert!(!no_backoff.should_retry(StatusCode::TOO_MANY_REQUESTS, 0));
    }

    #[test]
    fn delay_grows_exponentially_within_bounds() {
        let policy = policy();
        let headers = HeaderMap::new();

        let first = policy.delay_for(0, &headers);
        assert!(first >= Duration::from_secs(2) && first < Duration::from_secs(3));
        let third = policy.delay_for(2, &headers);
        assert!(third >= Duration::from_secs(8) && third < Duration::from_secs(9));
        assert_eq!(policy.delay_for(10, &headers), Duration::from_secs(60));
    }

    #[test]
    fn delay_follows_reset_header() {
        let policy = policy();
        let mut headers = HeaderMap::new();
        headers.insert(
            RESET_HEADER,
            HeaderValue::from_str(&(now() + 10).to_string()).unwrap(),
        );
        let delay = policy.delay_for(0, &headers);
        assert!(delay >= Duration::from_secs(10) && delay <= Duration::from_secs(11));

        // A reset already in the past still waits the minimum
        headers.insert(RESET_HEADER, HeaderValue::from_static("1"));
        assert_eq!(policy.delay_for(0, &headers), Duration::from_secs(2));
    }

    #[test]
    fn throttle_pauses_when_budget_is_used() {
        let throttle = Throttle::new(50);
        let window = RateWindow {
            limit: 600,
            remaining: 300,
            reset: 1_000,
        };
        assert_eq!(throttle.pause(&window, 990), Some(Duration::from_secs(10)));
        assert_eq!(
            throttle.pause(
                &RateWindow {
                    remaining: 301,
                    ..window
                },
                990
            ),
            None
        );
        // Window already reset
        assert_eq!(throttle.pause(&window, 1_000), None);
        // Full capacity never pauses
        assert_eq!(Throttle::new(100).pause(&window, 990), None);
    }

    #[tokio::test]
    async fn throttle_records_rate_limit_headers() {
        let throttle = Throttle::new(10);
        let mut headers = HeaderMap::new();
        headers.insert(LIMIT_HEADER, HeaderValue::from_static("600"));
        headers.insert(REMAINING_HEADER, HeaderValue::from_static("599"));
        headers.insert(RESET_HEADER, HeaderValue::from_static("1700000000"));
        throttle.observe(&headers).await;

        assert_eq!(
            *throttle.window.lock().await,
            Some(RateWindow {
                limit: 600,
                remaining: 599,
                reset: 1_700_000_000,
            })
        );
    }
}
