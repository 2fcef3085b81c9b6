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

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::future::Future;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tf_provider::{AttributePath, Diagnostics, Schema, Value, ValueString};

use crate::client::OktaError;

pub(crate) type ValueStringSet<'a> = Value<BTreeSet<ValueString<'a>>>;
pub(crate) type ValueStringList<'a> = Value<Vec<ValueString<'a>>>;

pub(crate) trait WithSchema {
    fn schema() -> Schema;
}

#[async_trait]
pub(crate) trait WithValidate {
    async fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath);
}

pub(crate) trait WithNormalize {
    fn normalize(&mut self, diags: &mut Diagnostics);
}

/// Unwrap a whole state, which the framework only hands over null or unknown by mistake
pub(crate) fn require<T>(diags: &mut Diagnostics, state: Value<T>) -> Option<T> {
    match state {
        Value::Value(state) => Some(state),
        Value::Null => {
            diags.root_error("Resource state is null", "The resource state is expected to be known.");
            None
        }
        Value::Unknown => {
            diags.root_error("Resource state is unknown", "The resource state is expected to be known.");
            None
        }
    }
}

pub(crate) fn report(diags: &mut Diagnostics, summary: &'static str, err: OktaError) {
    diags.root_error(summary, err.to_string());
}

/// Report a failed call, and keep going with its value otherwise
pub(crate) fn ok_or_report<T>(
    diags: &mut Diagnostics,
    summary: &'static str,
    result: Result<T, OktaError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            report(diags, summary, err);
            None
        }
    }
}

/// API failure tagged with the step of the operation it happened in
#[derive(Debug)]
pub(crate) struct StepError {
    pub summary: &'static str,
    pub source: OktaError,
}

impl StepError {
    pub(crate) fn report(self, diags: &mut Diagnostics) {
        report(diags, self.summary, self.source);
    }
}

pub(crate) trait StepContext<T> {
    fn step(self, summary: &'static str) -> Result<T, StepError>;
}

impl<T> StepContext<T> for Result<T, OktaError> {
    fn step(self, summary: &'static str) -> Result<T, StepError> {
        self.map_err(|source| StepError { summary, source })
    }
}

pub(crate) fn as_str<'b>(value: &'b ValueString<'_>) -> &'b str {
    match value {
        Value::Value(value) => value.as_ref(),
        _ => "",
    }
}

/// Known and non-empty string
pub(crate) fn non_empty<'b>(value: &'b ValueString<'_>) -> Option<&'b str> {
    match value {
        Value::Value(value) if !value.is_empty() => Some(value.as_ref()),
        _ => None,
    }
}

pub(crate) fn string_value<'a>(value: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(value.into()))
}

/// Empty strings are stored as null
pub(crate) fn optional_string<'a>(value: Option<&str>) -> ValueString<'a> {
    match value {
        Some(value) if !value.is_empty() => string_value(value),
        _ => Value::Null,
    }
}

/// Strings of a known set, `None` if the set is null or unknown
pub(crate) fn set_strings(set: &ValueStringSet<'_>) -> Option<Vec<String>> {
    match set {
        Value::Value(set) => Some(
            set.iter()
                .filter_map(|value| match value {
                    Value::Value(value) => Some(value.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

pub(crate) fn list_strings(list: &ValueStringList<'_>) -> Vec<String> {
    match list {
        Value::Value(list) => list
            .iter()
            .filter_map(|value| match value {
                Value::Value(value) => Some(value.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn string_set<'a, I, S>(values: I) -> ValueStringSet<'a>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Value(values.into_iter().map(string_value).collect())
}

pub(crate) fn string_list<'a, I, S>(values: I) -> ValueStringList<'a>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Value(values.into_iter().map(string_value).collect())
}

/// Read a set back from the API: a null (unmanaged) set stays null while nothing is there
pub(crate) fn read_set<'a>(prior: &ValueStringSet<'a>, current: Vec<String>) -> ValueStringSet<'a> {
    if prior.is_null() && current.is_empty() {
        Value::Null
    } else {
        string_set(current)
    }
}

/// Run `f` on every item with at most `parallelism` calls in flight, and keep the first error
pub(crate) async fn for_each_concurrent<I, F, Fut>(
    parallelism: usize,
    items: I,
    f: F,
) -> Result<(), OktaError>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<(), OktaError>>,
{
    stream::iter(items.into_iter().map(f))
        .buffer_unordered(parallelism.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect()
}

pub struct DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    iter: RefCell<T>,
    sep: &'a str,
}

pub trait DisplayJoinable {
    type Joiner<'a>;
    fn join_with(self, sep: &str) -> Self::Joiner<'_>;
}

impl<T, I> DisplayJoinable for T
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    type Joiner<'a> = DisplayJoiner<'a, T, I>;

    fn join_with(self, sep: &str) -> Self::Joiner<'_> {
        DisplayJoiner {
            iter: RefCell::new(self),
            sep,
        }
    }
}

impl<'a, T, I> std::fmt::Display for DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sep = "";
        let mut iter = self.iter.try_borrow_mut().or(Err(std::fmt::Error))?;
        for elt in iter.by_ref() {
            f.write_str(sep)?;
            f.write_fmt(format_args!("{elt}"))?;
            sep = self.sep;
        }
        Ok(())
    }
}
