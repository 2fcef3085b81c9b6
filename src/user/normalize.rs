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

use tf_provider::Diagnostics;

use crate::client::models::STATUS_ACTIVE;
use crate::utils::{string_value, WithNormalize};

use super::state::UserState;

impl<'a> WithNormalize for UserState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        if self.status.is_null() {
            self.status = string_value(STATUS_ACTIVE);
        }
        if self.custom_profile_attributes.is_null() {
            self.custom_profile_attributes = string_value("{}");
        }
    }
}
