// Copyright 2023 Quarry Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
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

use std::fmt;

pub type Result<T> = std::result::Result<T, ErrorCode>;

/// The error type used across the workspace.
///
/// Every error carries a stable numeric code, the name of its constructor
/// and a human readable message. Codes are declared in `exception_code.rs`.
pub struct ErrorCode {
    code: u16,
    name: String,
    display_text: String,
}

impl ErrorCode {
    pub fn create(code: u16, name: impl ToString, display_text: String) -> ErrorCode {
        ErrorCode {
            code,
            name: name.to_string(),
            display_text,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn name(&self) -> String {
        self.name.clone()
    }

    pub fn message(&self) -> String {
        self.display_text.clone()
    }

    pub fn add_message_back(mut self, msg: impl AsRef<str>) -> Self {
        self.display_text = format!("{}{}", self.display_text, msg.as_ref());
        self
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}. Code: {}, Text = {}.",
            self.name, self.code, self.display_text
        )
    }
}

impl fmt::Debug for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}. Code: {}, Text = {}.",
            self.name, self.code, self.display_text
        )
    }
}

impl std::error::Error for ErrorCode {}
