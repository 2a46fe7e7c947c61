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

use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;

use crate::values::Column;

/// Keys every row by the bytes of a single variable-length string column.
#[derive(Clone, Debug, Default)]
pub struct HashMethodSingleString;

impl HashMethodSingleString {
    pub fn build_keys<'a>(&self, column: &'a Column, rows: usize) -> Result<Vec<&'a [u8]>> {
        match column {
            Column::String(col) => {
                let mut keys = Vec::with_capacity(rows);
                for row in 0..rows {
                    keys.push(col.index(row).ok_or_else(|| {
                        ErrorCode::LogicalError("row index out of bounds in string keys")
                    })?);
                }
                Ok(keys)
            }
            other => Err(ErrorCode::LogicalError(format!(
                "single string hash method expects a String column, got {}",
                other.data_type()
            ))),
        }
    }
}

/// Keys every row by the bytes of a single fixed-length string column.
#[derive(Clone, Debug, Default)]
pub struct HashMethodSingleFixedString;

impl HashMethodSingleFixedString {
    pub fn build_keys<'a>(&self, column: &'a Column, rows: usize) -> Result<Vec<&'a [u8]>> {
        match column {
            Column::FixedString(col) => {
                let mut keys = Vec::with_capacity(rows);
                for row in 0..rows {
                    keys.push(col.index(row).ok_or_else(|| {
                        ErrorCode::LogicalError("row index out of bounds in fixed string keys")
                    })?);
                }
                Ok(keys)
            }
            other => Err(ErrorCode::LogicalError(format!(
                "single fixed string hash method expects a FixedString column, got {}",
                other.data_type()
            ))),
        }
    }
}
