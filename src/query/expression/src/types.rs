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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberDataType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl NumberDataType {
    pub fn bytes(&self) -> usize {
        match self {
            NumberDataType::UInt8 | NumberDataType::Int8 => 1,
            NumberDataType::UInt16 | NumberDataType::Int16 => 2,
            NumberDataType::UInt32 | NumberDataType::Int32 | NumberDataType::Float32 => 4,
            NumberDataType::UInt64 | NumberDataType::Int64 | NumberDataType::Float64 => 8,
        }
    }
}

/// The closed set of value types the join core operates on.
///
/// `Date` stores days as `i32`, `Timestamp` microseconds as `i64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Number(NumberDataType),
    String,
    FixedString(usize),
    Date,
    Timestamp,
    Nullable(Box<DataType>),
}

impl DataType {
    pub fn is_nullable(&self) -> bool {
        matches!(self, DataType::Nullable(_))
    }

    /// Date and timestamp columns count as numeric: they are plain
    /// fixed-width integer columns under a different name.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Number(_) | DataType::Date | DataType::Timestamp
        )
    }

    /// Byte width of one value if the column layout is fixed and contiguous.
    pub fn size_of_fixed(&self) -> Option<usize> {
        match self {
            DataType::Number(num) => Some(num.bytes()),
            DataType::Date => Some(4),
            DataType::Timestamp => Some(8),
            DataType::FixedString(n) => Some(*n),
            DataType::String | DataType::Nullable(_) => None,
        }
    }

    pub fn wrap_nullable(self) -> DataType {
        match self {
            DataType::Nullable(_) => self,
            other => DataType::Nullable(Box::new(other)),
        }
    }

    pub fn remove_nullable(&self) -> DataType {
        match self {
            DataType::Nullable(inner) => (**inner).clone(),
            other => other.clone(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Number(num) => write!(f, "{:?}", num),
            DataType::String => write!(f, "String"),
            DataType::FixedString(n) => write!(f, "FixedString({})", n),
            DataType::Date => write!(f, "Date"),
            DataType::Timestamp => write!(f, "Timestamp"),
            DataType::Nullable(inner) => write!(f, "Nullable({})", inner),
        }
    }
}
