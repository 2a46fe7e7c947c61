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

use std::hash::Hasher;

use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;
use siphasher::sip128::Hasher128;
use siphasher::sip128::SipHasher24;

use crate::values::Column;
use crate::values::NumberColumn;

/// Keys every row by a 128-bit hash of its serialized key tuple.
///
/// Serialization is column-oriented: each key column contributes its raw
/// value bytes in order, strings length-prefixed so that value boundaries
/// stay unambiguous.
#[derive(Clone, Debug, Default)]
pub struct HashMethodSerializer;

impl HashMethodSerializer {
    pub fn build_keys(&self, group_columns: &[Column], rows: usize) -> Result<Vec<u128>> {
        let mut keys = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut hasher = SipHasher24::new();
            for column in group_columns {
                serialize_value(column, row, &mut hasher)?;
            }
            keys.push(hasher.finish128().as_u128());
        }
        Ok(keys)
    }
}

fn serialize_value(column: &Column, row: usize, hasher: &mut SipHasher24) -> Result<()> {
    macro_rules! write_number {
        ($buffer:expr) => {{
            let value = $buffer.get(row).ok_or_else(row_out_of_bounds)?;
            hasher.write(&value.to_le_bytes());
        }};
    }

    match column {
        Column::Number(NumberColumn::UInt8(b)) => write_number!(b),
        Column::Number(NumberColumn::UInt16(b)) => write_number!(b),
        Column::Number(NumberColumn::UInt32(b)) => write_number!(b),
        Column::Number(NumberColumn::UInt64(b)) => write_number!(b),
        Column::Number(NumberColumn::Int8(b)) => write_number!(b),
        Column::Number(NumberColumn::Int16(b)) => write_number!(b),
        Column::Number(NumberColumn::Int32(b)) => write_number!(b),
        Column::Number(NumberColumn::Int64(b)) => write_number!(b),
        Column::Number(NumberColumn::Float32(b)) => write_number!(b),
        Column::Number(NumberColumn::Float64(b)) => write_number!(b),
        Column::Date(b) => write_number!(b),
        Column::Timestamp(b) => write_number!(b),
        Column::String(col) => {
            let value = col.index(row).ok_or_else(row_out_of_bounds)?;
            hasher.write(&(value.len() as u64).to_le_bytes());
            hasher.write(value);
        }
        Column::FixedString(col) => {
            let value = col.index(row).ok_or_else(row_out_of_bounds)?;
            hasher.write(value);
        }
        Column::Nullable(col) => {
            let null = *col.null_map.get(row).ok_or_else(row_out_of_bounds)?;
            if null != 0 {
                hasher.write(&[1u8]);
            } else {
                hasher.write(&[0u8]);
                serialize_value(&col.column, row, hasher)?;
            }
        }
    }
    Ok(())
}

fn row_out_of_bounds() -> ErrorCode {
    ErrorCode::LogicalError("row index out of bounds while serializing keys")
}
