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

use std::marker::PhantomData;
use std::mem;

use ethnum::U256;
use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;
use quarry_common_hashtable::Keyable;

use crate::values::Column;
use crate::values::NumberColumn;

/// An integer wide enough to hold a packed fixed-width key tuple.
pub trait FixedKey: Keyable {
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_key_for_primitive {
    ($($t:ty),*) => {
        $(
            impl FixedKey for $t {
                #[inline(always)]
                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_fixed_key_for_primitive! { u8, u16, u32, u64, u128 }

impl FixedKey for U256 {
    #[inline(always)]
    fn from_le_slice(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 32];
        buf.copy_from_slice(bytes);
        U256::from_le_bytes(buf)
    }
}

/// Packs the key tuple of each row into a `T`, little-endian, zero-padded.
///
/// All key columns must report a fixed contiguous layout; the caller
/// guarantees their total width fits `T`.
#[derive(Clone, Debug, Default)]
pub struct HashMethodFixedKeys<T> {
    _t: PhantomData<T>,
}

impl<T: FixedKey> HashMethodFixedKeys<T> {
    pub fn build_keys(&self, group_columns: &[Column], rows: usize) -> Result<Vec<T>> {
        let mut sizes = Vec::with_capacity(group_columns.len());
        let mut total = 0usize;
        for column in group_columns {
            let size = column.data_type().size_of_fixed().ok_or_else(|| {
                ErrorCode::LogicalError(format!(
                    "column of type {} has no fixed layout for key packing",
                    column.data_type()
                ))
            })?;
            sizes.push(size);
            total += size;
        }
        if total > mem::size_of::<T>() {
            return Err(ErrorCode::LogicalError(format!(
                "packed key of {} bytes does not fit into {} bytes",
                total,
                mem::size_of::<T>()
            )));
        }

        let mut keys = Vec::with_capacity(rows);
        let mut buf = [0u8; 32];
        for row in 0..rows {
            buf.fill(0);
            let mut offset = 0;
            for (column, size) in group_columns.iter().zip(sizes.iter()) {
                write_fixed_le(column, row, &mut buf[offset..offset + size])?;
                offset += size;
            }
            keys.push(T::from_le_slice(&buf[..mem::size_of::<T>()]));
        }
        Ok(keys)
    }
}

fn write_fixed_le(column: &Column, row: usize, out: &mut [u8]) -> Result<()> {
    macro_rules! copy_number {
        ($buffer:expr) => {{
            let value = $buffer.get(row).ok_or_else(row_out_of_bounds)?;
            out.copy_from_slice(&value.to_le_bytes());
        }};
    }

    match column {
        Column::Number(NumberColumn::UInt8(b)) => copy_number!(b),
        Column::Number(NumberColumn::UInt16(b)) => copy_number!(b),
        Column::Number(NumberColumn::UInt32(b)) => copy_number!(b),
        Column::Number(NumberColumn::UInt64(b)) => copy_number!(b),
        Column::Number(NumberColumn::Int8(b)) => copy_number!(b),
        Column::Number(NumberColumn::Int16(b)) => copy_number!(b),
        Column::Number(NumberColumn::Int32(b)) => copy_number!(b),
        Column::Number(NumberColumn::Int64(b)) => copy_number!(b),
        Column::Number(NumberColumn::Float32(b)) => copy_number!(b),
        Column::Number(NumberColumn::Float64(b)) => copy_number!(b),
        Column::Date(b) => copy_number!(b),
        Column::Timestamp(b) => copy_number!(b),
        Column::FixedString(col) => {
            let value = col.index(row).ok_or_else(row_out_of_bounds)?;
            out.copy_from_slice(value);
        }
        Column::String(_) | Column::Nullable(_) => {
            return Err(ErrorCode::LogicalError(format!(
                "column of type {} cannot be packed into a fixed key",
                column.data_type()
            )));
        }
    }
    Ok(())
}

fn row_out_of_bounds() -> ErrorCode {
    ErrorCode::LogicalError("row index out of bounds while packing keys")
}
