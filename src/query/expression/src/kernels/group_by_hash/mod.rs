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

mod method_fixed_keys;
mod method_serializer;
mod method_single_string;

use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;

pub use method_fixed_keys::FixedKey;
pub use method_fixed_keys::HashMethodFixedKeys;
pub use method_serializer::HashMethodSerializer;
pub use method_single_string::HashMethodSingleFixedString;
pub use method_single_string::HashMethodSingleString;

use crate::DataType;

/// The keyed representations a set of key columns can be indexed by.
#[derive(Clone, Debug)]
pub enum HashMethodKind {
    Serializer(HashMethodSerializer),
    SingleString(HashMethodSingleString),
    SingleFixedString(HashMethodSingleFixedString),
    KeysU8(HashMethodFixedKeys<u8>),
    KeysU16(HashMethodFixedKeys<u16>),
    KeysU32(HashMethodFixedKeys<u32>),
    KeysU64(HashMethodFixedKeys<u64>),
    KeysU128(HashMethodFixedKeys<u128>),
    KeysU256(HashMethodFixedKeys<ethnum::U256>),
}

impl HashMethodKind {
    pub fn name(&self) -> &'static str {
        match self {
            HashMethodKind::Serializer(_) => "Serializer",
            HashMethodKind::SingleString(_) => "SingleString",
            HashMethodKind::SingleFixedString(_) => "SingleFixedString",
            HashMethodKind::KeysU8(_) => "KeysU8",
            HashMethodKind::KeysU16(_) => "KeysU16",
            HashMethodKind::KeysU32(_) => "KeysU32",
            HashMethodKind::KeysU64(_) => "KeysU64",
            HashMethodKind::KeysU128(_) => "KeysU128",
            HashMethodKind::KeysU256(_) => "KeysU256",
        }
    }
}

/// Decide the keyed representation from the key column types.
///
/// Returns the method together with the per-column fixed byte widths used
/// for key packing (zero for columns without a fixed layout).
///
/// A single numeric column is keyed by its own width; any all-fixed tuple
/// that packs into 16 or 32 bytes is keyed by a packed integer; a single
/// string or fixed-string column is keyed by its bytes; everything else
/// falls back to a 128-bit hash of the serialized values.
pub fn choose_hash_method_with_types(
    key_types: &[DataType],
) -> Result<(HashMethodKind, Vec<usize>)> {
    if key_types.is_empty() {
        return Err(ErrorCode::BadArguments(
            "hash method requires at least one key column",
        ));
    }

    let mut all_fixed = true;
    let mut keys_bytes = 0usize;
    let mut key_sizes = Vec::with_capacity(key_types.len());
    for ty in key_types {
        match ty.size_of_fixed() {
            Some(size) => {
                key_sizes.push(size);
                keys_bytes += size;
            }
            None => {
                all_fixed = false;
                key_sizes.push(0);
            }
        }
    }

    if key_types.len() == 1 && key_types[0].is_numeric() {
        let kind = match key_sizes[0] {
            1 => HashMethodKind::KeysU8(HashMethodFixedKeys::default()),
            2 => HashMethodKind::KeysU16(HashMethodFixedKeys::default()),
            4 => HashMethodKind::KeysU32(HashMethodFixedKeys::default()),
            8 => HashMethodKind::KeysU64(HashMethodFixedKeys::default()),
            16 => HashMethodKind::KeysU128(HashMethodFixedKeys::default()),
            32 => HashMethodKind::KeysU256(HashMethodFixedKeys::default()),
            other => {
                return Err(ErrorCode::LogicalError(format!(
                    "numeric key column has fixed size {} not in 1, 2, 4, 8, 16, 32",
                    other
                )))
            }
        };
        return Ok((kind, key_sizes));
    }

    if all_fixed && keys_bytes <= 16 {
        return Ok((
            HashMethodKind::KeysU128(HashMethodFixedKeys::default()),
            key_sizes,
        ));
    }
    if all_fixed && keys_bytes <= 32 {
        return Ok((
            HashMethodKind::KeysU256(HashMethodFixedKeys::default()),
            key_sizes,
        ));
    }

    if key_types.len() == 1 && key_types[0] == DataType::String {
        return Ok((
            HashMethodKind::SingleString(HashMethodSingleString::default()),
            key_sizes,
        ));
    }
    if key_types.len() == 1 && matches!(key_types[0], DataType::FixedString(_)) {
        return Ok((
            HashMethodKind::SingleFixedString(HashMethodSingleFixedString::default()),
            key_sizes,
        ));
    }

    Ok((
        HashMethodKind::Serializer(HashMethodSerializer::default()),
        key_sizes,
    ))
}
