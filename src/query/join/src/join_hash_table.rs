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

use ethnum::U256;
use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;
use quarry_common_expression::FixedKey;
use quarry_common_expression::HashMethodFixedKeys;
use quarry_common_expression::HashMethodKind;
use quarry_common_expression::HashMethodSerializer;
use quarry_common_expression::HashMethodSingleFixedString;
use quarry_common_expression::HashMethodSingleString;
use quarry_common_hashtable::HashJoinHashMap;
use quarry_common_hashtable::RowPtr;
use quarry_common_hashtable::StringHashJoinHashMap;

use crate::asof::AsofRowRefs;
use crate::desc::JoinKind;
use crate::desc::JoinStrictness;
use crate::row::RowRefList;

pub struct FixedKeyHashJoinHashTable<T: FixedKey, V> {
    pub(crate) hash_table: HashJoinHashMap<T, V>,
    pub(crate) hash_method: HashMethodFixedKeys<T>,
}

pub struct SerializerHashJoinHashTable<V> {
    pub(crate) hash_table: HashJoinHashMap<u128, V>,
    pub(crate) hash_method: HashMethodSerializer,
}

pub struct SingleStringHashJoinHashTable<V> {
    pub(crate) hash_table: StringHashJoinHashMap<V>,
    pub(crate) hash_method: HashMethodSingleString,
}

pub struct SingleFixedStringHashJoinHashTable<V> {
    pub(crate) hash_table: StringHashJoinHashMap<V>,
    pub(crate) hash_method: HashMethodSingleFixedString,
}

/// The keyed lookup structure, one variant per key representation.
///
/// `Null` is the uninitialized sentinel; reaching it at build or probe
/// time is a logic error. Cross joins and dictionary-backed joins do not
/// materialize maps at all.
pub enum HashJoinHashTable<V> {
    Null,
    Serializer(SerializerHashJoinHashTable<V>),
    SingleString(SingleStringHashJoinHashTable<V>),
    SingleFixedString(SingleFixedStringHashJoinHashTable<V>),
    KeysU8(FixedKeyHashJoinHashTable<u8, V>),
    KeysU16(FixedKeyHashJoinHashTable<u16, V>),
    KeysU32(FixedKeyHashJoinHashTable<u32, V>),
    KeysU64(FixedKeyHashJoinHashTable<u64, V>),
    KeysU128(FixedKeyHashJoinHashTable<u128, V>),
    KeysU256(FixedKeyHashJoinHashTable<U256, V>),
}

impl<V> HashJoinHashTable<V> {
    pub fn from_method(method: &HashMethodKind) -> HashJoinHashTable<V> {
        match method {
            HashMethodKind::Serializer(hash_method) => {
                HashJoinHashTable::Serializer(SerializerHashJoinHashTable {
                    hash_table: HashJoinHashMap::new(),
                    hash_method: hash_method.clone(),
                })
            }
            HashMethodKind::SingleString(hash_method) => {
                HashJoinHashTable::SingleString(SingleStringHashJoinHashTable {
                    hash_table: StringHashJoinHashMap::new(),
                    hash_method: hash_method.clone(),
                })
            }
            HashMethodKind::SingleFixedString(hash_method) => {
                HashJoinHashTable::SingleFixedString(SingleFixedStringHashJoinHashTable {
                    hash_table: StringHashJoinHashMap::new(),
                    hash_method: hash_method.clone(),
                })
            }
            HashMethodKind::KeysU8(hash_method) => {
                HashJoinHashTable::KeysU8(FixedKeyHashJoinHashTable {
                    hash_table: HashJoinHashMap::new(),
                    hash_method: hash_method.clone(),
                })
            }
            HashMethodKind::KeysU16(hash_method) => {
                HashJoinHashTable::KeysU16(FixedKeyHashJoinHashTable {
                    hash_table: HashJoinHashMap::new(),
                    hash_method: hash_method.clone(),
                })
            }
            HashMethodKind::KeysU32(hash_method) => {
                HashJoinHashTable::KeysU32(FixedKeyHashJoinHashTable {
                    hash_table: HashJoinHashMap::new(),
                    hash_method: hash_method.clone(),
                })
            }
            HashMethodKind::KeysU64(hash_method) => {
                HashJoinHashTable::KeysU64(FixedKeyHashJoinHashTable {
                    hash_table: HashJoinHashMap::new(),
                    hash_method: hash_method.clone(),
                })
            }
            HashMethodKind::KeysU128(hash_method) => {
                HashJoinHashTable::KeysU128(FixedKeyHashJoinHashTable {
                    hash_table: HashJoinHashMap::new(),
                    hash_method: hash_method.clone(),
                })
            }
            HashMethodKind::KeysU256(hash_method) => {
                HashJoinHashTable::KeysU256(FixedKeyHashJoinHashTable {
                    hash_table: HashJoinHashMap::new(),
                    hash_method: hash_method.clone(),
                })
            }
        }
    }

    pub fn entry_count(&self) -> usize {
        match self {
            HashJoinHashTable::Null => 0,
            HashJoinHashTable::Serializer(t) => t.hash_table.entry_count(),
            HashJoinHashTable::SingleString(t) => t.hash_table.entry_count(),
            HashJoinHashTable::SingleFixedString(t) => t.hash_table.entry_count(),
            HashJoinHashTable::KeysU8(t) => t.hash_table.entry_count(),
            HashJoinHashTable::KeysU16(t) => t.hash_table.entry_count(),
            HashJoinHashTable::KeysU32(t) => t.hash_table.entry_count(),
            HashJoinHashTable::KeysU64(t) => t.hash_table.entry_count(),
            HashJoinHashTable::KeysU128(t) => t.hash_table.entry_count(),
            HashJoinHashTable::KeysU256(t) => t.hash_table.entry_count(),
        }
    }

    pub fn value_at(&self, offset: usize) -> Option<&V> {
        match self {
            HashJoinHashTable::Null => None,
            HashJoinHashTable::Serializer(t) => t.hash_table.value_at(offset),
            HashJoinHashTable::SingleString(t) => t.hash_table.value_at(offset),
            HashJoinHashTable::SingleFixedString(t) => t.hash_table.value_at(offset),
            HashJoinHashTable::KeysU8(t) => t.hash_table.value_at(offset),
            HashJoinHashTable::KeysU16(t) => t.hash_table.value_at(offset),
            HashJoinHashTable::KeysU32(t) => t.hash_table.value_at(offset),
            HashJoinHashTable::KeysU64(t) => t.hash_table.value_at(offset),
            HashJoinHashTable::KeysU128(t) => t.hash_table.value_at(offset),
            HashJoinHashTable::KeysU256(t) => t.hash_table.value_at(offset),
        }
    }

    pub fn bytes_len(&self) -> usize {
        match self {
            HashJoinHashTable::Null => 0,
            HashJoinHashTable::Serializer(t) => t.hash_table.bytes_len(),
            HashJoinHashTable::SingleString(t) => t.hash_table.bytes_len(),
            HashJoinHashTable::SingleFixedString(t) => t.hash_table.bytes_len(),
            HashJoinHashTable::KeysU8(t) => t.hash_table.bytes_len(),
            HashJoinHashTable::KeysU16(t) => t.hash_table.bytes_len(),
            HashJoinHashTable::KeysU32(t) => t.hash_table.bytes_len(),
            HashJoinHashTable::KeysU64(t) => t.hash_table.bytes_len(),
            HashJoinHashTable::KeysU128(t) => t.hash_table.bytes_len(),
            HashJoinHashTable::KeysU256(t) => t.hash_table.bytes_len(),
        }
    }
}

/// Which mapped-value kind the maps of one disjunct carry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MapsKind {
    One,
    All,
    Asof,
}

/// The maps of one key disjunct, tagged by mapped-value kind.
pub(crate) enum JoinMaps {
    One(HashJoinHashTable<RowPtr>),
    All(HashJoinHashTable<RowRefList>),
    Asof(HashJoinHashTable<AsofRowRefs>),
}

impl JoinMaps {
    pub fn create(kind: MapsKind, method: &HashMethodKind) -> JoinMaps {
        match kind {
            MapsKind::One => JoinMaps::One(HashJoinHashTable::from_method(method)),
            MapsKind::All => JoinMaps::All(HashJoinHashTable::from_method(method)),
            MapsKind::Asof => JoinMaps::Asof(HashJoinHashTable::from_method(method)),
        }
    }

    pub fn entry_count(&self) -> usize {
        match self {
            JoinMaps::One(table) => table.entry_count(),
            JoinMaps::All(table) => table.entry_count(),
            JoinMaps::Asof(table) => table.entry_count(),
        }
    }

    pub fn bytes_len(&self) -> usize {
        match self {
            JoinMaps::One(table) => table.bytes_len(),
            JoinMaps::All(table) => table.bytes_len(),
            JoinMaps::Asof(table) => table.bytes_len(),
        }
    }
}

/// The mapped-value kind and whether per-bucket used-flags are required,
/// per (kind, strictness) combination.
///
/// Flags exist exactly where the shape either emits non-joined right rows
/// or needs claim-once semantics (`Any` with Inner/Right).
pub(crate) fn map_getter(
    kind: JoinKind,
    strictness: JoinStrictness,
) -> Result<(MapsKind, bool)> {
    use JoinKind::*;
    use JoinStrictness::*;
    match (kind, strictness) {
        (Left, RightAny) => Ok((MapsKind::One, false)),
        (Inner, RightAny) => Ok((MapsKind::One, false)),
        (Right, RightAny) => Ok((MapsKind::One, true)),
        (Full, RightAny) => Ok((MapsKind::One, true)),

        (Left, Any) => Ok((MapsKind::One, false)),
        (Inner, Any) => Ok((MapsKind::One, true)),
        (Right, Any) => Ok((MapsKind::All, true)),
        (Full, Any) => Err(ErrorCode::NotImplemented(
            "ANY FULL JOIN is not implemented",
        )),

        (Left, All) => Ok((MapsKind::All, false)),
        (Inner, All) => Ok((MapsKind::All, false)),
        (Right, All) => Ok((MapsKind::All, true)),
        (Full, All) => Ok((MapsKind::All, true)),

        (Left, Semi) => Ok((MapsKind::One, false)),
        (Right, Semi) => Ok((MapsKind::All, true)),

        (Left, Anti) => Ok((MapsKind::One, false)),
        (Right, Anti) => Ok((MapsKind::All, true)),

        (Left, Asof) => Ok((MapsKind::Asof, false)),
        (Inner, Asof) => Ok((MapsKind::Asof, false)),

        (kind, strictness) => Err(ErrorCode::IncompatibleTypeOfJoin(format!(
            "unsupported JOIN combination: {} {}",
            kind, strictness
        ))),
    }
}
