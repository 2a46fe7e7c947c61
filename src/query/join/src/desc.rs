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
use std::sync::Arc;

use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;

use crate::dictionary::DictionaryReader;

pub const DEFAULT_MAX_JOINED_BLOCK_ROWS: usize = 65536;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn is_left_or_full(&self) -> bool {
        matches!(self, JoinKind::Left | JoinKind::Full)
    }

    pub fn is_right_or_full(&self) -> bool {
        matches!(self, JoinKind::Right | JoinKind::Full)
    }

    pub fn is_inner_or_right(&self) -> bool {
        matches!(self, JoinKind::Inner | JoinKind::Right)
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinStrictness {
    /// At most one match per left row.
    Any,
    /// Every match per left row.
    All,
    /// Emit the left row once if any match exists.
    Semi,
    /// Emit the left row only if no match exists.
    Anti,
    /// Inequality match on one extra ordered column.
    Asof,
    /// Legacy ANY keeping the first right row per key.
    RightAny,
}

impl fmt::Display for JoinStrictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AsofInequality {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OverflowMode {
    Throw,
    Break,
}

/// Limits on the materialized build side.
#[derive(Clone, Copy, Debug)]
pub struct SizeLimits {
    pub max_rows: u64,
    pub max_bytes: u64,
    pub overflow_mode: OverflowMode,
}

impl SizeLimits {
    pub fn unlimited() -> SizeLimits {
        SizeLimits {
            max_rows: 0,
            max_bytes: 0,
            overflow_mode: OverflowMode::Throw,
        }
    }

    pub fn new(max_rows: u64, max_bytes: u64, overflow_mode: OverflowMode) -> SizeLimits {
        SizeLimits {
            max_rows,
            max_bytes,
            overflow_mode,
        }
    }

    /// Check the current totals, returning `Ok(false)` in `Break` mode and
    /// an error in `Throw` mode when a limit is exceeded.
    pub fn check(&self, rows: u64, bytes: u64, what: &str) -> Result<bool> {
        let rows_exceeded = self.max_rows != 0 && rows > self.max_rows;
        let bytes_exceeded = self.max_bytes != 0 && bytes > self.max_bytes;
        if !rows_exceeded && !bytes_exceeded {
            return Ok(true);
        }
        match self.overflow_mode {
            OverflowMode::Break => Ok(false),
            OverflowMode::Throw => Err(ErrorCode::SetSizeLimitExceeded(format!(
                "{} size limit exceeded: {} rows, {} bytes (max rows: {}, max bytes: {})",
                what, rows, bytes, self.max_rows, self.max_bytes
            ))),
        }
    }
}

/// Immutable configuration of one hash-join instance.
#[derive(Clone)]
pub struct HashJoinDesc {
    pub kind: JoinKind,
    pub strictness: JoinStrictness,
    /// OR-disjunction list of key tuples; the join matches a row when any
    /// inner tuple matches.
    pub key_names_left: Vec<Vec<String>>,
    pub key_names_right: Vec<Vec<String>>,
    /// Widen output columns coming from the right side to nullable.
    pub nullable_right_side: bool,
    /// Widen output columns coming from the left side to nullable.
    pub nullable_left_side: bool,
    pub asof_inequality: AsofInequality,
    pub size_limits: SizeLimits,
    /// Right-side key columns the caller expects in the output block even
    /// though they equal the left keys.
    pub required_right_keys: Vec<String>,
    /// Whether the plan forced the hash algorithm; when it did and the
    /// shape allows, key columns are not stored twice.
    pub force_hash_join: bool,
    pub max_joined_block_rows: usize,
    pub dictionary_reader: Option<Arc<dyn DictionaryReader>>,
}

impl HashJoinDesc {
    pub fn new(
        kind: JoinKind,
        strictness: JoinStrictness,
        key_names_left: Vec<Vec<String>>,
        key_names_right: Vec<Vec<String>>,
    ) -> HashJoinDesc {
        HashJoinDesc {
            kind,
            strictness,
            key_names_left,
            key_names_right,
            nullable_right_side: false,
            nullable_left_side: false,
            asof_inequality: AsofInequality::LessOrEqual,
            size_limits: SizeLimits::unlimited(),
            required_right_keys: vec![],
            force_hash_join: true,
            max_joined_block_rows: DEFAULT_MAX_JOINED_BLOCK_ROWS,
            dictionary_reader: None,
        }
    }

    pub fn with_nullable_right_side(mut self, nullable: bool) -> Self {
        self.nullable_right_side = nullable;
        self
    }

    pub fn with_nullable_left_side(mut self, nullable: bool) -> Self {
        self.nullable_left_side = nullable;
        self
    }

    pub fn with_asof_inequality(mut self, inequality: AsofInequality) -> Self {
        self.asof_inequality = inequality;
        self
    }

    pub fn with_size_limits(mut self, limits: SizeLimits) -> Self {
        self.size_limits = limits;
        self
    }

    pub fn with_required_right_keys(mut self, keys: Vec<String>) -> Self {
        self.required_right_keys = keys;
        self
    }

    pub fn with_force_hash_join(mut self, force: bool) -> Self {
        self.force_hash_join = force;
        self
    }

    pub fn with_max_joined_block_rows(mut self, rows: usize) -> Self {
        self.max_joined_block_rows = rows;
        self
    }

    pub fn with_dictionary_reader(mut self, reader: Arc<dyn DictionaryReader>) -> Self {
        self.dictionary_reader = Some(reader);
        self
    }

    pub(crate) fn multiple_disjuncts(&self) -> bool {
        self.key_names_right.len() > 1
    }

    /// Eager validation of the descriptor shape; every invalid combination
    /// is reported here rather than at probe time.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.kind == JoinKind::Cross {
            return Ok(());
        }

        if self.key_names_left.len() != self.key_names_right.len() {
            return Err(ErrorCode::SyntaxError(format!(
                "mismatched number of key disjuncts: {} left vs {} right",
                self.key_names_left.len(),
                self.key_names_right.len()
            )));
        }
        if self.key_names_right.is_empty() {
            return Err(ErrorCode::SyntaxError(
                "hash join requires at least one key tuple",
            ));
        }
        for (left, right) in self.key_names_left.iter().zip(self.key_names_right.iter()) {
            if left.len() != right.len() || left.is_empty() {
                return Err(ErrorCode::SyntaxError(format!(
                    "mismatched key tuple: {} left columns vs {} right columns",
                    left.len(),
                    right.len()
                )));
            }
        }

        if self.strictness == JoinStrictness::Asof {
            if !matches!(self.kind, JoinKind::Left | JoinKind::Inner) {
                return Err(ErrorCode::NotImplemented(
                    "wrong ASOF JOIN type, only ASOF and LEFT ASOF joins are supported",
                ));
            }
            if self.multiple_disjuncts() {
                return Err(ErrorCode::NotImplemented(
                    "ASOF JOIN over multiple key disjuncts is not implemented",
                ));
            }
        }

        if let Some(_reader) = &self.dictionary_reader {
            let supported = self.kind == JoinKind::Left
                && matches!(
                    self.strictness,
                    JoinStrictness::Any | JoinStrictness::Semi | JoinStrictness::Anti
                );
            if !supported {
                return Err(ErrorCode::IncompatibleTypeOfJoin(
                    "dictionary-backed join supports only LEFT ANY, LEFT SEMI and LEFT ANTI",
                ));
            }
            if self.multiple_disjuncts() || self.key_names_right[0].len() != 1 {
                return Err(ErrorCode::IncompatibleTypeOfJoin(
                    "dictionary-backed join supports a single key column only",
                ));
            }
        }

        Ok(())
    }
}
