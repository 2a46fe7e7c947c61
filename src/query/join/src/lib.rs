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

//! The in-memory hash-join operator.
//!
//! The right relation is ingested block by block into a keyed structure
//! chosen from the key column types; left blocks are then probed against it
//! concurrently. Outer shapes track per-bucket usage with atomic flags and
//! drain the unmatched right rows through a resumable stream once probing
//! ends.

mod added_columns;
mod asof;
mod common;
mod cross_join;
mod desc;
mod dictionary;
mod hash_join;
mod join_hash_table;
mod non_joined;
mod probe;
mod row;
mod used_flags;

pub use asof::AsofType;
pub use cross_join::NotProcessedCrossJoin;
pub use desc::AsofInequality;
pub use desc::HashJoinDesc;
pub use desc::JoinKind;
pub use desc::JoinStrictness;
pub use desc::OverflowMode;
pub use desc::SizeLimits;
pub use dictionary::DictionaryReader;
pub use hash_join::HashJoin;
pub use non_joined::NonJoinedBlockStream;
pub use row::RowRefList;
