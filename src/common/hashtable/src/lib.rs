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

//! Hash maps specialized for hash joins.
//!
//! Unlike general purpose maps these keep every distinct key at a stable
//! *bucket ordinal* (the insertion index), which the join layer uses to
//! address its per-bucket used-flags and to resume iteration from the
//! middle of the table.

mod hashjoin_hashtable;
mod hashjoin_string_hashtable;
mod row_ptr;
mod traits;

pub use hashjoin_hashtable::HashJoinHashMap;
pub use hashjoin_string_hashtable::StringHashJoinHashMap;
pub use hashjoin_string_hashtable::STRING_EARLY_SIZE;
pub use row_ptr::RowPtr;
pub use traits::FastHash;
pub use traits::HashJoinHashtableLike;
pub use traits::Keyable;
