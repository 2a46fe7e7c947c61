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

use quarry_common_exception::Result;
use quarry_common_expression::Column;
use quarry_common_expression::DataBlock;

/// External dictionary lookup backing a `LEFT ANY | SEMI | ANTI` join.
///
/// Given the left key column, the reader resolves every key in one call:
/// the result block carries the right-side columns in the layout the join
/// stores them, `found` marks the keys that resolved (non-zero byte), and
/// `positions` gives the row inside the result block for each key.
pub trait DictionaryReader: Send + Sync {
    fn read_keys(&self, key_column: &Column) -> Result<(DataBlock, Vec<u8>, Vec<u64>)>;
}
