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

use crate::values::Column;
use crate::values::ColumnBuilder;

impl Column {
    /// Repeat row `i` `offsets[i] - offsets[i - 1]` times.
    ///
    /// `offsets` are cumulative output counts, so the last element is the
    /// total size of the result.
    pub fn replicate(&self, offsets: &[u64]) -> Column {
        debug_assert_eq!(offsets.len(), self.len());
        let result_size = offsets.last().copied().unwrap_or(0) as usize;
        let mut builder = ColumnBuilder::with_capacity(&self.data_type(), result_size);
        let mut previous = 0u64;
        for (row, offset) in offsets.iter().enumerate() {
            if let Some(value) = self.index(row) {
                builder.push_many(value, (*offset - previous) as usize);
            }
            previous = *offset;
        }
        builder.build()
    }
}
