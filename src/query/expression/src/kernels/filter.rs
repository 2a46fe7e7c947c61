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
    /// Keep the rows whose filter byte is non-zero.
    pub fn filter(&self, filter: &[u8]) -> Column {
        debug_assert_eq!(filter.len(), self.len());
        let result_size = filter.iter().filter(|keep| **keep != 0).count();
        let mut builder = ColumnBuilder::with_capacity(&self.data_type(), result_size);
        for (row, keep) in filter.iter().enumerate() {
            if *keep != 0 {
                if let Some(value) = self.index(row) {
                    builder.push(value);
                }
            }
        }
        builder.build()
    }
}
