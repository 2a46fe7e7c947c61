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

/// A stable reference to one row of the build side.
///
/// `chunk_index` addresses the append-only chunk list of the right-side
/// storage, `row_index` the row inside that chunk. Both stay valid for the
/// whole lifetime of the operator because chunks are never dropped or
/// reordered once pushed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct RowPtr {
    pub chunk_index: u32,
    pub row_index: u32,
}

impl RowPtr {
    pub fn new(chunk_index: u32, row_index: u32) -> RowPtr {
        RowPtr {
            chunk_index,
            row_index,
        }
    }
}
