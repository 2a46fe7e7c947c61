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

use std::collections::HashSet;

use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;
use quarry_common_expression::BlockEntry;
use quarry_common_expression::ColumnBuilder;
use quarry_common_expression::DataBlock;
use quarry_common_expression::DataType;
use quarry_common_expression::Value;
use quarry_common_hashtable::RowPtr;

/// Accumulator for the right-side columns a probe appends to the left
/// block: the right payload columns absent from the left block, plus the
/// right ASOF column when applicable.
///
/// Default rows for outer shapes are counted lazily and flushed before the
/// next real append, so misses cost nothing until a match follows them.
pub(crate) struct AddedColumns<'a> {
    blocks: &'a [DataBlock],
    type_name: Vec<(DataType, String)>,
    builders: Vec<ColumnBuilder>,
    right_indexes: Vec<usize>,
    lazy_defaults_count: usize,
    pub rows_to_add: usize,
    pub offsets_to_replicate: Option<Vec<u64>>,
    pub need_filter: bool,
}

impl<'a> AddedColumns<'a> {
    pub fn new(
        block_with_columns_to_add: &DataBlock,
        block: &DataBlock,
        saved_block_sample: &DataBlock,
        blocks: &'a [DataBlock],
        right_asof_entry: Option<&BlockEntry>,
        rows_to_add: usize,
    ) -> Result<AddedColumns<'a>> {
        let mut type_name = Vec::new();
        for src_column in block_with_columns_to_add.entries() {
            // Columns present in the left block are not added twice.
            if block.get_by_name(&src_column.name).is_none() {
                type_name.push((src_column.data_type.clone(), src_column.name.clone()));
            }
        }
        if let Some(asof_entry) = right_asof_entry {
            if !type_name.iter().any(|(_, name)| *name == asof_entry.name) {
                type_name.push((asof_entry.data_type.clone(), asof_entry.name.clone()));
            }
        }

        let mut builders = Vec::with_capacity(type_name.len());
        let mut right_indexes = Vec::with_capacity(type_name.len());
        for (ty, name) in &type_name {
            builders.push(ColumnBuilder::with_capacity(ty, rows_to_add));
            right_indexes.push(saved_block_sample.index_of(name).ok_or_else(|| {
                ErrorCode::NoSuchColumnInTable(format!(
                    "not found column {} in the stored right block",
                    name
                ))
            })?);
        }

        Ok(AddedColumns {
            blocks,
            type_name,
            builders,
            right_indexes,
            lazy_defaults_count: 0,
            rows_to_add,
            offsets_to_replicate: None,
            need_filter: false,
        })
    }

    pub fn append_from_block(&mut self, ptr: RowPtr, has_defaults: bool) -> Result<()> {
        if has_defaults {
            self.apply_lazy_defaults();
        }
        let chunk = self.blocks.get(ptr.chunk_index as usize).ok_or_else(|| {
            ErrorCode::LogicalError("row reference points at a missing right chunk")
        })?;
        for (builder, index) in self.builders.iter_mut().zip(self.right_indexes.iter()) {
            let column = chunk
                .entries()
                .get(*index)
                .and_then(|entry| entry.value.as_column())
                .ok_or_else(|| {
                    ErrorCode::LogicalError("stored right block misses an added column")
                })?;
            let value = column.index(ptr.row_index as usize).ok_or_else(|| {
                ErrorCode::LogicalError("row reference points past the stored right block")
            })?;
            builder.push(value);
        }
        Ok(())
    }

    pub fn append_default_row(&mut self) {
        self.lazy_defaults_count += 1;
    }

    pub fn apply_lazy_defaults(&mut self) {
        if self.lazy_defaults_count != 0 {
            for builder in self.builders.iter_mut() {
                builder.push_defaults(self.lazy_defaults_count);
            }
            self.lazy_defaults_count = 0;
        }
    }

    pub fn move_columns(self) -> Vec<BlockEntry> {
        self.type_name
            .into_iter()
            .zip(self.builders)
            .map(|((ty, name), builder)| BlockEntry::new(name, ty, Value::Column(builder.build())))
            .collect()
    }
}

const KNOWN_ROWS_MAX_LINEAR: usize = 16;

/// Right rows already emitted for the current left row.
///
/// Only the multi-disjunct regime needs it: overlapping disjuncts may
/// find the same right row twice. A small linear array covers the common
/// case; larger match sets spill into a hash set.
pub(crate) struct KnownRowsHolder {
    enabled: bool,
    linear: [RowPtr; KNOWN_ROWS_MAX_LINEAR],
    items: usize,
    spilled: Option<HashSet<RowPtr>>,
}

impl KnownRowsHolder {
    pub fn new(enabled: bool) -> KnownRowsHolder {
        KnownRowsHolder {
            enabled,
            linear: [RowPtr::default(); KNOWN_ROWS_MAX_LINEAR],
            items: 0,
            spilled: None,
        }
    }

    pub fn is_known(&self, ptr: &RowPtr) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.spilled {
            Some(set) => set.contains(ptr),
            None => self.linear[..self.items].contains(ptr),
        }
    }

    pub fn add(&mut self, ptrs: &[RowPtr]) {
        if !self.enabled || ptrs.is_empty() {
            return;
        }
        if self.spilled.is_none() && self.items + ptrs.len() <= KNOWN_ROWS_MAX_LINEAR {
            self.linear[self.items..self.items + ptrs.len()].copy_from_slice(ptrs);
            self.items += ptrs.len();
            return;
        }
        if self.spilled.is_none() {
            let spilled: HashSet<RowPtr> = self.linear[..self.items].iter().copied().collect();
            self.spilled = Some(spilled);
        }
        if let Some(set) = self.spilled.as_mut() {
            set.extend(ptrs.iter().copied());
        }
        self.items += ptrs.len();
    }
}
