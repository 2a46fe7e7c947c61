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

use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;
use quarry_common_expression::BlockEntry;
use quarry_common_expression::Column;
use quarry_common_expression::ColumnBuilder;
use quarry_common_expression::DataBlock;
use quarry_common_expression::Value;

use crate::common::correct_nullability;
use crate::common::default_column;
use crate::hash_join::HashJoin;
use crate::join_hash_table::JoinMaps;
use crate::row::JoinMapped;

/// Stream of the right rows that never matched, emitted after probing for
/// Right and Full shapes.
///
/// The iterator walks the buckets of the first disjunct's map, skipping
/// those whose used-flag is set, then drains the blocks that were kept
/// aside because their key tuple contained NULLs. Both positions survive
/// across `next_block` calls, so the stream can be pulled in bounded
/// pieces.
pub struct NonJoinedBlockStream<'a> {
    join: &'a HashJoin,
    result_sample_block: DataBlock,
    max_block_size: usize,
    /// Next bucket ordinal to inspect in `maps[0]`.
    position: usize,
    /// Next `blocks_nullmaps` entry to drain.
    nulls_position: usize,
}

impl<'a> NonJoinedBlockStream<'a> {
    pub(crate) fn new(
        join: &'a HashJoin,
        result_sample_block: DataBlock,
        max_block_size: usize,
    ) -> NonJoinedBlockStream<'a> {
        NonJoinedBlockStream {
            join,
            result_sample_block,
            max_block_size,
            position: 0,
            nulls_position: 0,
        }
    }

    /// Pull up to roughly `max_block_size` unmatched right rows; `None`
    /// once the storage is exhausted.
    pub fn next_block(&mut self) -> Result<Option<DataBlock>> {
        let data = self.join.data.read();
        if data.row_space.blocks.is_empty() {
            return Ok(None);
        }

        let saved_sample = &data.row_space.saved_block_sample;
        let mut builders: Vec<ColumnBuilder> = saved_sample
            .entries()
            .iter()
            .map(|entry| ColumnBuilder::with_capacity(&entry.data_type, self.max_block_size))
            .collect();
        let mut rows_added = 0usize;

        match data.maps.first() {
            Some(JoinMaps::One(table)) => {
                self.fill_columns_from_map(table, &data.row_space.blocks, &mut builders, &mut rows_added)?
            }
            Some(JoinMaps::All(table)) => {
                self.fill_columns_from_map(table, &data.row_space.blocks, &mut builders, &mut rows_added)?
            }
            Some(JoinMaps::Asof(_)) | None => {
                return Err(ErrorCode::LogicalError(
                    "unknown JOIN strictness for the non-joined stream (must be ANY or ALL)",
                ))
            }
        }

        self.fill_nulls_from_blocks(
            &data.row_space.blocks,
            &data.row_space.blocks_nullmaps,
            &mut builders,
            &mut rows_added,
        )?;

        if rows_added == 0 {
            return Ok(None);
        }

        let right_columns: Vec<(String, Column)> = saved_sample
            .entries()
            .iter()
            .zip(builders)
            .map(|(entry, builder)| (entry.name.clone(), builder.build()))
            .collect();

        Ok(Some(self.assemble_block(right_columns, rows_added)))
    }

    fn fill_columns_from_map<V: JoinMapped>(
        &mut self,
        table: &crate::join_hash_table::HashJoinHashTable<V>,
        blocks: &[DataBlock],
        builders: &mut [ColumnBuilder],
        rows_added: &mut usize,
    ) -> Result<()> {
        let used_flags = self.join.used_flags.read();
        let entry_count = table.entry_count();
        while self.position < entry_count && *rows_added < self.max_block_size {
            let offset = self.position;
            self.position += 1;
            if used_flags.get_used(0, offset) {
                continue;
            }
            let mapped = table.value_at(offset).ok_or_else(|| {
                ErrorCode::LogicalError("bucket ordinal out of bounds in the non-joined stream")
            })?;
            for ptr in mapped.rows() {
                push_stored_row(blocks, ptr.chunk_index as usize, ptr.row_index as usize, builders)?;
                *rows_added += 1;
            }
        }
        Ok(())
    }

    fn fill_nulls_from_blocks(
        &mut self,
        blocks: &[DataBlock],
        blocks_nullmaps: &[(u32, Vec<u8>)],
        builders: &mut [ColumnBuilder],
        rows_added: &mut usize,
    ) -> Result<()> {
        while self.nulls_position < blocks_nullmaps.len() && *rows_added < self.max_block_size {
            let (chunk_index, null_map) = &blocks_nullmaps[self.nulls_position];
            self.nulls_position += 1;
            for (row, byte) in null_map.iter().enumerate() {
                if *byte != 0 {
                    push_stored_row(blocks, *chunk_index as usize, row, builders)?;
                    *rows_added += 1;
                }
            }
        }
        Ok(())
    }

    /// Lay the collected right columns into the result sample shape: left
    /// columns become defaults (NULLs when nullable), right columns are
    /// adjusted to the nullability the sample expects, and required right
    /// keys are mirrored into their left twins.
    fn assemble_block(&self, right_columns: Vec<(String, Column)>, rows: usize) -> DataBlock {
        let mut entries = Vec::with_capacity(self.result_sample_block.num_columns());
        for sample_entry in self.result_sample_block.entries() {
            let column = match right_columns
                .iter()
                .find(|(name, _)| *name == sample_entry.name)
            {
                Some((_, column)) => adjust_nullability(column.clone(), sample_entry),
                None => default_column(&sample_entry.data_type, rows),
            };
            entries.push(BlockEntry::new(
                sample_entry.name.clone(),
                column.data_type(),
                Value::Column(column),
            ));
        }

        // Copy same keys: a required right key also populates its left
        // source column, so outer results read consistently.
        for (right_name, left_name) in &self.join.required_right_keys {
            let right_position = entries.iter().position(|entry| &entry.name == right_name);
            let left_position = entries.iter().position(|entry| &entry.name == left_name);
            if let (Some(right_position), Some(left_position)) = (right_position, left_position) {
                if let Some(sample_entry) = self.result_sample_block.get_by_name(left_name) {
                    let right_column = entries[right_position].value.as_column().cloned();
                    if let Some(column) = right_column {
                        let column = adjust_nullability(column, sample_entry);
                        entries[left_position] = BlockEntry::new(
                            left_name.clone(),
                            column.data_type(),
                            Value::Column(column),
                        );
                    }
                }
            }
        }

        DataBlock::new(entries, rows)
    }
}

fn adjust_nullability(column: Column, sample_entry: &BlockEntry) -> Column {
    if sample_entry.data_type.is_nullable() == column.data_type().is_nullable() {
        return column;
    }
    let entry = correct_nullability(
        &sample_entry.name,
        column,
        sample_entry.data_type.is_nullable(),
    );
    match entry.value {
        Value::Column(column) => column,
        Value::Scalar(_) => default_column(&sample_entry.data_type, 0),
    }
}

fn push_stored_row(
    blocks: &[DataBlock],
    chunk_index: usize,
    row_index: usize,
    builders: &mut [ColumnBuilder],
) -> Result<()> {
    let block = blocks.get(chunk_index).ok_or_else(|| {
        ErrorCode::LogicalError("row reference points at a missing right chunk")
    })?;
    for (builder, entry) in builders.iter_mut().zip(block.entries()) {
        let column = entry.value.as_column().ok_or_else(|| {
            ErrorCode::LogicalError("stored right block holds a constant column")
        })?;
        let value = column.index(row_index).ok_or_else(|| {
            ErrorCode::LogicalError("row reference points past the stored right block")
        })?;
        builder.push(value);
    }
    Ok(())
}
