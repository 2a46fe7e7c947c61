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
use quarry_common_expression::ColumnBuilder;
use quarry_common_expression::DataBlock;
use quarry_common_expression::Value;

use crate::hash_join::HashJoin;

/// Parked state of a cross join whose output crossed the row cap.
///
/// Holds the original left block and the position to resume from: the
/// current left row and the index of the next right block.
pub struct NotProcessedCrossJoin {
    pub block: DataBlock,
    pub left_position: usize,
    pub right_block: usize,
}

impl HashJoin {
    /// Nested-loop fallback: every left row is combined with every stored
    /// right block. Output is bounded by `max_joined_block_rows`; crossing
    /// the cap parks a continuation and returns the rows produced so far.
    pub(crate) fn join_block_impl_cross(
        &self,
        block: &mut DataBlock,
        not_processed: &mut Option<NotProcessedCrossJoin>,
    ) -> Result<()> {
        let max_joined_block_rows = self.desc.max_joined_block_rows.max(1);
        let (start_left_row, mut start_right_block) = match not_processed.take() {
            Some(continuation) => {
                *block = continuation.block;
                (continuation.left_position, continuation.right_block)
            }
            None => (0, 0),
        };

        let input = block.convert_to_full();
        let rows_left = input.num_rows();
        let num_existing_columns = input.num_columns();
        let columns_to_add = &self.sample_block_with_columns_to_add;
        let num_columns_to_add = columns_to_add.num_columns();

        let mut dst_columns: Vec<ColumnBuilder> = Vec::new();
        for entry in input.entries() {
            dst_columns.push(ColumnBuilder::with_capacity(
                &entry.data_type,
                max_joined_block_rows,
            ));
        }
        for entry in columns_to_add.entries() {
            dst_columns.push(ColumnBuilder::with_capacity(
                &entry.data_type,
                max_joined_block_rows,
            ));
        }

        let data = self.data.read();
        let right_blocks = &data.row_space.blocks;

        let mut rows_added = 0usize;
        'outer: for left_row in start_left_row..rows_left {
            for (block_number, right_block) in right_blocks.iter().enumerate() {
                if block_number < start_right_block {
                    continue;
                }
                let rows_right = right_block.num_rows();
                rows_added += rows_right;

                for (column_index, entry) in input.entries().iter().enumerate() {
                    let column = entry.value.as_column().ok_or_else(|| {
                        ErrorCode::LogicalError("cross join over a non-materialized left block")
                    })?;
                    let value = column.index(left_row).ok_or_else(|| {
                        ErrorCode::LogicalError("left row out of bounds in cross join")
                    })?;
                    dst_columns[column_index].push_many(value, rows_right);
                }
                for column_index in 0..num_columns_to_add {
                    let entry = right_block.entries().get(column_index).ok_or_else(|| {
                        ErrorCode::LogicalError("stored right block misses a cross join column")
                    })?;
                    let column = entry.value.as_column().ok_or_else(|| {
                        ErrorCode::LogicalError("stored right block holds a constant column")
                    })?;
                    dst_columns[num_existing_columns + column_index].append_column(column);
                }

                if rows_added > max_joined_block_rows {
                    let more_left = left_row + 1 < rows_left;
                    let more_right = block_number + 1 < right_blocks.len();
                    if more_left || more_right {
                        *not_processed = Some(NotProcessedCrossJoin {
                            block: input.clone(),
                            left_position: left_row,
                            right_block: block_number + 1,
                        });
                    }
                    break 'outer;
                }
            }
            start_right_block = 0;
        }

        let mut entries = Vec::with_capacity(num_existing_columns + num_columns_to_add);
        let mut builders = dst_columns.into_iter();
        for entry in input.entries() {
            let builder = builders.next().ok_or_else(builders_exhausted)?;
            entries.push(BlockEntry::new(
                entry.name.clone(),
                entry.data_type.clone(),
                Value::Column(builder.build()),
            ));
        }
        for entry in columns_to_add.entries() {
            let builder = builders.next().ok_or_else(builders_exhausted)?;
            entries.push(BlockEntry::new(
                entry.name.clone(),
                entry.data_type.clone(),
                Value::Column(builder.build()),
            ));
        }
        let num_rows = entries
            .first()
            .and_then(|entry| entry.value.as_column())
            .map(|column| column.len())
            .unwrap_or(0);
        *block = DataBlock::new(entries, num_rows);
        Ok(())
    }
}

fn builders_exhausted() -> ErrorCode {
    ErrorCode::LogicalError("cross join builders out of sync with output columns")
}
