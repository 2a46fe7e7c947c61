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

//! Column plumbing shared by the build and probe paths.

use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;
use quarry_common_expression::BlockEntry;
use quarry_common_expression::Column;
use quarry_common_expression::ColumnBuilder;
use quarry_common_expression::DataBlock;
use quarry_common_expression::DataType;
use quarry_common_expression::Value;

/// Materialize the named columns of a block into full columns.
pub(crate) fn materialize_keys(block: &DataBlock, names: &[String]) -> Result<Vec<Column>> {
    names
        .iter()
        .map(|name| {
            let entry = block.get_by_name(name).ok_or_else(|| {
                ErrorCode::NoSuchColumnInTable(format!("not found column {} in block", name))
            })?;
            Ok(entry.to_column(block.num_rows()))
        })
        .collect()
}

/// Strip nullability from key columns and compute the combined null map:
/// a row counts as NULL when any column of the tuple is NULL there.
pub(crate) fn extract_nested_columns_and_null_map(
    columns: Vec<Column>,
) -> (Vec<Column>, Option<Vec<u8>>) {
    let mut null_map: Option<Vec<u8>> = None;
    let nested = columns
        .into_iter()
        .map(|column| match column {
            Column::Nullable(_) => {
                let validity = column.validity().map(|map| map.to_vec());
                if let Some(map) = validity {
                    match null_map.as_mut() {
                        None => null_map = Some(map),
                        Some(combined) => {
                            for (byte, other) in combined.iter_mut().zip(map.iter()) {
                                *byte |= other;
                            }
                        }
                    }
                }
                column.remove_nullable()
            }
            other => other,
        })
        .collect();
    (nested, null_map)
}

/// Widen every full column of a block to nullable.
pub(crate) fn wrap_nullable_block(block: &DataBlock) -> DataBlock {
    let mut result = DataBlock::empty();
    for entry in block.entries() {
        let column = entry.to_column(block.num_rows()).wrap_nullable(None);
        result.add_entry(BlockEntry::new(
            entry.name.clone(),
            column.data_type(),
            Value::Column(column),
        ));
    }
    result
}

/// Keep the column values at rows selected by `filter`, inserting defaults
/// everywhere else; `inverse` flips the selection.
pub(crate) fn filter_with_blanks(column: &Column, filter: &[u8], inverse: bool) -> Column {
    let mut builder = ColumnBuilder::with_capacity(&column.data_type(), column.len());
    for (row, byte) in filter.iter().enumerate() {
        let selected = (*byte != 0) != inverse;
        if selected {
            if let Some(value) = column.index(row) {
                builder.push(value);
            }
        } else {
            builder.push_default();
        }
    }
    builder.build()
}

/// Adjust a column copied from the other side of the join to the
/// nullability the output expects.
pub(crate) fn correct_nullability(
    name: &str,
    column: Column,
    nullable: bool,
) -> BlockEntry {
    let column = if nullable {
        column.wrap_nullable(None)
    } else if let Some(null_map) = column.validity().map(|map| map.to_vec()) {
        // Values masked by NULLs are replaced with defaults.
        filter_with_blanks(&column.remove_nullable(), &null_map, true)
    } else {
        column
    };
    BlockEntry::new(name, column.data_type(), Value::Column(column))
}

/// Like `correct_nullability`, additionally marking as NULL the rows whose
/// byte in `negative_null_map` is zero.
pub(crate) fn correct_nullability_with_null_map(
    name: &str,
    column: Column,
    nullable: bool,
    negative_null_map: &[u8],
) -> BlockEntry {
    let column = if nullable {
        column
            .wrap_nullable(None)
            .apply_negated_null_map(negative_null_map)
    } else {
        match column.validity() {
            Some(_) => column.remove_nullable(),
            None => column,
        }
    };
    BlockEntry::new(name, column.data_type(), Value::Column(column))
}

/// Key tuples on both sides must agree on types, nullability aside.
pub(crate) fn check_types_of_keys(
    left_block: &DataBlock,
    left_names: &[String],
    right_sample: &DataBlock,
    right_names: &[String],
) -> Result<()> {
    for (left_name, right_name) in left_names.iter().zip(right_names.iter()) {
        let left = left_block.get_by_name(left_name).ok_or_else(|| {
            ErrorCode::NoSuchColumnInTable(format!("not found column {} in block", left_name))
        })?;
        let right = right_sample.get_by_name(right_name).ok_or_else(|| {
            ErrorCode::NoSuchColumnInTable(format!("not found column {} in block", right_name))
        })?;
        if left.data_type.remove_nullable() != right.data_type.remove_nullable() {
            return Err(ErrorCode::TypeMismatch(format!(
                "type mismatch of columns to JOIN by: {} {} at left, {} {} at right",
                left_name, left.data_type, right_name, right.data_type
            )));
        }
    }
    Ok(())
}

/// A column of `rows` default values: zeros, empty strings, or NULLs for
/// nullable types.
pub(crate) fn default_column(ty: &DataType, rows: usize) -> Column {
    let mut builder = ColumnBuilder::with_capacity(ty, rows);
    builder.push_defaults(rows);
    builder.build()
}
