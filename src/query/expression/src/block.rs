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

use std::mem;

use crate::values::Column;
use crate::values::ColumnBuilder;
use crate::values::Scalar;
use crate::DataType;

/// A column value inside a block: either a constant scalar or a full column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Column(Column),
}

impl Value {
    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Value::Scalar(_) => None,
            Value::Column(column) => Some(column),
        }
    }

    pub fn convert_to_full_column(&self, ty: &DataType, num_rows: usize) -> Column {
        match self {
            Value::Scalar(scalar) => {
                ColumnBuilder::repeat(&scalar.as_ref(), num_rows, ty).build()
            }
            Value::Column(column) => column.clone(),
        }
    }

    pub fn memory_size(&self) -> usize {
        match self {
            Value::Scalar(scalar) => mem::size_of_val(scalar),
            Value::Column(column) => column.memory_size(),
        }
    }
}

/// A named, typed column of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntry {
    pub name: String,
    pub data_type: DataType,
    pub value: Value,
}

impl BlockEntry {
    pub fn new(name: impl Into<String>, data_type: DataType, value: Value) -> BlockEntry {
        BlockEntry {
            name: name.into(),
            data_type,
            value,
        }
    }

    pub fn from_column(name: impl Into<String>, column: Column) -> BlockEntry {
        BlockEntry {
            name: name.into(),
            data_type: column.data_type(),
            value: Value::Column(column),
        }
    }

    pub fn to_column(&self, num_rows: usize) -> Column {
        self.value.convert_to_full_column(&self.data_type, num_rows)
    }
}

/// An ordered batch of equal-length named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBlock {
    entries: Vec<BlockEntry>,
    num_rows: usize,
}

impl DataBlock {
    pub fn new(entries: Vec<BlockEntry>, num_rows: usize) -> DataBlock {
        debug_assert!(entries.iter().all(|entry| match &entry.value {
            Value::Scalar(_) => true,
            Value::Column(column) => column.len() == num_rows,
        }));
        DataBlock { entries, num_rows }
    }

    pub fn empty() -> DataBlock {
        DataBlock::new(vec![], 0)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_columns() == 0 || self.num_rows() == 0
    }

    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [BlockEntry] {
        &mut self.entries
    }

    pub fn entry(&self, index: usize) -> &BlockEntry {
        &self.entries[index]
    }

    pub fn get_by_name(&self, name: &str) -> Option<&BlockEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    pub fn add_entry(&mut self, entry: BlockEntry) {
        debug_assert!(match &entry.value {
            Value::Scalar(_) => true,
            Value::Column(column) => self.entries.is_empty() || column.len() == self.num_rows,
        });
        if self.entries.is_empty() {
            if let Value::Column(column) = &entry.value {
                self.num_rows = column.len();
            }
        }
        self.entries.push(entry);
    }

    /// Materialize constant columns into full columns.
    pub fn convert_to_full(&self) -> DataBlock {
        let entries = self
            .entries
            .iter()
            .map(|entry| BlockEntry {
                name: entry.name.clone(),
                data_type: entry.data_type.clone(),
                value: Value::Column(entry.to_column(self.num_rows)),
            })
            .collect();
        DataBlock {
            entries,
            num_rows: self.num_rows,
        }
    }

    /// Same column names and types, zero rows.
    pub fn clone_empty(&self) -> DataBlock {
        let entries = self
            .entries
            .iter()
            .map(|entry| BlockEntry {
                name: entry.name.clone(),
                data_type: entry.data_type.clone(),
                value: Value::Column(ColumnBuilder::with_capacity(&entry.data_type, 0).build()),
            })
            .collect();
        DataBlock {
            entries,
            num_rows: 0,
        }
    }

    pub fn memory_size(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match &entry.value {
                Value::Scalar(scalar) => mem::size_of_val(scalar) * self.num_rows,
                Value::Column(column) => column.memory_size(),
            })
            .sum()
    }
}
