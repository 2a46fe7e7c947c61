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

use std::cmp::Ordering;

use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;
use quarry_common_expression::Column;
use quarry_common_expression::DataType;
use quarry_common_expression::NumberColumn;
use quarry_common_expression::NumberDataType;
use quarry_common_hashtable::RowPtr;

use crate::desc::AsofInequality;
use crate::row::JoinMapped;

/// The inequality-column types an ASOF join can order by.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AsofType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Date,
    Timestamp,
}

impl AsofType {
    /// Resolve the ASOF type and its byte width from a column type.
    pub fn try_new(ty: &DataType) -> Result<(AsofType, usize)> {
        let asof_type = match ty {
            DataType::Number(NumberDataType::UInt8) => AsofType::UInt8,
            DataType::Number(NumberDataType::UInt16) => AsofType::UInt16,
            DataType::Number(NumberDataType::UInt32) => AsofType::UInt32,
            DataType::Number(NumberDataType::UInt64) => AsofType::UInt64,
            DataType::Number(NumberDataType::Int8) => AsofType::Int8,
            DataType::Number(NumberDataType::Int16) => AsofType::Int16,
            DataType::Number(NumberDataType::Int32) => AsofType::Int32,
            DataType::Number(NumberDataType::Int64) => AsofType::Int64,
            DataType::Number(NumberDataType::Float32) => AsofType::Float32,
            DataType::Number(NumberDataType::Float64) => AsofType::Float64,
            DataType::Date => AsofType::Date,
            DataType::Timestamp => AsofType::Timestamp,
            other => {
                return Err(ErrorCode::TypeMismatch(format!(
                    "ASOF join is not supported over type {}",
                    other
                )))
            }
        };
        let size = ty
            .size_of_fixed()
            .ok_or_else(|| ErrorCode::LogicalError("ASOF column without a fixed size"))?;
        Ok((asof_type, size))
    }
}

trait AsofValue: Copy {
    fn compare(&self, other: &Self) -> Ordering;
}

macro_rules! impl_asof_value_for_int {
    ($($t:ty),*) => {
        $(
            impl AsofValue for $t {
                #[inline(always)]
                fn compare(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }
            }
        )*
    };
}

impl_asof_value_for_int! { u8, u16, u32, u64, i8, i16, i32, i64 }

impl AsofValue for f32 {
    #[inline(always)]
    fn compare(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl AsofValue for f64 {
    #[inline(always)]
    fn compare(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

/// Entries ordered by the inequality value. The build side keeps the
/// vector sorted on insert so that probing needs no extra synchronization.
struct SortedLookupVector<T> {
    entries: Vec<(T, RowPtr)>,
}

impl<T: AsofValue> SortedLookupVector<T> {
    fn new() -> Self {
        SortedLookupVector {
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, value: T, row: RowPtr) {
        let position = self
            .entries
            .partition_point(|entry| entry.0.compare(&value) != Ordering::Greater);
        self.entries.insert(position, (value, row));
    }

    /// The extremal entry satisfying the inequality relative to the probe
    /// value: the greatest below it or the smallest above it.
    fn find(&self, inequality: AsofInequality, value: T) -> Option<RowPtr> {
        match inequality {
            AsofInequality::Less => {
                let position = self
                    .entries
                    .partition_point(|entry| entry.0.compare(&value) == Ordering::Less);
                position.checked_sub(1).map(|p| self.entries[p].1)
            }
            AsofInequality::LessOrEqual => {
                let position = self
                    .entries
                    .partition_point(|entry| entry.0.compare(&value) != Ordering::Greater);
                position.checked_sub(1).map(|p| self.entries[p].1)
            }
            AsofInequality::Greater => {
                let position = self
                    .entries
                    .partition_point(|entry| entry.0.compare(&value) != Ordering::Greater);
                self.entries.get(position).map(|entry| entry.1)
            }
            AsofInequality::GreaterOrEqual => {
                let position = self
                    .entries
                    .partition_point(|entry| entry.0.compare(&value) == Ordering::Less);
                self.entries.get(position).map(|entry| entry.1)
            }
        }
    }
}

enum AsofLookups {
    UInt8(SortedLookupVector<u8>),
    UInt16(SortedLookupVector<u16>),
    UInt32(SortedLookupVector<u32>),
    UInt64(SortedLookupVector<u64>),
    Int8(SortedLookupVector<i8>),
    Int16(SortedLookupVector<i16>),
    Int32(SortedLookupVector<i32>),
    Int64(SortedLookupVector<i64>),
    Float32(SortedLookupVector<f32>),
    Float64(SortedLookupVector<f64>),
    Date(SortedLookupVector<i32>),
    Timestamp(SortedLookupVector<i64>),
}

/// Ordered row references of one equi-key group of an ASOF join.
pub struct AsofRowRefs {
    lookups: AsofLookups,
}

impl AsofRowRefs {
    pub(crate) fn new(asof_type: AsofType) -> AsofRowRefs {
        let lookups = match asof_type {
            AsofType::UInt8 => AsofLookups::UInt8(SortedLookupVector::new()),
            AsofType::UInt16 => AsofLookups::UInt16(SortedLookupVector::new()),
            AsofType::UInt32 => AsofLookups::UInt32(SortedLookupVector::new()),
            AsofType::UInt64 => AsofLookups::UInt64(SortedLookupVector::new()),
            AsofType::Int8 => AsofLookups::Int8(SortedLookupVector::new()),
            AsofType::Int16 => AsofLookups::Int16(SortedLookupVector::new()),
            AsofType::Int32 => AsofLookups::Int32(SortedLookupVector::new()),
            AsofType::Int64 => AsofLookups::Int64(SortedLookupVector::new()),
            AsofType::Float32 => AsofLookups::Float32(SortedLookupVector::new()),
            AsofType::Float64 => AsofLookups::Float64(SortedLookupVector::new()),
            AsofType::Date => AsofLookups::Date(SortedLookupVector::new()),
            AsofType::Timestamp => AsofLookups::Timestamp(SortedLookupVector::new()),
        };
        AsofRowRefs { lookups }
    }

    pub(crate) fn insert(&mut self, column: &Column, row: usize, ptr: RowPtr) -> Result<()> {
        match (&mut self.lookups, column) {
            (AsofLookups::UInt8(l), Column::Number(NumberColumn::UInt8(b))) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::UInt16(l), Column::Number(NumberColumn::UInt16(b))) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::UInt32(l), Column::Number(NumberColumn::UInt32(b))) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::UInt64(l), Column::Number(NumberColumn::UInt64(b))) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::Int8(l), Column::Number(NumberColumn::Int8(b))) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::Int16(l), Column::Number(NumberColumn::Int16(b))) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::Int32(l), Column::Number(NumberColumn::Int32(b))) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::Int64(l), Column::Number(NumberColumn::Int64(b))) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::Float32(l), Column::Number(NumberColumn::Float32(b))) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::Float64(l), Column::Number(NumberColumn::Float64(b))) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::Date(l), Column::Date(b)) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (AsofLookups::Timestamp(l), Column::Timestamp(b)) => {
                l.insert(*b.get(row).ok_or_else(bad_row)?, ptr)
            }
            (_, other) => {
                return Err(ErrorCode::TypeMismatch(format!(
                    "ASOF column type changed to {} between blocks",
                    other.data_type()
                )))
            }
        }
        Ok(())
    }

    pub(crate) fn lookup(
        &self,
        inequality: AsofInequality,
        column: &Column,
        row: usize,
    ) -> Option<RowPtr> {
        match (&self.lookups, column) {
            (AsofLookups::UInt8(l), Column::Number(NumberColumn::UInt8(b))) => {
                l.find(inequality, *b.get(row)?)
            }
            (AsofLookups::UInt16(l), Column::Number(NumberColumn::UInt16(b))) => {
                l.find(inequality, *b.get(row)?)
            }
            (AsofLookups::UInt32(l), Column::Number(NumberColumn::UInt32(b))) => {
                l.find(inequality, *b.get(row)?)
            }
            (AsofLookups::UInt64(l), Column::Number(NumberColumn::UInt64(b))) => {
                l.find(inequality, *b.get(row)?)
            }
            (AsofLookups::Int8(l), Column::Number(NumberColumn::Int8(b))) => {
                l.find(inequality, *b.get(row)?)
            }
            (AsofLookups::Int16(l), Column::Number(NumberColumn::Int16(b))) => {
                l.find(inequality, *b.get(row)?)
            }
            (AsofLookups::Int32(l), Column::Number(NumberColumn::Int32(b))) => {
                l.find(inequality, *b.get(row)?)
            }
            (AsofLookups::Int64(l), Column::Number(NumberColumn::Int64(b))) => {
                l.find(inequality, *b.get(row)?)
            }
            (AsofLookups::Float32(l), Column::Number(NumberColumn::Float32(b))) => {
                l.find(inequality, *b.get(row)?)
            }
            (AsofLookups::Float64(l), Column::Number(NumberColumn::Float64(b))) => {
                l.find(inequality, *b.get(row)?)
            }
            (AsofLookups::Date(l), Column::Date(b)) => l.find(inequality, *b.get(row)?),
            (AsofLookups::Timestamp(l), Column::Timestamp(b)) => l.find(inequality, *b.get(row)?),
            _ => None,
        }
    }

}

impl JoinMapped for AsofRowRefs {
    type RowsIter<'a>
        = std::iter::Empty<RowPtr>
    where Self: 'a;

    fn head_row(&self) -> Option<RowPtr> {
        None
    }

    /// The non-joined stream never walks ASOF groups; they are excluded at
    /// stream creation.
    fn rows(&self) -> Self::RowsIter<'_> {
        std::iter::empty()
    }

    fn find_asof(&self, inequality: AsofInequality, column: &Column, row: usize) -> Option<RowPtr> {
        self.lookup(inequality, column, row)
    }
}

fn bad_row() -> ErrorCode {
    ErrorCode::LogicalError("row index out of bounds in ASOF column")
}
