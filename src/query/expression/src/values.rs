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
use std::sync::Arc;

use crate::types::DataType;
use crate::types::NumberDataType;

/// Shared immutable storage behind a column.
pub type Buffer<T> = Arc<[T]>;

macro_rules! for_all_numbers {
    ($macro:ident) => {
        $macro! {
            { UInt8, u8 },
            { UInt16, u16 },
            { UInt32, u32 },
            { UInt64, u64 },
            { Int8, i8 },
            { Int16, i16 },
            { Int32, i32 },
            { Int64, i64 },
            { Float32, f32 },
            { Float64, f64 }
        }
    };
}

macro_rules! impl_number_enums {
    ($({ $V:ident, $t:ty }),*) => {
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum NumberScalar {
            $($V($t),)*
        }

        #[derive(Debug, Clone, PartialEq)]
        pub enum NumberColumn {
            $($V(Buffer<$t>),)*
        }

        #[derive(Debug, Clone)]
        pub enum NumberColumnBuilder {
            $($V(Vec<$t>),)*
        }

        impl NumberScalar {
            pub fn data_type(&self) -> NumberDataType {
                match self {
                    $(NumberScalar::$V(_) => NumberDataType::$V,)*
                }
            }
        }

        impl NumberColumn {
            pub fn len(&self) -> usize {
                match self {
                    $(NumberColumn::$V(buffer) => buffer.len(),)*
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn data_type(&self) -> NumberDataType {
                match self {
                    $(NumberColumn::$V(_) => NumberDataType::$V,)*
                }
            }

            pub fn index(&self, index: usize) -> Option<NumberScalar> {
                match self {
                    $(NumberColumn::$V(buffer) => {
                        buffer.get(index).copied().map(NumberScalar::$V)
                    })*
                }
            }

            pub fn memory_size(&self) -> usize {
                match self {
                    $(NumberColumn::$V(buffer) => buffer.len() * mem::size_of::<$t>(),)*
                }
            }
        }

        impl NumberColumnBuilder {
            pub fn with_capacity(ty: NumberDataType, capacity: usize) -> Self {
                match ty {
                    $(NumberDataType::$V => NumberColumnBuilder::$V(Vec::with_capacity(capacity)),)*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(NumberColumnBuilder::$V(values) => values.len(),)*
                }
            }

            pub fn push(&mut self, scalar: NumberScalar) {
                match (self, scalar) {
                    $((NumberColumnBuilder::$V(values), NumberScalar::$V(value)) => {
                        values.push(value)
                    })*
                    (builder, scalar) => unreachable!(
                        "unable to push {:?} into {:?} builder",
                        scalar,
                        builder
                    ),
                }
            }

            pub fn push_default(&mut self) {
                match self {
                    $(NumberColumnBuilder::$V(values) => values.push(Default::default()),)*
                }
            }

            pub fn build(self) -> NumberColumn {
                match self {
                    $(NumberColumnBuilder::$V(values) => NumberColumn::$V(values.into()),)*
                }
            }
        }
    };
}

for_all_numbers! { impl_number_enums }

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Number(NumberScalar),
    String(Vec<u8>),
    FixedString(Vec<u8>),
    Date(i32),
    Timestamp(i64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarRef<'a> {
    Null,
    Number(NumberScalar),
    String(&'a [u8]),
    FixedString(&'a [u8]),
    Date(i32),
    Timestamp(i64),
}

impl Scalar {
    pub fn as_ref(&self) -> ScalarRef<'_> {
        match self {
            Scalar::Null => ScalarRef::Null,
            Scalar::Number(num) => ScalarRef::Number(*num),
            Scalar::String(bytes) => ScalarRef::String(bytes),
            Scalar::FixedString(bytes) => ScalarRef::FixedString(bytes),
            Scalar::Date(days) => ScalarRef::Date(*days),
            Scalar::Timestamp(micros) => ScalarRef::Timestamp(*micros),
        }
    }

    /// The default value of a type: zero, the empty string, or NULL.
    pub fn default_value(ty: &DataType) -> Scalar {
        match ty {
            DataType::Number(num) => Scalar::Number(match num {
                NumberDataType::UInt8 => NumberScalar::UInt8(0),
                NumberDataType::UInt16 => NumberScalar::UInt16(0),
                NumberDataType::UInt32 => NumberScalar::UInt32(0),
                NumberDataType::UInt64 => NumberScalar::UInt64(0),
                NumberDataType::Int8 => NumberScalar::Int8(0),
                NumberDataType::Int16 => NumberScalar::Int16(0),
                NumberDataType::Int32 => NumberScalar::Int32(0),
                NumberDataType::Int64 => NumberScalar::Int64(0),
                NumberDataType::Float32 => NumberScalar::Float32(0.0),
                NumberDataType::Float64 => NumberScalar::Float64(0.0),
            }),
            DataType::String => Scalar::String(Vec::new()),
            DataType::FixedString(n) => Scalar::FixedString(vec![0; *n]),
            DataType::Date => Scalar::Date(0),
            DataType::Timestamp => Scalar::Timestamp(0),
            DataType::Nullable(_) => Scalar::Null,
        }
    }
}

impl ScalarRef<'_> {
    pub fn to_owned(&self) -> Scalar {
        match self {
            ScalarRef::Null => Scalar::Null,
            ScalarRef::Number(num) => Scalar::Number(*num),
            ScalarRef::String(bytes) => Scalar::String(bytes.to_vec()),
            ScalarRef::FixedString(bytes) => Scalar::FixedString(bytes.to_vec()),
            ScalarRef::Date(days) => Scalar::Date(*days),
            ScalarRef::Timestamp(micros) => Scalar::Timestamp(*micros),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarRef::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringColumn {
    data: Buffer<u8>,
    offsets: Buffer<u64>,
}

impl StringColumn {
    pub fn new(data: Buffer<u8>, offsets: Buffer<u64>) -> Self {
        debug_assert!(!offsets.is_empty());
        StringColumn { data, offsets }
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, index: usize) -> Option<&[u8]> {
        if index + 1 >= self.offsets.len() {
            return None;
        }
        Some(&self.data[self.offsets[index] as usize..self.offsets[index + 1] as usize])
    }

    pub fn memory_size(&self) -> usize {
        self.data.len() + self.offsets.len() * mem::size_of::<u64>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedStringColumn {
    data: Buffer<u8>,
    value_size: usize,
}

impl FixedStringColumn {
    pub fn new(data: Buffer<u8>, value_size: usize) -> Self {
        debug_assert!(value_size > 0);
        debug_assert_eq!(data.len() % value_size, 0);
        FixedStringColumn { data, value_size }
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.value_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_size(&self) -> usize {
        self.value_size
    }

    pub fn index(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len() {
            return None;
        }
        Some(&self.data[index * self.value_size..(index + 1) * self.value_size])
    }

    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}

/// A nullable column: the nested column plus a byte null map, one byte per
/// row, non-zero marking NULL. The nested column holds default values at
/// null positions.
#[derive(Debug, Clone, PartialEq)]
pub struct NullableColumn {
    pub column: Column,
    pub null_map: Buffer<u8>,
}

impl NullableColumn {
    pub fn new(column: Column, null_map: Buffer<u8>) -> Self {
        debug_assert_eq!(column.len(), null_map.len());
        debug_assert!(!column.data_type().is_nullable());
        NullableColumn { column, null_map }
    }

    pub fn len(&self) -> usize {
        self.null_map.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Number(NumberColumn),
    String(StringColumn),
    FixedString(FixedStringColumn),
    Date(Buffer<i32>),
    Timestamp(Buffer<i64>),
    Nullable(Box<NullableColumn>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Number(col) => col.len(),
            Column::String(col) => col.len(),
            Column::FixedString(col) => col.len(),
            Column::Date(buffer) => buffer.len(),
            Column::Timestamp(buffer) => buffer.len(),
            Column::Nullable(col) => col.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Column::Number(col) => DataType::Number(col.data_type()),
            Column::String(_) => DataType::String,
            Column::FixedString(col) => DataType::FixedString(col.value_size()),
            Column::Date(_) => DataType::Date,
            Column::Timestamp(_) => DataType::Timestamp,
            Column::Nullable(col) => col.column.data_type().wrap_nullable(),
        }
    }

    pub fn index(&self, index: usize) -> Option<ScalarRef<'_>> {
        match self {
            Column::Number(col) => col.index(index).map(ScalarRef::Number),
            Column::String(col) => col.index(index).map(ScalarRef::String),
            Column::FixedString(col) => col.index(index).map(ScalarRef::FixedString),
            Column::Date(buffer) => buffer.get(index).copied().map(ScalarRef::Date),
            Column::Timestamp(buffer) => buffer.get(index).copied().map(ScalarRef::Timestamp),
            Column::Nullable(col) => {
                let null = *col.null_map.get(index)?;
                if null != 0 {
                    Some(ScalarRef::Null)
                } else {
                    col.column.index(index)
                }
            }
        }
    }

    pub fn memory_size(&self) -> usize {
        match self {
            Column::Number(col) => col.memory_size(),
            Column::String(col) => col.memory_size(),
            Column::FixedString(col) => col.memory_size(),
            Column::Date(buffer) => buffer.len() * mem::size_of::<i32>(),
            Column::Timestamp(buffer) => buffer.len() * mem::size_of::<i64>(),
            Column::Nullable(col) => col.column.memory_size() + col.null_map.len(),
        }
    }

    /// The byte null map if the column is nullable.
    pub fn validity(&self) -> Option<&[u8]> {
        match self {
            Column::Nullable(col) => Some(&col.null_map),
            _ => None,
        }
    }

    pub fn remove_nullable(&self) -> Column {
        match self {
            Column::Nullable(col) => col.column.clone(),
            other => other.clone(),
        }
    }

    /// Wrap into a nullable column; without an explicit null map every row
    /// is valid.
    pub fn wrap_nullable(self, null_map: Option<Buffer<u8>>) -> Column {
        match self {
            Column::Nullable(col) => match null_map {
                None => Column::Nullable(col),
                Some(map) => {
                    debug_assert_eq!(map.len(), col.len());
                    let merged: Vec<u8> = col
                        .null_map
                        .iter()
                        .zip(map.iter())
                        .map(|(l, r)| l | r)
                        .collect();
                    Column::Nullable(Box::new(NullableColumn::new(col.column, merged.into())))
                }
            },
            column => {
                let len = column.len();
                let map = null_map.unwrap_or_else(|| vec![0u8; len].into());
                Column::Nullable(Box::new(NullableColumn::new(column, map)))
            }
        }
    }

    /// Mark as NULL every row whose byte in `negative_null_map` is zero.
    /// No-op on non-nullable columns.
    pub fn apply_negated_null_map(self, negative_null_map: &[u8]) -> Column {
        match self {
            Column::Nullable(col) => {
                debug_assert_eq!(negative_null_map.len(), col.len());
                let merged: Vec<u8> = col
                    .null_map
                    .iter()
                    .zip(negative_null_map.iter())
                    .map(|(null, keep)| null | u8::from(*keep == 0))
                    .collect();
                Column::Nullable(Box::new(NullableColumn::new(col.column, merged.into())))
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StringColumnBuilder {
    data: Vec<u8>,
    offsets: Vec<u64>,
}

impl StringColumnBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut offsets = Vec::with_capacity(capacity + 1);
        offsets.push(0);
        StringColumnBuilder {
            data: Vec::new(),
            offsets,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.offsets.push(self.data.len() as u64);
    }

    pub fn build(self) -> StringColumn {
        StringColumn::new(self.data.into(), self.offsets.into())
    }
}

#[derive(Debug, Clone)]
pub struct NullableColumnBuilder {
    pub builder: ColumnBuilder,
    pub null_map: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum ColumnBuilder {
    Number(NumberColumnBuilder),
    String(StringColumnBuilder),
    FixedString {
        data: Vec<u8>,
        value_size: usize,
    },
    Date(Vec<i32>),
    Timestamp(Vec<i64>),
    Nullable(Box<NullableColumnBuilder>),
}

impl ColumnBuilder {
    pub fn with_capacity(ty: &DataType, capacity: usize) -> ColumnBuilder {
        match ty {
            DataType::Number(num) => {
                ColumnBuilder::Number(NumberColumnBuilder::with_capacity(*num, capacity))
            }
            DataType::String => ColumnBuilder::String(StringColumnBuilder::with_capacity(capacity)),
            DataType::FixedString(n) => ColumnBuilder::FixedString {
                data: Vec::with_capacity(capacity * n),
                value_size: *n,
            },
            DataType::Date => ColumnBuilder::Date(Vec::with_capacity(capacity)),
            DataType::Timestamp => ColumnBuilder::Timestamp(Vec::with_capacity(capacity)),
            DataType::Nullable(inner) => ColumnBuilder::Nullable(Box::new(NullableColumnBuilder {
                builder: ColumnBuilder::with_capacity(inner, capacity),
                null_map: Vec::with_capacity(capacity),
            })),
        }
    }

    /// A builder that repeats one scalar `n` times.
    pub fn repeat(scalar: &ScalarRef, n: usize, ty: &DataType) -> ColumnBuilder {
        let mut builder = ColumnBuilder::with_capacity(ty, n);
        builder.push_many(*scalar, n);
        builder
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnBuilder::Number(builder) => builder.len(),
            ColumnBuilder::String(builder) => builder.len(),
            ColumnBuilder::FixedString { data, value_size } => data.len() / value_size,
            ColumnBuilder::Date(values) => values.len(),
            ColumnBuilder::Timestamp(values) => values.len(),
            ColumnBuilder::Nullable(builder) => builder.null_map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, item: ScalarRef) {
        match (self, item) {
            (ColumnBuilder::Number(builder), ScalarRef::Number(value)) => builder.push(value),
            (ColumnBuilder::String(builder), ScalarRef::String(bytes)) => builder.put_slice(bytes),
            (ColumnBuilder::FixedString { data, value_size }, ScalarRef::FixedString(bytes)) => {
                debug_assert_eq!(bytes.len(), *value_size);
                data.extend_from_slice(bytes);
            }
            (ColumnBuilder::Date(values), ScalarRef::Date(days)) => values.push(days),
            (ColumnBuilder::Timestamp(values), ScalarRef::Timestamp(micros)) => values.push(micros),
            (ColumnBuilder::Nullable(builder), ScalarRef::Null) => {
                builder.builder.push_default();
                builder.null_map.push(1);
            }
            (ColumnBuilder::Nullable(builder), scalar) => {
                builder.builder.push(scalar);
                builder.null_map.push(0);
            }
            (builder, scalar) => {
                unreachable!("unable to push {:?} into {:?} builder", scalar, builder)
            }
        }
    }

    pub fn push_default(&mut self) {
        match self {
            ColumnBuilder::Number(builder) => builder.push_default(),
            ColumnBuilder::String(builder) => builder.put_slice(&[]),
            ColumnBuilder::FixedString { data, value_size } => {
                data.resize(data.len() + *value_size, 0)
            }
            ColumnBuilder::Date(values) => values.push(0),
            ColumnBuilder::Timestamp(values) => values.push(0),
            ColumnBuilder::Nullable(builder) => {
                builder.builder.push_default();
                builder.null_map.push(1);
            }
        }
    }

    pub fn push_many(&mut self, item: ScalarRef, n: usize) {
        for _ in 0..n {
            self.push(item);
        }
    }

    pub fn push_defaults(&mut self, n: usize) {
        for _ in 0..n {
            self.push_default();
        }
    }

    /// Append every row of a column of the same type.
    pub fn append_column(&mut self, other: &Column) {
        for i in 0..other.len() {
            if let Some(value) = other.index(i) {
                self.push(value);
            }
        }
    }

    pub fn build(self) -> Column {
        match self {
            ColumnBuilder::Number(builder) => Column::Number(builder.build()),
            ColumnBuilder::String(builder) => Column::String(builder.build()),
            ColumnBuilder::FixedString { data, value_size } => {
                Column::FixedString(FixedStringColumn::new(data.into(), value_size))
            }
            ColumnBuilder::Date(values) => Column::Date(values.into()),
            ColumnBuilder::Timestamp(values) => Column::Timestamp(values.into()),
            ColumnBuilder::Nullable(builder) => {
                let NullableColumnBuilder { builder, null_map } = *builder;
                Column::Nullable(Box::new(NullableColumn::new(
                    builder.build(),
                    null_map.into(),
                )))
            }
        }
    }
}

/// Build a column from owned scalars, for tests and totals blocks.
impl FromIterator<Scalar> for ColumnBuilder {
    fn from_iter<T: IntoIterator<Item = Scalar>>(iter: T) -> Self {
        let scalars: Vec<Scalar> = iter.into_iter().collect();
        let ty = scalars
            .iter()
            .find(|s| !matches!(s, Scalar::Null))
            .map(|s| match s {
                Scalar::Number(num) => DataType::Number(num.data_type()),
                Scalar::String(_) => DataType::String,
                Scalar::FixedString(bytes) => DataType::FixedString(bytes.len()),
                Scalar::Date(_) => DataType::Date,
                Scalar::Timestamp(_) => DataType::Timestamp,
                Scalar::Null => unreachable!(),
            })
            .unwrap_or(DataType::Number(NumberDataType::UInt8));
        let ty = if scalars.iter().any(|s| matches!(s, Scalar::Null)) {
            ty.wrap_nullable()
        } else {
            ty
        };
        let mut builder = ColumnBuilder::with_capacity(&ty, scalars.len());
        for scalar in &scalars {
            builder.push(scalar.as_ref());
        }
        builder
    }
}
