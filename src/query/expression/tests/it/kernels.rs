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

use pretty_assertions::assert_eq;
use quarry_common_expression::Column;
use quarry_common_expression::ColumnBuilder;
use quarry_common_expression::DataType;
use quarry_common_expression::NumberDataType;
use quarry_common_expression::NumberScalar;
use quarry_common_expression::Scalar;
use quarry_common_expression::ScalarRef;

fn int32_column(values: &[i32]) -> Column {
    let mut builder =
        ColumnBuilder::with_capacity(&DataType::Number(NumberDataType::Int32), values.len());
    for value in values {
        builder.push(ScalarRef::Number(NumberScalar::Int32(*value)));
    }
    builder.build()
}

fn read_i32(column: &Column) -> Vec<Option<i32>> {
    (0..column.len())
        .map(|row| match column.index(row) {
            Some(ScalarRef::Number(NumberScalar::Int32(value))) => Some(value),
            Some(ScalarRef::Null) => None,
            other => panic!("unexpected scalar {:?}", other),
        })
        .collect()
}

#[test]
fn test_filter() {
    let column = int32_column(&[10, 20, 30, 40]);
    let filtered = column.filter(&[1, 0, 0, 1]);
    assert_eq!(read_i32(&filtered), vec![Some(10), Some(40)]);

    let empty = column.filter(&[0, 0, 0, 0]);
    assert_eq!(empty.len(), 0);
}

#[test]
fn test_replicate() {
    let column = int32_column(&[1, 2, 3]);
    // Row 0 twice, row 1 dropped, row 2 three times.
    let replicated = column.replicate(&[2, 2, 5]);
    assert_eq!(
        read_i32(&replicated),
        vec![Some(1), Some(1), Some(3), Some(3), Some(3)]
    );

    let empty = column.replicate(&[0, 0, 0]);
    assert_eq!(empty.len(), 0);
}

#[test]
fn test_nullable_column() {
    let ty = DataType::Nullable(Box::new(DataType::Number(NumberDataType::Int32)));
    let mut builder = ColumnBuilder::with_capacity(&ty, 3);
    builder.push(ScalarRef::Number(NumberScalar::Int32(5)));
    builder.push(ScalarRef::Null);
    builder.push(ScalarRef::Number(NumberScalar::Int32(7)));
    let column = builder.build();

    assert_eq!(column.data_type(), ty);
    assert_eq!(read_i32(&column), vec![Some(5), None, Some(7)]);
    assert_eq!(column.validity(), Some(&[0u8, 1, 0][..]));

    let nested = column.remove_nullable();
    assert_eq!(read_i32(&nested), vec![Some(5), Some(0), Some(7)]);

    // Filtering keeps null positions aligned.
    let filtered = column.filter(&[0, 1, 1]);
    assert_eq!(read_i32(&filtered), vec![None, Some(7)]);
}

#[test]
fn test_wrap_and_negate_null_map() {
    let column = int32_column(&[1, 2, 3]).wrap_nullable(None);
    assert_eq!(read_i32(&column), vec![Some(1), Some(2), Some(3)]);

    // Rows whose byte is zero become NULL.
    let masked = column.apply_negated_null_map(&[1, 0, 1]);
    assert_eq!(read_i32(&masked), vec![Some(1), None, Some(3)]);
}

#[test]
fn test_builder_defaults() {
    let ty = DataType::String;
    let mut builder = ColumnBuilder::with_capacity(&ty, 2);
    builder.push(ScalarRef::String(b"x"));
    builder.push_default();
    let column = builder.build();
    assert_eq!(column.index(0), Some(ScalarRef::String(b"x")));
    assert_eq!(column.index(1), Some(ScalarRef::String(b"")));

    assert_eq!(
        Scalar::default_value(&DataType::Number(NumberDataType::Int64)),
        Scalar::Number(NumberScalar::Int64(0))
    );
    assert_eq!(
        Scalar::default_value(&DataType::Nullable(Box::new(DataType::String))),
        Scalar::Null
    );
}
