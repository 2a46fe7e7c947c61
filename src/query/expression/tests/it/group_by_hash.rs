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

use quarry_common_expression::choose_hash_method_with_types;
use quarry_common_expression::Column;
use quarry_common_expression::ColumnBuilder;
use quarry_common_expression::DataType;
use quarry_common_expression::HashMethodFixedKeys;
use quarry_common_expression::HashMethodSerializer;
use quarry_common_expression::NumberDataType;
use quarry_common_expression::NumberScalar;
use quarry_common_expression::ScalarRef;

fn int32_column(values: &[i32]) -> Column {
    let mut builder =
        ColumnBuilder::with_capacity(&DataType::Number(NumberDataType::Int32), values.len());
    for value in values {
        builder.push(ScalarRef::Number(NumberScalar::Int32(*value)));
    }
    builder.build()
}

fn int64_column(values: &[i64]) -> Column {
    let mut builder =
        ColumnBuilder::with_capacity(&DataType::Number(NumberDataType::Int64), values.len());
    for value in values {
        builder.push(ScalarRef::Number(NumberScalar::Int64(*value)));
    }
    builder.build()
}

fn method_name(types: &[DataType]) -> &'static str {
    let (method, _) = choose_hash_method_with_types(types).unwrap();
    method.name()
}

#[test]
fn test_choose_hash_method() {
    use NumberDataType::*;

    assert_eq!(method_name(&[DataType::Number(UInt8)]), "KeysU8");
    assert_eq!(method_name(&[DataType::Number(Int16)]), "KeysU16");
    assert_eq!(method_name(&[DataType::Number(Float32)]), "KeysU32");
    assert_eq!(method_name(&[DataType::Number(Int64)]), "KeysU64");
    assert_eq!(method_name(&[DataType::Date]), "KeysU32");
    assert_eq!(method_name(&[DataType::Timestamp]), "KeysU64");

    // Packed fixed tuples.
    assert_eq!(
        method_name(&[DataType::Number(Int32), DataType::Number(Int64)]),
        "KeysU128"
    );
    assert_eq!(
        method_name(&[
            DataType::Number(Int64),
            DataType::Number(Int64),
            DataType::Number(Int64)
        ]),
        "KeysU256"
    );
    assert_eq!(
        method_name(&[DataType::FixedString(4), DataType::Number(Int32)]),
        "KeysU128"
    );

    // Single byte-string keys.
    assert_eq!(method_name(&[DataType::String]), "SingleString");
    assert_eq!(method_name(&[DataType::FixedString(20)]), "SingleFixedString");

    // Everything else serializes.
    assert_eq!(
        method_name(&[DataType::String, DataType::Number(Int32)]),
        "Serializer"
    );
    assert_eq!(
        method_name(&[DataType::Nullable(Box::new(DataType::Number(Int32)))]),
        "Serializer"
    );

    let (_, sizes) =
        choose_hash_method_with_types(&[DataType::Number(Int32), DataType::Number(Int64)]).unwrap();
    assert_eq!(sizes, vec![4, 8]);

    assert!(choose_hash_method_with_types(&[]).is_err());
}

#[test]
fn test_fixed_keys_packing() {
    let method = HashMethodFixedKeys::<u64>::default();
    let keys = method.build_keys(&[int32_column(&[1, -1])], 2).unwrap();
    assert_eq!(keys[0], 1u32 as u64);
    assert_eq!(keys[1], (-1i32 as u32) as u64);

    // Two columns packed side by side, little-endian, low column first.
    let method = HashMethodFixedKeys::<u128>::default();
    let keys = method
        .build_keys(&[int32_column(&[2]), int64_column(&[3])], 1)
        .unwrap();
    let expected = (2u128 & 0xffff_ffff) | (3u128 << 32);
    assert_eq!(keys[0], expected);

    // Equal tuples pack to equal keys, regardless of the row position.
    let keys = method
        .build_keys(&[int32_column(&[7, 2, 7]), int64_column(&[8, 3, 8])], 3)
        .unwrap();
    assert_eq!(keys[0], keys[2]);
    assert_ne!(keys[0], keys[1]);
}

#[test]
fn test_serializer_keys() {
    let method = HashMethodSerializer::default();

    let mut builder = ColumnBuilder::with_capacity(&DataType::String, 2);
    builder.push(ScalarRef::String(b"ab"));
    builder.push(ScalarRef::String(b"a"));
    let strings = builder.build();

    let mut builder = ColumnBuilder::with_capacity(&DataType::String, 2);
    builder.push(ScalarRef::String(b"b"));
    builder.push(ScalarRef::String(b"bb"));
    let tails = builder.build();

    // Length prefixes keep ("ab","b") and ("a","bb") apart.
    let keys = method.build_keys(&[strings, tails], 2).unwrap();
    assert_ne!(keys[0], keys[1]);

    let ints = int32_column(&[5, 5, 6]);
    let keys = method.build_keys(&[ints], 3).unwrap();
    assert_eq!(keys[0], keys[1]);
    assert_ne!(keys[0], keys[2]);
}
