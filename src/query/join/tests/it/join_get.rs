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
use quarry_common_exception::ErrorCode;
use quarry_common_expression::DataType;
use quarry_query_join::HashJoin;
use quarry_query_join::HashJoinDesc;
use quarry_query_join::JoinKind;
use quarry_query_join::JoinStrictness;

use crate::common::*;

fn storage_join(any_take_last_row: bool) -> HashJoin {
    let desc = HashJoinDesc::new(
        JoinKind::Left,
        JoinStrictness::Any,
        keys(&["k"]),
        keys(&["k"]),
    );
    let join = HashJoin::new(
        desc,
        sample(&[("k", int32_type()), ("v", DataType::String)]),
        any_take_last_row,
    )
    .unwrap();
    join.add_right_block(
        &block(vec![
            ("k", int32(&[1, 1, 2])),
            ("v", strings(&["a", "b", "c"])),
        ]),
        true,
    )
    .unwrap();
    join
}

fn read_entry_strings(entry: &quarry_common_expression::BlockEntry) -> Vec<Option<String>> {
    let column = entry.value.as_column().expect("full column");
    (0..column.len())
        .map(|row| match column.index(row) {
            Some(quarry_common_expression::ScalarRef::String(bytes)) => {
                Some(String::from_utf8(bytes.to_vec()).expect("utf8"))
            }
            Some(quarry_common_expression::ScalarRef::Null) => None,
            other => panic!("unexpected scalar {:?}", other),
        })
        .collect()
}

#[test]
fn test_join_get() {
    let join = storage_join(false);
    let keys_block = block(vec![("key", int32(&[1, 3]))]);
    let entry = join.join_get(&keys_block, "v", false).unwrap();
    assert_eq!(
        read_entry_strings(&entry),
        vec![Some("a".to_string()), Some(String::new())]
    );
}

#[test]
fn test_join_get_or_null() {
    let join = storage_join(false);
    let keys_block = block(vec![("key", int32(&[2, 9]))]);
    let entry = join.join_get(&keys_block, "v", true).unwrap();
    assert_eq!(entry.data_type, DataType::Nullable(Box::new(DataType::String)));
    assert_eq!(
        read_entry_strings(&entry),
        vec![Some("c".to_string()), None]
    );
}

#[test]
fn test_join_get_any_take_last_row() {
    let join = storage_join(true);
    let keys_block = block(vec![("key", int32(&[1]))]);
    let entry = join.join_get(&keys_block, "v", false).unwrap();
    assert_eq!(read_entry_strings(&entry), vec![Some("b".to_string())]);
}

#[test]
fn test_join_get_argument_checks() {
    let join = storage_join(false);

    let err = join
        .join_get(&block(vec![("key", int32(&[1]))]), "missing", false)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NO_SUCH_COLUMN_IN_TABLE);

    let err = join
        .join_get(
            &block(vec![("a", int32(&[1])), ("b", int32(&[2]))]),
            "v",
            false,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NUMBER_OF_ARGUMENTS_DOESNT_MATCH);

    let err = join
        .join_get(&block(vec![("key", strings(&["1"]))]), "v", false)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TYPE_MISMATCH);

    let err = join
        .join_get_return_type(&[DataType::String], "v", false)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TYPE_MISMATCH);
    let ty = join
        .join_get_return_type(&[int32_type()], "v", true)
        .unwrap();
    assert_eq!(ty, DataType::Nullable(Box::new(DataType::String)));
}

#[test]
fn test_join_get_requires_left_any() {
    let desc = HashJoinDesc::new(
        JoinKind::Inner,
        JoinStrictness::All,
        keys(&["k"]),
        keys(&["k"]),
    );
    let join = HashJoin::new(
        desc,
        sample(&[("k", int32_type()), ("v", DataType::String)]),
        false,
    )
    .unwrap();
    let err = join
        .join_get(&block(vec![("key", int32(&[1]))]), "v", false)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::INCOMPATIBLE_TYPE_OF_JOIN);
}

#[test]
fn test_reuse_joined_data() {
    let donor = storage_join(false);

    let desc = HashJoinDesc::new(
        JoinKind::Left,
        JoinStrictness::Any,
        keys(&["k"]),
        keys(&["k"]),
    );
    let mut join = HashJoin::new(
        desc,
        sample(&[("k", int32_type()), ("v", DataType::String)]),
        false,
    )
    .unwrap();
    join.reuse_joined_data(&donor).unwrap();
    assert_eq!(join.total_rows(), 3);

    let mut probe = block(vec![("k", int32(&[2]))]);
    join.join_block(&mut probe, &mut None).unwrap();
    assert_eq!(read_strings(&probe, "v"), vec![Some("c".to_string())]);

    // The donor is sealed once its data is shared.
    let err = donor
        .add_right_block(
            &block(vec![("k", int32(&[9])), ("v", strings(&["x"]))]),
            true,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LOGICAL_ERROR);
}

#[test]
fn test_join_totals() {
    let join = storage_join(false);
    let mut totals = block(vec![("k", int32(&[0]))]);
    join.join_totals(&mut totals).unwrap();
    assert_eq!(read_strings(&totals, "v"), vec![Some(String::new())]);

    let join = storage_join(false);
    join.set_totals(block(vec![("v", strings(&["sum"]))]));
    let mut totals = block(vec![("k", int32(&[0]))]);
    join.join_totals(&mut totals).unwrap();
    assert_eq!(read_strings(&totals, "v"), vec![Some("sum".to_string())]);
}
