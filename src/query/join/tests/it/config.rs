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
use quarry_common_expression::DataType;
use quarry_query_join::HashJoin;
use quarry_query_join::HashJoinDesc;
use quarry_query_join::JoinKind;
use quarry_query_join::JoinStrictness;
use quarry_query_join::OverflowMode;
use quarry_query_join::SizeLimits;

use crate::common::*;

fn kv_sample() -> quarry_common_expression::DataBlock {
    sample(&[("k", int32_type()), ("v", DataType::String)])
}

fn expect_error(kind: JoinKind, strictness: JoinStrictness, code: u16) {
    let desc = HashJoinDesc::new(kind, strictness, keys(&["k"]), keys(&["k"]));
    let err = HashJoin::new(desc, kv_sample(), false).unwrap_err();
    assert_eq!(err.code(), code, "{} {}: {}", kind, strictness, err);
}

#[test]
fn test_rejected_combinations() {
    expect_error(
        JoinKind::Full,
        JoinStrictness::Any,
        ErrorCode::NOT_IMPLEMENTED,
    );
    expect_error(
        JoinKind::Inner,
        JoinStrictness::Semi,
        ErrorCode::INCOMPATIBLE_TYPE_OF_JOIN,
    );
    expect_error(
        JoinKind::Full,
        JoinStrictness::Semi,
        ErrorCode::INCOMPATIBLE_TYPE_OF_JOIN,
    );
    expect_error(
        JoinKind::Inner,
        JoinStrictness::Anti,
        ErrorCode::INCOMPATIBLE_TYPE_OF_JOIN,
    );
    expect_error(
        JoinKind::Right,
        JoinStrictness::Asof,
        ErrorCode::NOT_IMPLEMENTED,
    );
    expect_error(
        JoinKind::Full,
        JoinStrictness::Asof,
        ErrorCode::NOT_IMPLEMENTED,
    );
}

#[test]
fn test_asof_needs_equi_column() {
    let desc = HashJoinDesc::new(
        JoinKind::Left,
        JoinStrictness::Asof,
        keys(&["t"]),
        keys(&["t"]),
    );
    let sample_block = sample(&[("t", int64_type()), ("x", DataType::String)]);
    let err = HashJoin::new(desc, sample_block, false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SYNTAX_ERROR);
}

#[test]
fn test_asof_rejects_nullable_right_column() {
    let desc = HashJoinDesc::new(
        JoinKind::Left,
        JoinStrictness::Asof,
        keys(&["e", "t"]),
        keys(&["e", "t"]),
    );
    let sample_block = sample(&[
        ("e", int32_type()),
        ("t", DataType::Nullable(Box::new(int64_type()))),
        ("x", DataType::String),
    ]);
    let err = HashJoin::new(desc, sample_block, false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NOT_IMPLEMENTED);
}

#[test]
fn test_asof_rejects_unordered_type() {
    let desc = HashJoinDesc::new(
        JoinKind::Left,
        JoinStrictness::Asof,
        keys(&["e", "t"]),
        keys(&["e", "t"]),
    );
    let sample_block = sample(&[
        ("e", int32_type()),
        ("t", DataType::String),
        ("x", DataType::String),
    ]);
    let err = HashJoin::new(desc, sample_block, false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TYPE_MISMATCH);
}

#[test]
fn test_missing_key_column() {
    let desc = HashJoinDesc::new(
        JoinKind::Inner,
        JoinStrictness::All,
        keys(&["k"]),
        keys(&["missing"]),
    );
    let err = HashJoin::new(desc, kv_sample(), false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NO_SUCH_COLUMN_IN_TABLE);
}

#[test]
fn test_mismatched_disjuncts() {
    let desc = HashJoinDesc::new(
        JoinKind::Inner,
        JoinStrictness::All,
        vec![vec!["k".to_string()]],
        vec![vec!["k".to_string()], vec!["v".to_string()]],
    );
    let err = HashJoin::new(desc, kv_sample(), false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SYNTAX_ERROR);
}

#[test]
fn test_probe_key_type_mismatch() {
    let desc = HashJoinDesc::new(
        JoinKind::Inner,
        JoinStrictness::All,
        keys(&["k"]),
        keys(&["k"]),
    );
    let join = HashJoin::new(desc, kv_sample(), false).unwrap();
    join.add_right_block(
        &block(vec![("k", int32(&[1])), ("v", strings(&["a"]))]),
        true,
    )
    .unwrap();

    let mut probe = block(vec![("k", strings(&["1"]))]);
    let err = join.join_block(&mut probe, &mut None).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TYPE_MISMATCH);
}

#[test]
fn test_ingest_after_seal() {
    let desc = HashJoinDesc::new(
        JoinKind::Inner,
        JoinStrictness::All,
        keys(&["k"]),
        keys(&["k"]),
    );
    let join = HashJoin::new(desc, kv_sample(), false).unwrap();
    join.add_right_block(
        &block(vec![("k", int32(&[1])), ("v", strings(&["a"]))]),
        true,
    )
    .unwrap();

    let mut probe = block(vec![("k", int32(&[1]))]);
    join.join_block(&mut probe, &mut None).unwrap();

    let err = join
        .add_right_block(
            &block(vec![("k", int32(&[2])), ("v", strings(&["b"]))]),
            true,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LOGICAL_ERROR);
}

#[test]
fn test_size_limits() {
    let desc = HashJoinDesc::new(
        JoinKind::Inner,
        JoinStrictness::All,
        keys(&["k"]),
        keys(&["k"]),
    )
    .with_size_limits(SizeLimits::new(2, 0, OverflowMode::Throw));
    let join = HashJoin::new(desc, kv_sample(), false).unwrap();
    let err = join.add_right_block(&right_rows(3), true).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SET_SIZE_LIMIT_EXCEEDED);

    let desc = HashJoinDesc::new(
        JoinKind::Inner,
        JoinStrictness::All,
        keys(&["k"]),
        keys(&["k"]),
    )
    .with_size_limits(SizeLimits::new(2, 0, OverflowMode::Break));
    let join = HashJoin::new(desc, kv_sample(), false).unwrap();
    assert!(!join.add_right_block(&right_rows(3), true).unwrap());
    // Limits are only consulted when the caller asks.
    assert!(join.add_right_block(&right_rows(3), false).unwrap());
}

fn right_rows(n: i32) -> quarry_common_expression::DataBlock {
    let keys: Vec<i32> = (0..n).collect();
    let values: Vec<String> = (0..n).map(|i| format!("v{}", i)).collect();
    let value_refs: Vec<&str> = values.iter().map(|s| s.as_str()).collect();
    block(vec![("k", int32(&keys)), ("v", strings(&value_refs))])
}
