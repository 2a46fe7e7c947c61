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
use quarry_common_expression::DataType;
use quarry_query_join::AsofInequality;
use quarry_query_join::HashJoin;
use quarry_query_join::HashJoinDesc;
use quarry_query_join::JoinKind;
use quarry_query_join::JoinStrictness;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;

use crate::common::*;

fn build_join(kind: JoinKind, strictness: JoinStrictness, right_keys: &[i32]) -> HashJoin {
    let desc = HashJoinDesc::new(kind, strictness, keys(&["k"]), keys(&["k"]));
    let join = HashJoin::new(
        desc,
        sample(&[("k", int32_type()), ("v", int32_type())]),
        false,
    )
    .unwrap();
    let values: Vec<i32> = (0..right_keys.len() as i32).collect();
    join.add_right_block(
        &block(vec![("k", int32(right_keys)), ("v", int32(&values))]),
        true,
    )
    .unwrap();
    join
}

/// ALL-join cardinality: per left row, one output row per matching right
/// row; output order is (left row, right ingestion order).
#[test]
fn test_inner_all_cardinality_and_stability() {
    let mut rng = StdRng::seed_from_u64(42);
    // Up to five duplicates per key: small chains stay in ingestion
    // order, which the expected output below relies on.
    let mut right_keys: Vec<i32> = Vec::new();
    for key in 0..40 {
        for _ in 0..(key % 5 + 1) {
            right_keys.push(key);
        }
    }
    right_keys.shuffle(&mut rng);
    let left_keys: Vec<i32> = (0..60).map(|_| rng.gen_range(0..50)).collect();

    let join = build_join(JoinKind::Inner, JoinStrictness::All, &right_keys);
    let mut probe = block(vec![("k", int32(&left_keys))]);
    join.join_block(&mut probe, &mut None).unwrap();

    let mut expected = Vec::new();
    for left in &left_keys {
        for (row, right) in right_keys.iter().enumerate() {
            if left == right {
                expected.push((Some(*left), Some(row as i32)));
            }
        }
    }

    let produced: Vec<(Option<i32>, Option<i32>)> = read_int32(&probe, "k")
        .into_iter()
        .zip(read_int32(&probe, "v"))
        .collect();
    assert_eq!(produced, expected);
}

/// ANY-join cardinality: exactly one output row per left row.
#[test]
fn test_left_any_cardinality() {
    let mut rng = StdRng::seed_from_u64(43);
    let right_keys: Vec<i32> = (0..300).map(|_| rng.gen_range(0..30)).collect();
    let left_keys: Vec<i32> = (0..100).map(|_| rng.gen_range(0..60)).collect();

    let join = build_join(JoinKind::Left, JoinStrictness::Any, &right_keys);
    let mut probe = block(vec![("k", int32(&left_keys))]);
    join.join_block(&mut probe, &mut None).unwrap();

    assert_eq!(probe.num_rows(), left_keys.len());
    assert_eq!(
        read_int32(&probe, "k"),
        left_keys.iter().map(|k| Some(*k)).collect::<Vec<_>>()
    );
}

/// Outer completeness: with distinct left keys, every right row is emitted
/// exactly once, through the probe or through the non-joined stream.
#[test]
fn test_outer_completeness_right_all() {
    let mut rng = StdRng::seed_from_u64(44);
    let right_keys: Vec<i32> = (0..500).map(|_| rng.gen_range(0..80)).collect();
    let mut left_keys: Vec<i32> = (0..40).collect();
    left_keys.shuffle(&mut rng);

    let join = build_join(JoinKind::Right, JoinStrictness::All, &right_keys);
    let mut probe = block(vec![("k", int32(&left_keys))]);
    join.join_block(&mut probe, &mut None).unwrap();

    let mut emitted: Vec<i32> = read_int32(&probe, "v")
        .into_iter()
        .map(|v| v.expect("matched right row"))
        .collect();

    let mut stream = join
        .create_non_joined_stream(
            sample(&[("k", int32_type()), ("v", int32_type())]),
            64,
        )
        .unwrap();
    while let Some(non_joined) = stream.next_block().unwrap() {
        assert!(non_joined.num_rows() > 0);
        emitted.extend(
            read_int32(&non_joined, "v")
                .into_iter()
                .map(|v| v.expect("stored right row")),
        );
    }

    emitted.sort_unstable();
    let expected: Vec<i32> = (0..right_keys.len() as i32).collect();
    assert_eq!(emitted, expected);
}

/// Null keys never reach the maps; Right/Full shapes surface them through
/// the non-joined stream instead.
#[test]
fn test_null_key_exclusion() {
    let desc = HashJoinDesc::new(
        JoinKind::Right,
        JoinStrictness::All,
        keys(&["k"]),
        keys(&["k"]),
    );
    let right_sample = sample(&[
        ("k", DataType::Nullable(Box::new(int32_type()))),
        ("v", int32_type()),
    ]);
    let join = HashJoin::new(desc, right_sample, false).unwrap();
    let right = block(vec![
        ("k", nullable_int32(&[Some(1), None, Some(2), None])),
        ("v", int32(&[0, 1, 2, 3])),
    ]);
    join.add_right_block(&right, true).unwrap();

    let mut probe = block(vec![("k", int32(&[1, 2, 3]))]);
    join.join_block(&mut probe, &mut None).unwrap();
    // Only the non-NULL keyed rows can match.
    assert_eq!(read_int32(&probe, "v"), vec![Some(0), Some(2)]);

    let result_sample = sample(&[
        ("k", DataType::Nullable(Box::new(int32_type()))),
        ("v", int32_type()),
    ]);
    let mut stream = join.create_non_joined_stream(result_sample, 1024).unwrap();
    let non_joined = stream.next_block().unwrap().unwrap();
    assert_eq!(read_int32(&non_joined, "v"), vec![Some(1), Some(3)]);
    assert_eq!(read_int32(&non_joined, "k"), vec![None, None]);
}

/// ASOF: the emitted inequality value is extremal among the candidates
/// satisfying the configured relation.
#[test]
fn test_asof_extremal_selection() {
    let mut rng = StdRng::seed_from_u64(45);
    let mut right_times: Vec<i64> = (0..100).map(|_| rng.gen_range(0..1000)).collect();
    right_times.sort_unstable();
    right_times.dedup();
    let right_equi = vec![7i32; right_times.len()];
    let payload: Vec<i32> = (0..right_times.len() as i32).collect();

    for inequality in [
        AsofInequality::Less,
        AsofInequality::LessOrEqual,
        AsofInequality::Greater,
        AsofInequality::GreaterOrEqual,
    ] {
        let desc = HashJoinDesc::new(
            JoinKind::Left,
            JoinStrictness::Asof,
            keys(&["e", "t"]),
            keys(&["e", "t"]),
        )
        .with_asof_inequality(inequality)
        .with_nullable_right_side(true);
        let right_sample = sample(&[
            ("e", int32_type()),
            ("t", int64_type()),
            ("p", int32_type()),
        ]);
        let join = HashJoin::new(desc, right_sample, false).unwrap();
        join.add_right_block(
            &block(vec![
                ("e", int32(&right_equi)),
                ("t", int64(&right_times)),
                ("p", int32(&payload)),
            ]),
            true,
        )
        .unwrap();

        let probe_times: Vec<i64> = (0..50).map(|_| rng.gen_range(-10..1010)).collect();
        let probe_equi = vec![7i32; probe_times.len()];
        let mut probe = block(vec![
            ("e", int32(&probe_equi)),
            ("t", int64(&probe_times)),
        ]);
        join.join_block(&mut probe, &mut None).unwrap();

        let produced = read_int32(&probe, "p");
        for (row, probe_time) in probe_times.iter().enumerate() {
            let expected = match inequality {
                AsofInequality::Less => right_times.iter().position(|t| t >= probe_time).map(
                    |p| p.checked_sub(1),
                ).unwrap_or(Some(right_times.len() - 1)).map(|p| p as i32),
                AsofInequality::LessOrEqual => right_times
                    .iter()
                    .position(|t| t > probe_time)
                    .map(|p| p.checked_sub(1))
                    .unwrap_or(Some(right_times.len() - 1))
                    .map(|p| p as i32),
                AsofInequality::Greater => right_times
                    .iter()
                    .position(|t| t > probe_time)
                    .map(|p| p as i32),
                AsofInequality::GreaterOrEqual => right_times
                    .iter()
                    .position(|t| t >= probe_time)
                    .map(|p| p as i32),
            };
            assert_eq!(produced[row], expected, "inequality {:?}", inequality);
        }
    }
}

/// ANTI LEFT emits exactly the left rows without any match.
#[test]
fn test_anti_left_correctness() {
    let mut rng = StdRng::seed_from_u64(46);
    let right_keys: Vec<i32> = (0..100).map(|_| rng.gen_range(0..25)).collect();
    let left_keys: Vec<i32> = (0..80).map(|_| rng.gen_range(0..50)).collect();

    let join = build_join(JoinKind::Left, JoinStrictness::Anti, &right_keys);
    let mut probe = block(vec![("k", int32(&left_keys))]);
    join.join_block(&mut probe, &mut None).unwrap();

    let expected: Vec<Option<i32>> = left_keys
        .iter()
        .filter(|k| !right_keys.contains(k))
        .map(|k| Some(*k))
        .collect();
    assert_eq!(read_int32(&probe, "k"), expected);
    // Default right columns on every emitted row.
    assert!(read_int32(&probe, "v").iter().all(|v| *v == Some(0)));
}

/// The non-joined stream honors its block-size bound across pulls.
#[test]
fn test_non_joined_stream_chunks() {
    let right_keys: Vec<i32> = (0..97).collect();
    let join = build_join(JoinKind::Right, JoinStrictness::All, &right_keys);

    let mut probe = block(vec![("k", int32(&[-1]))]);
    join.join_block(&mut probe, &mut None).unwrap();
    assert_eq!(probe.num_rows(), 0);

    let mut stream = join
        .create_non_joined_stream(
            sample(&[("k", int32_type()), ("v", int32_type())]),
            10,
        )
        .unwrap();
    let mut total = 0;
    let mut pulls = 0;
    while let Some(non_joined) = stream.next_block().unwrap() {
        assert!(non_joined.num_rows() <= 10);
        total += non_joined.num_rows();
        pulls += 1;
    }
    assert_eq!(total, 97);
    assert!(pulls >= 10);
}
