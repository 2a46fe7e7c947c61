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
use quarry_common_expression::DataBlock;
use quarry_query_join::HashJoin;
use quarry_query_join::HashJoinDesc;
use quarry_query_join::JoinKind;
use quarry_query_join::JoinStrictness;

use crate::common::*;

fn cross_join(max_joined_block_rows: usize) -> HashJoin {
    let desc = HashJoinDesc::new(JoinKind::Cross, JoinStrictness::All, vec![], vec![])
        .with_max_joined_block_rows(max_joined_block_rows);
    let join = HashJoin::new(desc, sample(&[("r", int32_type())]), false).unwrap();
    for chunk in 0..3 {
        let values: Vec<i32> = (chunk * 10..(chunk + 1) * 10).collect();
        join.add_right_block(&block(vec![("r", int32(&values))]), true)
            .unwrap();
    }
    join
}

fn left_block() -> DataBlock {
    block(vec![("l", int32(&[0, 1, 2, 3, 4]))])
}

fn collect_pairs(blocks: &[DataBlock]) -> Vec<(Option<i32>, Option<i32>)> {
    let mut pairs = Vec::new();
    for block in blocks {
        let left = read_int32(block, "l");
        let right = read_int32(block, "r");
        assert_eq!(left.len(), right.len());
        pairs.extend(left.into_iter().zip(right));
    }
    pairs
}

#[test]
fn test_cross_join_full_output() {
    let join = cross_join(1 << 20);
    let mut probe = left_block();
    let mut not_processed = None;
    join.join_block(&mut probe, &mut not_processed).unwrap();
    assert!(not_processed.is_none());
    assert_eq!(probe.num_rows(), 150);

    let pairs = collect_pairs(std::slice::from_ref(&probe));
    let mut expected = Vec::new();
    for l in 0..5 {
        for r in 0..30 {
            expected.push((Some(l), Some(r)));
        }
    }
    assert_eq!(pairs, expected);
}

#[test]
fn test_cross_join_resumption_equals_unsplit() {
    // The same cross product, produced in bounded pieces through the
    // parked continuation, must concatenate to the unsplit output.
    let unsplit = {
        let join = cross_join(1 << 20);
        let mut probe = left_block();
        join.join_block(&mut probe, &mut None).unwrap();
        collect_pairs(std::slice::from_ref(&probe))
    };

    let join = cross_join(17);
    let mut outputs = Vec::new();
    let mut probe = left_block();
    let mut not_processed = None;
    let mut calls = 0;
    loop {
        join.join_block(&mut probe, &mut not_processed).unwrap();
        calls += 1;
        assert!(calls < 100, "cross join continuation does not make progress");
        // Each piece stays close to the cap: it can overshoot by at most
        // one right block.
        assert!(probe.num_rows() <= 17 + 10);
        outputs.push(probe.clone());
        if not_processed.is_none() {
            break;
        }
    }

    assert!(outputs.len() > 1);
    assert_eq!(collect_pairs(&outputs), unsplit);
}
