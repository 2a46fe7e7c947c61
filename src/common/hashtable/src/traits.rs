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

use ethnum::U256;

/// A cheap 64-bit hash used to place keys into buckets.
pub trait FastHash {
    fn fast_hash(&self) -> u64;
}

#[inline(always)]
fn hash64(mut x: u64) -> u64 {
    // 64-bit finalizer, murmur3 constants.
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^ (x >> 33)
}

#[inline(always)]
fn merge_hash(l: u64, r: u64) -> u64 {
    hash64(l ^ r.rotate_left(32))
}

macro_rules! impl_fast_hash_for_primitive {
    ($($t:ty),*) => {
        $(
            impl FastHash for $t {
                #[inline(always)]
                fn fast_hash(&self) -> u64 {
                    hash64(*self as u64)
                }
            }
        )*
    };
}

impl_fast_hash_for_primitive! { u8, u16, u32, u64 }

impl FastHash for u128 {
    #[inline(always)]
    fn fast_hash(&self) -> u64 {
        merge_hash(hash64(*self as u64), hash64((*self >> 64) as u64))
    }
}

impl FastHash for U256 {
    #[inline(always)]
    fn fast_hash(&self) -> u64 {
        let lo = *self.low();
        let hi = *self.high();
        merge_hash(lo.fast_hash(), hi.fast_hash())
    }
}

impl FastHash for [u8] {
    fn fast_hash(&self) -> u64 {
        let mut state = hash64(self.len() as u64);
        let mut chunks = self.chunks_exact(8);
        for chunk in &mut chunks {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            state = merge_hash(state, u64::from_le_bytes(word));
        }
        let rem = chunks.remainder();
        if !rem.is_empty() {
            let mut word = [0u8; 8];
            word[..rem.len()].copy_from_slice(rem);
            state = merge_hash(state, u64::from_le_bytes(word));
        }
        state
    }
}

/// Fixed-width key types the join maps can be specialized to.
pub trait Keyable: Sized + Copy + Eq + FastHash + Send + Sync + 'static {}

impl Keyable for u8 {}
impl Keyable for u16 {}
impl Keyable for u32 {}
impl Keyable for u64 {}
impl Keyable for u128 {}
impl Keyable for U256 {}

/// The probe-side surface shared by the fixed-key and string-key join maps.
///
/// `find` returns the bucket ordinal together with the mapped value; the
/// ordinal indexes the caller's used-flags and stays stable across growth.
pub trait HashJoinHashtableLike {
    type Key: ?Sized;
    type Value;

    fn find(&self, key: &Self::Key) -> Option<(usize, &Self::Value)>;

    /// Number of distinct keys, which equals the number of bucket ordinals.
    fn entry_count(&self) -> usize;

    /// The mapped value stored at a bucket ordinal.
    fn value_at(&self, offset: usize) -> Option<&Self::Value>;

    fn bytes_len(&self) -> usize;
}
