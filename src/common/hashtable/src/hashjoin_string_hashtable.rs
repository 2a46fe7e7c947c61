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

use crate::traits::HashJoinHashtableLike;
use crate::FastHash;

/// Length of the inline prefix compared before touching the key pool.
pub const STRING_EARLY_SIZE: usize = 4;

const NONE: u32 = 0;

struct StringEntry<V> {
    key_offset: usize,
    key_length: u32,
    early: [u8; STRING_EARLY_SIZE],
    next: u32,
    value: V,
}

/// A chained hash map keyed by byte strings.
///
/// Key bytes live in an append-only pool owned by the map; entries keep
/// `(offset, length)` plus the first bytes inline so most negative probes
/// never touch the pool. Entry indexes are the stable bucket ordinals, as
/// in `HashJoinHashMap`.
pub struct StringHashJoinHashMap<V> {
    pool: Vec<u8>,
    pointers: Box<[u32]>,
    entries: Vec<StringEntry<V>>,
    hash_shift: u32,
}

impl<V> Default for StringHashJoinHashMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> StringHashJoinHashMap<V> {
    pub fn new() -> Self {
        Self::with_build_row_num(0)
    }

    pub fn with_build_row_num(row_num: usize) -> Self {
        let capacity = std::cmp::max((row_num * 2).next_power_of_two(), 1 << 10);
        Self {
            pool: Vec::new(),
            pointers: vec![NONE; capacity].into_boxed_slice(),
            entries: Vec::with_capacity(row_num),
            hash_shift: 64 - capacity.trailing_zeros(),
        }
    }

    #[inline(always)]
    fn slot(&self, hash: u64) -> usize {
        (hash >> self.hash_shift) as usize
    }

    fn entry_key(&self, entry: &StringEntry<V>) -> &[u8] {
        &self.pool[entry.key_offset..entry.key_offset + entry.key_length as usize]
    }

    #[inline(always)]
    fn entry_matches(&self, entry: &StringEntry<V>, key: &[u8]) -> bool {
        if entry.key_length as usize != key.len() {
            return false;
        }
        let early_len = std::cmp::min(STRING_EARLY_SIZE, key.len());
        if key[..early_len] != entry.early[..early_len] {
            return false;
        }
        self.entry_key(entry) == key
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn find(&self, key: &[u8]) -> Option<(usize, &V)> {
        let mut index = self.pointers[self.slot(key.fast_hash())];
        while index != NONE {
            let entry = &self.entries[(index - 1) as usize];
            if self.entry_matches(entry, key) {
                return Some(((index - 1) as usize, &entry.value));
            }
            index = entry.next;
        }
        None
    }

    pub fn emplace(&mut self, key: &[u8], init: impl FnOnce() -> V) -> (bool, usize, &mut V) {
        let slot = self.slot(key.fast_hash());
        let mut index = self.pointers[slot];
        while index != NONE {
            let offset = (index - 1) as usize;
            if self.entry_matches(&self.entries[offset], key) {
                return (false, offset, &mut self.entries[offset].value);
            }
            index = self.entries[offset].next;
        }

        if self.needs_grow() {
            self.grow();
        }
        let slot = self.slot(key.fast_hash());
        let head = self.pointers[slot];
        let key_offset = self.pool.len();
        self.pool.extend_from_slice(key);
        let mut early = [0u8; STRING_EARLY_SIZE];
        let early_len = std::cmp::min(STRING_EARLY_SIZE, key.len());
        early[..early_len].copy_from_slice(&key[..early_len]);
        self.entries.push(StringEntry {
            key_offset,
            key_length: key.len() as u32,
            early,
            next: head,
            value: init(),
        });
        let offset = self.entries.len() - 1;
        self.pointers[slot] = (offset + 1) as u32;
        (true, offset, &mut self.entries[offset].value)
    }

    pub fn value_at(&self, offset: usize) -> Option<&V> {
        self.entries.get(offset).map(|e| &e.value)
    }

    pub fn bytes_len(&self) -> usize {
        mem::size_of::<Self>()
            + self.pool.capacity()
            + self.pointers.len() * mem::size_of::<u32>()
            + self.entries.capacity() * mem::size_of::<StringEntry<V>>()
    }

    #[inline(always)]
    fn needs_grow(&self) -> bool {
        self.entries.len() + 1 > self.pointers.len() - self.pointers.len() / 4
    }

    fn grow(&mut self) {
        let capacity = self.pointers.len() * 2;
        self.pointers = vec![NONE; capacity].into_boxed_slice();
        self.hash_shift = 64 - capacity.trailing_zeros();
        for offset in 0..self.entries.len() {
            let entry = &self.entries[offset];
            let hash = self
                .pool
                .get(entry.key_offset..entry.key_offset + entry.key_length as usize)
                .map(|key| key.fast_hash())
                .unwrap_or_default();
            let slot = self.slot(hash);
            self.entries[offset].next = self.pointers[slot];
            self.pointers[slot] = (offset + 1) as u32;
        }
    }
}

impl<V> HashJoinHashtableLike for StringHashJoinHashMap<V> {
    type Key = [u8];
    type Value = V;

    fn find(&self, key: &[u8]) -> Option<(usize, &V)> {
        self.find(key)
    }

    fn entry_count(&self) -> usize {
        self.entry_count()
    }

    fn value_at(&self, offset: usize) -> Option<&V> {
        self.value_at(offset)
    }

    fn bytes_len(&self) -> usize {
        self.bytes_len()
    }
}
