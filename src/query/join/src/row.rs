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

use std::marker::PhantomData;
use std::ptr;

use bumpalo::Bump;
use quarry_common_exception::ErrorCode;
use quarry_common_exception::Result;
use quarry_common_expression::Column;
use quarry_common_expression::DataBlock;
use quarry_common_hashtable::RowPtr;

use crate::desc::AsofInequality;

/// Arena backing the overflow chain nodes of `RowRefList`.
///
/// Nodes are bump-allocated and freed en masse when the operator drops.
/// The arena is only written while the build side holds the write lock;
/// after sealing it is read-only, which is what makes the `Sync` claim
/// sound despite `Bump` not being `Sync` itself.
pub(crate) struct Pool {
    arena: Bump,
}

unsafe impl Send for Pool {}
unsafe impl Sync for Pool {}

impl Pool {
    pub fn new() -> Pool {
        Pool { arena: Bump::new() }
    }

    pub fn allocated_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }

    fn alloc_batch(&self, batch: RowRefBatch) -> *mut RowRefBatch {
        self.arena.alloc(batch) as *mut RowRefBatch
    }
}

pub(crate) const ROW_REF_BATCH_SIZE: usize = 7;

pub(crate) struct RowRefBatch {
    row_refs: [RowPtr; ROW_REF_BATCH_SIZE],
    size: u32,
    next: *mut RowRefBatch,
}

/// The chain of right rows sharing one key: the first row inline, the rest
/// in arena-allocated batches. A full batch is chained in front of the
/// previous one, so iteration yields the head first, then batches newest
/// first with rows in insertion order inside each batch.
pub struct RowRefList {
    pub row: RowPtr,
    next: *mut RowRefBatch,
}

// The raw batch pointers target the operator-owned arena, which outlives
// every map referencing it and is immutable once probing starts.
unsafe impl Send for RowRefList {}
unsafe impl Sync for RowRefList {}

impl RowRefList {
    pub(crate) fn new(row: RowPtr) -> RowRefList {
        RowRefList {
            row,
            next: ptr::null_mut(),
        }
    }

    pub(crate) fn insert(&mut self, row: RowPtr, pool: &Pool) {
        unsafe {
            if self.next.is_null() || (*self.next).size as usize == ROW_REF_BATCH_SIZE {
                self.next = pool.alloc_batch(RowRefBatch {
                    row_refs: [RowPtr::default(); ROW_REF_BATCH_SIZE],
                    size: 0,
                    next: self.next,
                });
            }
            let batch = &mut *self.next;
            batch.row_refs[batch.size as usize] = row;
            batch.size += 1;
        }
    }

    pub fn iter(&self) -> RowRefListIter<'_> {
        RowRefListIter {
            head: Some(self.row),
            batch: self.next,
            index: 0,
            _marker: PhantomData,
        }
    }
}

pub struct RowRefListIter<'a> {
    head: Option<RowPtr>,
    batch: *const RowRefBatch,
    index: u32,
    _marker: PhantomData<&'a RowRefList>,
}

impl Iterator for RowRefListIter<'_> {
    type Item = RowPtr;

    fn next(&mut self) -> Option<RowPtr> {
        if let Some(head) = self.head.take() {
            return Some(head);
        }
        while !self.batch.is_null() {
            let batch = unsafe { &*self.batch };
            if self.index < batch.size {
                let row = batch.row_refs[self.index as usize];
                self.index += 1;
                return Some(row);
            }
            self.batch = batch.next;
            self.index = 0;
        }
        None
    }
}

/// The mapped-value side of the join maps: a single row, a chain of rows,
/// or an ASOF lookup structure.
pub trait JoinMapped: Send + Sync + 'static {
    type RowsIter<'a>: Iterator<Item = RowPtr>
    where Self: 'a;

    /// The inline row, when the mapped value stores one.
    fn head_row(&self) -> Option<RowPtr>;

    /// All rows of this bucket in chain order.
    fn rows(&self) -> Self::RowsIter<'_>;

    /// ASOF lookup against the left inequality column; `None` for the
    /// non-ASOF mapped kinds.
    fn find_asof(&self, inequality: AsofInequality, column: &Column, row: usize) -> Option<RowPtr> {
        let _ = (inequality, column, row);
        None
    }
}

impl JoinMapped for RowPtr {
    type RowsIter<'a>
        = std::iter::Once<RowPtr>
    where Self: 'a;

    fn head_row(&self) -> Option<RowPtr> {
        Some(*self)
    }

    fn rows(&self) -> Self::RowsIter<'_> {
        std::iter::once(*self)
    }
}

impl JoinMapped for RowRefList {
    type RowsIter<'a>
        = RowRefListIter<'a>
    where Self: 'a;

    fn head_row(&self) -> Option<RowPtr> {
        Some(self.row)
    }

    fn rows(&self) -> Self::RowsIter<'_> {
        self.iter()
    }
}

/// Owner of the ingested right blocks.
pub(crate) struct RowSpace {
    pub saved_block_sample: DataBlock,
    pub blocks: Vec<DataBlock>,
    /// Captured combined null maps for Right/Full shapes, one entry per
    /// ingested block that carried a NULL key.
    pub blocks_nullmaps: Vec<(u32, Vec<u8>)>,
    pub pool: Pool,
    pub row_count: usize,
}

impl RowSpace {
    pub fn new(saved_block_sample: DataBlock) -> RowSpace {
        RowSpace {
            saved_block_sample,
            blocks: Vec::new(),
            blocks_nullmaps: Vec::new(),
            pool: Pool::new(),
            row_count: 0,
        }
    }

    pub fn push_block(&mut self, block: DataBlock) -> Result<u32> {
        let chunk_index = u32::try_from(self.blocks.len())
            .map_err(|_| ErrorCode::NotImplemented("too many blocks in right table storage"))?;
        self.row_count += block.num_rows();
        self.blocks.push(block);
        Ok(chunk_index)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn bytes(&self) -> usize {
        self.blocks
            .iter()
            .map(|block| block.memory_size())
            .sum::<usize>()
            + self.pool.allocated_bytes()
    }
}
