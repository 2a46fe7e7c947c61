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

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Per-bucket usage bits, one vector per key disjunct.
///
/// Shapes that never emit non-joined right rows skip the allocation
/// entirely: `set_used` becomes a no-op and `get_used` always answers true,
/// so the non-joined stream would skip every bucket.
///
/// Flag races between probing threads decide only which thread emits a
/// given outer-join row, never the content of the joined output, so all
/// accesses are relaxed. The claim path (`set_used_once`) is the one
/// place that needs a real compare-and-swap.
pub struct JoinUsedFlags {
    need_flags: bool,
    flags: Vec<Vec<AtomicBool>>,
}

impl JoinUsedFlags {
    pub fn new(need_flags: bool) -> JoinUsedFlags {
        JoinUsedFlags {
            need_flags,
            flags: Vec::new(),
        }
    }

    pub fn need_flags(&self) -> bool {
        self.need_flags
    }

    /// Replace the flags of one disjunct with `size` cleared bits. Called
    /// under the build lock after every ingested block.
    pub fn reinit(&mut self, disjunct: usize, size: usize) {
        if !self.need_flags {
            return;
        }
        if self.flags.len() <= disjunct {
            self.flags.resize_with(disjunct + 1, Vec::new);
        }
        let mut flags = Vec::with_capacity(size);
        flags.resize_with(size, || AtomicBool::new(false));
        self.flags[disjunct] = flags;
    }

    #[inline]
    pub fn set_used(&self, disjunct: usize, index: usize) {
        if !self.need_flags {
            return;
        }
        self.flags[disjunct][index].store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn get_used(&self, disjunct: usize, index: usize) -> bool {
        if !self.need_flags {
            return true;
        }
        self.flags[disjunct][index].load(Ordering::Relaxed)
    }

    /// Claim a bucket exactly once across concurrent probers.
    #[inline]
    pub fn set_used_once(&self, disjunct: usize, index: usize) -> bool {
        if !self.need_flags {
            return true;
        }
        let flag = &self.flags[disjunct][index];
        // Fast check to avoid the CAS on already-claimed buckets.
        if flag.load(Ordering::Relaxed) {
            return false;
        }
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
