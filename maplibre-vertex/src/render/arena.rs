//! A pool of fixed-size vertex blocks shared by all tile jobs and the render thread.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

/// Number of `i16` values per block. Divisible by every vertex stride.
pub const BLOCK_SIZE: usize = 360;

pub struct VertexBlock {
    data: Box<[i16; BLOCK_SIZE]>,
    used: usize,
}

impl VertexBlock {
    fn new() -> Self {
        Self {
            data: Box::new([0; BLOCK_SIZE]),
            used: 0,
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn is_full(&self) -> bool {
        self.used == BLOCK_SIZE
    }

    pub fn as_slice(&self) -> &[i16] {
        &self.data[..self.used]
    }
}

impl fmt::Debug for VertexBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexBlock")
            .field("used", &self.used)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaStats {
    /// Blocks currently owned by chains.
    pub in_use: usize,
    /// Blocks waiting on the free list.
    pub free: usize,
    /// Blocks allocated from the heap so far.
    pub allocated: usize,
    pub limit: usize,
}

#[derive(Default)]
struct PoolState {
    free: Vec<VertexBlock>,
    in_use: usize,
    allocated: usize,
}

/// Hands out [`VertexBlock`]s and takes them back. The free list never grows past `limit`;
/// blocks released beyond that are dropped.
pub struct VertexArena {
    limit: usize,
    state: Mutex<PoolState>,
}

impl VertexArena {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            state: Mutex::new(PoolState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // A panic while holding the lock leaves the counters usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn acquire(&self) -> VertexBlock {
        let mut state = self.lock();
        state.in_use += 1;
        match state.free.pop() {
            Some(mut block) => {
                block.used = 0;
                block
            }
            None => {
                state.allocated += 1;
                VertexBlock::new()
            }
        }
    }

    /// Returns a whole chain to the pool in one critical section.
    pub fn release(&self, mut chain: Vec<VertexBlock>) {
        if chain.is_empty() {
            return;
        }
        let mut state = self.lock();

        let count = chain.len();
        if count > state.in_use {
            log::warn!(
                "releasing {} blocks but only {} are in use",
                count,
                state.in_use
            );
        }
        state.in_use = state.in_use.saturating_sub(count);

        let room = self.limit.saturating_sub(state.free.len());
        if count > room {
            chain.truncate(room);
        }
        state.free.append(&mut chain);
    }

    pub fn stats(&self) -> ArenaStats {
        let state = self.lock();
        ArenaStats {
            in_use: state.in_use,
            free: state.free.len(),
            allocated: state.allocated,
            limit: self.limit,
        }
    }
}

impl fmt::Debug for VertexArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexArena")
            .field("stats", &self.stats())
            .finish()
    }
}

/// The blocks of one layer. Every block but the last is full.
pub struct VertexChain {
    arena: Arc<VertexArena>,
    blocks: Vec<VertexBlock>,
}

impl VertexChain {
    pub fn new(arena: Arc<VertexArena>) -> Self {
        Self {
            arena,
            blocks: Vec::new(),
        }
    }

    /// Appends one vertex, or any other group of values which must not be split across blocks.
    pub fn push(&mut self, values: &[i16]) {
        let n = values.len();
        debug_assert!(n > 0 && BLOCK_SIZE % n == 0, "group of {} values", n);

        let full = self
            .blocks
            .last()
            .map_or(true, |block| block.used + n > BLOCK_SIZE);
        if full {
            self.blocks.push(self.arena.acquire());
        }
        if let Some(block) = self.blocks.last_mut() {
            block.data[block.used..block.used + n].copy_from_slice(values);
            block.used += n;
        }
    }

    /// Number of values written.
    pub fn len(&self) -> usize {
        self.blocks.iter().map(VertexBlock::used).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[VertexBlock] {
        &self.blocks
    }

    pub fn values(&self) -> impl Iterator<Item = i16> + '_ {
        self.blocks
            .iter()
            .flat_map(|block| block.as_slice().iter().copied())
    }

    /// Copies the chain to `out`. Only the tail block is partial.
    pub fn copy_into(&self, out: &mut Vec<i16>) {
        out.reserve(self.len());
        for block in &self.blocks {
            out.extend_from_slice(block.as_slice());
        }
    }

    /// Hands all blocks back to the arena.
    pub fn release(&mut self) {
        self.arena.release(std::mem::take(&mut self.blocks));
    }
}

impl Drop for VertexChain {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for VertexChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexChain")
            .field("blocks", &self.blocks.len())
            .field("len", &self.len())
            .finish()
    }
}
