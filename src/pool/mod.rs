/*!
 * Pool Allocator
 * Block-sharded best-fit allocation with coalescing free
 *
 * Each node carves its buffer into `[header][block]` slots and tracks free
 * runs in a size-sorted region list. A run claimed for an allocation is
 * split off the smallest region that fits; a freed run merges with its
 * physical neighbors before re-entering the list. The region descriptors
 * live in a private arena per node so free-list bookkeeping never touches
 * the system heap once the node exists.
 */

mod free_list;

use crate::arena::Arena;
use crate::limits::{FL_ARENA_DIVISOR, FL_ARENA_MAX, FL_ARENA_MIN, FL_ARENA_NODES, WORD};
use crate::traits::{Allocator, Deallocator};
use crate::types::{AllocError, AllocResult, PoolStats};
use crate::util::{ceil_div, next_power_of_two, read_header, write_header};
use free_list::FreeList;
use log::{debug, info, warn};
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt;
use std::ptr::{self, NonNull};

/// One block-sharded backing buffer in the chain.
struct PoolNode {
    buf: NonNull<u8>,
    /// `s_pool` payload bytes plus one header slot per block
    buf_len: usize,
    s_pool: usize,
    s_block: usize,
    /// Feeds free-region descriptors exclusively
    fl_arena: Arena,
    free_list: FreeList,
    next: Option<Box<PoolNode>>,
}

impl PoolNode {
    /// `s_pool` and `s_block` must already be powers of two.
    fn new(s_pool: usize, s_block: usize) -> AllocResult<Self> {
        let block_count = s_pool / s_block;
        let buf_len = s_pool + WORD * block_count;

        let fl_size = (s_pool / FL_ARENA_DIVISOR).clamp(FL_ARENA_MIN, FL_ARENA_MAX);
        let mut fl_arena = Arena::new(fl_size, FL_ARENA_NODES)?;

        let mut free_list = FreeList::new();
        free_list.init_full(&mut fl_arena, block_count)?;

        let layout = Layout::from_size_align(buf_len, WORD)
            .map_err(|_| AllocError::BackingExhausted { requested: buf_len })?;
        let raw = unsafe { alloc_zeroed(layout) };
        let buf = NonNull::new(raw).ok_or(AllocError::BackingExhausted { requested: buf_len })?;

        Ok(Self {
            buf,
            buf_len,
            s_pool,
            s_block,
            fl_arena,
            free_list,
            next: None,
        })
    }

    fn block_count(&self) -> usize {
        self.s_pool / self.s_block
    }

    /// Header slot plus payload, the stride between block starts.
    fn slot(&self) -> usize {
        WORD + self.s_block
    }

    /// Claim `blocks` from this node's free list and stamp the header.
    fn try_claim(&mut self, blocks: usize, size: usize) -> Option<NonNull<u8>> {
        let index = self.free_list.find(blocks)?;
        unsafe {
            let payload = self.buf.as_ptr().add(index * self.slot() + WORD);
            write_header(payload, size);
            Some(NonNull::new_unchecked(payload))
        }
    }

    /// Payload range check, inclusive of the buffer's end.
    fn contains(&self, ptr: NonNull<u8>, size: usize) -> bool {
        let base = self.buf.as_ptr() as usize;
        let p = ptr.as_ptr() as usize;
        p >= base + WORD
            && p < base + self.buf_len
            && size
                .checked_add(p)
                .is_some_and(|end| end <= base + self.buf_len)
    }

    /// Block index of a payload pointer within this node.
    fn index_of(&self, ptr: NonNull<u8>) -> usize {
        debug_assert!(self.contains(ptr, 0));
        (ptr.as_ptr() as usize - self.buf.as_ptr() as usize) / self.slot()
    }

    /// Zero a freed allocation (header plus payload) and return its run to
    /// the free list.
    unsafe fn release(&mut self, ptr: NonNull<u8>, size: usize) -> AllocResult<()> {
        unsafe {
            ptr::write_bytes(ptr.as_ptr().sub(WORD), 0, WORD + size);
        }
        let index = self.index_of(ptr);
        let blocks = ceil_div(size, self.s_block);
        self.free_list.release(&mut self.fl_arena, index, blocks)
    }

    /// Rewind to a single full-coverage region over zeroed blocks.
    fn reset(&mut self) -> AllocResult<()> {
        self.fl_arena.reset()?;
        self.free_list = FreeList::new();
        let block_count = self.block_count();
        self.free_list.init_full(&mut self.fl_arena, block_count)?;
        unsafe {
            ptr::write_bytes(self.buf.as_ptr(), 0, self.buf_len);
        }
        Ok(())
    }

    fn used_bytes(&self) -> usize {
        self.s_pool - self.s_block * self.free_list.free_blocks()
    }
}

impl Drop for PoolNode {
    fn drop(&mut self) {
        // unlink the chain iteratively; recursive Box drops could blow the
        // stack on long chains
        let mut next = self.next.take();
        while let Some(mut node) = next {
            next = node.next.take();
        }
        // buf_len and alignment were validated when the buffer was created
        let layout = unsafe { Layout::from_size_align_unchecked(self.buf_len, WORD) };
        unsafe { dealloc(self.buf.as_ptr(), layout) };
    }
}

/// Best-fit block allocator with coalescing.
///
/// Requests are rounded up to whole blocks and served from the smallest
/// free run that holds them; freed runs merge with adjacent free runs.
/// A full chain grows by whole nodes up to the node cap. Runs never span
/// nodes and never coalesce across them.
pub struct Pool {
    head: PoolNode,
    nodes: usize,
    max_nodes: usize,
}

impl Pool {
    /// Create a pool of `size` payload bytes per node carved into
    /// `block_size`-byte blocks (both rounded up to powers of two), growing
    /// up to `max_nodes` nodes.
    pub fn new(size: usize, block_size: usize, max_nodes: usize) -> AllocResult<Self> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        if block_size < WORD {
            return Err(AllocError::BlockTooSmall {
                requested: block_size,
                min: WORD,
            });
        }
        let s_pool = next_power_of_two(size);
        let s_block = next_power_of_two(block_size);
        if s_block > s_pool {
            return Err(AllocError::RequestTooLarge {
                requested: s_block,
                node_capacity: s_pool,
            });
        }
        let head = PoolNode::new(s_pool, s_block)?;
        info!(
            "pool created: {} bytes per node, {}-byte blocks, cap {} nodes",
            s_pool, s_block, max_nodes
        );
        Ok(Self {
            head,
            nodes: 1,
            max_nodes,
        })
    }

    /// Allocate `size` bytes, rounded up to whole blocks; the byte count is
    /// stamped into the header slot of the run's first block.
    ///
    /// Walks the nodes best-fit; when every node misses, a fresh node is
    /// chained if the cap allows and the run comes off its front.
    pub fn alloc(&mut self, size: usize) -> AllocResult<NonNull<u8>> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        let blocks = ceil_div(size, self.head.s_block);
        if blocks > self.head.block_count() {
            return Err(AllocError::RequestTooLarge {
                requested: size,
                node_capacity: self.head.s_pool,
            });
        }

        let mut node = &mut self.head;
        loop {
            if let Some(ptr) = node.try_claim(blocks, size) {
                return Ok(ptr);
            }
            if node.next.is_none() {
                break;
            }
            node = node.next.as_mut().unwrap();
        }

        self.grow()?;
        // a fresh node's single region always satisfies a pre-checked request
        self.last_node_mut()
            .try_claim(blocks, size)
            .ok_or(AllocError::BackingExhausted { requested: size })
    }

    /// Allocate room for `count` items of `item_size` bytes each.
    pub fn alloc_array(&mut self, item_size: usize, count: usize) -> AllocResult<NonNull<u8>> {
        self.alloc(item_size.saturating_mul(count))
    }

    /// Allocate a copy of `bytes`.
    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> AllocResult<NonNull<u8>> {
        let ptr = self.alloc(bytes.len())?;
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
        }
        Ok(ptr)
    }

    /// Release a live allocation: zero its header and payload, then merge
    /// its block run back into the owning node's free list.
    ///
    /// # Safety
    /// The header word immediately before `ptr` must be readable. Pointers
    /// that this pool never returned are rejected by range check; interior
    /// pointers into a live run are undefined behavior.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) -> AllocResult<()> {
        let size = unsafe { read_header(ptr.as_ptr()) };
        if size == 0 {
            warn!("pool rejected free at {:p}: zero header", ptr);
            return Err(AllocError::ZeroHeader(ptr.as_ptr() as usize));
        }
        let node = match self.find_node_mut(ptr, size) {
            Some(node) => node,
            None => {
                warn!("pool rejected free at {:p}: pointer out of range", ptr);
                return Err(AllocError::ForeignPointer(ptr.as_ptr() as usize));
            }
        };
        unsafe { node.release(ptr, size) }
    }

    /// Move a live allocation into a fresh run of `new_size` bytes.
    ///
    /// Shrinking is not supported and reports `ShrinkNotSupported` before
    /// anything is allocated. On success the old run is freed; if that free
    /// fails, the fresh run is released again and the failure surfaces.
    ///
    /// # Safety
    /// `ptr` must have been returned by `alloc` or `realloc` on this pool
    /// and must still be live.
    pub unsafe fn realloc(
        &mut self,
        ptr: NonNull<u8>,
        new_size: usize,
    ) -> AllocResult<NonNull<u8>> {
        let old_size = unsafe { read_header(ptr.as_ptr()) };
        if self.find_node_mut(ptr, old_size).is_none() {
            return Err(AllocError::ForeignPointer(ptr.as_ptr() as usize));
        }
        if old_size > new_size {
            return Err(AllocError::ShrinkNotSupported {
                old: old_size,
                new: new_size,
            });
        }
        let new_ptr = self.alloc(new_size)?;
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_size);
            if let Err(err) = self.free(ptr) {
                let _ = self.free(new_ptr);
                return Err(err);
            }
        }
        Ok(new_ptr)
    }

    /// Reset every node: descriptor arenas rewound, full-coverage regions
    /// rebuilt, block buffers zeroed.
    pub fn reset(&mut self) -> AllocResult<()> {
        let mut node = Some(&mut self.head);
        while let Some(n) = node {
            n.reset()?;
            node = n.next.as_deref_mut();
        }
        debug!("pool reset: {} nodes rewound", self.nodes);
        Ok(())
    }

    /// Block payload bytes of one node.
    pub fn size(&self) -> usize {
        self.head.s_pool
    }

    /// Block length in bytes.
    pub fn block_size(&self) -> usize {
        self.head.s_block
    }

    /// Live bytes across all nodes, counted block-wise.
    pub fn size_used(&self) -> usize {
        self.iter_nodes().map(PoolNode::used_bytes).sum()
    }

    /// Nodes currently chained.
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Node cap.
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            node_size: self.head.s_pool,
            block_size: self.head.s_block,
            used: self.size_used(),
            nodes: self.nodes,
            max_nodes: self.max_nodes,
        }
    }

    /// Free-region snapshot per node, in list (size) order.
    ///
    /// Diagnostic surface: lets callers observe sortedness, coverage, and
    /// coalescing without reaching into the list.
    pub fn free_regions(&self) -> Vec<Vec<(usize, usize)>> {
        self.iter_nodes()
            .map(|node| node.free_list.iter().collect())
            .collect()
    }

    fn iter_nodes(&self) -> impl Iterator<Item = &PoolNode> + '_ {
        let mut node = Some(&self.head);
        std::iter::from_fn(move || {
            let n = node?;
            node = n.next.as_deref();
            Some(n)
        })
    }

    fn find_node_mut(&mut self, ptr: NonNull<u8>, size: usize) -> Option<&mut PoolNode> {
        let mut node = &mut self.head;
        loop {
            if node.contains(ptr, size) {
                return Some(node);
            }
            if node.next.is_none() {
                return None;
            }
            node = node.next.as_mut().unwrap();
        }
    }

    fn grow(&mut self) -> AllocResult<()> {
        if self.nodes >= self.max_nodes {
            return Err(AllocError::CapacityExceeded {
                nodes: self.nodes,
                max_nodes: self.max_nodes,
            });
        }
        let node = PoolNode::new(self.head.s_pool, self.head.s_block)?;
        self.last_node_mut().next = Some(Box::new(node));
        self.nodes += 1;
        debug!("pool grew to {} of {} nodes", self.nodes, self.max_nodes);
        Ok(())
    }

    fn last_node_mut(&mut self) -> &mut PoolNode {
        let mut node = &mut self.head;
        while node.next.is_some() {
            node = node.next.as_mut().unwrap();
        }
        node
    }
}

impl Allocator for Pool {
    fn alloc(&mut self, size: usize) -> AllocResult<NonNull<u8>> {
        Pool::alloc(self, size)
    }

    unsafe fn realloc(&mut self, ptr: NonNull<u8>, new_size: usize) -> AllocResult<NonNull<u8>> {
        unsafe { Pool::realloc(self, ptr, new_size) }
    }

    fn reset(&mut self) -> AllocResult<()> {
        Pool::reset(self)
    }

    fn size(&self) -> usize {
        Pool::size(self)
    }

    fn size_used(&self) -> usize {
        Pool::size_used(self)
    }

    fn nodes(&self) -> usize {
        Pool::nodes(self)
    }

    fn max_nodes(&self) -> usize {
        Pool::max_nodes(self)
    }
}

impl Deallocator for Pool {
    unsafe fn free(&mut self, ptr: NonNull<u8>) -> AllocResult<()> {
        unsafe { Pool::free(self, ptr) }
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("node_size", &self.head.s_pool)
            .field("block_size", &self.head.s_block)
            .field("used", &self.size_used())
            .field("nodes", &self.nodes)
            .field("max_nodes", &self.max_nodes)
            .finish()
    }
}
