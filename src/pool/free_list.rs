/*!
 * Free-Region List
 * Size-sorted doubly-linked descriptors over a pool node's free blocks
 *
 * Ascending size order makes the first fitting region the best fit. The
 * descriptors are bump-allocated from the owning node's private arena and
 * never handed back individually; reset reclaims them wholesale.
 */

use crate::arena::Arena;
use crate::types::{AllocError, AllocResult};
use std::mem;
use std::ptr::NonNull;

/// Descriptor for a maximal contiguous run of free blocks.
struct FreeRegion {
    start_block: usize,
    s_blocks: usize,
    prev: Option<NonNull<FreeRegion>>,
    next: Option<NonNull<FreeRegion>>,
}

impl FreeRegion {
    fn end(&self) -> usize {
        self.start_block + self.s_blocks
    }
}

/// Size-sorted doubly-linked list of free regions.
///
/// Invariants: ascending `s_blocks` along `next` (ties stable), regions
/// pairwise disjoint and never adjacent, and the union of regions plus the
/// live allocations covers the node exactly.
pub(super) struct FreeList {
    head: Option<NonNull<FreeRegion>>,
}

impl FreeList {
    pub fn new() -> Self {
        Self { head: None }
    }

    /// Install a single region covering the whole node.
    pub fn init_full(&mut self, arena: &mut Arena, block_count: usize) -> AllocResult<()> {
        let region = Self::alloc_region(arena, 0, block_count)?;
        self.insert_sorted(region);
        Ok(())
    }

    /// Best-fit find: claim `blocks` off the front of the smallest region
    /// that holds them, repairing sort order in place.
    ///
    /// A region shrunk to zero is unlinked (its descriptor stays behind in
    /// the arena until reset). Otherwise the region may only have become
    /// smaller than its left neighbor, so bubbling leftward by content swap
    /// restores ascending order without touching a single link.
    pub fn find(&mut self, blocks: usize) -> Option<usize> {
        if blocks == 0 {
            return None;
        }
        let mut cursor = self.head;
        while let Some(region) = cursor {
            let r = region.as_ptr();
            unsafe {
                if (*r).s_blocks < blocks {
                    cursor = (*r).next;
                    continue;
                }
                let start = (*r).start_block;
                (*r).s_blocks -= blocks;
                (*r).start_block += blocks;
                if (*r).s_blocks == 0 {
                    self.unlink(region);
                } else {
                    Self::bubble_left(region);
                }
                return Some(start);
            }
        }
        None
    }

    /// Return `blocks` starting at `index`, merging with physical
    /// neighbors.
    ///
    /// The scan ignores sort order; adjacency is a property of block
    /// positions, and it stops as soon as both sides are found. Merged
    /// survivors re-enter the list at their new size rank.
    pub fn release(&mut self, arena: &mut Arena, index: usize, blocks: usize) -> AllocResult<()> {
        debug_assert!(blocks > 0);

        let mut left: Option<NonNull<FreeRegion>> = None;
        let mut right: Option<NonNull<FreeRegion>> = None;
        let mut cursor = self.head;
        while let Some(region) = cursor {
            unsafe {
                let r = region.as_ptr();
                if (*r).end() == index {
                    left = Some(region);
                } else if (*r).start_block == index + blocks {
                    right = Some(region);
                }
                if left.is_some() && right.is_some() {
                    break;
                }
                cursor = (*r).next;
            }
        }

        match (left, right) {
            (Some(l), Some(rt)) => unsafe {
                self.unlink(l);
                self.unlink(rt);
                // rt's descriptor is abandoned in the arena
                (*l.as_ptr()).s_blocks += blocks + (*rt.as_ptr()).s_blocks;
                self.insert_sorted(l);
            },
            (Some(l), None) => unsafe {
                self.unlink(l);
                (*l.as_ptr()).s_blocks += blocks;
                self.insert_sorted(l);
            },
            (None, Some(rt)) => unsafe {
                self.unlink(rt);
                (*rt.as_ptr()).start_block = index;
                (*rt.as_ptr()).s_blocks += blocks;
                self.insert_sorted(rt);
            },
            (None, None) => {
                let region = Self::alloc_region(arena, index, blocks)?;
                self.insert_sorted(region);
            }
        }
        Ok(())
    }

    /// Total free blocks across all regions.
    pub fn free_blocks(&self) -> usize {
        self.iter().map(|(_, s_blocks)| s_blocks).sum()
    }

    /// Regions in list (size) order as `(start_block, s_blocks)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let region = cursor?;
            unsafe {
                let r = region.as_ptr();
                cursor = (*r).next;
                Some(((*r).start_block, (*r).s_blocks))
            }
        })
    }

    /// Carve a new descriptor out of the descriptor arena.
    fn alloc_region(
        arena: &mut Arena,
        start_block: usize,
        s_blocks: usize,
    ) -> AllocResult<NonNull<FreeRegion>> {
        debug_assert!(s_blocks > 0);
        let raw = arena
            .alloc(mem::size_of::<FreeRegion>())
            .map_err(|_| AllocError::MetadataExhausted)?;
        // descriptor-only arenas advance in word multiples, keeping this true
        debug_assert_eq!(raw.as_ptr() as usize % mem::align_of::<FreeRegion>(), 0);
        let region = raw.cast::<FreeRegion>();
        unsafe {
            region.as_ptr().write(FreeRegion {
                start_block,
                s_blocks,
                prev: None,
                next: None,
            });
        }
        Ok(region)
    }

    /// Splice `region` before the first strictly-larger neighbor; ties land
    /// after existing equals.
    fn insert_sorted(&mut self, region: NonNull<FreeRegion>) {
        unsafe {
            let mut prev: Option<NonNull<FreeRegion>> = None;
            let mut curr = self.head;
            while let Some(c) = curr {
                if (*c.as_ptr()).s_blocks > (*region.as_ptr()).s_blocks {
                    break;
                }
                prev = curr;
                curr = (*c.as_ptr()).next;
            }
            (*region.as_ptr()).prev = prev;
            (*region.as_ptr()).next = curr;
            match prev {
                Some(p) => (*p.as_ptr()).next = Some(region),
                None => self.head = Some(region),
            }
            if let Some(c) = curr {
                (*c.as_ptr()).prev = Some(region);
            }
        }
    }

    fn unlink(&mut self, region: NonNull<FreeRegion>) {
        unsafe {
            let r = region.as_ptr();
            match (*r).prev {
                Some(p) => (*p.as_ptr()).next = (*r).next,
                None => self.head = (*r).next,
            }
            if let Some(n) = (*r).next {
                (*n.as_ptr()).prev = (*r).prev;
            }
            (*r).prev = None;
            (*r).next = None;
        }
    }

    /// Swap `(start_block, s_blocks)` with the left neighbor while smaller.
    fn bubble_left(region: NonNull<FreeRegion>) {
        unsafe {
            let mut r = region.as_ptr();
            while let Some(prev) = (*r).prev {
                let p = prev.as_ptr();
                if (*r).s_blocks >= (*p).s_blocks {
                    break;
                }
                mem::swap(&mut (*r).start_block, &mut (*p).start_block);
                mem::swap(&mut (*r).s_blocks, &mut (*p).s_blocks);
                r = p;
            }
        }
    }
}
