/*!
 * Allocator Traits
 * Capability interfaces over the arena and the pool
 */

use crate::types::AllocResult;
use std::ptr::NonNull;

/// Byte allocator interface shared by the arena and the pool.
///
/// Implementations are deliberately not `Send` or `Sync`; a handle belongs
/// to one thread.
pub trait Allocator {
    /// Allocate `size` bytes and return the payload pointer.
    fn alloc(&mut self, size: usize) -> AllocResult<NonNull<u8>>;

    /// Move an allocation into a fresh region of `new_size` bytes.
    ///
    /// # Safety
    /// `ptr` must have been returned by `alloc` or `realloc` on this
    /// allocator and must still be live.
    unsafe fn realloc(&mut self, ptr: NonNull<u8>, new_size: usize) -> AllocResult<NonNull<u8>>;

    /// Return the allocator to its freshly-created state.
    fn reset(&mut self) -> AllocResult<()>;

    /// Buffer length of one node in bytes.
    fn size(&self) -> usize;

    /// Bytes currently accounted as live.
    fn size_used(&self) -> usize;

    /// Nodes currently chained.
    fn nodes(&self) -> usize;

    /// Node cap.
    fn max_nodes(&self) -> usize;
}

/// Allocators that can release individual allocations.
pub trait Deallocator: Allocator {
    /// Release a live allocation.
    ///
    /// # Safety
    /// The header word immediately before `ptr` must be readable. Pointers
    /// from another allocator are rejected by range check; interior pointers
    /// into a live allocation are undefined behavior.
    unsafe fn free(&mut self, ptr: NonNull<u8>) -> AllocResult<()>;
}
