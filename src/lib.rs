/*!
 * chainalloc
 * Chained bump arenas and best-fit block pools over heap-backed buffers
 *
 * Two cooperating allocation disciplines share a node-chained growth model
 * and a common header convention: every allocation is preceded by one
 * machine word holding the user-requested byte count, so realloc and free
 * can recover sizes without an external ledger.
 *
 * - [`Arena`]: bump allocation; individual frees are unsupported and
 *   memory is reclaimed wholesale via reset.
 * - [`Pool`]: block-quantized best-fit allocation with coalescing on free.
 *   Free runs are tracked in a size-sorted region list per node, and the
 *   region descriptors themselves live in a private arena so free-list
 *   metadata never fragments the system heap.
 *
 * Handles are single-threaded by contract; none of the types are `Send`
 * or `Sync`. Separate handles may live on separate threads.
 */

pub mod arena;
pub mod limits;
pub mod pool;
pub mod traits;
pub mod types;

mod util;

// Re-export for convenience
pub use arena::Arena;
pub use pool::Pool;
pub use traits::{Allocator, Deallocator};
pub use types::{AllocError, AllocResult, ArenaStats, PoolStats};
