/*!
 * Allocator Limits and Constants
 * Centralized sizing knobs and byte-unit constants
 */

/// One kibibyte
pub const KIB: usize = 1024;

/// One mebibyte
pub const MIB: usize = 1024 * KIB;

/// Header word width in bytes
/// Every allocation header is exactly this wide and stores the
/// user-requested byte count
pub const WORD: usize = std::mem::size_of::<usize>();

/// Floor for a pool node's descriptor arena (1 KiB)
/// Keeps tiny pools from starving their own free-list metadata
pub const FL_ARENA_MIN: usize = KIB;

/// Ceiling for a pool node's descriptor arena (10 MiB)
/// Bounds metadata growth on very large pools
pub const FL_ARENA_MAX: usize = 10 * MIB;

/// Descriptor arena share of the pool buffer (1/100 of the payload bytes)
pub const FL_ARENA_DIVISOR: usize = 100;

/// Node cap for a pool node's descriptor arena
/// Descriptors leak across splits until reset; five nodes bound the leak
pub const FL_ARENA_NODES: usize = 5;
