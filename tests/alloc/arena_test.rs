/*!
 * Arena Tests
 * Bump allocation, node chaining, realloc, and reset
 */

use chainalloc::limits::WORD;
use chainalloc::{AllocError, Allocator, Arena};
use pretty_assertions::assert_eq;

#[test]
fn create_rounds_the_node_size_up() {
    let arena = Arena::new(1000, 3).unwrap();
    assert_eq!(arena.size(), 1024);
    assert_eq!(arena.nodes(), 1);
    assert_eq!(arena.max_nodes(), 3);
}

#[test]
fn create_rejects_zero_size() {
    assert_eq!(Arena::new(0, 1).unwrap_err(), AllocError::ZeroSize);
}

#[test]
fn alloc_rejects_zero_bytes() {
    let mut arena = Arena::new(64, 1).unwrap();
    assert_eq!(arena.alloc(0).unwrap_err(), AllocError::ZeroSize);
}

#[test]
fn chains_a_second_node_and_then_hits_the_cap() {
    let mut arena = Arena::new(64, 2).unwrap();

    // header + 40 = 48 bytes fits the 64-byte node
    arena.alloc(40).unwrap();
    assert_eq!(arena.nodes(), 1);

    // another 48 bytes exceed the first node; a second one is chained
    arena.alloc(40).unwrap();
    assert_eq!(arena.nodes(), 2);

    assert_eq!(
        arena.alloc(40).unwrap_err(),
        AllocError::CapacityExceeded {
            nodes: 2,
            max_nodes: 2,
        }
    );
}

#[test]
fn size_used_counts_headers_and_payloads() {
    let mut arena = Arena::new(256, 1).unwrap();
    arena.alloc(10).unwrap();
    arena.alloc(20).unwrap();
    assert_eq!(arena.size_used(), 2 * WORD + 30);
}

#[test]
fn realloc_copies_old_bytes_and_finds_a_zeroed_tail() {
    let mut arena = Arena::new(256, 1).unwrap();
    let p = arena.alloc(16).unwrap();
    unsafe {
        for i in 0..16 {
            p.as_ptr().add(i).write(i as u8 + 1);
        }
        let q = arena.realloc(p, 40).unwrap();
        let copied = std::slice::from_raw_parts(q.as_ptr(), 40);
        assert_eq!(&copied[..16], &(1..=16).collect::<Vec<u8>>()[..]);
        assert_eq!(&copied[16..], &[0u8; 24]);
    }
}

#[test]
fn realloc_shrink_copies_the_smaller_length() {
    let mut arena = Arena::new(256, 1).unwrap();
    let p = arena.alloc_bytes(b"abcdefgh").unwrap();
    unsafe {
        let q = arena.realloc(p, 4).unwrap();
        assert_eq!(std::slice::from_raw_parts(q.as_ptr(), 4), b"abcd");
    }
}

#[test]
fn realloc_rejects_pointers_from_chained_nodes() {
    let mut arena = Arena::new(64, 2).unwrap();
    arena.alloc(40).unwrap();
    let p2 = arena.alloc(40).unwrap();
    assert_eq!(arena.nodes(), 2);

    // only the head node's range is honored for realloc validation
    let err = unsafe { arena.realloc(p2, 8) };
    assert_eq!(err, Err(AllocError::ForeignPointer(p2.as_ptr() as usize)));
}

#[test]
fn reset_replays_the_same_pointer_sequence() {
    let mut arena = Arena::new(256, 1).unwrap();
    let sizes = [10usize, 20, 30];
    let first: Vec<usize> = sizes
        .iter()
        .map(|&n| arena.alloc(n).unwrap().as_ptr() as usize)
        .collect();

    arena.reset().unwrap();
    assert_eq!(arena.size_used(), 0);

    let second: Vec<usize> = sizes
        .iter()
        .map(|&n| arena.alloc(n).unwrap().as_ptr() as usize)
        .collect();
    assert_eq!(first, second);
}

#[test]
fn reset_zeroes_the_head_buffer() {
    let mut arena = Arena::new(64, 1).unwrap();
    let p = arena.alloc_bytes(&[0xFFu8; 16]).unwrap();
    arena.reset().unwrap();
    let q = arena.alloc(16).unwrap();
    assert_eq!(p, q);
    let bytes = unsafe { std::slice::from_raw_parts(q.as_ptr(), 16) };
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn oversized_requests_are_rejected_up_front() {
    let mut arena = Arena::new(64, 4).unwrap();
    assert_eq!(
        arena.alloc(64).unwrap_err(),
        AllocError::RequestTooLarge {
            requested: 64,
            node_capacity: 64,
        }
    );
    assert_eq!(arena.nodes(), 1);
}

#[test]
fn alloc_array_multiplies_and_checks_overflow() {
    let mut arena = Arena::new(256, 1).unwrap();
    let p = arena.alloc_array(8, 4).unwrap();
    let q = arena.alloc(1).unwrap();
    assert_eq!(q.as_ptr() as usize - p.as_ptr() as usize, WORD + 32);

    assert_eq!(
        arena.alloc_array(usize::MAX, 2).unwrap_err(),
        AllocError::RequestTooLarge {
            requested: usize::MAX,
            node_capacity: 256,
        }
    );
}

#[test]
fn alloc_bytes_copies_the_content() {
    let mut arena = Arena::new(128, 1).unwrap();
    let p = arena.alloc_bytes(b"chain").unwrap();
    unsafe {
        assert_eq!(std::slice::from_raw_parts(p.as_ptr(), 5), b"chain");
    }
}

#[test]
fn stats_snapshot_serializes() {
    let mut arena = Arena::new(100, 3).unwrap();
    arena.alloc(10).unwrap();
    let stats = arena.stats();
    assert_eq!(stats.node_size, 128);
    assert_eq!(stats.used, WORD + 10);
    assert_eq!(stats.nodes, 1);

    let json = serde_json::to_string(&stats).unwrap();
    assert!(json.contains("\"node_size\":128"));
}

#[test]
fn arena_serves_the_allocator_interface() {
    let mut arena = Arena::new(128, 1).unwrap();
    let alloc: &mut dyn Allocator = &mut arena;
    alloc.alloc(8).unwrap();
    assert_eq!(alloc.size_used(), WORD + 8);
    alloc.reset().unwrap();
    assert_eq!(alloc.size_used(), 0);
}
