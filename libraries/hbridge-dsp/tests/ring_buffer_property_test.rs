//! Property-based tests for the ring buffer
//!
//! Runs random operation sequences against a `VecDeque` model and checks the
//! occupancy invariants after every step.

use hbridge_dsp::RingBuffer;
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Put(Vec<u32>),
    PutOne(u32),
    Get(usize),
    GetOne,
    Clear,
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => prop::collection::vec(any::<u32>(), 0..24).prop_map(Op::Put),
        4 => any::<u32>().prop_map(Op::PutOne),
        4 => (0usize..24).prop_map(Op::Get),
        4 => Just(Op::GetOne),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    /// Property: the buffer behaves like a bounded FIFO and never loses track
    /// of its occupancy
    #[test]
    fn behaves_like_bounded_fifo(
        capacity in 0usize..20,
        ops in prop::collection::vec(arbitrary_op(), 1..200)
    ) {
        let mut ring = RingBuffer::new(capacity);
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Op::Put(items) => {
                    let free = ring.free_slots();
                    let accepted = ring.put(&items);
                    prop_assert_eq!(accepted, items.len().min(free));
                    model.extend(items.iter().take(accepted).copied());
                }
                Op::PutOne(item) => {
                    let was_full = ring.is_full();
                    let accepted = ring.put_one(item);
                    prop_assert_eq!(accepted, !was_full);
                    if accepted {
                        model.push_back(item);
                    }
                }
                Op::Get(max) => {
                    let mut out = vec![0u32; max];
                    let read = ring.get(&mut out);
                    prop_assert_eq!(read, max.min(model.len()));
                    let expected: Vec<u32> = model.drain(..read).collect();
                    prop_assert_eq!(&out[..read], expected.as_slice());
                }
                Op::GetOne => {
                    prop_assert_eq!(ring.get_one(), model.pop_front());
                }
                Op::Clear => {
                    ring.clear();
                    model.clear();
                    prop_assert_eq!(ring.get_one(), None);
                }
            }

            prop_assert_eq!(ring.filled_slots() + ring.free_slots(), capacity);
            prop_assert_eq!(ring.filled_slots(), model.len());
            prop_assert_eq!(ring.is_empty(), model.is_empty());
            prop_assert_eq!(ring.is_full(), model.len() == capacity);
            if capacity > 0 {
                prop_assert!(!(ring.is_empty() && ring.is_full()));
            }
        }
    }

    /// Property: a buffer of capacity N takes exactly N single puts and
    /// yields exactly N single gets
    #[test]
    fn exact_capacity(capacity in 1usize..64, offset in 0usize..64) {
        let mut ring = RingBuffer::new(capacity);

        // move the cursors away from zero first
        for i in 0..offset % capacity {
            ring.put_one(i);
            ring.get_one();
        }

        for i in 0..capacity {
            prop_assert!(ring.put_one(i));
        }
        prop_assert!(ring.is_full());
        prop_assert!(!ring.put_one(usize::MAX));

        for i in 0..capacity {
            prop_assert_eq!(ring.get_one(), Some(i));
        }
        prop_assert!(ring.is_empty());
        prop_assert_eq!(ring.get_one(), None);
    }
}
