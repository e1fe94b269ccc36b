//! Fixed-capacity circular buffer
//!
//! `RingBuffer<T>` is the hand-off primitive between the feeding side and the
//! rendering side of the amplifier. It is used twice: once for PCM frames and
//! once for modulated bridge words.
//!
//! # Constraints
//!
//! - Capacity is fixed at construction; no allocation happens afterwards.
//! - Writes never overwrite unread data and never block. A full buffer simply
//!   accepts fewer items than offered.
//! - The buffer is **not** synchronized. Concurrent producer/consumer access
//!   must be wrapped in a `Mutex` by the owner.

/// A fixed-capacity ring buffer of `Copy` elements.
///
/// Equal read and write cursors are ambiguous (empty or full), so an explicit
/// `empty` flag tells the two apart.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Box<[T]>,
    /// First filled slot
    read: usize,
    /// First unfilled slot
    write: usize,
    empty: bool,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create an empty ring buffer holding up to `capacity` elements
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![T::default(); capacity].into_boxed_slice(),
            read: 0,
            write: 0,
            empty: true,
        }
    }

    /// Discard all buffered elements
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
        self.empty = true;
    }

    /// Maximum number of elements the buffer can hold
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// `true` when no more elements can be written.
    ///
    /// A zero-capacity buffer is both empty and full.
    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    /// Number of elements that can be written before the buffer is full
    pub fn free_slots(&self) -> usize {
        if self.empty {
            return self.capacity();
        }

        if self.read == self.write {
            return 0;
        }

        if self.read > self.write {
            self.read - self.write
        } else {
            self.capacity() - (self.write - self.read)
        }
    }

    /// Number of elements available to read
    pub fn filled_slots(&self) -> usize {
        self.capacity() - self.free_slots()
    }

    /// Write as many of `items` as fit.
    ///
    /// Returns the number of elements stored. The caller retries or drops the
    /// remainder.
    pub fn put(&mut self, items: &[T]) -> usize {
        let count = items.len().min(self.free_slots());
        if count == 0 {
            return 0;
        }

        let before_wrap = self.capacity() - self.write;
        if before_wrap >= count {
            self.slots[self.write..self.write + count].copy_from_slice(&items[..count]);
        } else {
            self.slots[self.write..].copy_from_slice(&items[..before_wrap]);
            self.slots[..count - before_wrap].copy_from_slice(&items[before_wrap..count]);
        }

        self.write = (self.write + count) % self.capacity();
        self.empty = false;

        count
    }

    /// Write a single element, returning `false` if the buffer is full
    pub fn put_one(&mut self, item: T) -> bool {
        if self.is_full() {
            return false;
        }

        self.slots[self.write] = item;
        self.write += 1;
        if self.write == self.capacity() {
            self.write = 0;
        }
        self.empty = false;

        true
    }

    /// Read up to `out.len()` elements into `out`.
    ///
    /// Returns the number of elements read (0 when empty).
    pub fn get(&mut self, out: &mut [T]) -> usize {
        let count = out.len().min(self.filled_slots());
        if count == 0 {
            return 0;
        }

        let before_wrap = self.capacity() - self.read;
        if before_wrap >= count {
            out[..count].copy_from_slice(&self.slots[self.read..self.read + count]);
        } else {
            out[..before_wrap].copy_from_slice(&self.slots[self.read..]);
            out[before_wrap..count].copy_from_slice(&self.slots[..count - before_wrap]);
        }

        self.read = (self.read + count) % self.capacity();
        if self.read == self.write {
            self.empty = true;
        }

        count
    }

    /// Read a single element
    pub fn get_one(&mut self) -> Option<T> {
        if self.empty {
            return None;
        }

        let item = self.slots[self.read];
        self.read += 1;
        if self.read == self.capacity() {
            self.read = 0;
        }
        if self.read == self.write {
            self.empty = true;
        }

        Some(item)
    }
}
