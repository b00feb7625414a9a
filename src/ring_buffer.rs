//! # Sample History
//!
//! A fixed-capacity circular buffer for widgets that graph a sampled
//! series. Pushing past capacity overwrites the oldest sample.
//!
//! ## Invariants
//! - `1 <= cap()` and `0 <= len() <= cap()`
//! - logical index 0 is the oldest sample, `len() - 1` the newest
//! - reading outside `[0, len())` yields `T::default()` and never panics
//! - no allocation after construction; `clear()` keeps the storage

/// Circular buffer of `Copy` samples.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    data: Box<[T]>,
    head: usize,
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Creates an empty buffer. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity.max(1)].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn cap(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.cap()
    }

    pub fn push(&mut self, value: T) {
        let cap = self.cap();
        self.data[self.head] = value;
        self.head = (self.head + 1) % cap;
        if self.len < cap {
            self.len += 1;
        }
    }

    /// Sample at logical index `i` (0 = oldest), or `T::default()`.
    pub fn get(&self, i: usize) -> T {
        if i >= self.len {
            return T::default();
        }
        let cap = self.cap();
        self.data[(self.head + cap - self.len + i) % cap]
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<T> {
        (!self.is_empty()).then(|| self.get(self.len - 1))
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Snapshot in insertion order.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl<T: Copy + Default + PartialOrd> RingBuffer<T> {
    /// Largest sample currently held.
    pub fn max(&self) -> Option<T> {
        self.iter()
            .fold(None, |acc, v| match acc {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
    }
}
