//! # Ordered Ring
//!
//! A priority queue laid over a circular buffer.
//!
//! Entries live in an owned slot array and are addressed by logical position
//! (0 = head). The physical slot of a position is always
//! `(head + position) % capacity`, so no caller ever sees a raw slot index.

use std::convert::Infallible;
use std::fmt;

use thiserror::Error;

/// Queues at or below this length are searched linearly on push.
const LINEAR_SCAN_MAX: usize = 4;

/// Errors produced by [`OrderedRing`] operations.
///
/// `E` is the error type of a caller-supplied release hook. Operations that
/// take no hook use the default `Infallible`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingError<E = Infallible> {
    /// A ring must be created with at least one slot.
    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    /// The backing slot array could not be allocated.
    #[error("allocation of {requested} ring slots failed")]
    Allocation {
        /// Number of slots requested.
        requested: usize,
    },

    /// A logical position past the tail was addressed.
    #[error("position {position} out of range for queue of length {len}")]
    OutOfRange {
        /// The requested position.
        position: usize,
        /// The queue length at the time of the request.
        len: usize,
    },

    /// The release hook refused the entry; the entry was left in place.
    #[error("release hook rejected entry: {0}")]
    Release(E),
}

impl RingError {
    /// Converts a hook-less error into one carrying a hook error type.
    #[must_use]
    pub fn widen<E>(self) -> RingError<E> {
        match self {
            Self::ZeroCapacity => RingError::ZeroCapacity,
            Self::Allocation { requested } => RingError::Allocation { requested },
            Self::OutOfRange { position, len } => RingError::OutOfRange { position, len },
            Self::Release(never) => match never {},
        }
    }
}

#[derive(Clone, Debug)]
struct Entry<T> {
    value: T,
    priority: i32,
}

/// A circular-buffer priority queue with stable ordering.
///
/// Entries are kept sorted ascending by priority from head to tail. Entries
/// with equal priority keep their push order. Capacity only ever doubles.
///
/// # Example
///
/// ```rust,ignore
/// let mut ring = OrderedRing::with_capacity(8)?;
/// ring.push("late", 5)?;
/// ring.push("early", -1)?;
/// assert_eq!(ring.peek(), Some(&"early"));
/// ```
#[derive(Clone, Debug)]
pub struct OrderedRing<T> {
    /// Slot array; `None` outside the live range.
    slots: Box<[Option<Entry<T>>]>,
    /// Physical slot of logical position 0.
    head: usize,
    /// Number of live entries.
    len: usize,
}

impl<T> OrderedRing<T> {
    /// Creates an empty ring with `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::ZeroCapacity`] for a zero capacity and
    /// [`RingError::Allocation`] if the slot array cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::ZeroCapacity);
        }
        Ok(Self {
            slots: Self::alloc_slots(capacity)?,
            head: 0,
            len: 0,
        })
    }

    fn alloc_slots(capacity: usize) -> Result<Box<[Option<Entry<T>>]>, RingError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| RingError::Allocation {
                requested: capacity,
            })?;
        slots.resize_with(capacity, || None);
        Ok(slots.into_boxed_slice())
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the ring holds no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot(&self, position: usize) -> usize {
        (self.head + position) % self.slots.len()
    }

    fn entry(&self, position: usize) -> &Entry<T> {
        match &self.slots[self.slot(position)] {
            Some(entry) => entry,
            None => unreachable!("vacant slot inside the live range"),
        }
    }

    /// Inserts `value` keeping the queue sorted by `priority`.
    ///
    /// Equal priorities are placed after every existing entry with the same
    /// priority. A full ring doubles its capacity first.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::Allocation`] if growing the ring fails; the ring
    /// is left untouched in that case.
    pub fn push(&mut self, value: T, priority: i32) -> Result<(), RingError> {
        if self.len == self.capacity() {
            self.grow()?;
        }
        let position = self.insertion_point(priority);
        self.open_gap(position);
        let slot = self.slot(position);
        self.slots[slot] = Some(Entry { value, priority });
        self.len += 1;
        Ok(())
    }

    /// Doubles the slot array, linearising the live range to start at slot 0.
    fn grow(&mut self) -> Result<(), RingError> {
        let capacity = self.capacity();
        let doubled = capacity
            .checked_mul(2)
            .ok_or(RingError::Allocation {
                requested: usize::MAX,
            })?;
        let mut slots = Self::alloc_slots(doubled)?;
        for (position, target) in slots.iter_mut().enumerate().take(self.len) {
            let slot = self.slot(position);
            *target = self.slots[slot].take();
        }
        self.slots = slots;
        self.head = 0;
        Ok(())
    }

    /// Finds the logical position a new entry of `priority` belongs at.
    fn insertion_point(&self, priority: i32) -> usize {
        let len = self.len;
        if len <= LINEAR_SCAN_MAX {
            return (0..len)
                .find(|&position| self.entry(position).priority > priority)
                .unwrap_or(len);
        }

        // Boundaries first, so the search below always has a doublet to land in.
        if priority >= self.entry(len - 1).priority {
            return len;
        }
        if priority < self.entry(0).priority {
            return 0;
        }

        // Looking for k with prio(k - 1) <= priority < prio(k), k in [1, len - 1].
        let (mut low, mut high) = (1, len - 1);
        loop {
            let mid = low + (high - low) / 2;
            if priority >= self.entry(mid).priority {
                low = mid + 1;
            } else if priority < self.entry(mid - 1).priority {
                high = mid - 1;
            } else {
                return mid;
            }
        }
    }

    /// Makes logical `position` vacant by shifting the shorter side outward.
    ///
    /// Requires `len < capacity`.
    fn open_gap(&mut self, position: usize) {
        let capacity = self.capacity();
        if position < self.len - position {
            self.head = (self.head + capacity - 1) % capacity;
            for i in 0..position {
                let (to, from) = (self.slot(i), self.slot(i + 1));
                self.slots[to] = self.slots[from].take();
            }
        } else {
            for i in (position..self.len).rev() {
                let (to, from) = (self.slot(i + 1), self.slot(i));
                self.slots[to] = self.slots[from].take();
            }
        }
    }

    /// Returns the head value without removing it.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the head priority without removing it.
    #[inline]
    #[must_use]
    pub fn peek_priority(&self) -> Option<i32> {
        self.priority_at(0)
    }

    /// Returns the value at a logical position.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&T> {
        (position < self.len).then(|| &self.entry(position).value)
    }

    /// Returns the priority at a logical position.
    #[must_use]
    pub fn priority_at(&self, position: usize) -> Option<i32> {
        (position < self.len).then(|| self.entry(position).priority)
    }

    /// Returns the first logical position whose value matches `predicate`.
    pub fn position<F>(&self, mut predicate: F) -> Option<usize>
    where
        F: FnMut(&T) -> bool,
    {
        (0..self.len).find(|&position| predicate(&self.entry(position).value))
    }

    /// Iterates head to tail, yielding each value with its priority.
    pub fn iter(&self) -> impl Iterator<Item = (&T, i32)> + '_ {
        (0..self.len).map(move |position| {
            let entry = self.entry(position);
            (&entry.value, entry.priority)
        })
    }

    /// Removes and returns the head value.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.head].take().map(|entry| entry.value);
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        value
    }

    /// Runs `release` on the head value, then removes it.
    ///
    /// Returns `Ok(None)` on an empty ring.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::Release`] if the hook fails; the head stays.
    pub fn pop_with<E, F>(&mut self, release: F) -> Result<Option<T>, RingError<E>>
    where
        F: FnOnce(&T) -> Result<(), E>,
    {
        let Some(head) = self.peek() else {
            return Ok(None);
        };
        release(head).map_err(RingError::Release)?;
        Ok(self.pop())
    }

    /// Removes the entry at a logical position, closing the gap from the
    /// shorter side.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::OutOfRange`] if `position >= len`.
    pub fn remove_at(&mut self, position: usize) -> Result<T, RingError> {
        if position >= self.len {
            return Err(RingError::OutOfRange {
                position,
                len: self.len,
            });
        }
        let slot = self.slot(position);
        let removed = self.slots[slot].take();

        if position < self.len - 1 - position {
            for i in (0..position).rev() {
                let (to, from) = (self.slot(i + 1), self.slot(i));
                self.slots[to] = self.slots[from].take();
            }
            self.head = (self.head + 1) % self.capacity();
        } else {
            for i in position..self.len - 1 {
                let (to, from) = (self.slot(i), self.slot(i + 1));
                self.slots[to] = self.slots[from].take();
            }
        }
        self.len -= 1;

        match removed {
            Some(entry) => Ok(entry.value),
            None => unreachable!("vacant slot inside the live range"),
        }
    }

    /// Runs `release` on the entry at `position`, then removes it.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::OutOfRange`] for a bad position and
    /// [`RingError::Release`] if the hook fails (the entry stays).
    pub fn remove_at_with<E, F>(&mut self, position: usize, release: F) -> Result<T, RingError<E>>
    where
        F: FnOnce(&T) -> Result<(), E>,
    {
        let Some(value) = self.get(position) else {
            return Err(RingError::OutOfRange {
                position,
                len: self.len,
            });
        };
        release(value).map_err(RingError::Release)?;
        self.remove_at(position).map_err(RingError::widen)
    }

    /// Drops every entry. Capacity is kept.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }

    /// Releases entries head first through `release`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing entry, which stays at the head together
    /// with everything behind it.
    pub fn clear_with<E, F>(&mut self, mut release: F) -> Result<(), RingError<E>>
    where
        F: FnMut(&T) -> Result<(), E>,
    {
        while !self.is_empty() {
            self.pop_with(&mut release)?;
        }
        self.head = 0;
        Ok(())
    }

    /// Returns a [`Display`](fmt::Display) adaptor that renders the ring as
    /// a table.
    #[must_use]
    pub fn table(&self) -> RingTable<'_, T> {
        RingTable { ring: self }
    }
}

/// Tabular dump of an [`OrderedRing`], one row per entry, head first.
pub struct RingTable<'a, T> {
    ring: &'a OrderedRing<T>,
}

impl<T: fmt::Debug> fmt::Display for RingTable<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RULE: &str = "+-------+----------+-------+------------------+";
        writeln!(f, "{RULE}")?;
        writeln!(f, "| INDEX | PRIORITY | SLOT  | VALUE            |")?;
        writeln!(f, "|-------+----------+-------+------------------|")?;
        for (position, (value, priority)) in self.ring.iter().enumerate() {
            let value = format!("{value:?}");
            writeln!(
                f,
                "| {position:>5} | {priority:>8} | {:>5} | {value:<16} |",
                self.ring.slot(position)
            )?;
        }
        writeln!(f, "{RULE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents<T: Copy>(ring: &OrderedRing<T>) -> Vec<(T, i32)> {
        ring.iter().map(|(value, priority)| (*value, priority)).collect()
    }

    /// Small deterministic generator so the ordering tests cover many shapes.
    fn priorities(seed: u64, count: usize, spread: i32) -> Vec<i32> {
        let mut state = seed;
        (0..count)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                ((state >> 33) % spread as u64) as i32 - spread / 2
            })
            .collect()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            OrderedRing::<u32>::with_capacity(0).unwrap_err(),
            RingError::ZeroCapacity
        );
    }

    #[test]
    fn test_push_keeps_sorted_and_stable() {
        for seed in 0..20 {
            let prios = priorities(seed, 50, 7);
            let mut ring = OrderedRing::with_capacity(4).unwrap();
            for (order, &priority) in prios.iter().enumerate() {
                ring.push(order, priority).unwrap();
            }

            let items = contents(&ring);
            assert_eq!(items.len(), prios.len());
            for pair in items.windows(2) {
                let ((a_order, a_prio), (b_order, b_prio)) = (pair[0], pair[1]);
                assert!(a_prio <= b_prio, "seed {seed}: priorities out of order");
                if a_prio == b_prio {
                    assert!(a_order < b_order, "seed {seed}: tie order broken");
                }
            }
        }
    }

    #[test]
    fn test_small_queue_ties_go_last() {
        let mut ring = OrderedRing::with_capacity(8).unwrap();
        ring.push('a', 1).unwrap();
        ring.push('b', 0).unwrap();
        ring.push('c', 1).unwrap();
        ring.push('d', 0).unwrap();
        assert_eq!(
            contents(&ring),
            vec![('b', 0), ('d', 0), ('a', 1), ('c', 1)]
        );
    }

    #[test]
    fn test_binary_search_path_with_wraparound() {
        let mut ring = OrderedRing::with_capacity(16).unwrap();
        for i in 0..10 {
            ring.push(i, i * 10).unwrap();
        }
        // Pop a few so head sits mid-array, then refill past the physical end.
        for _ in 0..6 {
            ring.pop().unwrap();
        }
        for i in 10..20 {
            ring.push(i, i * 10).unwrap();
        }
        ring.push(100, 55).unwrap();
        ring.push(101, 60).unwrap();
        ring.push(102, 1000).unwrap();
        ring.push(103, -5).unwrap();

        let prios: Vec<i32> = contents(&ring).iter().map(|&(_, p)| p).collect();
        let mut sorted = prios.clone();
        sorted.sort_unstable();
        assert_eq!(prios, sorted);

        // The tie at 60 goes after the existing 60.
        let at_60: Vec<i32> = contents(&ring)
            .iter()
            .filter(|&&(_, p)| p == 60)
            .map(|&(v, _)| v)
            .collect();
        assert_eq!(at_60, vec![6, 101]);
        assert_eq!(ring.peek(), Some(&103));
    }

    #[test]
    fn test_push_pop_round_trip() {
        let prios = priorities(7, 200, 11);
        let mut ring = OrderedRing::with_capacity(3).unwrap();
        for (order, &priority) in prios.iter().enumerate() {
            ring.push(order, priority).unwrap();
        }

        let mut expected: Vec<(usize, i32)> = prios.iter().copied().enumerate().collect();
        expected.sort_by_key(|&(_, priority)| priority);

        let mut popped = Vec::new();
        while let Some(priority) = ring.peek_priority() {
            popped.push((ring.pop().unwrap(), priority));
        }
        assert_eq!(popped, expected);
        assert_eq!(ring.len(), 0);
        assert!(ring.is_empty());
        assert!(ring.pop().is_none());
    }

    #[test]
    fn test_growth_doubles_and_preserves_order() {
        let mut ring = OrderedRing::with_capacity(4).unwrap();
        // Wrap the live range around the physical end before growing.
        ring.push(0, 0).unwrap();
        ring.push(1, 1).unwrap();
        ring.pop().unwrap();
        ring.pop().unwrap();
        for i in 0..4 {
            ring.push(i, i32::try_from(i).unwrap()).unwrap();
        }
        assert_eq!(ring.capacity(), 4);
        let before = contents(&ring);

        ring.push(4, 4).unwrap();
        assert_eq!(ring.capacity(), 8);
        let after = contents(&ring);
        assert_eq!(&after[..4], &before[..]);
        assert_eq!(after[4], (4, 4));

        for i in 5..9 {
            ring.push(i, 4).unwrap();
        }
        assert_eq!(ring.capacity(), 16);
        assert_eq!(ring.len(), 9);
    }

    #[test]
    fn test_front_push_is_cheap_side() {
        let mut ring = OrderedRing::with_capacity(8).unwrap();
        for i in 0..6 {
            ring.push(i, 10).unwrap();
        }
        ring.push(99, -1).unwrap();
        assert_eq!(ring.peek(), Some(&99));
        assert_eq!(ring.len(), 7);
        assert_eq!(
            contents(&ring).iter().map(|&(v, _)| v).collect::<Vec<_>>(),
            vec![99, 0, 1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_remove_at_every_position() {
        for target in 0..9 {
            let mut ring = OrderedRing::with_capacity(8).unwrap();
            // Offset head so both shift directions cross the wrap point.
            for _ in 0..5 {
                ring.push(usize::MAX, -100).unwrap();
                ring.pop().unwrap();
            }
            for i in 0..9 {
                ring.push(i, i32::try_from(i).unwrap()).unwrap();
            }

            let removed = ring.remove_at(target).unwrap();
            assert_eq!(removed, target);
            assert_eq!(ring.len(), 8);

            let remaining: Vec<usize> = contents(&ring).iter().map(|&(v, _)| v).collect();
            let expected: Vec<usize> = (0..9).filter(|&i| i != target).collect();
            assert_eq!(remaining, expected);
        }
    }

    #[test]
    fn test_remove_at_out_of_range() {
        let mut ring = OrderedRing::with_capacity(2).unwrap();
        ring.push(1u8, 0).unwrap();
        assert_eq!(
            ring.remove_at(1).unwrap_err(),
            RingError::OutOfRange { position: 1, len: 1 }
        );
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_release_failure_aborts() {
        let mut ring = OrderedRing::with_capacity(4).unwrap();
        ring.push("a", 0).unwrap();
        ring.push("b", 1).unwrap();

        let err = ring.pop_with(|_| Err("busy")).unwrap_err();
        assert_eq!(err, RingError::Release("busy"));
        assert_eq!(ring.len(), 2);

        let err = ring.remove_at_with(1, |_| Err("locked")).unwrap_err();
        assert_eq!(err, RingError::Release("locked"));
        assert_eq!(ring.get(1), Some(&"b"));

        let mut seen = Vec::new();
        let popped = ring
            .pop_with(|v| {
                seen.push(*v);
                Ok::<(), &str>(())
            })
            .unwrap();
        assert_eq!(popped, Some("a"));
        assert_eq!(seen, vec!["a"]);
    }

    #[test]
    fn test_clear_with_stops_at_failure() {
        let mut ring = OrderedRing::with_capacity(4).unwrap();
        for i in 0..4 {
            ring.push(i, i).unwrap();
        }
        let err = ring
            .clear_with(|&v| if v == 2 { Err(v) } else { Ok(()) })
            .unwrap_err();
        assert_eq!(err, RingError::Release(2));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.peek(), Some(&2));

        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 4);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut ring = OrderedRing::with_capacity(4).unwrap();
        ring.push(1, 1).unwrap();
        let mut copy = ring.clone();
        copy.push(0, 0).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(copy.peek(), Some(&0));
    }

    #[test]
    fn test_table_dump() {
        let mut ring = OrderedRing::with_capacity(4).unwrap();
        ring.push("wall", 1).unwrap();
        ring.push("enemy", -2).unwrap();
        let dump = ring.table().to_string();
        let rows: Vec<&str> = dump.lines().collect();
        assert_eq!(rows.len(), 6);
        assert!(rows[3].contains("\"enemy\""));
        assert!(rows[3].contains("-2"));
        assert!(rows[4].contains("\"wall\""));
    }
}
