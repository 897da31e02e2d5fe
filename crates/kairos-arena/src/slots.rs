//! Sparse, generation-tracked slot vector.
//!
//! [`SlotPool`] owns values addressed by a dense `usize` index. Each slot
//! carries a generation counter that is bumped whenever its occupant is
//! taken out or replaced, so an `(index, generation)` pair taken earlier
//! can be checked for staleness in O(1).
//!
//! The pool also tracks a low-water mark, the smallest index that might
//! be free. Automatic allocation starts there.
//!
//! Explicit indices may land past the end of the pool, leaving holes, but
//! only up to [`max_growth`](SlotPool::max_growth) slots beyond the
//! current capacity. Anything further is refused with
//! [`SlotError::OutOfReach`] instead of allocating.

use crate::error::SlotError;

/// A single slot.
#[derive(Clone, Debug)]
struct Slot<T> {
    value: Option<T>,
    generation: u32,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            generation: 0,
        }
    }
}

/// Sparse vector of generation-tracked slots.
#[derive(Clone, Debug)]
pub struct SlotPool<T> {
    slots: Vec<Slot<T>>,
    next_free: usize,
    live: usize,
    max_growth: usize,
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotPool<T> {
    /// Default limit on how far past the end an explicit index may land.
    pub const DEFAULT_MAX_GROWTH: usize = 1 << 16;

    /// An empty pool.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_free: 0,
            live: 0,
            max_growth: Self::DEFAULT_MAX_GROWTH,
        }
    }

    /// Replace the growth limit.
    pub fn with_max_growth(mut self, max_growth: usize) -> Self {
        self.max_growth = max_growth;
        self
    }

    /// How many slots past the current capacity an insert may reach.
    pub fn max_growth(&self) -> usize {
        self.max_growth
    }

    /// Number of slots, occupied or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Low-water mark for automatic allocation.
    pub fn next_free(&self) -> usize {
        self.next_free
    }

    /// Whether `index` holds a value.
    pub fn is_occupied(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// The value at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(|slot| slot.value.as_ref())
    }

    /// Current generation of `index`. Slots never allocated report 0.
    pub fn generation(&self, index: usize) -> u32 {
        self.slots.get(index).map_or(0, |slot| slot.generation)
    }

    /// Whether an insert at `index` stays within the growth limit.
    pub fn check_reach(&self, index: usize) -> Result<(), SlotError> {
        let capacity = self.slots.len();
        if index.saturating_sub(capacity) >= self.max_growth {
            return Err(SlotError::OutOfReach {
                index,
                capacity,
                max_growth: self.max_growth,
            });
        }
        Ok(())
    }

    /// Place `value` at `index`, growing the pool as needed.
    ///
    /// Returns the previous occupant, whose generation is retired. An
    /// index beyond the growth limit leaves the pool untouched.
    pub fn insert_at(&mut self, index: usize, value: T) -> Result<Option<T>, SlotError> {
        self.check_reach(index)?;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, Slot::default);
        }
        let slot = &mut self.slots[index];
        let previous = slot.value.replace(value);
        if previous.is_some() {
            slot.generation = slot.generation.wrapping_add(1);
        } else {
            self.live += 1;
        }
        self.advance_next_free();
        Ok(previous)
    }

    /// Remove and return the value at `index`.
    ///
    /// Rewinds the low-water mark when `index` lies below it.
    pub fn take(&mut self, index: usize) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        if self.next_free > index {
            self.next_free = index;
        }
        Some(value)
    }

    /// Drop every value and reset the low-water mark.
    ///
    /// Generations survive so that handles taken before the clear stay
    /// stale.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.live = 0;
        self.next_free = 0;
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.value.as_ref().map(|v| (i, v)))
    }

    /// First occupied slot at or after `from`.
    pub fn next_occupied(&self, from: usize) -> Option<(usize, &T)> {
        self.slots
            .get(from..)?
            .iter()
            .enumerate()
            .find_map(|(i, slot)| slot.value.as_ref().map(|v| (from + i, v)))
    }

    fn advance_next_free(&mut self) {
        while self
            .slots
            .get(self.next_free)
            .is_some_and(|slot| slot.value.is_some())
        {
            self.next_free += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_fill_advances_low_water_mark() {
        let mut pool = SlotPool::new();
        for i in 0..4 {
            let at = pool.next_free();
            assert_eq!(at, i);
            assert_eq!(pool.insert_at(at, i * 10), Ok(None));
        }
        assert_eq!(pool.live(), 4);
        assert_eq!(pool.next_free(), 4);
    }

    #[test]
    fn take_rewinds_low_water_mark() {
        let mut pool = SlotPool::new();
        for i in 0..4 {
            pool.insert_at(i, i).unwrap();
        }
        assert_eq!(pool.take(1), Some(1));
        assert_eq!(pool.next_free(), 1);
        pool.insert_at(1, 11).unwrap();
        assert_eq!(pool.next_free(), 4);
    }

    #[test]
    fn sparse_insert_grows_pool() {
        let mut pool = SlotPool::new();
        pool.insert_at(5, 'x').unwrap();
        assert_eq!(pool.capacity(), 6);
        assert_eq!(pool.next_free(), 0);
        assert!(pool.is_occupied(5));
        assert!(!pool.is_occupied(2));
    }

    #[test]
    fn insert_far_past_the_end_is_refused() {
        let mut pool = SlotPool::new().with_max_growth(8);
        pool.insert_at(7, 'a').unwrap();
        assert_eq!(pool.capacity(), 8);
        assert_eq!(
            pool.insert_at(16, 'b'),
            Err(SlotError::OutOfReach {
                index: 16,
                capacity: 8,
                max_growth: 8,
            })
        );
        assert!(pool.insert_at(u32::MAX as usize, 'c').is_err());
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.live(), 1);
        pool.insert_at(15, 'd').unwrap();
        assert_eq!(pool.capacity(), 16);
    }

    #[test]
    fn generation_bumps_on_take_and_replace() {
        let mut pool = SlotPool::new();
        pool.insert_at(0, 'a').unwrap();
        assert_eq!(pool.generation(0), 0);
        assert_eq!(pool.insert_at(0, 'b'), Ok(Some('a')));
        assert_eq!(pool.generation(0), 1);
        pool.take(0);
        assert_eq!(pool.generation(0), 2);
        assert_eq!(pool.take(0), None);
        assert_eq!(pool.generation(0), 2);
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn clear_keeps_generations() {
        let mut pool = SlotPool::new();
        pool.insert_at(0, 1).unwrap();
        pool.insert_at(1, 2).unwrap();
        pool.clear();
        assert_eq!(pool.live(), 0);
        assert_eq!(pool.next_free(), 0);
        assert_eq!(pool.generation(0), 1);
        assert!(pool.iter().next().is_none());
    }

    #[test]
    fn next_occupied_skips_holes() {
        let mut pool = SlotPool::new();
        pool.insert_at(1, 'a').unwrap();
        pool.insert_at(4, 'b').unwrap();
        assert_eq!(pool.next_occupied(0), Some((1, &'a')));
        assert_eq!(pool.next_occupied(2), Some((4, &'b')));
        assert_eq!(pool.next_occupied(5), None);
        assert_eq!(pool.next_occupied(99), None);
    }
}
