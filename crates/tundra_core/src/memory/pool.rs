//! # ID Pool
//!
//! Fixed-size pool of small integer IDs that are handed out and returned
//! individually. Classic entity IDs are signed bytes and `-1` means "self",
//! so a viewer can track at most 127 other entities with IDs `0..=126`.

/// A pool of reusable `u8` IDs.
///
/// IDs are handed out lowest-first on a fresh pool. A released ID goes
/// back on top of the free list and is the next one handed out.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Each session owns its own pool.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = IdPool::new(127);
///
/// let id = pool.acquire()?;
/// pool.release(id);
/// ```
#[derive(Clone, Debug)]
pub struct IdPool {
    /// Which IDs are currently handed out.
    in_use: Box<[bool]>,
    /// Free list - IDs available for acquisition.
    free_list: Vec<u8>,
    /// Number of IDs handed out.
    allocated_count: usize,
}

impl IdPool {
    /// Largest capacity the pool supports.
    pub const MAX_CAPACITY: usize = 256;

    /// Creates a pool with IDs `0..capacity`.
    ///
    /// Capacities above [`Self::MAX_CAPACITY`] are clamped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(Self::MAX_CAPACITY);
        Self {
            in_use: vec![false; capacity].into_boxed_slice(),
            free_list: (0..capacity).rev().map(|id| id as u8).collect(),
            allocated_count: 0,
        }
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.in_use.len()
    }

    /// Returns the number of IDs currently handed out.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Returns the number of free IDs.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Takes an ID from the pool, `None` if all are in use.
    pub fn acquire(&mut self) -> Option<u8> {
        let id = self.free_list.pop()?;
        self.in_use[usize::from(id)] = true;
        self.allocated_count += 1;
        Some(id)
    }

    /// Returns an ID to the pool.
    ///
    /// Returns false if the ID was not handed out by this pool.
    pub fn release(&mut self, id: u8) -> bool {
        match self.in_use.get_mut(usize::from(id)) {
            Some(slot) if *slot => {
                *slot = false;
                self.free_list.push(id);
                self.allocated_count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Returns true if the ID is currently handed out.
    #[inline]
    #[must_use]
    pub fn is_allocated(&self, id: u8) -> bool {
        self.in_use.get(usize::from(id)).copied().unwrap_or(false)
    }

    /// Returns every ID to the pool.
    pub fn clear(&mut self) {
        self.in_use.iter_mut().for_each(|slot| *slot = false);
        self.free_list.clear();
        self.free_list.extend((0..self.in_use.len()).rev().map(|id| id as u8));
        self.allocated_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_acquire_release() {
        let mut pool = IdPool::new(10);

        let id = pool.acquire().unwrap();
        assert_eq!(id, 0);
        assert!(pool.is_allocated(id));
        assert_eq!(pool.allocated_count(), 1);

        assert!(pool.release(id));
        assert!(!pool.is_allocated(id));
        assert_eq!(pool.allocated_count(), 0);
        assert!(!pool.release(id));
    }

    #[test]
    fn test_pool_full() {
        let mut pool = IdPool::new(2);

        assert_eq!(pool.acquire(), Some(0));
        assert_eq!(pool.acquire(), Some(1));
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_pool_reuse() {
        let mut pool = IdPool::new(127);

        let first = pool.acquire().unwrap();
        let _second = pool.acquire().unwrap();
        pool.release(first);

        assert_eq!(pool.acquire(), Some(first)); // Same slot reused
    }

    #[test]
    fn test_pool_entity_range() {
        let mut pool = IdPool::new(127);
        let ids: Vec<u8> = std::iter::from_fn(|| pool.acquire()).collect();
        assert_eq!(ids.len(), 127);
        assert_eq!(ids.last(), Some(&126));

        pool.clear();
        assert_eq!(pool.free_count(), 127);
    }
}
