use std::sync::atomic::{AtomicU64, Ordering};

/// Byte budget for resident pages.
pub struct MemoryTracker {
    maximum: u64,
    current: AtomicU64,
}

impl MemoryTracker {
    pub fn new(maximum: u64) -> Self {
        Self {
            maximum,
            current: AtomicU64::new(0),
        }
    }

    /// Reserve `size` bytes, or return false without reserving anything when
    /// the budget cannot hold them.
    pub fn try_allocate(&self, size: u64) -> bool {
        self.current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current
                    .checked_add(size)
                    .filter(|&new| new <= self.maximum)
            })
            .is_ok()
    }

    pub fn deallocate(&self, size: u64) {
        let prev = self.current.fetch_sub(size, Ordering::AcqRel);
        debug_assert!(prev >= size, "deallocated {} bytes with {} in use", size, prev);
    }

    pub fn get_current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    pub fn get_available(&self) -> u64 {
        self.maximum.saturating_sub(self.get_current())
    }

    pub fn get_maximum(&self) -> u64 {
        self.maximum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_within_budget() {
        let tracker = MemoryTracker::new(100);
        assert!(tracker.try_allocate(60));
        assert!(tracker.try_allocate(40));
        assert_eq!(tracker.get_available(), 0);
    }

    #[test]
    fn test_allocate_over_budget_reserves_nothing() {
        let tracker = MemoryTracker::new(100);
        assert!(tracker.try_allocate(60));
        assert!(!tracker.try_allocate(41));
        assert_eq!(tracker.get_current(), 60);
    }

    #[test]
    fn test_deallocate_frees_budget() {
        let tracker = MemoryTracker::new(16);
        assert!(tracker.try_allocate(16));
        tracker.deallocate(16);
        assert!(tracker.try_allocate(8));
        assert_eq!(tracker.get_maximum(), 16);
    }
}
