use std::collections::HashMap;
use std::sync::RwLock;

use tracing::trace;

use super::PageCache;
use crate::array::Array;
use crate::page::PageId;
use crate::utils::error::Result;
use crate::utils::expect_msg::ExpectMsg;

/// In-memory only cache: pages are allocated on first touch and never evicted.
#[derive(Default)]
pub struct ResidentCache {
    pages: RwLock<HashMap<PageId, Array>>,
}

impl ResidentCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageCache for ResidentCache {
    fn get(&self, id: PageId) -> Option<Array> {
        self.pages
            .read()
            .expect_msg("Failed to acquire read lock on resident cache")
            .get(&id)
            .cloned()
    }

    fn swap(&self, id: PageId, capacity: usize) -> Result<()> {
        let mut pages = self
            .pages
            .write()
            .expect_msg("Failed to acquire write lock on resident cache");

        pages.entry(id).or_insert_with(|| {
            trace!(page = %id, capacity, "allocating resident page");
            Array::zeros(capacity)
        });
        Ok(())
    }

    fn resident_pages(&self) -> usize {
        self.pages
            .read()
            .expect_msg("Failed to acquire read lock on resident cache")
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_swap_allocates_zeroed_page() {
        let cache = ResidentCache::new();
        assert!(cache.get(PageId(0)).is_none());

        cache.swap(PageId(0), 3).unwrap();
        assert_eq!(cache.get(PageId(0)).unwrap().to_vec(), vec![0.0; 3]);
        assert_eq!(cache.resident_pages(), 1);
    }

    #[test]
    fn test_swap_of_resident_page_keeps_contents() {
        let cache = ResidentCache::new();
        cache.swap(PageId(0), 2).unwrap();
        cache
            .get(PageId(0))
            .unwrap()
            .copy_from(&Array::from_vec(vec![1.0, 2.0]))
            .unwrap();

        cache.swap(PageId(0), 2).unwrap();
        assert_eq!(cache.get(PageId(0)).unwrap().to_vec(), vec![1.0, 2.0]);
    }
}
