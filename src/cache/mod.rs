mod memory_tracker;
mod resident;
mod store;
mod swapped;

pub use memory_tracker::MemoryTracker;
pub use resident::ResidentCache;
pub use store::{BackingStore, FileStore, MemoryStore};
pub use swapped::{CacheStats, SwappedCache};

use crate::array::Array;
use crate::page::PageId;
use crate::utils::error::Result;

/// Maps page ids to their resident arrays.
///
/// Implementations serialize their own bookkeeping and are shared across
/// threads, and possibly across tensors.
pub trait PageCache: Send + Sync {
    /// Non-blocking lookup. The returned array aliases the cached page.
    fn get(&self, id: PageId) -> Option<Array>;

    /// Load a page of `capacity` elements into residency, evicting if needed.
    /// After `Ok(())` a `get` for the same id succeeds unless another user of
    /// the cache evicts the page first.
    fn swap(&self, id: PageId, capacity: usize) -> Result<()>;

    /// Swap a page in and return its resident array. `None` means the page
    /// was still absent after the swap.
    ///
    /// Caches that evict should override this so the page cannot be evicted
    /// between loading it and handing it out.
    fn swap_and_get(&self, id: PageId, capacity: usize) -> Result<Option<Array>> {
        self.swap(id, capacity)?;
        Ok(self.get(id))
    }

    fn resident_pages(&self) -> usize;

    /// Write every resident page back to the backing store, if there is one.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
