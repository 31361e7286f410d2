use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

use super::{BackingStore, MemoryTracker, PageCache};
use crate::array::Array;
use crate::page::PageId;
use crate::utils::error::{PaginatedError, Result};
use crate::utils::expect_msg::ExpectMsg;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub swaps: u64,
    pub evictions: u64,
}

/// One resident page.
struct Slot {
    id: PageId,
    page: Array,
    /// Set on load and on every hit, cleared when the clock hand passes over it.
    referenced: AtomicBool,
}

#[derive(Default)]
struct Slots {
    slots: Vec<Slot>,
    index: HashMap<PageId, usize>,
    hand: usize,
}

/// Swap-backed cache. The resident set is bounded by a byte budget, and pages
/// that do not fit are written to the backing store using second-chance
/// (clock) eviction.
pub struct SwappedCache<S> {
    store: S,
    slots: RwLock<Slots>,
    memory: MemoryTracker,
    hits: AtomicU64,
    misses: AtomicU64,
    swaps: AtomicU64,
    evictions: AtomicU64,
}

impl<S: BackingStore> SwappedCache<S> {
    pub fn new(store: S, budget_bytes: u64) -> Self {
        Self {
            store,
            slots: RwLock::new(Slots::default()),
            memory: MemoryTracker::new(budget_bytes),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            swaps: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn memory(&self) -> &MemoryTracker {
        &self.memory
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            swaps: self.swaps.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn is_resident(&self, id: PageId) -> bool {
        self.slots
            .read()
            .expect_msg("Failed to acquire read lock on swapped cache")
            .index
            .contains_key(&id)
    }

    /// Make `id` resident under the slot lock and return its array.
    ///
    /// A freshly loaded page starts referenced, so the next clock sweep passes
    /// over it instead of evicting it before its first use.
    fn make_resident(&self, slots: &mut Slots, id: PageId, capacity: usize) -> Result<Array> {
        if let Some(&idx) = slots.index.get(&id) {
            let slot = &slots.slots[idx];
            slot.referenced.store(true, Ordering::Relaxed);
            return Ok(slot.page.clone());
        }

        let bytes = (capacity * std::mem::size_of::<f32>()) as u64;
        if bytes > self.memory.get_maximum() {
            return Err(PaginatedError::OutOfMemory(format!(
                "{} needs {} bytes but the resident budget is {} bytes",
                id,
                bytes,
                self.memory.get_maximum()
            )));
        }

        while !self.memory.try_allocate(bytes) {
            if !self.evict_one(slots)? {
                return Err(PaginatedError::OutOfMemory(format!(
                    "nothing left to evict for {} ({} bytes free of {})",
                    id,
                    self.memory.get_available(),
                    self.memory.get_maximum()
                )));
            }
        }

        let data = match self.store.load(id) {
            Ok(Some(data)) => data,
            Ok(None) => vec![0.0; capacity],
            Err(e) => {
                self.memory.deallocate(bytes);
                return Err(e);
            }
        };

        if data.len() != capacity {
            self.memory.deallocate(bytes);
            return Err(PaginatedError::CorruptPage {
                id,
                message: format!("stored {} elements, expected {}", data.len(), capacity),
            });
        }

        let page = Array::from_vec(data);
        let idx = slots.slots.len();
        slots.slots.push(Slot {
            id,
            page: page.clone(),
            referenced: AtomicBool::new(true),
        });
        slots.index.insert(id, idx);

        self.swaps.fetch_add(1, Ordering::Relaxed);
        debug!(page = %id, capacity, "swapped page in");
        Ok(page)
    }

    /// Write one unreferenced page back to the store and drop it.
    /// Returns false when nothing is resident.
    fn evict_one(&self, slots: &mut Slots) -> Result<bool> {
        if slots.slots.is_empty() {
            return Ok(false);
        }

        // at most two sweeps: the first clears every reference bit
        let victim_idx = loop {
            slots.hand %= slots.slots.len();
            if slots.slots[slots.hand]
                .referenced
                .swap(false, Ordering::Relaxed)
            {
                slots.hand += 1;
                continue;
            }
            break slots.hand;
        };

        // write back before unlinking so a failed store loses nothing
        {
            let victim = &slots.slots[victim_idx];
            self.store.store(victim.id, &victim.page.read_data())?;
        }

        let victim = slots.slots.swap_remove(victim_idx);
        slots.index.remove(&victim.id);
        if let Some(moved) = slots.slots.get(victim_idx) {
            slots.index.insert(moved.id, victim_idx);
        }

        self.memory.deallocate(victim.page.size_in_bytes());
        self.evictions.fetch_add(1, Ordering::Relaxed);
        debug!(page = %victim.id, "evicted page to backing store");
        Ok(true)
    }
}

impl<S: BackingStore> PageCache for SwappedCache<S> {
    fn get(&self, id: PageId) -> Option<Array> {
        let slots = self
            .slots
            .read()
            .expect_msg("Failed to acquire read lock on swapped cache");

        match slots.index.get(&id) {
            Some(&idx) => {
                let slot = &slots.slots[idx];
                slot.referenced.store(true, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(slot.page.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn swap(&self, id: PageId, capacity: usize) -> Result<()> {
        let mut slots = self
            .slots
            .write()
            .expect_msg("Failed to acquire write lock on swapped cache");
        self.make_resident(&mut slots, id, capacity).map(|_| ())
    }

    fn swap_and_get(&self, id: PageId, capacity: usize) -> Result<Option<Array>> {
        let mut slots = self
            .slots
            .write()
            .expect_msg("Failed to acquire write lock on swapped cache");
        self.make_resident(&mut slots, id, capacity).map(Some)
    }

    fn resident_pages(&self) -> usize {
        self.slots
            .read()
            .expect_msg("Failed to acquire read lock on swapped cache")
            .slots
            .len()
    }

    fn flush(&self) -> Result<()> {
        let slots = self
            .slots
            .read()
            .expect_msg("Failed to acquire read lock on swapped cache");

        for slot in &slots.slots {
            self.store.store(slot.id, &slot.page.read_data())?;
        }
        debug!(pages = slots.slots.len(), "flushed resident pages");
        Ok(())
    }
}
