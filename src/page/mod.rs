mod directory;
pub use directory::PageDirectory;

use std::fmt;

/// Stable page identifier, used both as cache key and backing-store key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.0)
    }
}

/// One fixed-capacity segment of a tensor's flattened storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    id: PageId,
    capacity: usize,
    datasize: usize,
}

impl Page {
    pub fn new(id: PageId, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            datasize: 0,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of elements already written into this page.
    pub fn datasize(&self) -> usize {
        self.datasize
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.datasize
    }

    pub fn is_filled(&self) -> bool {
        self.datasize == self.capacity
    }

    // Only called once the elements are copied into the resident page
    pub(crate) fn advance(&mut self, written: usize) {
        assert!(
            written <= self.remaining(),
            "{} overflow: advancing by {} with {} of {} elements written",
            self.id,
            written,
            self.datasize,
            self.capacity
        );
        self.datasize += written;
    }
}
