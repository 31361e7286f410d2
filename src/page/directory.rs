use std::sync::atomic::{AtomicU64, Ordering};

use super::{Page, PageId};

/// Page ids are unique per process so tensors can share a cache or a store.
static NEXT_PAGE_ID: AtomicU64 = AtomicU64::new(0);

/// Ordered page table of a tensor. Page order is write order.
///
/// Pages only ever fill lowest-first, so every page before `frontier` is
/// filled and the frontier never moves backwards.
#[derive(Clone, Debug)]
pub struct PageDirectory {
    pages: Vec<Page>,
    /// Id of the first page; the rest follow consecutively.
    base: u64,
    frontier: usize,
}

impl PageDirectory {
    /// Split `total_elements` into pages of `page_size` elements. The last page
    /// holds the remainder when the split is uneven.
    pub fn new(total_elements: usize, page_size: usize) -> Self {
        assert!(page_size > 0, "Page size must be positive");

        let count = total_elements.div_ceil(page_size);
        let base = NEXT_PAGE_ID.fetch_add(count as u64, Ordering::Relaxed);

        let pages = (0..count)
            .map(|idx| {
                let start = idx * page_size;
                let capacity = page_size.min(total_elements - start);
                Page::new(PageId(base + idx as u64), capacity)
            })
            .collect();

        Self {
            pages,
            base,
            frontier: 0,
        }
    }

    /// The lowest-ordered page that is not yet completely filled.
    pub fn first_unfilled_page(&mut self) -> Option<&mut Page> {
        while self.frontier < self.pages.len() && self.pages[self.frontier].is_filled() {
            self.frontier += 1;
        }
        self.pages.get_mut(self.frontier)
    }

    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.pages.get(self.index_of(id)?)
    }

    pub(crate) fn get_mut(&mut self, id: PageId) -> Option<&mut Page> {
        let idx = self.index_of(id)?;
        self.pages.get_mut(idx)
    }

    fn index_of(&self, id: PageId) -> Option<usize> {
        usize::try_from(id.0.checked_sub(self.base)?).ok()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Total element capacity across all pages.
    pub fn capacity(&self) -> usize {
        self.pages.iter().map(Page::capacity).sum()
    }

    /// Total elements written so far.
    pub fn written(&self) -> usize {
        self.pages.iter().map(Page::datasize).sum()
    }

    pub fn is_filled(&self) -> bool {
        self.pages.iter().all(Page::is_filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        let dir = PageDirectory::new(8, 4);
        assert_eq!(dir.len(), 2);
        assert!(dir.pages().iter().all(|p| p.capacity() == 4));
        assert_eq!(dir.capacity(), 8);
    }

    #[test]
    fn test_last_page_holds_remainder() {
        let dir = PageDirectory::new(10, 4);
        let capacities: Vec<usize> = dir.pages().iter().map(Page::capacity).collect();
        assert_eq!(capacities, vec![4, 4, 2]);
    }

    #[test]
    fn test_empty_directory_has_no_unfilled_page() {
        let mut dir = PageDirectory::new(0, 4);
        assert!(dir.is_empty());
        assert!(dir.first_unfilled_page().is_none());
    }

    #[test]
    fn test_frontier_resumes_at_partially_filled_page() {
        let mut dir = PageDirectory::new(12, 4);
        dir.first_unfilled_page().unwrap().advance(4);
        dir.first_unfilled_page().unwrap().advance(1);

        let second = dir.pages()[1].id();
        let page = dir.first_unfilled_page().unwrap();
        assert_eq!(page.id(), second);
        assert_eq!(page.datasize(), 1);
        assert_eq!(dir.written(), 5);
    }

    #[test]
    fn test_no_unfilled_page_once_filled() {
        let mut dir = PageDirectory::new(6, 4);
        dir.first_unfilled_page().unwrap().advance(4);
        dir.first_unfilled_page().unwrap().advance(2);
        assert!(dir.first_unfilled_page().is_none());
        assert!(dir.is_filled());
    }

    #[test]
    fn test_get_by_id() {
        let dir = PageDirectory::new(8, 4);
        let last = dir.pages()[1].id();
        assert_eq!(dir.get(last).unwrap().id(), last);
        assert!(dir.get(PageId(last.0 + 1)).is_none());
        assert!(dir.get(PageId(dir.pages()[0].id().0.wrapping_sub(1))).is_none());
    }

    #[test]
    fn test_ids_are_unique_across_directories() {
        let a = PageDirectory::new(8, 4);
        let b = PageDirectory::new(8, 4);

        for page in b.pages() {
            assert!(a.get(page.id()).is_none());
        }
        assert!(b.get(a.pages()[0].id()).is_none());
        assert_eq!(b.pages()[1].id().0, b.pages()[0].id().0 + 1);
    }
}
