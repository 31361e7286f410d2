use std::fmt;
use std::sync::Arc;

use crate::array::Array;
use crate::cache::PageCache;
use crate::page::{Page, PageDirectory, PageId};
use crate::tensor::desc::TensorDesc;
use crate::utils::error::{PaginatedError, Result};

/// A tensor whose flattened storage is split into pages that live in a
/// [`PageCache`] and are only resident on demand.
pub struct Tensor {
    pub(crate) desc: TensorDesc,
    pub(crate) directory: PageDirectory,
    pub(crate) cache: Arc<dyn PageCache>,
}

impl Tensor {
    pub fn new(desc: TensorDesc, page_size: usize, cache: Arc<dyn PageCache>) -> Result<Self> {
        if page_size == 0 {
            return Err(PaginatedError::InvalidConfig {
                message: "Page size must be positive".to_string(),
            });
        }

        let directory = PageDirectory::new(desc.num_elements(), page_size);
        Ok(Self {
            desc,
            directory,
            cache,
        })
    }

    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.desc.ndim()
    }

    pub fn pages(&self) -> &[Page] {
        self.directory.pages()
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.directory.get(id)
    }

    pub fn cache(&self) -> &Arc<dyn PageCache> {
        &self.cache
    }

    pub fn capacity(&self) -> usize {
        self.directory.capacity()
    }

    pub fn written(&self) -> usize {
        self.directory.written()
    }

    pub fn is_filled(&self) -> bool {
        self.directory.is_filled()
    }

    /// Load a page of this tensor into the cache.
    pub fn swap(&self, id: PageId) -> Result<()> {
        self.cache.swap(id, self.page_capacity(id)?)
    }

    fn page_capacity(&self, id: PageId) -> Result<usize> {
        self.directory
            .get(id)
            .map(Page::capacity)
            .ok_or(PaginatedError::UnknownPage(id))
    }

    /// Resident array of a page, swapping it in on a miss. The flag reports
    /// whether a swap happened.
    pub(crate) fn resident_page(&self, id: PageId) -> Result<(Array, bool)> {
        if let Some(page) = self.cache.get(id) {
            return Ok((page, false));
        }

        let page = self
            .cache
            .swap_and_get(id, self.page_capacity(id)?)?
            .ok_or(PaginatedError::Cache(id))?;
        Ok((page, true))
    }

    /// Whether `page` is still the cached array for `id`.
    pub(crate) fn is_current(&self, id: PageId, page: &Array) -> bool {
        self.cache
            .get(id)
            .is_some_and(|current| current.shares_storage(page))
    }

    /// Full contents of a page, written or not.
    pub fn read_page(&self, id: PageId) -> Result<Vec<f32>> {
        let (page, _) = self.resident_page(id)?;
        Ok(page.to_vec())
    }

    /// Every written element, in page order.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(self.written());
        for page in self.pages().iter().filter(|page| page.datasize() > 0) {
            let (resident, _) = self.resident_page(page.id())?;
            let data = resident.read_data();
            let written = data
                .get(..page.datasize())
                .ok_or_else(|| PaginatedError::CorruptPage {
                    id: page.id(),
                    message: format!(
                        "resident page holds {} elements but {} were written",
                        data.len(),
                        page.datasize()
                    ),
                })?;
            out.extend_from_slice(written);
        }
        Ok(out)
    }

    pub fn flush(&self) -> Result<()> {
        self.cache.flush()
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("dims", &self.desc.dims())
            .field("pages", &self.directory.len())
            .field("written", &self.written())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResidentCache;

    fn tensor() -> Tensor {
        let desc = TensorDesc::new(vec![2, 4]).unwrap();
        Tensor::new(desc, 4, Arc::new(ResidentCache::new())).unwrap()
    }

    #[test]
    fn test_swap_unknown_page() {
        let t = tensor();
        let other = tensor();
        let foreign = other.pages()[0].id();

        assert!(matches!(
            t.swap(PageId(u64::MAX)),
            Err(PaginatedError::UnknownPage(PageId(u64::MAX)))
        ));
        assert!(matches!(
            t.swap(foreign),
            Err(PaginatedError::UnknownPage(id)) if id == foreign
        ));
        assert!(matches!(
            t.read_page(foreign),
            Err(PaginatedError::UnknownPage(_))
        ));
        assert_eq!(t.cache().resident_pages(), 0);
    }

    #[test]
    fn test_swap_own_page() {
        let t = tensor();
        let id = t.pages()[1].id();
        t.swap(id).unwrap();
        assert_eq!(t.read_page(id).unwrap(), vec![0.0; 4]);
    }
}
