use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{FileStore, MemoryStore, PageCache, ResidentCache, SwappedCache};
use crate::tensor::{Tensor, TensorDesc};
use crate::utils::error::{PaginatedError, Result};

/// Resident budget used when the system memory cannot be queried.
const FALLBACK_BUDGET_BYTES: u64 = 256 * 1024 * 1024;

pub struct PaginatedConfig {
    /// Elements per page.
    pub page_size: usize,
    /// Byte budget for resident pages of a swap-backed cache. `None` takes a
    /// quarter of the available system memory.
    pub resident_budget_bytes: Option<u64>,
    /// Swap pages to files under this directory.
    pub backing_dir: Option<PathBuf>,
    /// Bound the resident set and swap to memory when no directory is set.
    pub swap: bool,
}

impl PaginatedConfig {
    pub fn build(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(PaginatedError::InvalidConfig {
                message: "Page size must be positive".to_string(),
            });
        }

        if self.is_swapped() {
            let page_bytes = self.page_bytes();
            let budget = self.resident_budget();
            if budget < page_bytes {
                return Err(PaginatedError::InvalidConfig {
                    message: format!(
                        "Resident budget of {} bytes cannot hold one page of {} bytes",
                        budget, page_bytes
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn is_swapped(&self) -> bool {
        self.swap || self.backing_dir.is_some()
    }

    pub fn page_bytes(&self) -> u64 {
        (self.page_size * std::mem::size_of::<f32>()) as u64
    }

    pub fn resident_budget(&self) -> u64 {
        self.resident_budget_bytes.unwrap_or_else(system_budget)
    }

    /// The page cache this configuration describes.
    pub fn open_cache(&self) -> Result<Arc<dyn PageCache>> {
        self.validate()?;

        let cache: Arc<dyn PageCache> = match (&self.backing_dir, self.swap) {
            (Some(dir), _) => {
                debug!(dir = %dir.display(), budget = self.resident_budget(), "opening file-backed page cache");
                Arc::new(SwappedCache::new(FileStore::open(dir)?, self.resident_budget()))
            }
            (None, true) => {
                debug!(budget = self.resident_budget(), "opening memory-backed page cache");
                Arc::new(SwappedCache::new(MemoryStore::new(), self.resident_budget()))
            }
            (None, false) => Arc::new(ResidentCache::new()),
        };
        Ok(cache)
    }

    pub fn create_tensor(&self, dims: Vec<usize>) -> Result<Tensor> {
        let desc = TensorDesc::new(dims)?;
        Tensor::new(desc, self.page_size, self.open_cache()?)
    }
}

impl Default for PaginatedConfig {
    fn default() -> Self {
        Self {
            page_size: 4096,
            resident_budget_bytes: None,
            backing_dir: None,
            swap: false,
        }
    }
}

fn system_budget() -> u64 {
    match sys_info::mem_info() {
        // reported in KiB
        Ok(info) => (info.avail * 1024 / 4).max(1),
        Err(e) => {
            debug!(error = %e, "system memory unavailable, using fallback budget");
            FALLBACK_BUDGET_BYTES
        }
    }
}
