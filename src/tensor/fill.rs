use tracing::{debug, trace};

use crate::array::Array;
use crate::tensor::tensor::Tensor;
use crate::utils::error::{PaginatedError, Result};
use crate::utils::expect_msg::ExpectMsg;

/// Outcome of one successful ingestion unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Elements copied into the tensor.
    pub written: usize,
    /// Pages that received at least one element.
    pub pages_touched: usize,
    /// Cache misses that had to be swapped in.
    pub swaps: usize,
}

impl Tensor {
    /// Write `data` into the unfilled region of the tensor, starting at the
    /// first page that is not yet filled and cascading into later pages.
    ///
    /// Elements that do not fit fail the call with [`PaginatedError::Filled`];
    /// everything before them stays written.
    pub fn add_data(&mut self, data: &Array) -> Result<FillReport> {
        let mut report = FillReport::default();
        let mut remaining = data.clone();

        while !remaining.is_empty() {
            let (id, offset, capacity) = match self.directory.first_unfilled_page() {
                Some(page) => (page.id(), page.datasize(), page.capacity()),
                None => {
                    return Err(PaginatedError::Filled {
                        unwritten: remaining.len(),
                    });
                }
            };

            let count = loop {
                let (resident, swapped) = self.resident_page(id)?;
                if swapped {
                    report.swaps += 1;
                }

                // a short page would leave the frontier stuck forever
                if resident.len() != capacity {
                    return Err(PaginatedError::CorruptPage {
                        id,
                        message: format!(
                            "resident page holds {} elements, expected {}",
                            resident.len(),
                            capacity
                        ),
                    });
                }

                let window = resident.slice(offset, resident.len())?;
                let count = window.len().min(remaining.len());
                window.slice(0, count)?.copy_from(&remaining.slice(0, count)?)?;

                // an eviction racing the copy wrote back the page without it
                if self.is_current(id, &resident) {
                    break count;
                }
                debug!(page = %id, "page evicted during write, rewriting");
            };

            self.directory
                .get_mut(id)
                .expect_msg("Frontier page missing from directory")
                .advance(count);
            trace!(page = %id, offset, count, "wrote page window");

            report.written += count;
            report.pages_touched += 1;
            remaining = remaining.slice(count, remaining.len())?;
        }

        Ok(report)
    }
}
