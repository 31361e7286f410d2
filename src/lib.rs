//! Paginated - incremental, out-of-core ingestion into paged tensors
//!
//! A tensor's flattened storage is split into fixed-size pages that live in a
//! page cache and are swapped in from a backing store on demand. Data is
//! streamed in through a single-writer actor that fills pages in order.

mod array;

mod cache;

mod config;

mod page;

mod stream;

mod tensor;

mod utils;

pub use array::{Array, ArrayReadGuard};
pub use cache::{
    BackingStore, CacheStats, FileStore, MemoryStore, MemoryTracker, PageCache, ResidentCache,
    SwappedCache,
};
pub use config::PaginatedConfig;
pub use page::{Page, PageDirectory, PageId};
pub use stream::{Receipt, Stream, StreamOpenError, StreamSender, StreamState};
pub use tensor::{FillReport, Tensor, TensorDesc};
pub use utils::error::{PaginatedError, Result};
