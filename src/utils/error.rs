use thiserror::Error;

use crate::page::PageId;

#[derive(Error, Debug)]
pub enum PaginatedError {
    #[error("Mutable mask has {got} entries but tensor has {expected} dimensions")]
    Size { expected: usize, got: usize },

    #[error("Tensor is filled, {unwritten} elements could not be written")]
    Filled { unwritten: usize },

    #[error("{0} missing from cache after a successful swap")]
    Cache(PageId),

    #[error("Slice {start}..{end} out of bounds for array of length {len}")]
    Bounds { start: usize, end: usize, len: usize },

    #[error("Copy length mismatch: destination has {dst} elements, source has {src}")]
    LengthMismatch { dst: usize, src: usize },

    #[error("Stream closed")]
    StreamClosed,

    #[error("Stream actor panicked")]
    ActorPanicked,

    #[error("{0} is not part of this tensor")]
    UnknownPage(PageId),

    #[error("{id} is corrupt: {message}")]
    CorruptPage { id: PageId, message: String },

    #[error("Out of memory error: {0}")]
    OutOfMemory(String),

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PaginatedError>;
