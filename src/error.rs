use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the paged file format and the tree built on top of it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corruption detected: {0}")]
    Corruption(String),

    #[error("short page: expected {expected} bytes, got {actual}")]
    ShortPage { expected: usize, actual: usize },

    #[error("short field while decoding {field}: need {needed} more bytes")]
    ShortField { field: &'static str, needed: usize },

    #[error("page overflow: payload needs {needed} bytes but page size is {page_size}")]
    PageTooSmall { needed: usize, page_size: usize },

    #[error("cannot free reserved page {0}")]
    ReservedPage(u32),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("database file not found: {0}")]
    NotFound(String),

    #[error("pager is closed")]
    ClosedPager,

    #[error("both meta pages are invalid or missing; file is unrecoverable")]
    CorruptMeta,

    #[error("unexpected page type byte {0} at page {1}")]
    UnexpectedPageType(u8, u32),
}
