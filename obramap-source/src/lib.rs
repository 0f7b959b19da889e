pub mod client;
pub mod error;
pub mod result;

pub use client::{ConstructionSource, DEFAULT_ORDER, DEFAULT_PAGE_SIZE, DEFAULT_VIEW, ProgressCallback};
pub use error::SourceError;
pub use result::FetchResult;
