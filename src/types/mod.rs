//! Shared types for DRY compliance.

mod page;
mod pagination;

pub use page::{page_window, total_pages, Page};
pub use pagination::PaginationParams;
