//! One page of query results and the paging formula shared by every paged query.

use serde::Serialize;

use crate::errors::{AppError, AppResult};

/// Read-only result of a paginated query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    current_page: u64,
    next_page: u64,
    total_pages: u64,
    page_size: u64,
    total_items: u64,
    items: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page from the materialized slice and the total count of the query.
    pub fn new(items: Vec<T>, page: u64, page_size: u64, total_items: u64) -> Self {
        let total_pages = total_pages(total_items, page_size);
        Self {
            current_page: page,
            next_page: total_pages.min(page.saturating_add(1)),
            total_pages,
            page_size,
            total_items,
            items,
        }
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    /// Page after this one, capped at `total_pages`
    pub fn next_page(&self) -> u64 {
        self.next_page
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Convert the items while keeping the paging metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            current_page: self.current_page,
            next_page: self.next_page,
            total_pages: self.total_pages,
            page_size: self.page_size,
            total_items: self.total_items,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// `ceil(total_items / page_size)`, 0 for an empty result.
pub fn total_pages(total_items: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

/// Validated `(offset, limit)` window for a 1-based page request.
pub fn page_window(page: u64, page_size: u64) -> AppResult<(u64, u64)> {
    if page == 0 {
        return Err(AppError::invalid_argument("page must be >= 1"));
    }
    if page_size == 0 {
        return Err(AppError::invalid_argument("page_size must be >= 1"));
    }
    Ok(((page - 1).saturating_mul(page_size), page_size))
}
