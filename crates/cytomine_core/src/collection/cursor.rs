//! Pagination cursor.

use crate::error::{ClientError, ClientResult};

/// Pagination state of a collection.
///
/// A page size of 0 means "no limit": the whole collection is one page
/// retrieved in a single round trip. Totals are only known after a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    page: u64,
    page_size: u32,
    total_items: Option<u64>,
    total_pages: Option<u64>,
}

impl Cursor {
    /// Creates a cursor on page 0.
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Current page index.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Items per page (0 = unpaginated).
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total item count reported by the last fetch.
    pub fn total_items(&self) -> Option<u64> {
        self.total_items
    }

    /// Total page count reported by the last fetch.
    pub fn total_pages(&self) -> Option<u64> {
        self.total_pages
    }

    /// Returns true unless the page size is the unpaginated sentinel.
    pub fn is_paginated(&self) -> bool {
        self.page_size > 0
    }

    /// Offset of the first item of `page`.
    ///
    /// Fails with `OutOfBounds` if the offset does not fit in a `u64` or the
    /// page index does not fit in an `i64`.
    pub fn offset_of(&self, page: u64) -> ClientResult<u64> {
        let index = self.page_index(page)?;
        page
            .checked_mul(u64::from(self.page_size))
            .ok_or_else(|| self.out_of_bounds(index))
    }

    /// Moves to `page` without fetching.
    pub fn set_page(&mut self, page: u64) {
        self.page = page;
    }

    /// Changes the page size. Known totals no longer apply.
    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size;
        self.page = 0;
        self.total_items = None;
        self.total_pages = None;
    }

    /// Stores the totals reported for a fetch of `page`.
    ///
    /// A missing page count is derived from the item count.
    pub(crate) fn record_fetch(
        &mut self,
        page: u64,
        total_items: Option<u64>,
        total_pages: Option<u64>,
    ) {
        self.page = page;
        self.total_items = total_items;
        self.total_pages = total_pages.or_else(|| {
            total_items.map(|items| match self.page_size {
                0 => 1,
                size => items.div_ceil(u64::from(size)),
            })
        });
    }

    /// Returns true if a page after the current one is known to exist.
    pub fn has_next(&self) -> bool {
        self.total_pages
            .is_some_and(|pages| self.page.saturating_add(1) < pages)
    }

    /// Returns true if the current page is not the first.
    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    /// Index of the next page, checked against the last known total.
    pub fn next_page(&self) -> ClientResult<u64> {
        let next = self
            .page
            .checked_add(1)
            .ok_or_else(|| self.out_of_bounds(i64::MAX))?;
        self.check(self.page_index(next)?)?;
        Ok(next)
    }

    /// Index of the previous page.
    pub fn previous_page(&self) -> ClientResult<u64> {
        let Some(previous) = self.page.checked_sub(1) else {
            return Err(self.out_of_bounds(-1));
        };
        self.check(self.page_index(previous)?)?;
        Ok(previous)
    }

    /// Fails if `page` is negative or beyond the last known page.
    pub fn check(&self, page: i64) -> ClientResult<()> {
        let out_of_range = page < 0
            || self
                .total_pages
                .is_some_and(|pages| u64::try_from(page).is_ok_and(|p| p >= pages.max(1)));
        if out_of_range {
            return Err(self.out_of_bounds(page));
        }
        Ok(())
    }

    /// Converts a page index to its signed form; indices past `i64::MAX` are
    /// out of bounds.
    pub(crate) fn page_index(&self, page: u64) -> ClientResult<i64> {
        i64::try_from(page).map_err(|_| self.out_of_bounds(i64::MAX))
    }

    fn out_of_bounds(&self, page: i64) -> ClientError {
        ClientError::OutOfBounds {
            page,
            total_pages: self.total_pages,
        }
    }
}
