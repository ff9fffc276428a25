//! Paging and sorting value types.
//!
//! # Design
//! `Page` is the request-side directive sent with search calls; `Pagination`
//! is the descriptor a backend returns alongside a result set. Neither type
//! carries behavior beyond construction and (de)serialization.
//!
//! `index` is unsigned and `size` is a `NonZeroU32`, so the `index >= 0` and
//! `size > 0` invariants hold for every constructed value.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: NonZeroU32 = match NonZeroU32::new(50) {
    Some(size) => size,
    None => unreachable!(),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A single ordering criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("page size must be greater than zero")]
    ZeroSize,
}

/// Client-supplied paging directive.
///
/// The order of `sort` is the precedence of the sort keys. `total` is
/// normally left at zero and filled in by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<S = Sort> {
    pub sort: Vec<S>,
    pub index: u32,
    pub size: NonZeroU32,
    pub total: u64,
}

impl<S> Page<S> {
    pub fn new(sort: Vec<S>) -> Self {
        Self {
            sort,
            index: 0,
            size: DEFAULT_PAGE_SIZE,
            total: 0,
        }
    }

    pub fn with(sort: Vec<S>, index: u32, size: u32) -> Result<Self, PageError> {
        let size = NonZeroU32::new(size).ok_or(PageError::ZeroSize)?;

        Ok(Self {
            sort,
            index,
            size,
            total: 0,
        })
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    /// Zero-based offset of the first row on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.index) * u64::from(self.size.get())
    }
}

impl<S> Default for Page<S> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Backend-supplied paging metadata for a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub first: u64,
    pub page: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
}

impl Pagination {
    /// Describe `page` of a result set holding `rows` rows in total.
    pub fn from_page<S>(page: &Page<S>, rows: u64) -> Self {
        let size = u64::from(page.size.get());

        Self {
            first: page.offset(),
            page: u64::from(page.index),
            page_count: Some(rows.div_ceil(size)),
            rows: Some(rows),
        }
    }
}
