//! Page arithmetic for full and partial resyncs.
//!
//! The remote source reports a total row count and serves fixed-size pages
//! numbered from one. Two quirks are preserved deliberately:
//!
//! - [`total_pages`] always includes a trailing page, even when the row count
//!   is an exact multiple of the page size. That trailing page comes back
//!   empty, which the fetcher treats as a valid result.
//! - [`resume_start_page`] re-requests the page containing the last stored
//!   row. Overlapping rows are absorbed by the store's skip-duplicates policy.
//!
//! Resuming by count assumes the remote keeps a stable ordering between the
//! run that stored the rows and the run that resumes. Nothing here verifies
//! that assumption; if the remote reorders or rewrites rows between runs a
//! partial resync can skip or re-fetch records.

use std::{fmt, num::NonZeroU32, ops::RangeInclusive};

use thiserror::Error;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: PageSize = PageSize(match NonZeroU32::new(1000) {
    Some(size) => size,
    None => panic!("default page size must be non-zero"),
});

/// Number of rows requested per page. Always greater than zero.
///
/// # Examples
///
/// ```
/// use racefeed_core::PageSize;
///
/// let size = PageSize::new(250).expect("non-zero page size");
/// assert_eq!(size.get(), 250);
/// assert!(PageSize::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u32", into = "u32"))]
pub struct PageSize(NonZeroU32);

/// Errors returned by [`PageSize::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageSizeError {
    /// A page size of zero was requested.
    #[error("page size must be greater than zero")]
    Zero,
}

impl PageSize {
    /// Validate and construct a page size.
    pub const fn new(size: u32) -> Result<Self, PageSizeError> {
        match NonZeroU32::new(size) {
            Some(size) => Ok(Self(size)),
            None => Err(PageSizeError::Zero),
        }
    }

    /// The page size as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    const fn as_u64(self) -> u64 {
        self.0.get() as u64
    }
}

impl Default for PageSize {
    fn default() -> Self {
        DEFAULT_PAGE_SIZE
    }
}

impl TryFrom<u32> for PageSize {
    type Error = PageSizeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageSize> for u32 {
    fn from(value: PageSize) -> Self {
        value.get()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of pages needed to cover `total_rows`, including the trailing page.
///
/// # Examples
///
/// ```
/// use racefeed_core::{PageSize, total_pages};
///
/// let size = PageSize::new(1000).expect("non-zero page size");
/// assert_eq!(total_pages(2500, size), 3);
/// // Exact multiples still get a trailing (empty) page.
/// assert_eq!(total_pages(2000, size), 3);
/// ```
#[must_use]
pub const fn total_pages(total_rows: u64, page_size: PageSize) -> u64 {
    total_rows / page_size.as_u64() + 1
}

/// First page a partial resync must request given `stored` local records.
///
/// # Examples
///
/// ```
/// use racefeed_core::{PageSize, resume_start_page};
///
/// let size = PageSize::new(1000).expect("non-zero page size");
/// assert_eq!(resume_start_page(1000, size), 2);
/// assert_eq!(resume_start_page(0, size), 1);
/// ```
#[must_use]
pub const fn resume_start_page(stored: u64, page_size: PageSize) -> u64 {
    stored / page_size.as_u64() + 1
}

/// Inclusive range of one-based page indices. `start > end` means empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: u64,
    end: u64,
}

impl PageRange {
    /// Range covering `start..=end`.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// A range with no pages.
    #[must_use]
    pub const fn empty() -> Self {
        Self { start: 1, end: 0 }
    }

    /// First page index.
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Last page index.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Whether the range contains no pages.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Number of pages in the range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// Iterate over the page indices.
    #[must_use]
    pub const fn pages(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("no pages")
        } else {
            write!(f, "pages {}..={}", self.start, self.end)
        }
    }
}

/// Result of probing the remote for its row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    /// Total rows reported by the remote.
    pub total_rows: u64,
    /// Page size the plan was computed for.
    pub page_size: PageSize,
    /// Pages needed to cover `total_rows`, including the trailing page.
    pub total_pages: u64,
}

impl PagePlan {
    /// Compute the plan for `total_rows` at `page_size`.
    #[must_use]
    pub const fn new(total_rows: u64, page_size: PageSize) -> Self {
        Self {
            total_rows,
            page_size,
            total_pages: total_pages(total_rows, page_size),
        }
    }

    /// Pages a full resync requests.
    ///
    /// The range is empty when the store already holds `total_rows` records.
    #[must_use]
    pub const fn full_range(&self, stored: u64) -> PageRange {
        if stored == self.total_rows {
            return PageRange::empty();
        }
        PageRange::new(1, self.total_pages)
    }

    /// Pages a partial resync requests given `stored` local records.
    ///
    /// The range is empty when the store holds at least `total_rows` records.
    #[must_use]
    pub const fn resume_range(&self, stored: u64) -> PageRange {
        if stored >= self.total_rows {
            return PageRange::empty();
        }
        PageRange::new(resume_start_page(stored, self.page_size), self.total_pages)
    }
}
