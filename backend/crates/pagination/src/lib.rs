//! Page/limit pagination primitives shared by DigiDiploma list endpoints.
//!
//! Requests carry `?page=&limit=` query parameters. [`PageQuery`] is the raw,
//! deserialisable form; [`PageParams`] is the validated form handed to
//! repositories; [`Paginated`] is the response envelope:
//!
//! ```json
//! { "items": [...], "total": 42, "page": 2, "limit": 20, "totalPages": 3 }
//! ```

use serde::{Deserialize, Serialize};

/// Page used when the client does not send one.
pub const DEFAULT_PAGE: u32 = 1;
/// Page size used when the client does not send one.
pub const DEFAULT_LIMIT: u32 = 20;
/// Largest page size a client may request.
pub const MAX_LIMIT: u32 = 100;

/// Errors raised while validating pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PageParamsError {
    /// Pages are numbered from one.
    #[error("page must be at least 1")]
    PageOutOfRange,
    /// Limit must lie within `1..=MAX_LIMIT`.
    #[error("limit must be between 1 and {max}")]
    LimitOutOfRange {
        /// Largest permitted limit.
        max: u32,
    },
}

/// Raw pagination query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// One-based page number.
    pub page: Option<u32>,
    /// Items per page.
    pub limit: Option<u32>,
}

impl PageQuery {
    /// Validate the query, applying defaults for absent values.
    ///
    /// # Errors
    /// Returns [`PageParamsError`] when a supplied value is out of range.
    pub fn validate(self) -> Result<PageParams, PageParamsError> {
        PageParams::new(self.page, self.limit)
    }
}

/// Validated pagination parameters.
///
/// # Examples
/// ```
/// use pagination::PageParams;
///
/// let params = PageParams::new(Some(3), Some(10)).expect("valid");
/// assert_eq!(params.offset(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageParams {
    page: u32,
    limit: u32,
}

impl PageParams {
    /// Validate optional page and limit values.
    ///
    /// # Errors
    /// Returns [`PageParamsError`] when `page` is zero or `limit` falls
    /// outside `1..=MAX_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, PageParamsError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if page == 0 {
            return Err(PageParamsError::PageOutOfRange);
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(PageParamsError::LimitOutOfRange { max: MAX_LIMIT });
        }
        Ok(Self { page, limit })
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Items per page.
    #[must_use]
    pub const fn limit(self) -> u32 {
        self.limit
    }

    /// Number of items to skip.
    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Apply these parameters to an in-memory collection.
    #[must_use]
    pub fn slice<T>(self, items: Vec<T>) -> Paginated<T> {
        let total = items.len() as u64;
        let skip = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(self.limit).unwrap_or(usize::MAX);
        let page_items = items.into_iter().skip(skip).take(take).collect();
        Paginated::new(page_items, total, self)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Paginated response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Items across all pages.
    pub total: u64,
    /// One-based page number.
    pub page: u32,
    /// Requested page size.
    pub limit: u32,
    /// Number of pages for `total` at this `limit`.
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    /// Wrap one page of results.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, params: PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            limit: params.limit,
            total_pages: total.div_ceil(u64::from(params.limit)),
        }
    }

    /// Transform each item, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, 1, 20)]
    #[case(Some(2), Some(50), 2, 50)]
    fn applies_defaults(
        #[case] page: Option<u32>,
        #[case] limit: Option<u32>,
        #[case] expected_page: u32,
        #[case] expected_limit: u32,
    ) {
        let params = PageParams::new(page, limit).expect("valid params");
        assert_eq!(params.page(), expected_page);
        assert_eq!(params.limit(), expected_limit);
    }

    #[rstest]
    #[case(Some(0), None, PageParamsError::PageOutOfRange)]
    #[case(None, Some(0), PageParamsError::LimitOutOfRange { max: MAX_LIMIT })]
    #[case(None, Some(101), PageParamsError::LimitOutOfRange { max: MAX_LIMIT })]
    fn rejects_out_of_range(
        #[case] page: Option<u32>,
        #[case] limit: Option<u32>,
        #[case] expected: PageParamsError,
    ) {
        assert_eq!(PageParams::new(page, limit), Err(expected));
    }

    #[rstest]
    fn slices_in_memory_items() {
        let params = PageParams::new(Some(2), Some(3)).expect("valid params");
        let page = params.slice((1..=7).collect::<Vec<u32>>());
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
    }

    #[rstest]
    fn serialises_camel_case_envelope() {
        let page = Paginated::new(vec!["a"], 1, PageParams::default());
        let value = serde_json::to_value(page).expect("serialise");
        assert_eq!(
            value,
            serde_json::json!({
                "items": ["a"],
                "total": 1,
                "page": 1,
                "limit": 20,
                "totalPages": 1
            })
        );
    }
}
