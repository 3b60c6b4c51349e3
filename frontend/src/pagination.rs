use std::ops::Range;

/// Number of pages needed to show `min(len, cap)` items, `page_size` at a time.
pub fn max_page(len: usize, cap: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.min(cap).div_ceil(page_size)
}

/// Pages are 1-based; an empty list still sits on page 1.
pub fn clamp_page(page: usize, max_page: usize) -> usize {
    page.clamp(1, max_page.max(1))
}

/// Indices of the cached list shown on `page`.
pub fn page_range(len: usize, cap: usize, page_size: usize, page: usize) -> Range<usize> {
    let end_of_list = len.min(cap);
    let start = page.saturating_sub(1).saturating_mul(page_size).min(end_of_list);
    let end = page.saturating_mul(page_size).min(end_of_list);

    start..end.max(start)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: usize,
    pub max_page: usize,
    pub range: Range<usize>,
}

impl Pagination {
    pub fn new(len: usize, cap: usize, page_size: usize, page: usize) -> Self {
        let max_page = max_page(len, cap, page_size);
        let current_page = clamp_page(page, max_page);

        Pagination {
            current_page,
            max_page,
            range: page_range(len, cap, page_size, current_page),
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.current_page > 1
    }

    pub fn can_go_forward(&self) -> bool {
        self.current_page < self.max_page
    }

    /// "Page 2 of 3" style label; an empty list reads as page 1 of 1.
    pub fn label(&self) -> String {
        format!("Page {} of {}", self.current_page, self.max_page.max(1))
    }
}
