//! Fixed-size paging of event lists and the compact page index rendered under
//! the table.

mod index;

pub use index::{next_page, page_index, previous_page, PageMarker};

use serde::Serialize;

use crate::error::{QueueLensError, Result};
use crate::event::Event;

/// A contiguous slice of the source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<'a> {
    /// 1-based.
    pub page_number: usize,
    pub items: &'a [Event],
}

/// Every page of a list, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginated<'a> {
    pub pages: Vec<Page<'a>>,
    pub page_count: usize,
}

impl<'a> Paginated<'a> {
    /// Look up a page by its 1-based number.
    pub fn page(&self, page_number: usize) -> Option<&Page<'a>> {
        page_number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
    }
}

/// Split `events` into pages of `page_size`. Only the last page may be short.
pub fn paginate(events: &[Event], page_size: usize) -> Result<Paginated<'_>> {
    if page_size == 0 {
        return Err(QueueLensError::Validation(
            "page_size must be a positive integer".to_string(),
        ));
    }

    let pages: Vec<Page<'_>> = events
        .chunks(page_size)
        .enumerate()
        .map(|(idx, items)| Page {
            page_number: idx + 1,
            items,
        })
        .collect();

    Ok(Paginated {
        page_count: pages.len(),
        pages,
    })
}

/// Everything the table needs to render one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView<'a> {
    pub current_page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub items: &'a [Event],
    pub index: Vec<PageMarker>,
    pub previous: Option<usize>,
    pub next: Option<usize>,
}

/// Select `current_page` and build its index. Page numbers past the end are
/// clamped to the last page; page 0 is rejected.
pub fn page_view(events: &[Event], page_size: usize, current_page: usize) -> Result<PageView<'_>> {
    if current_page == 0 {
        return Err(QueueLensError::Validation(
            "page numbers start at 1".to_string(),
        ));
    }

    let paginated = paginate(events, page_size)?;
    let page_count = paginated.page_count;
    let current = current_page.min(page_count.max(1));

    Ok(PageView {
        current_page: current,
        page_count,
        page_size,
        total_items: events.len(),
        items: paginated.page(current).map(|p| p.items).unwrap_or(&[]),
        index: page_index(current, page_count),
        previous: previous_page(current, page_count),
        next: next_page(current, page_count),
    })
}
