use serde::Serialize;

/// One entry in the rendered page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageMarker {
    Page { number: usize, current: bool },
    Ellipsis,
}

/// Bounded page index for `current_page` out of `page_count`.
///
/// Page 1 and the last page are always present. Near the head the index shows
/// pages 1-4, near the tail the last four, and elsewhere the current page with
/// one neighbour either side. An ellipsis stands in for each run of skipped
/// pages, so there is never more than one per side of the current page.
pub fn page_index(current_page: usize, page_count: usize) -> Vec<PageMarker> {
    if page_count == 0 {
        return Vec::new();
    }
    let current = current_page.clamp(1, page_count);

    let pages: Vec<usize> = if page_count <= 4 {
        (1..=page_count).collect()
    } else if current <= 3 {
        vec![1, 2, 3, 4, page_count]
    } else if current >= page_count - 2 {
        vec![
            1,
            page_count - 3,
            page_count - 2,
            page_count - 1,
            page_count,
        ]
    } else {
        vec![1, current - 1, current, current + 1, page_count]
    };

    let mut markers = Vec::with_capacity(pages.len() + 2);
    let mut last_shown = 0;
    for number in pages {
        if last_shown != 0 && number > last_shown + 1 {
            markers.push(PageMarker::Ellipsis);
        }
        markers.push(PageMarker::Page {
            number,
            current: number == current,
        });
        last_shown = number;
    }
    markers
}

/// Page before `current_page`, or `None` on the first page.
pub fn previous_page(current_page: usize, page_count: usize) -> Option<usize> {
    (current_page > 1 && current_page <= page_count).then(|| current_page - 1)
}

/// Page after `current_page`, or `None` on the last page.
pub fn next_page(current_page: usize, page_count: usize) -> Option<usize> {
    (current_page < page_count).then(|| current_page + 1)
}
