//! Pagination controls.

use serde::{Deserialize, Serialize};

/// Pages shown on each side of the current page.
const WINDOW_RADIUS: usize = 2;

/// One control in the pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageItem {
    Previous { target: usize, enabled: bool },
    Page { number: usize, active: bool },
    Ellipsis,
    Next { target: usize, enabled: bool },
}

/// Pagination state and controls for one table view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// Empty when everything fits on one page.
    pub items: Vec<PageItem>,
}

/// Number of pages needed for `items` rows, at least one.
pub fn page_count(items: usize, page_size: usize) -> usize {
    items.div_ceil(page_size.max(1)).max(1)
}

/// Build the pagination bar: previous, first page, ellipsis, a window of
/// pages around the current one, ellipsis, last page, next.
pub fn paginate(current: usize, total_pages: usize, total_items: usize) -> Pagination {
    let total_pages = total_pages.max(1);
    let current = current.clamp(1, total_pages);
    let mut items = Vec::new();

    if total_pages > 1 {
        items.push(PageItem::Previous {
            target: current.saturating_sub(1).max(1),
            enabled: current > 1,
        });

        let start = current.saturating_sub(WINDOW_RADIUS).max(1);
        let end = (current + WINDOW_RADIUS).min(total_pages);

        if start > 1 {
            items.push(PageItem::Page {
                number: 1,
                active: false,
            });
            if start > 2 {
                items.push(PageItem::Ellipsis);
            }
        }

        for number in start..=end {
            items.push(PageItem::Page {
                number,
                active: number == current,
            });
        }

        if end < total_pages {
            if end < total_pages - 1 {
                items.push(PageItem::Ellipsis);
            }
            items.push(PageItem::Page {
                number: total_pages,
                active: false,
            });
        }

        items.push(PageItem::Next {
            target: (current + 1).min(total_pages),
            enabled: current < total_pages,
        });
    }

    Pagination {
        current,
        total_pages,
        total_items,
        items,
    }
}
