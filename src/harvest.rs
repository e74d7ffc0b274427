//! Generic paginated-table harvesting.
//!
//! Every quote source paginates the same way: page 1, 2, 3 ... until the
//! source starts repeating itself. The only reliable end-of-data signal is
//! that the last row of a freshly fetched page equals the last row of the
//! previous page, at which point the fresh page is a duplicate and is
//! discarded. Some sources additionally expose a next-page control whose
//! absence ends the walk, and callers may impose a hard page cap.
//!
//! Termination is always one of the named [`Termination`] variants. A fetch
//! or parse failure is not a termination signal and propagates as an error.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

/// One unit of paginated source content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Raw rows in source order, possibly empty.
    pub rows: Vec<Vec<String>>,
    /// Whether the source still shows a next-page control. Sources without
    /// such a control report `true` and rely on duplicate-tail detection.
    pub has_next: bool,
}

impl Page {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            has_next: true,
        }
    }
}

/// Capability to fetch one page of a tabular source for one code.
pub trait PageFetcher {
    fn fetch_page(&self, code: &str, page: u32) -> Result<Page>;
}

/// Pacing and bounds for one harvesting walk.
#[derive(Debug, Clone, Copy)]
pub struct HarvestPolicy {
    /// Minimum interval between consecutive fetches.
    pub delay: Duration,
    /// Hard cap on the number of pages fetched, if any.
    pub max_pages: Option<u32>,
}

impl HarvestPolicy {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_pages: None,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

/// Why a harvesting walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The new page's tail row equals the previous page's tail row; the new
    /// page was discarded.
    DuplicateTail,
    /// The new page had no tail row to compare (came back empty); the walk
    /// ends as if the source had run out of data.
    TailUnavailable,
    /// The very first page was empty; nothing was harvested.
    EmptyFirstPage,
    /// The caller-supplied page cap was reached.
    PageLimit,
    /// The source no longer shows a next-page control.
    NoNextControl,
}

/// Result of one harvesting walk: concatenated rows in fetch order, the
/// number of pages kept, and the reason the walk ended.
#[derive(Debug)]
pub struct Harvest {
    pub rows: Vec<Vec<String>>,
    pub pages: u32,
    pub termination: Termination,
}

/// Walk `fetcher` page by page for `code` until a termination condition is
/// met, concatenating rows in fetch order.
pub fn harvest(fetcher: &dyn PageFetcher, code: &str, policy: HarvestPolicy) -> Result<Harvest> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut prev_tail: Option<Vec<String>> = None;
    let mut pages = 0u32;
    let mut page = 1u32;

    let termination = loop {
        if let Some(max) = policy.max_pages {
            if page > max {
                break Termination::PageLimit;
            }
        }
        if page > 1 && !policy.delay.is_zero() {
            thread::sleep(policy.delay);
        }

        let fetched = fetcher.fetch_page(code, page)?;

        let tail = match fetched.rows.last() {
            Some(tail) => tail.clone(),
            None if page == 1 => break Termination::EmptyFirstPage,
            None => break Termination::TailUnavailable,
        };
        if prev_tail.as_ref() == Some(&tail) {
            break Termination::DuplicateTail;
        }

        rows.extend(fetched.rows);
        prev_tail = Some(tail);
        pages += 1;

        if !fetched.has_next {
            break Termination::NoNextControl;
        }
        page += 1;
    };

    debug!(code, pages, rows = rows.len(), ?termination, "harvest finished");
    Ok(Harvest {
        rows,
        pages,
        termination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Serves a fixed list of pages; requests past the end repeat the last
    /// page, which is how the live sources behave.
    struct CannedFetcher {
        pages: Vec<Page>,
        fetched: Cell<u32>,
    }

    impl CannedFetcher {
        fn new(pages: Vec<Page>) -> Self {
            Self {
                pages,
                fetched: Cell::new(0),
            }
        }
    }

    impl PageFetcher for CannedFetcher {
        fn fetch_page(&self, _code: &str, page: u32) -> Result<Page> {
            self.fetched.set(self.fetched.get() + 1);
            let idx = (page as usize - 1).min(self.pages.len() - 1);
            Ok(self.pages[idx].clone())
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn no_delay() -> HarvestPolicy {
        HarvestPolicy::new(Duration::ZERO)
    }

    #[test]
    fn duplicate_tail_discards_repeating_page() {
        let page1 = Page::new(vec![row(&["2021.01.03", "1.0"]), row(&["2021.01.02", "2.0"])]);
        let page2 = Page::new(vec![row(&["2021.01.01", "3.0"]), row(&["2021.01.02", "2.0"])]);
        let fetcher = CannedFetcher::new(vec![page1.clone(), page2]);

        let harvest = harvest(&fetcher, "X", no_delay()).unwrap();
        assert_eq!(harvest.termination, Termination::DuplicateTail);
        assert_eq!(harvest.pages, 1);
        assert_eq!(harvest.rows, page1.rows);
    }

    #[test]
    fn distinct_pages_concatenate_in_fetch_order() {
        let pages = vec![
            Page::new(vec![row(&["2021.01.04", "4.0"])]),
            Page::new(vec![row(&["2021.01.03", "3.0"])]),
            Page::new(vec![row(&["2021.01.02", "2.0"])]),
        ];
        let fetcher = CannedFetcher::new(pages);

        let harvest = harvest(&fetcher, "X", no_delay().with_max_pages(3)).unwrap();
        assert_eq!(harvest.termination, Termination::PageLimit);
        assert_eq!(harvest.pages, 3);
        assert_eq!(
            harvest.rows,
            vec![
                row(&["2021.01.04", "4.0"]),
                row(&["2021.01.03", "3.0"]),
                row(&["2021.01.02", "2.0"]),
            ]
        );
        assert_eq!(fetcher.fetched.get(), 3);
    }

    #[test]
    fn empty_first_page_yields_empty_harvest() {
        let fetcher = CannedFetcher::new(vec![Page::new(vec![])]);
        let harvest = harvest(&fetcher, "X", no_delay()).unwrap();
        assert_eq!(harvest.termination, Termination::EmptyFirstPage);
        assert!(harvest.rows.is_empty());
        assert_eq!(harvest.pages, 0);
    }

    #[test]
    fn empty_later_page_ends_walk_without_error() {
        let fetcher = CannedFetcher::new(vec![
            Page::new(vec![row(&["2021.01.02", "2.0"])]),
            Page::new(vec![]),
        ]);
        let harvest = harvest(&fetcher, "X", no_delay()).unwrap();
        assert_eq!(harvest.termination, Termination::TailUnavailable);
        assert_eq!(harvest.rows, vec![row(&["2021.01.02", "2.0"])]);
    }

    #[test]
    fn missing_next_control_stops_after_current_page() {
        let mut last = Page::new(vec![row(&["2021.01.01", "1.0"])]);
        last.has_next = false;
        let fetcher = CannedFetcher::new(vec![
            Page::new(vec![row(&["2021.01.02", "2.0"])]),
            last,
        ]);

        let harvest = harvest(&fetcher, "X", no_delay()).unwrap();
        assert_eq!(harvest.termination, Termination::NoNextControl);
        assert_eq!(harvest.pages, 2);
        assert_eq!(harvest.rows.len(), 2);
        assert_eq!(fetcher.fetched.get(), 2);
    }

    #[test]
    fn fetch_error_propagates() {
        struct FailingFetcher;
        impl PageFetcher for FailingFetcher {
            fn fetch_page(&self, _code: &str, _page: u32) -> Result<Page> {
                anyhow::bail!("connection reset")
            }
        }

        assert!(harvest(&FailingFetcher, "X", no_delay()).is_err());
    }
}
