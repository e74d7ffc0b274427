//! HTTP page fetching for the paginated quote sources.

pub mod html;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::harvest::{Page, PageFetcher};

/// Fetches quote pages over plain HTTP GET from a `{code}`/`{page}` URL
/// template and extracts the embedded data table.
///
/// The quote sources expose no next-page control; the harvester relies on
/// duplicate-tail detection, so every page reports `has_next = true`.
pub struct QuotePageFetcher {
    client: Client,
    url_template: &'static str,
}

impl QuotePageFetcher {
    pub fn new(url_template: &'static str) -> Self {
        Self {
            client: Client::new(),
            url_template,
        }
    }

    fn page_url(&self, code: &str, page: u32) -> String {
        self.url_template
            .replace("{code}", code)
            .replace("{page}", &page.to_string())
    }
}

impl PageFetcher for QuotePageFetcher {
    fn fetch_page(&self, code: &str, page: u32) -> Result<Page> {
        let url = self.page_url(code, page);
        let body = self
            .client
            .get(&url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .with_context(|| format!("fetching `{}`", url))?
            .text()
            .with_context(|| format!("reading body of `{}`", url))?;

        Ok(Page::new(html::extract_table_rows(&body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_substitution() {
        let fetcher = QuotePageFetcher::new("https://example.com/q?cd={code}&page={page}");
        assert_eq!(
            fetcher.page_url("FX_USDKRW", 7),
            "https://example.com/q?cd=FX_USDKRW&page=7"
        );
    }
}
