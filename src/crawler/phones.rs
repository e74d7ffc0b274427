//! Used-phone model metadata crawler.
//!
//! One document, queried once: the price board groups phone entries into
//! `div[name="wireless_*"]` blocks, one block per carrier combination. Each
//! entry is a run of float-left list items: the first holds the device name
//! and a link whose `pno` query parameter identifies the model. The source
//! renders every entry twice, so extracted rows are deduplicated exactly
//! before writing.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use rusqlite::types::Value;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

use crate::crawler::{Crawler, RunSummary};
use crate::dataset::{WriteMode, PHONE_MODELS};
use crate::fetch::html::cell_text;
use crate::store::Sink;

pub const PHONE_BOARD_URL: &str = "https://price.cetizen.com/";

/// Carrier-combination query groups, `(div name attribute, persisted label)`.
pub const WIRELESS_GROUPS: &[(&str, &str)] = &[
    ("wireless_1[]", "S"),
    ("wireless_2[]", "K"),
    ("wireless_3[]", "L"),
    ("wireless_7[]", "SELF"),
    ("wireless_1,2[]", "S,K"),
    ("wireless_1,3[]", "S,L"),
    ("wireless_2,3[]", "K,L"),
    ("wireless_1,2,3[]", "S,K,L"),
    ("wireless_1,2,3,7[]", "S,K,L,SELF"),
    ("wireless_9[]", "NONE"),
    ("wireless_0[]", "OVERSEAS"),
];

static FLOAT_LEFT_ITEM: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"li[style^="float:left"]"#)
        .expect("CSS selector for board items should be valid")
});
static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("CSS selector for anchors should be valid"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneRow {
    pub pno: String,
    pub model: String,
    pub wireless: String,
}

/// Capability to retrieve the price-board document. The crawler never cares
/// where the HTML came from.
pub trait DocumentSource {
    fn fetch_document(&self) -> Result<String>;
}

/// Plain HTTP GET of the live board.
pub struct HttpDocumentSource {
    client: Client,
    url: String,
}

impl HttpDocumentSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

impl Default for HttpDocumentSource {
    fn default() -> Self {
        Self::new(PHONE_BOARD_URL)
    }
}

impl DocumentSource for HttpDocumentSource {
    fn fetch_document(&self) -> Result<String> {
        self.client
            .get(&self.url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .with_context(|| format!("fetching `{}`", self.url))?
            .text()
            .with_context(|| format!("reading body of `{}`", self.url))
    }
}

/// Extract the deduplicated model rows of every wireless group in `html`.
pub fn extract_models(html: &str) -> Result<Vec<PhoneRow>> {
    let doc = Html::parse_document(html);
    let base = Url::parse(PHONE_BOARD_URL).expect("board URL should be valid");

    let mut seen: HashSet<PhoneRow> = HashSet::new();
    let mut rows = Vec::new();

    for &(group, label) in WIRELESS_GROUPS {
        let group_selector = Selector::parse(&format!(r#"div[name="{}"]"#, group))
            .map_err(|e| anyhow::anyhow!("selector for group {}: {:?}", group, e))?;

        let mut in_group = 0usize;
        for entry in doc.select(&group_selector) {
            let mut items = entry.select(&FLOAT_LEFT_ITEM);
            let Some(first) = items.next() else {
                continue;
            };
            let Some(href) = first
                .select(&ANCHOR)
                .next()
                .and_then(|a| a.value().attr("href"))
            else {
                continue;
            };
            let Some(pno) = pno_from_href(&base, href) else {
                debug!(group, href, "entry link carries no pno; skipped");
                continue;
            };
            let model = cell_text(first);

            let row = PhoneRow {
                pno,
                model,
                wireless: label.to_string(),
            };
            if seen.insert(row.clone()) {
                rows.push(row);
            }
            in_group += 1;
        }
        debug!(group, label, entries = in_group, "group extracted");
    }

    Ok(rows)
}

/// Pull the `pno` query parameter out of a (possibly relative) entry link.
fn pno_from_href(base: &Url, href: &str) -> Option<String> {
    let url = base.join(href).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "pno")
        .map(|(_, value)| value.into_owned())
}

pub struct PhoneCrawler<'a, S: DocumentSource> {
    source: S,
    sink: &'a mut Sink,
}

impl<'a, S: DocumentSource> PhoneCrawler<'a, S> {
    pub fn new(sink: &'a mut Sink, source: S) -> Self {
        Self { source, sink }
    }
}

impl<S: DocumentSource> Crawler for PhoneCrawler<'_, S> {
    fn ensure_schema(&self) -> Result<()> {
        self.sink.ensure_table(&PHONE_MODELS)
    }

    fn run(&mut self) -> Result<RunSummary> {
        self.ensure_schema()?;
        let mut summary = RunSummary::new(PHONE_MODELS.name);

        info!(table = PHONE_MODELS.name, "collection started");
        let html = self.source.fetch_document()?;
        let rows = extract_models(&html)?;
        let batch: Vec<Vec<Value>> = rows
            .iter()
            .map(|row| {
                vec![
                    Value::from(row.pno.clone()),
                    Value::from(row.model.clone()),
                    Value::from(row.wireless.clone()),
                ]
            })
            .collect();
        let written = self.sink.write(&PHONE_MODELS, &batch, WriteMode::Upsert)?;
        info!(table = PHONE_MODELS.name, rows = written, "collection finished");

        summary.succeeded.push(("price-board".to_string(), written));
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedSource(String);
    impl DocumentSource for CannedSource {
        fn fetch_document(&self) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn entry(pno: &str, name: &str) -> String {
        format!(
            r#"<div name="wireless_1[]">
                 <li style="float:left; width:40%"><a href="/price.php?q=info&pno={pno}">{name}</a></li>
                 <li style="float:left; width:30%">{name}-MODEL</li>
                 <li style="float:left; width:30%">350,000</li>
               </div>"#
        )
    }

    fn board(entries: &[String]) -> String {
        format!("<html><body>{}</body></html>", entries.join("\n"))
    }

    #[test]
    fn duplicated_entries_collapse_to_one_row_per_pno() {
        // The live board renders every entry twice.
        let html = board(&[
            entry("1000", "Galaxy S21"),
            entry("1000", "Galaxy S21"),
            entry("2000", "iPhone 12"),
            entry("2000", "iPhone 12"),
        ]);

        let rows = extract_models(&html).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            PhoneRow {
                pno: "1000".to_string(),
                model: "Galaxy S21".to_string(),
                wireless: "S".to_string(),
            }
        );
    }

    #[test]
    fn entries_without_pno_links_are_skipped() {
        let html = board(&[
            r#"<div name="wireless_1[]"><li style="float:left"><a href="/nowhere.php">junk</a></li></div>"#.to_string(),
            entry("3000", "Pixel 5"),
        ]);
        let rows = extract_models(&html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pno, "3000");
    }

    #[test]
    fn end_to_end_one_row_per_pno_in_store() {
        let html = board(&[
            entry("1000", "Galaxy S21"),
            entry("1000", "Galaxy S21"),
            entry("2000", "iPhone 12"),
            entry("2000", "iPhone 12"),
        ]);
        let mut sink = Sink::open_in_memory().unwrap();
        let mut crawler = PhoneCrawler::new(&mut sink, CannedSource(html));
        let summary = crawler.run().unwrap();

        assert!(summary.is_clean());
        assert_eq!(sink.count_rows("CETIZEN_PNO").unwrap(), 2);
    }
}
