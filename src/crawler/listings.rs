//! Used-car listings crawler.
//!
//! The listings site only paginates through a clickable control inside a
//! browser session, so harvesting is split into two explicit stages:
//!
//! 1. *Fetch-and-archive*: drive a [`ListingSource`] (the browser session is
//!    an external collaborator behind that trait) and serialize each page's
//!    table fragment to `{archive_dir}/{code}/carlist_{code}_{page:04}.html`.
//! 2. *Parse-archive*: glob the fragment files and extract listing rows
//!    offline.
//!
//! The destination table is a keyless snapshot: one replace-write per run
//! covering every configured code.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use glob::glob;
use once_cell::sync::Lazy;
use rusqlite::types::Value;
use scraper::{ElementRef, Html, Selector};
use tracing::{error, info};

use crate::crawler::{Crawler, RunSummary};
use crate::dataset::{WriteMode, CAR_LISTINGS};
use crate::fetch::html::cell_text;
use crate::harvest::{HarvestPolicy, Termination};
use crate::store::Sink;

/// Pages captured per code before the walk is cut off.
pub const LISTING_PAGE_CAP: u32 = 3;
/// Pause between page captures.
pub const LISTING_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Capability of a paginated listings session. Implementations wrap whatever
/// drives the site (a browser automation session in production, canned HTML
/// in tests).
pub trait ListingSource {
    /// Navigate to the first listings page for `code`.
    fn open(&mut self, code: &str) -> Result<()>;
    /// Serialized HTML of the listing table currently displayed.
    fn page_html(&mut self) -> Result<String>;
    /// Advance to `page` via the next-page control. `false` when the control
    /// is absent, which ends the walk.
    fn goto_page(&mut self, page: u32) -> Result<bool>;
}

/// One parsed listing. All fields are kept textual; the source formats
/// prices and mileage for display and no arithmetic happens downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub base_date: String,
    pub code: String,
    pub name1: String,
    pub name2: String,
    pub name3: String,
    pub name4: String,
    pub yer: String,
    pub km: String,
    pub fue: String,
    pub loc: String,
    pub ins: String,
    pub ass: String,
    pub prc: String,
    pub link: String,
}

impl ListingRow {
    fn values(&self) -> Vec<Value> {
        [
            &self.base_date,
            &self.code,
            &self.name1,
            &self.name2,
            &self.name3,
            &self.name4,
            &self.yer,
            &self.km,
            &self.fue,
            &self.loc,
            &self.ins,
            &self.ass,
            &self.prc,
            &self.link,
        ]
        .into_iter()
        .map(|s| Value::from(s.clone()))
        .collect()
    }
}

static ROW: Lazy<Selector> = Lazy::new(|| sel("tr"));
static NAME1: Lazy<Selector> = Lazy::new(|| sel("span.cls > strong"));
static NAME2: Lazy<Selector> = Lazy::new(|| sel("span.cls > em"));
static NAME3: Lazy<Selector> = Lazy::new(|| sel("span.dtl > strong"));
static NAME4: Lazy<Selector> = Lazy::new(|| sel("span.dtl > em"));
static YER: Lazy<Selector> = Lazy::new(|| sel("span.yer"));
static KM: Lazy<Selector> = Lazy::new(|| sel("span.km"));
static FUE: Lazy<Selector> = Lazy::new(|| sel("span.fue"));
static LOC: Lazy<Selector> = Lazy::new(|| sel("span.loc"));
static INS: Lazy<Selector> = Lazy::new(|| sel("span.ins"));
static ASS: Lazy<Selector> = Lazy::new(|| sel("span.ass"));
static PRC: Lazy<Selector> = Lazy::new(|| sel("td.prc_hs"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| sel("a"));

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("CSS selector for listings should be valid")
}

/// Stage 1: capture up to the page cap of listing fragments for `code` into
/// `archive_dir/code/`. Returns the number of files written and why the walk
/// stopped.
pub fn archive_listings(
    source: &mut dyn ListingSource,
    code: &str,
    archive_dir: &Path,
    policy: HarvestPolicy,
) -> Result<(u32, Termination)> {
    let code_dir = archive_dir.join(code);
    if code_dir.exists() {
        // Stale fragments from an earlier run would be parsed alongside the
        // fresh capture.
        fs::remove_dir_all(&code_dir)
            .with_context(|| format!("clearing archive directory `{}`", code_dir.display()))?;
    }
    fs::create_dir_all(&code_dir)
        .with_context(|| format!("creating archive directory `{}`", code_dir.display()))?;

    source.open(code)?;

    let mut written = 0u32;
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

        let html = source.page_html()?;
        let path = code_dir.join(format!("carlist_{}_{:04}.html", code, page));
        fs::write(&path, html).with_context(|| format!("writing `{}`", path.display()))?;
        written += 1;

        if !source.goto_page(page + 1)? {
            break Termination::NoNextControl;
        }
        page += 1;
    };

    info!(code, pages = written, ?termination, "archive stage finished");
    Ok((written, termination))
}

/// Stage 2: parse every archived fragment of `code` under `archive_dir`.
pub fn parse_archive(archive_dir: &Path, code: &str, base_date: &str) -> Result<Vec<ListingRow>> {
    let pattern = format!("{}/{}/*.html", archive_dir.display(), code);
    let mut rows = Vec::new();
    for entry in glob(&pattern).context("bad archive glob pattern")? {
        let path = entry?;
        let html = fs::read_to_string(&path)
            .with_context(|| format!("reading archived fragment `{}`", path.display()))?;
        rows.extend(parse_fragment(&html, code, base_date));
    }
    Ok(rows)
}

/// Extract listing rows from one archived table fragment. Rows missing the
/// mandatory listing markup (the header row, ad banners) are skipped;
/// insurance and warranty badges are optional and default to empty.
pub fn parse_fragment(html: &str, code: &str, base_date: &str) -> Vec<ListingRow> {
    let doc = Html::parse_document(html);

    doc.select(&ROW)
        .filter_map(|tr| {
            let link = tr
                .select(&ANCHOR)
                .next()
                .and_then(|a| a.value().attr("href"))?;
            Some(ListingRow {
                base_date: base_date.to_string(),
                code: code.to_string(),
                name1: required(tr, &NAME1)?,
                name2: required(tr, &NAME2)?,
                name3: required(tr, &NAME3)?,
                name4: required(tr, &NAME4)?,
                yer: required(tr, &YER)?,
                km: required(tr, &KM)?,
                fue: required(tr, &FUE)?,
                loc: required(tr, &LOC)?,
                ins: optional(tr, &INS),
                ass: optional(tr, &ASS),
                prc: required(tr, &PRC)?,
                link: absolutize(link),
            })
        })
        .collect()
}

fn required(tr: ElementRef, selector: &Selector) -> Option<String> {
    tr.select(selector).next().map(cell_text)
}

fn optional(tr: ElementRef, selector: &Selector) -> String {
    tr.select(selector).next().map(cell_text).unwrap_or_default()
}

fn absolutize(href: &str) -> String {
    if href.starts_with('/') {
        format!("http://www.encar.com{}", href)
    } else {
        href.to_string()
    }
}

/// Parse archived fragments for every code and replace-write the snapshot
/// table. Shared by the crawler's second stage and the standalone
/// parse-archive entry point.
pub fn parse_and_store(sink: &mut Sink, archive_dir: &Path, codes: &[String]) -> Result<RunSummary> {
    sink.ensure_table(&CAR_LISTINGS)?;
    let base_date = Local::now().format("%Y-%m-%d").to_string();

    let mut summary = RunSummary::new(CAR_LISTINGS.name);
    let mut per_code: BTreeMap<String, usize> = BTreeMap::new();
    let mut batch: Vec<Vec<Value>> = Vec::new();

    for code in codes {
        match parse_archive(archive_dir, code, &base_date) {
            Ok(rows) => {
                per_code.insert(code.clone(), rows.len());
                batch.extend(rows.iter().map(ListingRow::values));
            }
            Err(err) => {
                error!(code = %code, error = %format!("{:#}", err), "parse stage failed");
                summary.failed.push((code.clone(), format!("{:#}", err)));
            }
        }
    }

    if batch.is_empty() {
        info!(table = CAR_LISTINGS.name, "no parsed listings; table untouched");
    } else {
        sink.write(&CAR_LISTINGS, &batch, WriteMode::Replace)?;
    }
    for (code, count) in per_code {
        summary.succeeded.push((code, count));
    }
    Ok(summary)
}

pub struct ListingCrawler<'a, S: ListingSource> {
    source: S,
    sink: &'a mut Sink,
    archive_dir: PathBuf,
    codes: Vec<String>,
    policy: HarvestPolicy,
}

impl<'a, S: ListingSource> ListingCrawler<'a, S> {
    pub fn new(sink: &'a mut Sink, source: S, archive_dir: impl Into<PathBuf>, codes: Vec<String>) -> Self {
        Self {
            source,
            sink,
            archive_dir: archive_dir.into(),
            codes,
            policy: HarvestPolicy::new(LISTING_PAGE_DELAY).with_max_pages(LISTING_PAGE_CAP),
        }
    }

    pub fn with_policy(mut self, policy: HarvestPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<S: ListingSource> Crawler for ListingCrawler<'_, S> {
    fn ensure_schema(&self) -> Result<()> {
        self.sink.ensure_table(&CAR_LISTINGS)
    }

    fn run(&mut self) -> Result<RunSummary> {
        self.ensure_schema()?;

        // Stage 1 per code, isolating capture failures.
        let mut archived = Vec::new();
        let mut capture_failures = Vec::new();
        for code in self.codes.clone() {
            info!(code = %code, "capture started");
            match archive_listings(&mut self.source, &code, &self.archive_dir, self.policy) {
                Ok(_) => archived.push(code),
                Err(err) => {
                    error!(code = %code, error = %format!("{:#}", err), "capture failed");
                    capture_failures.push((code, format!("{:#}", err)));
                }
            }
        }

        // Stage 2 over whatever made it to disk.
        let mut summary = parse_and_store(self.sink, &self.archive_dir, &archived)?;
        summary.failed.extend(capture_failures);
        Ok(summary)
    }
}
