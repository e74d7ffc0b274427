//! Crawlers: one per dataset family, all implementing the same capability
//! surface (`ensure_schema` + `run`).
//!
//! A run processes its configured codes strictly sequentially. A failure on
//! one code is recorded in the [`RunSummary`] and the remaining codes still
//! run; only a schema failure aborts the whole dataset.

pub mod listings;
pub mod phones;

use std::time::{Duration, Instant};

use anyhow::Result;
use rusqlite::types::Value;
use tracing::{error, info, warn};

use crate::dataset::DatasetSpec;
use crate::harvest::{harvest, HarvestPolicy, PageFetcher};
use crate::reshape::{reshape_quotes, QuoteRow};
use crate::store::Sink;

/// Capability every dataset crawler provides.
pub trait Crawler {
    /// Idempotently create the destination schema.
    fn ensure_schema(&self) -> Result<()>;
    /// Harvest, reshape and persist every configured code.
    fn run(&mut self) -> Result<RunSummary>;
}

/// Per-code outcome tally for one dataset run.
#[derive(Debug)]
pub struct RunSummary {
    pub dataset: &'static str,
    /// `(code, rows written)` in processing order.
    pub succeeded: Vec<(String, usize)>,
    /// `(code, error)` in processing order.
    pub failed: Vec<(String, String)>,
}

impl RunSummary {
    pub fn new(dataset: &'static str) -> Self {
        Self {
            dataset,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn rows_written(&self) -> usize {
        self.succeeded.iter().map(|(_, n)| n).sum()
    }
}

/// Generic crawler for the paginated quote datasets. The dataset identity
/// lives entirely in the [`DatasetSpec`]; this type never branches on which
/// dataset it serves.
pub struct QuoteCrawler<'a, F: PageFetcher> {
    spec: &'static DatasetSpec,
    codes: Vec<String>,
    fetcher: F,
    sink: &'a mut Sink,
}

impl<'a, F: PageFetcher> QuoteCrawler<'a, F> {
    pub fn new(sink: &'a mut Sink, spec: &'static DatasetSpec, codes: Vec<String>, fetcher: F) -> Self {
        Self {
            spec,
            codes,
            fetcher,
            sink,
        }
    }

    fn policy(&self) -> HarvestPolicy {
        HarvestPolicy {
            delay: Duration::from_millis(self.spec.delay_ms),
            max_pages: self.spec.max_pages,
        }
    }

    /// Harvest, reshape and write one code. Returns the number of rows
    /// written (zero when the source had nothing, in which case the table is
    /// left untouched).
    fn run_code(&mut self, code: &str) -> Result<usize> {
        let harvested = harvest(&self.fetcher, code, self.policy())?;
        let rows = reshape_quotes(self.spec, code, &harvested.rows)?;
        if rows.is_empty() {
            warn!(code, table = self.spec.table.name, "source returned no rows; skipping write");
            return Ok(0);
        }
        let batch: Vec<Vec<Value>> = rows.iter().map(quote_values).collect();
        self.sink
            .write(&self.spec.table, &batch, self.spec.write_mode)
    }
}

impl<F: PageFetcher> Crawler for QuoteCrawler<'_, F> {
    fn ensure_schema(&self) -> Result<()> {
        self.sink.ensure_table(&self.spec.table)
    }

    fn run(&mut self) -> Result<RunSummary> {
        self.ensure_schema()?;
        let mut summary = RunSummary::new(self.spec.table.name);

        for code in self.codes.clone() {
            let started = Instant::now();
            info!(code = %code, table = self.spec.table.name, "collection started");
            match self.run_code(&code) {
                Ok(written) => {
                    info!(
                        code = %code,
                        rows = written,
                        elapsed = ?started.elapsed(),
                        "collection finished"
                    );
                    summary.succeeded.push((code, written));
                }
                Err(err) => {
                    error!(code = %code, error = %format!("{:#}", err), "collection failed");
                    summary.failed.push((code, format!("{:#}", err)));
                }
            }
        }

        Ok(summary)
    }
}

fn quote_values(row: &QuoteRow) -> Vec<Value> {
    vec![
        Value::from(row.base_date.clone()),
        Value::from(row.code.clone()),
        Value::from(row.value),
    ]
}
