use anyhow::Result;
use finscraper::{
    config::Config,
    crawler::{
        listings,
        phones::{HttpDocumentSource, PhoneCrawler},
        Crawler, QuoteCrawler, RunSummary,
    },
    dataset::{DatasetSpec, EXCHANGE_RATE, OIL_PRICE, STOCK_PRICE},
    fetch::QuotePageFetcher,
    store::Sink,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    // ─── 3) open store ───────────────────────────────────────────────
    let mut sink = Sink::open(&config.db_path)?;
    info!(db = %config.db_path.display(), "store opened");

    // ─── 4) run the quote datasets sequentially ──────────────────────
    let mut summaries: Vec<RunSummary> = Vec::new();
    let quote_runs: [(&'static DatasetSpec, &Vec<String>); 3] = [
        (&EXCHANGE_RATE, &config.exchange_rate_codes),
        (&OIL_PRICE, &config.oil_price_codes),
        (&STOCK_PRICE, &config.stock_price_codes),
    ];
    for (spec, codes) in quote_runs {
        if codes.is_empty() {
            continue;
        }
        let fetcher = QuotePageFetcher::new(spec.url_template);
        let mut crawler = QuoteCrawler::new(&mut sink, spec, codes.clone(), fetcher);
        match crawler.run() {
            Ok(summary) => summaries.push(summary),
            Err(err) => error!(table = spec.table.name, "run aborted: {:#}", err),
        }
    }

    // ─── 5) phone model metadata ─────────────────────────────────────
    let mut phone_crawler = PhoneCrawler::new(&mut sink, HttpDocumentSource::default());
    match phone_crawler.run() {
        Ok(summary) => summaries.push(summary),
        Err(err) => error!(table = "CETIZEN_PNO", "run aborted: {:#}", err),
    }

    // ─── 6) used-car listings: parse whatever a browser session archived ──
    // Capturing needs an interactive session (see `parse_listings`); here we
    // only pick up fragments already on disk.
    if config.archive_dir.exists() && !config.listing_codes.is_empty() {
        match listings::parse_and_store(&mut sink, &config.archive_dir, &config.listing_codes) {
            Ok(summary) => summaries.push(summary),
            Err(err) => error!(table = "ENCAR_USED_CAR_PRICE", "run aborted: {:#}", err),
        }
    } else {
        info!(
            dir = %config.archive_dir.display(),
            "no listings archive present; skipping listings dataset"
        );
    }

    // ─── 7) final summary ────────────────────────────────────────────
    for summary in &summaries {
        if summary.is_clean() {
            info!(
                dataset = summary.dataset,
                codes = summary.succeeded.len(),
                rows = summary.rows_written(),
                "dataset complete"
            );
        } else {
            warn!(
                dataset = summary.dataset,
                ok = summary.succeeded.len(),
                failed = summary.failed.len(),
                "dataset finished with failures"
            );
            for (code, err) in &summary.failed {
                warn!(dataset = summary.dataset, code = %code, error = %err, "failed code");
            }
        }
    }
    info!("all done");
    Ok(())
}
