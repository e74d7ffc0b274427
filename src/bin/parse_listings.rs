//! Parse an existing listings archive into the store.
//!
//! The capture stage runs in an interactive browser session elsewhere; this
//! entry point replays stage 2 only:
//!
//! ```text
//! parse_listings [config.yaml]
//! ```

use anyhow::Result;
use finscraper::{config::Config, crawler::listings, store::Sink};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let mut sink = Sink::open(&config.db_path)?;
    let summary = listings::parse_and_store(&mut sink, &config.archive_dir, &config.listing_codes)?;

    for (code, rows) in &summary.succeeded {
        info!(code = %code, rows = *rows, "parsed");
    }
    for (code, err) in &summary.failed {
        warn!(code = %code, error = %err, "parse failed");
    }
    info!(
        total = summary.rows_written(),
        table = summary.dataset,
        "archive parse complete"
    );
    Ok(())
}
