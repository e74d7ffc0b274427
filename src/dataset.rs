//! Declarative per-dataset descriptors.
//!
//! Every tabular source is described by one static [`DatasetSpec`]: where the
//! pages live, how the scraped columns are laid out, which columns survive
//! into the destination table, and how writes are applied. The harvesting
//! loop and the reshape step consume these records uniformly; there is no
//! bespoke code path per dataset.

/// Destination table layout: name, `(column, sql type)` pairs and the
/// declared primary key (may be empty for keyless tables).
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [(&'static str, &'static str)],
    pub primary_key: &'static [&'static str],
}

impl TableSpec {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(name, _)| *name).collect()
    }
}

/// How a batch of records is applied to its destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Insert-or-update on the declared primary key. Rows for codes absent
    /// from the current batch are preserved.
    Upsert,
    /// Delete all existing rows, then insert the batch.
    Replace,
}

/// One paginated quote source: URL template plus the positional layout of the
/// scraped table.
///
/// `url_template` contains `{code}` and `{page}` placeholders. `raw_columns`
/// names the source table's columns in order; only the date column and the
/// measurement column are kept, everything else (day-over-day change, bid/ask
/// variants, volume) is dropped at reshape time.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSpec {
    pub table: TableSpec,
    pub url_template: &'static str,
    pub raw_columns: &'static [&'static str],
    pub date_col: usize,
    pub value_col: usize,
    /// Minimum interval between consecutive page fetches, in milliseconds.
    pub delay_ms: u64,
    /// Optional hard cap on the number of pages fetched per code.
    pub max_pages: Option<u32>,
    pub write_mode: WriteMode,
}

impl DatasetSpec {
    /// Name of the persisted measurement column (`RATE`, `PRICE`, ...).
    pub fn measurement(&self) -> &'static str {
        self.table.columns[2].0
    }
}

/// Daily exchange rates (dealing base rate), e.g. `FX_USDKRW`.
pub static EXCHANGE_RATE: DatasetSpec = DatasetSpec {
    table: TableSpec {
        name: "EXCHANGE_RATE",
        columns: &[
            ("BASE_DATE", "TEXT"),
            ("CODE", "TEXT"),
            ("RATE", "REAL"),
        ],
        primary_key: &["CODE", "BASE_DATE"],
    },
    url_template:
        "https://finance.naver.com/marketindex/exchangeDailyQuote.nhn?marketindexCd={code}&page={page}",
    raw_columns: &[
        "BASE_DATE",
        "RATE",
        "CHANGE",
        "CASH_BUY",
        "CASH_SELL",
        "WIRE_SEND",
        "WIRE_RECEIVE",
        "TC_BUY",
        "CHECK_SELL",
    ],
    date_col: 0,
    value_col: 1,
    delay_ms: 20,
    max_pages: None,
    write_mode: WriteMode::Upsert,
};

/// Daily oil prices (closing), e.g. `OIL_CL` (WTI), `OIL_BRT` (Brent).
pub static OIL_PRICE: DatasetSpec = DatasetSpec {
    table: TableSpec {
        name: "OIL_PRICE",
        columns: &[
            ("BASE_DATE", "TEXT"),
            ("CODE", "TEXT"),
            ("PRICE", "REAL"),
        ],
        primary_key: &["CODE", "BASE_DATE"],
    },
    url_template:
        "https://finance.naver.com/marketindex/worldDailyQuote.nhn?marketindexCd={code}&fdtc=2&page={page}",
    raw_columns: &["BASE_DATE", "PRICE", "CHANGE", "CHANGE_PCT"],
    date_col: 0,
    value_col: 1,
    delay_ms: 10,
    max_pages: None,
    write_mode: WriteMode::Upsert,
};

/// Daily stock prices (closing) by ticker, e.g. `005930`.
pub static STOCK_PRICE: DatasetSpec = DatasetSpec {
    table: TableSpec {
        name: "STOCK_PRICE",
        columns: &[
            ("BASE_DATE", "TEXT"),
            ("CODE", "TEXT"),
            ("PRICE", "REAL"),
        ],
        primary_key: &["CODE", "BASE_DATE"],
    },
    url_template: "https://finance.naver.com/item/sise_day.nhn?code={code}&page={page}",
    raw_columns: &[
        "BASE_DATE",
        "PRICE",
        "CHANGE",
        "OPEN",
        "HIGH",
        "LOW",
        "VOLUME",
    ],
    date_col: 0,
    value_col: 1,
    delay_ms: 10,
    max_pages: None,
    write_mode: WriteMode::Upsert,
};

/// Used-phone model metadata. Not paginated and not date-keyed; kept here so
/// the store layer sees one table layout per dataset regardless of shape.
pub static PHONE_MODELS: TableSpec = TableSpec {
    name: "CETIZEN_PNO",
    columns: &[
        ("PNO", "TEXT"),
        ("MODEL", "TEXT"),
        ("WIRELESS", "TEXT"),
    ],
    primary_key: &["PNO"],
};

/// Used-car listings captured from a browser session. Keyless snapshot table,
/// rewritten in full on every run.
pub static CAR_LISTINGS: TableSpec = TableSpec {
    name: "ENCAR_USED_CAR_PRICE",
    columns: &[
        ("BASE_DATE", "TEXT"),
        ("CODE", "TEXT"),
        ("NAME1", "TEXT"),
        ("NAME2", "TEXT"),
        ("NAME3", "TEXT"),
        ("NAME4", "TEXT"),
        ("YER", "TEXT"),
        ("KM", "TEXT"),
        ("FUE", "TEXT"),
        ("LOC", "TEXT"),
        ("INS", "TEXT"),
        ("ASS", "TEXT"),
        ("PRC", "TEXT"),
        ("LINK", "TEXT"),
    ],
    primary_key: &[],
};
