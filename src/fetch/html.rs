//! Extraction of the single data table embedded in a quote page.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("CSS selector for tables should be valid"));
static TR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("CSS selector for rows should be valid"));
static TD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("CSS selector for cells should be valid"));

/// Extract the rows of the first `<table>` in `html`.
///
/// Cell text is whitespace-collapsed. Rows without `<td>` cells (header rows)
/// and rows with any empty cell (the sources pad their tables with blank
/// spacer rows) are dropped.
pub fn extract_table_rows(html: &str) -> Vec<Vec<String>> {
    let doc = Html::parse_document(html);
    let Some(table) = doc.select(&TABLE).next() else {
        return Vec::new();
    };

    table
        .select(&TR)
        .filter_map(|tr| {
            let cells: Vec<String> = tr.select(&TD).map(cell_text).collect();
            if cells.is_empty() || cells.iter().any(String::is_empty) {
                None
            } else {
                Some(cells)
            }
        })
        .collect()
}

/// Inner text of one cell with runs of whitespace collapsed to single spaces.
pub fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_table_and_drops_spacer_rows() {
        let html = r#"
            <html><body>
            <table>
              <tr><th>date</th><th>rate</th></tr>
              <tr><td>2021.01.05</td><td>1,085.50</td></tr>
              <tr><td></td><td></td></tr>
              <tr><td>2021.01.04</td><td>  1,087.00 </td></tr>
            </table>
            <table><tr><td>ignored</td></tr></table>
            </body></html>"#;

        let rows = extract_table_rows(html);
        assert_eq!(
            rows,
            vec![
                vec!["2021.01.05".to_string(), "1,085.50".to_string()],
                vec!["2021.01.04".to_string(), "1,087.00".to_string()],
            ]
        );
    }

    #[test]
    fn no_table_means_no_rows() {
        assert!(extract_table_rows("<html><body><p>nothing</p></body></html>").is_empty());
    }

    #[test]
    fn nested_markup_inside_cells_is_flattened() {
        let html = "<table><tr><td><span>2021.01.05</span></td><td><b>1,085</b>.50</td></tr></table>";
        let rows = extract_table_rows(html);
        assert_eq!(rows, vec![vec!["2021.01.05".to_string(), "1,085 .50".to_string()]]);
    }
}
