//! Report document scanning.
//!
//! Pulls failure references out of a library summary page. The page is a
//! table: header rows label the columns with runners (`td.runner`, spread
//! over `colspan`) and toolsets (`td.toolset-name`); each body row is one
//! test, with one result cell (`library-*` class) per column. Failures we
//! care about sit in `library-fail-unexpected-new` cells as a link to the
//! log.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use triage_shared::{FailureReference, TriageError};

const FAIL_CLASS: &str = "library-fail-unexpected-new";
const RESULT_CLASS_PREFIX: &str = "library-";

/// What a scan of one document yields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedDocument {
    /// Failure references in document order
    pub failures: Vec<FailureReference>,
    /// Every other hyperlink target
    pub links: Vec<String>,
    /// Runner label per result column
    pub runners: Vec<String>,
    /// Toolset label per result column
    pub toolsets: Vec<String>,
}

/// Source of failure references
pub trait DocumentScanner: Send + Sync {
    fn scan(&self, markup: &str) -> Result<ScannedDocument, TriageError>;
}

/// Scanner for the HTML regression summary pages
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlReportScanner;

fn selector(expr: &str) -> Result<Selector, TriageError> {
    Selector::parse(expr)
        .map_err(|e| TriageError::MalformedDocument(format!("bad selector '{}': {}", expr, e)))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn is_result_cell(el: ElementRef<'_>) -> bool {
    el.value().classes().any(|c| c.starts_with(RESULT_CLASS_PREFIX))
}

impl DocumentScanner for HtmlReportScanner {
    fn scan(&self, markup: &str) -> Result<ScannedDocument, TriageError> {
        let document = Html::parse_document(markup);

        let row_sel = selector("tr")?;
        let cell_sel = selector("td, th")?;
        let runner_sel = selector("td.runner, th.runner")?;
        let toolset_sel = selector("td.toolset-name, th.toolset-name")?;
        let link_sel = selector("a[href]")?;

        let rows: Vec<ElementRef<'_>> = document.select(&row_sel).collect();
        if rows.is_empty() {
            return Err(TriageError::MalformedDocument(
                "no table rows found".to_string(),
            ));
        }

        let mut scanned = ScannedDocument::default();

        for cell in document.select(&runner_sel) {
            let span = cell
                .value()
                .attr("colspan")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(1)
                .max(1);
            let label = text_of(cell);
            scanned.runners.extend(std::iter::repeat(label).take(span));
        }

        scanned.toolsets = document.select(&toolset_sel).map(text_of).collect();

        let mut failure_links = HashSet::new();

        for row in rows {
            let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
            let test = cells
                .iter()
                .find(|c| has_class(**c, "test-name"))
                .or_else(|| cells.first())
                .map(|c| text_of(*c))
                .unwrap_or_default();

            let mut column = 0;
            for cell in cells.iter().filter(|c| is_result_cell(**c)) {
                if has_class(*cell, FAIL_CLASS) {
                    if let Some(anchor) = cell.select(&link_sel).next() {
                        let href = anchor.value().attr("href").unwrap_or_default();
                        failure_links.insert(anchor.id());
                        scanned.failures.push(FailureReference {
                            test: test.clone(),
                            runner: scanned.runners.get(column).cloned().unwrap_or_default(),
                            toolset: scanned.toolsets.get(column).cloned().unwrap_or_default(),
                            raw_href: href.to_string(),
                        });
                    }
                }
                column += 1;
            }
        }

        scanned.links = document
            .select(&link_sel)
            .filter(|a| !failure_links.contains(&a.id()))
            .filter_map(|a| a.value().attr("href").map(str::to_string))
            .collect();

        Ok(scanned)
    }
}
