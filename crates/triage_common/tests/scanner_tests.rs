//! Tests for scanner.rs

use triage_common::scanner::{DocumentScanner, HtmlReportScanner};
use triage_shared::TriageError;

const PAGE: &str = r#"<html><body>
<a href="../index.html">back</a>
<table class="library-table">
  <thead>
    <tr><td class="head">runner</td><td colspan="2" class="runner">teeks99-03</td><td class="runner">msvc-box</td></tr>
    <tr><td class="head">toolset</td><td class="toolset-name">gcc-4.9</td><td class="toolset-name">clang-3.5</td><td class="toolset-name">msvc-12.0</td></tr>
  </thead>
  <tbody>
    <tr>
      <td class="test-name"><a href="../../libs/geometry/test/buffer.cpp">buffer</a></td>
      <td class="library-success-expected">pass</td>
      <td class="library-fail-unexpected-new"><a href="/developer/output/teeks99-03-buffer-clang.html">fail</a></td>
      <td class="library-fail-unexpected-new"><a href="http://logs.example/msvc-buffer.html">fail</a></td>
    </tr>
    <tr>
      <td class="test-name">area</td>
      <td class="library-fail-unexpected-new"><a href="developer/output/teeks99-03-area-gcc.html">fail</a></td>
      <td class="library-fail-expected"><a href="developer/output/expected.html">fail*</a></td>
      <td class="library-missing"></td>
    </tr>
  </tbody>
</table>
</body></html>"#;

#[test]
fn test_scan_finds_unexpected_failures_with_labels() {
    let scanned = HtmlReportScanner.scan(PAGE).unwrap();

    assert_eq!(scanned.runners, vec!["teeks99-03", "teeks99-03", "msvc-box"]);
    assert_eq!(scanned.toolsets, vec!["gcc-4.9", "clang-3.5", "msvc-12.0"]);
    assert_eq!(scanned.failures.len(), 3);

    let first = &scanned.failures[0];
    assert_eq!(first.test, "buffer");
    assert_eq!(first.runner, "teeks99-03");
    assert_eq!(first.toolset, "clang-3.5");
    assert_eq!(first.raw_href, "/developer/output/teeks99-03-buffer-clang.html");

    let second = &scanned.failures[1];
    assert_eq!(second.runner, "msvc-box");
    assert_eq!(second.toolset, "msvc-12.0");
    assert_eq!(second.raw_href, "http://logs.example/msvc-buffer.html");

    let third = &scanned.failures[2];
    assert_eq!(third.test, "area");
    assert_eq!(third.toolset, "gcc-4.9");
}

#[test]
fn test_scan_separates_other_links() {
    let scanned = HtmlReportScanner.scan(PAGE).unwrap();
    assert_eq!(
        scanned.links,
        vec![
            "../index.html",
            "../../libs/geometry/test/buffer.cpp",
            "developer/output/expected.html",
        ]
    );
}

#[test]
fn test_missing_labels_are_empty() {
    let page = r#"<table><tr><td>t</td><td class="library-fail-unexpected-new"><a href="x.html">fail</a></td></tr></table>"#;
    let scanned = HtmlReportScanner.scan(page).unwrap();
    assert_eq!(scanned.failures.len(), 1);
    assert_eq!(scanned.failures[0].test, "t");
    assert_eq!(scanned.failures[0].runner, "");
    assert_eq!(scanned.failures[0].toolset, "");
}

#[test]
fn test_document_without_table_is_malformed() {
    let err = HtmlReportScanner.scan("<html><body><p>Service unavailable</p></body></html>");
    assert!(matches!(err, Err(TriageError::MalformedDocument(_))));
    assert!(HtmlReportScanner.scan("").is_err());
}
