//! Rendering of triage results and change reports.

use triage_shared::{sorted_entries, DiffEntry, LibraryDiff, LibrarySnapshot, ReasonCode};

/// Stylesheet linked by every page, copied into the output directory
pub const STYLESHEET: &str = "master.css";

/// Minimal HTML escaping for text and attribute values
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn reason_cell(reason: ReasonCode, url: &str) -> String {
    let style = reason
        .highlight()
        .map(|c| format!(" style=\"background-color: {};\"", c))
        .unwrap_or_default();
    let label = reason.label();
    if url.is_empty() {
        format!("<td{}>{}</td>", style, label)
    } else {
        format!(
            "<td{}><a href=\"{}\">{}</a></td>",
            style,
            escape_html(url),
            label
        )
    }
}

/// Standalone HTML page listing one library's classified failures
pub fn render_library_page(snapshot: &LibrarySnapshot, generated_at: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>{} failures</title>\n<link rel=\"stylesheet\" type=\"text/css\" href=\"{}\">\n",
        escape_html(&snapshot.name),
        STYLESHEET
    ));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(&snapshot.name)));
    html.push_str(&format!("<p>Generated {}</p>\n", escape_html(generated_at)));

    if snapshot.is_empty() {
        html.push_str("<p>No unexpected failures.</p>\n");
    } else {
        let counts = snapshot.reason_counts();
        let summary: Vec<String> = counts
            .iter()
            .rev()
            .map(|(reason, n)| format!("{}: {}", reason, n))
            .collect();
        html.push_str(&format!("<p>{}</p>\n", escape_html(&summary.join(", "))));

        html.push_str("<table class=\"library-table\">\n");
        html.push_str("<tr><th>Test</th><th>Runner</th><th>Toolset</th><th>Reason</th></tr>\n");
        for record in snapshot.records() {
            html.push_str(&format!(
                "<tr><td class=\"test-name\">{}</td><td>{}</td><td>{}</td>{}</tr>\n",
                escape_html(&record.identity.test),
                escape_html(&record.identity.runner),
                escape_html(&record.identity.toolset),
                reason_cell(record.reason, &record.url)
            ));
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// One-line summary of a library's classification
pub fn format_library_summary(snapshot: &LibrarySnapshot) -> String {
    if snapshot.is_empty() {
        return format!("{}: no unexpected failures", snapshot.name);
    }
    let counts: Vec<String> = snapshot
        .reason_counts()
        .iter()
        .rev()
        .map(|(reason, n)| format!("{} {}", n, reason))
        .collect();
    format!("{}: {}", snapshot.name, counts.join(", "))
}

fn format_entry(library: &str, entry: &DiffEntry) -> String {
    let id = entry.identity();
    match entry {
        DiffEntry::New { current } => format!(
            "  {}: {} [{} / {}] {}",
            library, id.test, id.runner, id.toolset, current.reason
        ),
        DiffEntry::Changed { current, previous } => format!(
            "  {}: {} [{} / {}] {} -> {}",
            library, id.test, id.runner, id.toolset, previous.reason, current.reason
        ),
        DiffEntry::Resolved { previous } => format!(
            "  {}: {} [{} / {}] was {}",
            library, id.test, id.runner, id.toolset, previous.reason
        ),
    }
}

/// Plain-text change report over all libraries, grouped by kind and
/// ordered by (library, test, runner, toolset)
pub fn render_diff_text(diffs: &[LibraryDiff]) -> String {
    let entries = sorted_entries(diffs);
    if entries.is_empty() {
        return "No changes.".to_string();
    }

    let mut sections = Vec::new();
    for (kind, title) in [("new", "New"), ("changed", "Changed"), ("resolved", "Resolved")] {
        let lines: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.kind() == kind)
            .map(|(lib, e)| format_entry(lib, e))
            .collect();
        if !lines.is_empty() {
            sections.push(format!("{} ({}):\n{}", title, lines.len(), lines.join("\n")));
        }
    }
    sections.join("\n\n")
}

/// True if any library has something to report
pub fn has_changes(diffs: &[LibraryDiff]) -> bool {
    diffs.iter().any(|d| !d.is_empty())
}
