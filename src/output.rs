use serde::Serialize;

use crate::{docset::Doc, search::SearchResult, text_util::format_bytes};

/// `available` with a query stops listing after this many matches.
pub const AVAILABLE_QUERY_LIMIT: usize = 50;

/// One row of `devshelf list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstalledDoc {
    pub slug: String,
    pub name: String,
    pub release: String,
    pub version: String,
    pub entries: usize,
    pub db_size: u64,
}

fn version_label(release: &str, version: &str) -> String {
    if version.is_empty() {
        release.to_string()
    } else {
        format!("{release} ({version})")
    }
}

/// Pretty-printed JSON, as emitted by `--json`.
pub fn to_json<T: Serialize + ?Sized>(
    value: &T,
) -> crate::error::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Numbered, column-aligned result listing for `search --list`.
pub fn format_result_list(results: &[SearchResult]) -> String {
    let name_w = column_width(results.iter().map(|r| r.entry.name.as_str()));
    let kind_w = column_width(results.iter().map(|r| r.entry.kind.as_str()));
    let doc_w = column_width(results.iter().map(|r| r.source_id.as_str()));

    let mut out = format!("Found {} result(s):\n\n", results.len());
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!(
            "{:>2}. {:<name_w$}  {:<kind_w$}  {:<doc_w$}  {:.2}\n",
            i + 1,
            r.entry.name,
            r.entry.kind,
            r.source_id,
            r.score,
        ));
    }
    out
}

/// Header printed above the rendered content of the best match.
pub fn format_match_header(result: &SearchResult) -> String {
    format!(
        "\n{} [{}]\n  Doc: {}\n  Score: {:.2}\n  Path: {}\n\n--- Content ---",
        result.entry.name,
        result.entry.kind,
        result.source_id,
        result.score,
        result.entry.path
    )
}

/// Table of installed docs for `devshelf list`.
pub fn format_installed(docs: &[InstalledDoc]) -> String {
    let rows: Vec<[String; 4]> = docs
        .iter()
        .map(|d| {
            [
                d.name.clone(),
                version_label(&d.release, &d.version),
                d.entries.to_string(),
                format_bytes(d.db_size),
            ]
        })
        .collect();

    let headers = ["NAME", "VERSION", "ENTRIES", "SIZE"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 4]| {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    };
    push_row(headers);
    push_row(headers.map(|h| if h.len() == 4 { "----" } else { "-------" }));
    for row in &rows {
        push_row([&row[0], &row[1], &row[2], &row[3]]);
    }
    out
}

/// Catalog docs whose name contains `query` (case-insensitive), in catalog
/// order. With a non-empty query at most [`AVAILABLE_QUERY_LIMIT`] docs are
/// returned and the flag reports whether more matched.
pub fn matching_docs<'a>(
    catalog: &'a [Doc],
    query: Option<&str>,
) -> (Vec<&'a Doc>, bool) {
    let Some(needle) = query.map(str::to_lowercase).filter(|q| !q.is_empty())
    else {
        return (catalog.iter().collect(), false);
    };

    let mut matches = catalog
        .iter()
        .filter(|doc| doc.name.to_lowercase().contains(&needle));
    let shown: Vec<&Doc> = matches.by_ref().take(AVAILABLE_QUERY_LIMIT).collect();
    let truncated = matches.next().is_some();
    (shown, truncated)
}

/// Catalog listing for `devshelf available`, grouped by first letter.
pub fn format_available(
    total: usize,
    docs: &[&Doc],
    truncated: bool,
    query: Option<&str>,
) -> String {
    if total == 0 {
        return "No documentation available.\n".to_string();
    }

    let mut out = format!("Available documentation ({total} total):\n");
    let mut letter = None;
    for doc in docs {
        let first = doc.name.chars().next().map(|c| c.to_ascii_uppercase());
        if let Some(c) = first
            && first != letter
        {
            letter = first;
            out.push_str(&format!("\n[{c}]\n"));
        }

        let alias = if doc.alias.is_empty() {
            String::new()
        } else {
            format!("[{}]", doc.alias)
        };
        let line = format!(
            "  {:<30} {:<15} {} {}",
            doc.name,
            version_label(&doc.release, &doc.version),
            format_bytes(doc.db_size),
            alias
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    let filtered = query.is_some_and(|q| !q.is_empty());
    if truncated {
        out.push_str(&format!(
            "\n... (showing first {AVAILABLE_QUERY_LIMIT} matches)\n"
        ));
    } else if filtered && docs.is_empty() {
        out.push_str("\nNo docs match that name.\n");
    }
    if !filtered {
        out.push_str(
            "\nTo install documentation, run:\n  \
             devshelf import <doc> --index index.json --db db.json\n  \
             devshelf import <doc>@<version> --index index.json --db db.json   # e.g. react@18\n",
        );
    }
    out
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.map(|v| v.chars().count()).max().unwrap_or(0)
}
