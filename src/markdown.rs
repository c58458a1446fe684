//! HTML to markdown conversion.

use scraper::{ElementRef, Html, Node};

use crate::text_util::{MAX_NESTING, collapse_whitespace, tidy_output};

/// Elements whose content is never output.
const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "title", "iframe",
    "svg", "canvas", "object", "embed",
];

/// Elements rendered as separate paragraphs.
const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "main",
    "header",
    "footer",
    "aside",
    "nav",
    "figure",
    "figcaption",
    "details",
    "summary",
    "address",
    "center",
    "dl",
    "form",
    "fieldset",
];

/// Convert an HTML document or fragment to markdown.
///
/// The result has no trailing whitespace on any line, no runs of more than
/// one blank line and no leading or trailing whitespace.
pub fn html_to_markdown(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut writer = Writer::default();
    writer.children(document.root_element());
    tidy_output(&writer.out)
}

#[derive(Default)]
struct Writer {
    out: String,
    /// Nesting depth of the list this writer renders an item for.
    list_depth: usize,
    /// Set for sub-writers rendering inline content, where leading
    /// whitespace is significant.
    inline: bool,
    /// Element nesting depth of the node being rendered.
    depth: usize,
}

impl Writer {
    fn nested(&self, list_depth: usize) -> Self {
        Self {
            out: String::new(),
            list_depth,
            inline: false,
            depth: self.depth,
        }
    }

    fn inline_of(&self, element: ElementRef<'_>) -> String {
        let mut writer = Self {
            out: String::new(),
            list_depth: self.list_depth,
            inline: true,
            depth: self.depth,
        };
        writer.children(element);
        writer.out
    }

    fn children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn text(&mut self, raw: &str) {
        let collapsed = collapse_whitespace(raw);
        if collapsed.is_empty() {
            return;
        }
        let at_line_start = (self.out.is_empty() && !self.inline)
            || self.out.ends_with('\n')
            || self.out.ends_with(' ');
        if at_line_start {
            self.out.push_str(collapsed.trim_start());
        } else {
            self.out.push_str(&collapsed);
        }
    }

    fn block_break(&mut self) {
        if self.out.is_empty() {
            return;
        }
        let kept = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(kept);
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn line_break(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if SKIPPED_TAGS.contains(&name) {
            return;
        }
        if self.depth >= MAX_NESTING {
            self.text(&flattened_text(element, SKIPPED_TAGS));
            return;
        }

        self.depth += 1;
        self.markup(element, name);
        self.depth -= 1;
    }

    fn markup(&mut self, element: ElementRef<'_>, name: &str) {
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(name.as_bytes()[1] - b'0');
                self.heading(element, level);
            }
            "br" => self.out.push('\n'),
            "hr" => {
                self.block_break();
                self.out.push_str("---");
                self.block_break();
            }
            "strong" | "b" => self.wrap_inline(element, "**"),
            "em" | "i" => self.wrap_inline(element, "*"),
            "del" | "s" | "strike" => self.wrap_inline(element, "~~"),
            "code" | "kbd" | "samp" | "tt" => self.inline_code(element),
            "pre" => self.code_block(element),
            "a" => self.link(element),
            "img" => self.image(element),
            "ul" => self.list(element, false),
            "ol" => self.list(element, true),
            "li" => self.list_item(element, "- "),
            "blockquote" => self.blockquote(element),
            "table" => self.table(element),
            "dt" => {
                self.block_break();
                let term = collapse_whitespace(&self.inline_of(element));
                let term = term.trim();
                if !term.is_empty() {
                    self.out.push_str("**");
                    self.out.push_str(term);
                    self.out.push_str("**\n");
                }
            }
            "dd" => {
                self.line_break();
                self.children(element);
                self.block_break();
            }
            _ if BLOCK_TAGS.contains(&name) => {
                self.block_break();
                self.children(element);
                self.block_break();
            }
            _ => self.children(element),
        }
    }

    fn heading(&mut self, element: ElementRef<'_>, level: usize) {
        let text = collapse_whitespace(&self.inline_of(element));
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.block_break();
        self.out.push_str(&"#".repeat(level));
        self.out.push(' ');
        self.out.push_str(text);
        self.block_break();
    }

    fn wrap_inline(&mut self, element: ElementRef<'_>, marker: &str) {
        let inner = self.inline_of(element);
        let trimmed = inner.trim();
        if trimmed.is_empty() {
            self.text(&inner);
            return;
        }
        if inner.starts_with(char::is_whitespace) {
            self.text(" ");
        }
        self.out.push_str(marker);
        self.out.push_str(trimmed);
        self.out.push_str(marker);
        if inner.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn inline_code(&mut self, element: ElementRef<'_>) {
        let code: String = element.text().collect();
        let code = code.replace('\n', " ");
        let code = code.trim();
        if code.is_empty() {
            return;
        }
        if code.contains('`') {
            self.out.push_str("`` ");
            self.out.push_str(code);
            self.out.push_str(" ``");
        } else {
            self.out.push('`');
            self.out.push_str(code);
            self.out.push('`');
        }
    }

    fn code_block(&mut self, element: ElementRef<'_>) {
        let code: String = element.text().collect();
        let code = code.trim_matches('\n');
        let fence = if code.contains("```") { "~~~" } else { "```" };

        self.block_break();
        self.out.push_str(fence);
        if let Some(lang) = code_language(element) {
            self.out.push_str(&lang);
        }
        self.out.push('\n');
        self.out.push_str(code);
        self.out.push('\n');
        self.out.push_str(fence);
        self.block_break();
    }

    fn link(&mut self, element: ElementRef<'_>) {
        let text = collapse_whitespace(&self.inline_of(element));
        let label = text.trim();
        let href = element
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty());

        match href {
            Some(href) if !label.is_empty() => {
                if text.starts_with(' ') {
                    self.text(" ");
                }
                self.out.push('[');
                self.out.push_str(label);
                self.out.push_str("](");
                self.out.push_str(href);
                self.out.push(')');
                if text.ends_with(' ') {
                    self.out.push(' ');
                }
            }
            _ => self.text(&text),
        }
    }

    fn image(&mut self, element: ElementRef<'_>) {
        let value = element.value();
        let Some(src) = value.attr("src").filter(|src| !src.is_empty()) else {
            return;
        };
        let alt = collapse_whitespace(value.attr("alt").unwrap_or_default());
        self.out.push_str("![");
        self.out.push_str(alt.trim());
        self.out.push_str("](");
        self.out.push_str(src);
        self.out.push(')');
    }

    fn list(&mut self, element: ElementRef<'_>, ordered: bool) {
        if self.list_depth == 0 {
            self.block_break();
        } else {
            self.line_break();
        }

        let mut number = element
            .value()
            .attr("start")
            .and_then(|start| start.trim().parse::<usize>().ok())
            .unwrap_or(1);

        for child in element.children().filter_map(ElementRef::wrap) {
            if child.value().name() != "li" {
                self.element(child);
                continue;
            }
            let marker = if ordered {
                format!("{number}. ")
            } else {
                "- ".to_string()
            };
            number += 1;
            self.list_item(child, &marker);
        }

        if self.list_depth == 0 {
            self.block_break();
        }
    }

    fn list_item(&mut self, element: ElementRef<'_>, marker: &str) {
        let mut writer = self.nested(self.list_depth + 1);
        writer.children(element);
        let body = tidy_output(&writer.out);

        self.line_break();
        let indent = " ".repeat(marker.len());
        let mut lines = body.lines();
        self.out.push_str(marker.trim_end());
        if let Some(first) = lines.next() {
            self.out.push(' ');
            self.out.push_str(first);
        }
        for line in lines {
            self.out.push('\n');
            if !line.is_empty() {
                self.out.push_str(&indent);
                self.out.push_str(line);
            }
        }
        self.out.push('\n');
    }

    fn blockquote(&mut self, element: ElementRef<'_>) {
        let mut writer = self.nested(0);
        writer.children(element);
        let body = tidy_output(&writer.out);
        if body.is_empty() {
            return;
        }

        self.block_break();
        for (i, line) in body.lines().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            if line.is_empty() {
                self.out.push('>');
            } else {
                self.out.push_str("> ");
                self.out.push_str(line);
            }
        }
        self.block_break();
    }

    fn table(&mut self, element: ElementRef<'_>) {
        let rows: Vec<Vec<String>> = element
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|row| row.value().name() == "tr")
            .map(|row| {
                row.children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                    .map(|cell| {
                        collapse_whitespace(&self.inline_of(cell))
                            .trim()
                            .replace('|', "\\|")
                    })
                    .collect()
            })
            .filter(|cells: &Vec<String>| !cells.is_empty())
            .collect();

        if rows.is_empty() {
            self.block_break();
            self.children(element);
            self.block_break();
            return;
        }

        self.block_break();
        for (i, cells) in rows.iter().enumerate() {
            self.out.push_str("| ");
            self.out.push_str(&cells.join(" | "));
            self.out.push_str(" |\n");
            if i == 0 {
                let separator = vec!["---"; cells.len()].join(" | ");
                self.out.push_str("| ");
                self.out.push_str(&separator);
                self.out.push_str(" |\n");
            }
        }
        self.block_break();
    }
}

/// All text below `element`, leaving out anything inside a `skipped` tag.
///
/// Walks descendants iteratively, so nesting depth does not matter.
pub(crate) fn flattened_text(
    element: ElementRef<'_>,
    skipped: &[&str],
) -> String {
    let root = element.id();
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root)
            .filter_map(ElementRef::wrap)
            .any(|ancestor| skipped.contains(&ancestor.value().name()));
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

/// Language hint from `data-language` or a `language-*` / `lang-*` class on
/// the `<pre>` or its `<code>` child.
fn code_language(pre: ElementRef<'_>) -> Option<String> {
    let code = pre
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "code");

    [Some(pre), code].into_iter().flatten().find_map(|element| {
        let value = element.value();
        if let Some(lang) = value.attr("data-language") {
            let lang = lang.trim();
            if !lang.is_empty() {
                return Some(lang.to_string());
            }
        }
        value.classes().find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .filter(|lang| !lang.is_empty())
                .map(str::to_string)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_and_emphasis() {
        let md = html_to_markdown(
            "<h1>Test Title</h1><p>This is a <strong>test</strong> \
             paragraph with <em>style</em>.</p><h3>Sub</h3>",
        );
        assert_eq!(
            md,
            "# Test Title\n\nThis is a **test** paragraph with *style*.\n\n### Sub"
        );
    }

    #[test]
    fn links_and_inline_code() {
        let md = html_to_markdown(
            r#"<p>Check out <a href="https://example.com">this link</a> or call <code>map()</code>.</p>"#,
        );
        assert_eq!(
            md,
            "Check out [this link](https://example.com) or call `map()`."
        );
    }

    #[test]
    fn link_without_href_keeps_text() {
        let md = html_to_markdown("<p>An <a name=\"x\">anchor</a> here</p>");
        assert_eq!(md, "An anchor here");
    }

    #[test]
    fn code_block_with_language() {
        let md = html_to_markdown(
            "<pre data-language=\"javascript\">function test() {\n  return true;\n}</pre>",
        );
        assert_eq!(
            md,
            "```javascript\nfunction test() {\n  return true;\n}\n```"
        );
    }

    #[test]
    fn code_block_language_from_class() {
        let md = html_to_markdown(
            "<pre><code class=\"hljs language-rust\">fn main() {}</code></pre>",
        );
        assert_eq!(md, "```rust\nfn main() {}\n```");
    }

    #[test]
    fn unordered_and_ordered_lists() {
        let md = html_to_markdown(
            "<ul><li>First item</li><li>Second item</li></ul>\
             <ol start=\"3\"><li>three</li><li>four</li></ol>",
        );
        assert_eq!(md, "- First item\n- Second item\n\n3. three\n4. four");
    }

    #[test]
    fn nested_lists_are_indented() {
        let md = html_to_markdown(
            "<ul><li>Parent<ul><li>Child</li></ul></li><li>Next</li></ul>",
        );
        assert_eq!(md, "- Parent\n  - Child\n- Next");
    }

    #[test]
    fn blockquote_prefixes_lines() {
        let md = html_to_markdown(
            "<blockquote><p>One</p><p>Two</p></blockquote>",
        );
        assert_eq!(md, "> One\n>\n> Two");
    }

    #[test]
    fn tables_become_pipe_rows() {
        let md = html_to_markdown(
            "<table><tr><th>Name</th><th>Type</th></tr>\
             <tr><td>a|b</td><td>string</td></tr></table>",
        );
        assert_eq!(
            md,
            "| Name | Type |\n| --- | --- |\n| a\\|b | string |"
        );
    }

    #[test]
    fn definition_lists() {
        let md = html_to_markdown(
            "<dl><dt>size</dt><dd>Number of items.</dd></dl>",
        );
        assert_eq!(md, "**size**\nNumber of items.");
    }

    #[test]
    fn images_and_rules() {
        let md = html_to_markdown(
            "<p><img src=\"a.png\" alt=\"Diagram\"></p><hr><p>after</p>",
        );
        assert_eq!(md, "![Diagram](a.png)\n\n---\n\nafter");
    }

    #[test]
    fn skips_script_and_style_bodies() {
        let md = html_to_markdown(
            "<style>.x { color: red; }</style><p>Text</p><script>alert(1)</script>",
        );
        assert_eq!(md, "Text");
    }

    #[test]
    fn blank_runs_collapse() {
        let md = html_to_markdown(
            "<div><p>a</p><br><br><br><br><p>b</p></div>",
        );
        assert!(!md.contains("\n\n\n"));
        assert!(md.starts_with('a'));
        assert!(md.ends_with('b'));
    }

    #[test]
    fn deep_nesting_is_flattened() {
        let depth = 5_000;
        let html = format!(
            "{}<p>deep <b>text</b></p><script>hidden()</script>{}",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        );
        let md = html_to_markdown(&html);
        assert!(md.contains("deep text"));
        assert!(!md.contains("hidden"));
    }

    #[test]
    fn flattened_text_skips_listed_tags() {
        let document = Html::parse_fragment(
            "<div>a<style>x</style><span>b<script>y</script></span></div>",
        );
        assert_eq!(flattened_text(document.root_element(), SKIPPED_TAGS), "ab");
    }

    #[test]
    fn entities_are_decoded() {
        let md = html_to_markdown("<p>a &lt; b &amp;&amp; c</p>");
        assert_eq!(md, "a < b && c");
    }
}
