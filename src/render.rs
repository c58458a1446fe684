use scraper::{ElementRef, Html, Node};

use crate::{
    markdown::{self, flattened_text},
    readability,
    text_util::{MAX_NESTING, tidy_output},
};

/// Output format for rendered entry content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Plain text with light structure markers
    #[default]
    Text,
    /// Markdown
    #[value(name = "md", alias = "markdown")]
    Markdown,
}

/// Turns stored entry HTML into something readable in a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    format: Format,
}

impl Renderer {
    pub fn new(format: Format) -> Self {
        Self { format }
    }

    /// Render raw HTML bytes. Never fails: invalid UTF-8 is decoded lossily
    /// and if main-content extraction finds nothing the raw HTML is
    /// converted instead.
    pub fn render(&self, raw_html: &[u8]) -> String {
        let html = String::from_utf8_lossy(raw_html);
        let source = match readability::extract_main_content(&html) {
            Ok(cleaned) => cleaned,
            Err(e) => {
                tracing::warn!(error = %e, "rendering unfiltered HTML");
                html.into_owned()
            }
        };

        match self.format {
            Format::Text => html_to_text(&source),
            Format::Markdown => markdown::html_to_markdown(&source),
        }
    }
}

const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "title", "iframe",
    "svg", "canvas", "object", "embed",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "br", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol",
    "dl", "dt", "dd", "tr", "table", "blockquote", "section", "article",
    "main", "hr", "figure", "figcaption",
];

/// Plain-text rendering: block elements on their own lines, `[link text]`,
/// fenced `pre` blocks, text nodes joined by single spaces.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    text_children(document.root_element(), &mut out, 0);
    tidy_output(&out)
}

fn text_children(element: ElementRef<'_>, out: &mut String, depth: usize) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push_str(text);
                    out.push(' ');
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    text_element(child, out, depth);
                }
            }
            _ => {}
        }
    }
}

fn text_element(element: ElementRef<'_>, out: &mut String, depth: usize) {
    let value = element.value();
    let name = value.name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }
    if depth >= MAX_NESTING {
        let text = flattened_text(element, SKIPPED_TAGS);
        let text = text.trim();
        if !text.is_empty() {
            out.push_str(text);
            out.push(' ');
        }
        return;
    }

    match name {
        "pre" => {
            let code: String = element.text().collect();
            out.push_str("\n```\n");
            out.push_str(code.trim_matches('\n'));
            out.push_str("\n```\n");
            return;
        }
        "code" => {
            let code: String = element.text().collect();
            let code = code.trim();
            if !code.is_empty() {
                out.push('`');
                out.push_str(code);
                out.push_str("` ");
            }
            return;
        }
        _ => {}
    }

    let block = BLOCK_TAGS.contains(&name);
    let link = name == "a" && value.attr("href").is_some();

    if block {
        out.push('\n');
    }
    if link {
        out.push('[');
    }

    text_children(element, out, depth + 1);

    if link {
        let kept = out.trim_end_matches(' ').len();
        out.truncate(kept);
        out.push_str("] ");
    }
    if block && name != "br" {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAV_PAGE: &str = r#"<html><body>
<nav id="main-nav"><a href="/home">Home</a><a href="/about">About</a></nav>
<main>
<h1>Main Content</h1>
<p>This is the main article content.</p>
</main>
<footer>Copyright 2024</footer>
</body></html>"#;

    fn markdown(html: &str) -> String {
        Renderer::new(Format::Markdown).render(html.as_bytes())
    }

    fn text(html: &str) -> String {
        Renderer::new(Format::Text).render(html.as_bytes())
    }

    #[test]
    fn markdown_basic_document() {
        let md = markdown(
            "<html><body><h1>Test Title</h1>\n\
             <p>This is a <strong>test</strong> paragraph.</p></body></html>",
        );
        assert_eq!(md, "# Test Title\n\nThis is a **test** paragraph.");
    }

    #[test]
    fn markdown_removes_css() {
        let md = markdown(
            "<html><head><style>\nbody { color: red; }\n.navigation { display: none; }\n\
             </style></head><body><h1>Title</h1></body></html>",
        );
        assert_eq!(md, "# Title");
    }

    #[test]
    fn markdown_removes_scripts() {
        let md = markdown(
            "<html><body>\n<h1>Title</h1>\n<script>console.log(\"test\");</script>\n\
             <p>Content</p>\n</body></html>",
        );
        assert!(md.contains("# Title"));
        assert!(md.contains("Content"));
        assert!(!md.contains("console.log"));
        assert!(!md.contains("script"));
    }

    #[test]
    fn markdown_removes_navigation() {
        let md = markdown(NAV_PAGE);
        assert_eq!(md, "# Main Content\n\nThis is the main article content.");
    }

    #[test]
    fn markdown_code_blocks() {
        let md = markdown(
            "<html><body>\n<h1>Code Example</h1>\n\
             <pre><code>function test() {\n  return true;\n}</code></pre>\n</body></html>",
        );
        assert!(md.contains("# Code Example"));
        assert!(md.contains("```\nfunction test() {\n  return true;\n}\n```"));
    }

    #[test]
    fn markdown_links_and_lists() {
        let md = markdown(
            "<p>Check out <a href=\"https://example.com\">this link</a> for more info.</p>\
             <h1>Todo List</h1><ul>\n<li>First item</li>\n<li>Second item</li>\n\
             <li>Third item</li>\n</ul>",
        );
        assert!(md.contains("[this link](https://example.com)"));
        assert!(md.contains("- First item\n- Second item\n- Third item"));
    }

    #[test]
    fn markdown_has_no_blank_runs_or_outer_whitespace() {
        let md = markdown(
            "\n\n<div>\n\n<p>a</p>\n\n\n<br><br><br>\n\n<p>b</p>\n\n</div>\n\n",
        );
        assert!(!md.contains("\n\n\n"));
        assert_eq!(md, md.trim());
    }

    #[test]
    fn chrome_only_page_falls_back_to_raw() {
        let md = markdown("<nav><a href=\"/\">Home</a></nav><script>x()</script>");
        assert_eq!(md, "[Home](/)");
    }

    #[test]
    fn malformed_html_never_fails() {
        for input in [
            "<div><p>unclosed <b>bold",
            "</p></div>>>><<",
            "<<<script",
            "<table><tr><td>cell",
            "",
        ] {
            let _ = markdown(input);
            let _ = text(input);
        }
        assert_eq!(markdown("<div><p>unclosed <b>bold"), "unclosed **bold**");
    }

    #[test]
    fn invalid_utf8_is_tolerated() {
        let out =
            Renderer::new(Format::Text).render(b"<p>caf\xe9 au lait</p>");
        assert!(out.contains("au lait"));
    }

    #[test]
    fn text_mode_strips_markup_and_css() {
        let out = text(
            "<html><head><style>body { color: red; }</style></head><body>\n\
             <h1>Title</h1>\n<p>This is <strong>bold</strong> text.</p>\n</body></html>",
        );
        assert_eq!(out, "Title\n\nThis is bold text.");
    }

    #[test]
    fn text_mode_links_and_code() {
        let out = text(
            "<p>See <a href=\"/x\">the docs</a> and <code>map()</code>.</p>\
             <pre>let a = 1;\nlet b = 2;</pre>",
        );
        assert!(out.contains("See [the docs] and `map()` ."));
        assert!(out.contains("```\nlet a = 1;\nlet b = 2;\n```"));
    }

    #[test]
    fn text_mode_list_items_on_own_lines() {
        let out = text("<ul><li>one</li><li>two</li></ul>");
        assert_eq!(out, "one\n\ntwo");
    }

    #[test]
    fn deeply_nested_html_renders_on_the_calling_thread() {
        let depth = 50_000;
        let html = format!(
            "{}<p>deep text</p>{}",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        );

        assert!(markdown(&html).contains("deep text"));
        assert!(text(&html).contains("deep text"));
    }

    #[test]
    fn renderer_is_shareable_across_threads() {
        let renderer = Renderer::new(Format::Markdown);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    assert!(renderer.render(NAV_PAGE.as_bytes()).contains("# Main"));
                });
            }
        });
    }
}
