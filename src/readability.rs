//! Boilerplate removal ahead of text/markdown conversion.
//!
//! The pass drops scripts, styles and page chrome (navigation, menus,
//! headers, footers, sidebars, link farms) and, when the page marks its main
//! content with `<main>`, `<article>` or `role="main"`, keeps only that
//! landmark. What survives is serialized back to an HTML fragment.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

use crate::{markdown::flattened_text, text_util::MAX_NESTING};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no readable content left after removing page chrome")]
    Empty,
}

/// Elements that never carry article content.
const CHROME_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "iframe", "nav",
    "header", "footer", "aside", "form", "button", "input", "select",
    "textarea", "svg", "canvas", "object", "embed", "link", "meta", "title",
];

/// Elements never dropped on id/class naming alone.
const NAME_EXEMPT_TAGS: &[&str] = &[
    "html", "body", "main", "article", "a", "h1", "h2", "h3", "h4", "h5",
    "h6", "p", "pre", "code", "table", "thead", "tbody", "tr", "td", "th",
];

const CHROME_ROLES: &[&str] = &[
    "navigation",
    "banner",
    "contentinfo",
    "menu",
    "menubar",
    "complementary",
    "search",
];

const LINK_FARM_TAGS: &[&str] = &["ul", "ol", "div", "section", "menu", "table"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "source", "track", "wbr",
];

const KEPT_ATTRS: &[&str] = &[
    "href",
    "src",
    "alt",
    "title",
    "id",
    "class",
    "lang",
    "data-language",
    "start",
    "colspan",
    "rowspan",
];

static UNLIKELY_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)-ad-|ad-break|agegate|banner|breadcrumb|combx|comment|community|cookie|disqus|extra|footer|gdpr|header|menu|modal|navbar|navigation|pager|pagination|popup|related|remark|replies|rss|share|shoutbox|sidebar|skip-link|skyscraper|social|sponsor|subscribe|supplemental|toolbar|yom-remote",
    )
    .expect("literal pattern")
});

static MAYBE_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)and|article|body|column|content|main|shadow")
        .expect("literal pattern")
});

/// Link text at or above this share of an element's text marks a link farm.
const LINK_DENSITY_LIMIT: f64 = 0.8;
const LINK_FARM_MIN_LINKS: usize = 3;

/// Strip non-article content from `html` and return the remaining fragment.
pub fn extract_main_content(html: &str) -> Result<String, ExtractError> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let start = find_landmark(root).unwrap_or(root);

    let mut cleaner = Cleaner::default();
    cleaner.children(start);

    if cleaner.text_chars == 0 {
        return Err(ExtractError::Empty);
    }
    Ok(cleaner.out)
}

/// First `<main>`, `<article>` or `role="main"` element outside chrome that
/// contains text, in document order.
fn find_landmark(root: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let mut stack: Vec<(ElementRef<'_>, usize)> = root
        .children()
        .filter_map(ElementRef::wrap)
        .rev()
        .map(|child| (child, 1))
        .collect();

    while let Some((element, depth)) = stack.pop() {
        if is_chrome(element) {
            continue;
        }
        let value = element.value();
        let landmark = matches!(value.name(), "main" | "article")
            || value.attr("role") == Some("main");
        if landmark && has_text(element) {
            return Some(element);
        }
        if depth < MAX_NESTING {
            stack.extend(
                element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .rev()
                    .map(|child| (child, depth + 1)),
            );
        }
    }
    None
}

fn has_text(element: ElementRef<'_>) -> bool {
    element.text().any(|t| !t.trim().is_empty())
}

fn is_chrome(element: ElementRef<'_>) -> bool {
    let value = element.value();
    let name = value.name();

    if CHROME_TAGS.contains(&name) {
        return true;
    }
    if value.attr("hidden").is_some()
        || value.attr("aria-hidden") == Some("true")
    {
        return true;
    }
    if value.attr("style").is_some_and(|style| {
        style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase()
            .contains("display:none")
    }) {
        return true;
    }
    if value
        .attr("role")
        .is_some_and(|role| CHROME_ROLES.contains(&role))
    {
        return true;
    }
    if name == "a"
        && value.attr("href").is_some_and(|href| {
            href.trim_start().to_ascii_lowercase().starts_with("javascript:")
        })
    {
        return true;
    }
    if !NAME_EXEMPT_TAGS.contains(&name) {
        let signature = format!(
            "{} {}",
            value.id().unwrap_or_default(),
            value.attr("class").unwrap_or_default()
        );
        if UNLIKELY_CANDIDATE.is_match(&signature)
            && !MAYBE_CANDIDATE.is_match(&signature)
        {
            return true;
        }
    }
    LINK_FARM_TAGS.contains(&name) && is_link_farm(element)
}

/// Mostly-links containers such as menus and tables of contents.
fn is_link_farm(element: ElementRef<'_>) -> bool {
    let total = visible_chars(element);
    if total == 0 {
        return false;
    }

    let mut links = 0;
    let mut link_chars = 0;
    for node in element.descendants() {
        if let Some(link) = ElementRef::wrap(node)
            && link.value().name() == "a"
            && link.value().attr("href").is_some()
        {
            links += 1;
            link_chars += visible_chars(link);
        }
    }

    links >= LINK_FARM_MIN_LINKS
        && link_chars as f64 / total as f64 >= LINK_DENSITY_LIMIT
}

fn visible_chars(element: ElementRef<'_>) -> usize {
    element
        .text()
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .count()
}

/// Serializes the elements that survive [`is_chrome`].
#[derive(Default)]
struct Cleaner {
    out: String,
    text_chars: usize,
    depth: usize,
}

impl Cleaner {
    fn children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    self.text_chars += text.trim().len();
                    escape_into(&mut self.out, text, false);
                }
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        if is_chrome(element) {
            return;
        }
        if self.depth >= MAX_NESTING {
            let text = flattened_text(element, CHROME_TAGS);
            self.text_chars += text.trim().len();
            escape_into(&mut self.out, &text, false);
            return;
        }

        let value = element.value();
        let name = value.name();
        self.out.push('<');
        self.out.push_str(name);
        for (attr, attr_value) in value.attrs() {
            if KEPT_ATTRS.contains(&attr) {
                self.out.push(' ');
                self.out.push_str(attr);
                self.out.push_str("=\"");
                escape_into(&mut self.out, attr_value, true);
                self.out.push('"');
            }
        }
        self.out.push('>');

        if VOID_TAGS.contains(&name) {
            return;
        }

        self.depth += 1;
        self.children(element);
        self.depth -= 1;
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}
