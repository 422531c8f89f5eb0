//! Structured content extraction from HTML pages.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text never belongs to the primary content.
const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "iframe",
    "svg", "form",
];

/// Candidate primary-content regions, in order of preference.
const PRIMARY_REGIONS: &[&str] = &["article", "main", "[role=\"main\"]", "body"];

/// Bounds applied to extracted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    pub max_body_chars: usize,
    pub max_headings: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_body_chars: 20_000,
            max_headings: 30,
        }
    }
}

/// Content pulled out of one document, before it is tied to a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body_text: String,
    pub truncated: bool,
    pub headings: Vec<String>,
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|t| !t.is_empty())
}

/// Append visible text below `element`, skipping stripped subtrees.
fn visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
            }
            Node::Element(el) => {
                if STRIPPED_TAGS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    // Block boundaries must not glue words together.
                    out.push(' ');
                    visible_text(child_el, out);
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn primary_region(document: &Html) -> Option<ElementRef<'_>> {
    PRIMARY_REGIONS.iter().find_map(|css| {
        let sel = selector(css)?;
        document.select(&sel).next()
    })
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: String, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (text[..byte_idx].trim_end().to_string(), true),
        None => (text, false),
    }
}

/// Extract title, description, body text and heading outline from an HTML document.
///
/// Returns `None` when the document has neither a title nor any body text.
pub fn extract_page(html: &str, limits: &ExtractLimits) -> Option<PageContent> {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title").or_else(|| first_text(&document, "h1"));
    let description = meta_content(&document, "meta[name=\"description\"]")
        .or_else(|| meta_content(&document, "meta[property=\"og:description\"]"));

    let mut raw_body = String::new();
    if let Some(region) = primary_region(&document) {
        visible_text(region, &mut raw_body);
    }
    let (body_text, truncated) =
        truncate_chars(collapse_whitespace(&raw_body), limits.max_body_chars);

    let headings = match selector("h1, h2, h3, h4, h5, h6") {
        Some(sel) => document
            .select(&sel)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .take(limits.max_headings)
            .collect(),
        None => Vec::new(),
    };

    if title.is_none() && body_text.is_empty() {
        return None;
    }

    Some(PageContent {
        title,
        description,
        body_text,
        truncated,
        headings,
    })
}
