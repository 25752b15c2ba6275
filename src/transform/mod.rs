//! Raw HTML → sanitized HTML → Markdown.

pub mod markdown;
pub mod sanitize;

pub use markdown::convert;
pub use sanitize::{sanitize, HtmlDocument};

use scraper::{ElementRef, Html};

/// Text of the first `<title>` element, trimmed. `None` when the page has
/// no title or it is blank.
pub fn extract_title(raw_html: &str) -> Option<String> {
    let doc = Html::parse_document(raw_html);
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "title")
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Full transform: sanitize, convert, normalize.
pub fn html_to_markdown(raw_html: &str) -> String {
    convert(&sanitize(raw_html))
}
