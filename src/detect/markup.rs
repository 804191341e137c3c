// src/detect/markup.rs

//! Markup stripping for pattern matching.

use scraper::{ElementRef, Html};

/// Elements whose text is never rendered as page content.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Elements that start a new line of rendered text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "caption", "dd", "details",
    "dialog", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "li", "main", "nav", "ol", "option",
    "p", "pre", "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title",
    "tr", "ul",
];

/// Reduce an HTML document to its visible text.
///
/// Text nodes outside `script`/`style`/`noscript`/`template` are concatenated
/// in document order. Block-level elements are separated by a space; inline
/// elements add nothing, so `$<b>10</b>` reads as `$10`. Runs of whitespace
/// collapse to a single space and both ends are trimmed. Entities are decoded
/// by the parser.
pub fn strip_markup(raw: &str) -> String {
    let document = Html::parse_document(raw);

    let mut text = String::with_capacity(raw.len() / 2);
    collect_text(document.root_element(), &mut text);

    normalize_whitespace(&text)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(chunk) = child.value().as_text() {
            out.push_str(chunk);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child.value().name();
        if HIDDEN_ELEMENTS.contains(&name) {
            continue;
        }
        let block = BLOCK_ELEMENTS.contains(&name);
        if block {
            out.push(' ');
        }
        collect_text(child, out);
        if block {
            out.push(' ');
        }
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
