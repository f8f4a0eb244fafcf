use lazy_static::lazy_static;
use url::Url;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").expect("valid selector");
}

/// Elements whose boundaries separate words. Inline markup such as `<em>` joins its text
/// to the neighbouring text unchanged.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "li",
    "main", "nav", "ol", "option", "p", "pre", "section", "table", "td", "th", "title", "tr", "ul",
];

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Document text, title included, with whitespace runs collapsed to single spaces.
    pub text: String,
    /// Absolute http(s) link targets, fragment-free, in first-seen order.
    pub links: Vec<Url>,
}

/// Best-effort extraction of text and outgoing links. `base` is the URL the page was
/// finally served from, after redirects. Malformed markup never fails; the parser
/// recovers whatever it can.
pub fn extract(base: &Url, html: &str) -> Page {
    let doc = Html::parse_document(html);
    let mut raw = String::new();
    collect_text(doc.root_element(), &mut raw);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for a in doc.select(&ANCHOR) {
        let Some(href) = a.value().attr("href") else { continue };
        let Ok(u) = base.join(href.trim()) else { continue };
        if !matches!(u.scheme(), "http" | "https") {
            continue;
        }
        let u = without_fragment(u);
        if seen.insert(u.as_str().to_string()) {
            links.push(u);
        }
    }

    Page { text: collapse_whitespace(&raw), links }
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) => {
                let name = e.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else { continue };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push(' ');
                }
                collect_text(child_el, out);
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

pub fn collapse_whitespace(s: &str) -> String { s.split_whitespace().collect::<Vec<_>>().join(" ") }

/// `#section` links point at the same document, so they share one visit.
pub fn without_fragment(mut u: Url) -> Url {
    u.set_fragment(None);
    u
}
