// Rendered-page extraction: HTML to plain text for label-driven regexes, and
// element helpers for portals with stable ids.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use appraisal_common::normalize::parse_amount;

static LINK_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]\[\d+\]").expect("valid regex"));
static FOOTNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\[\d+\]:.*$").expect("valid regex"));
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s*").expect("valid regex"));

/// Page body as plain text, roughly what a browser's innerText gives.
pub fn page_text(html: &str) -> String {
    let rendered = html2text::from_read(html.as_bytes(), 1000).unwrap_or_default();
    clean_rendered_text(&rendered)
}

/// Strip link footnotes, emphasis markers and table borders.
fn clean_rendered_text(rendered: &str) -> String {
    let text = LINK_REF_RE.replace_all(rendered, "$1");
    let text = FOOTNOTE_RE.replace_all(&text, "");
    let text = HEADING_RE.replace_all(&text, "");
    text.chars()
        .map(|c| match c {
            '\u{2500}'..='\u{257F}' => '\n',
            '*' => ' ',
            c => c,
        })
        .collect()
}

/// First capture group of the first match, trimmed.
pub fn first_match(text: &str, re: &Regex) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First capture that parses to a non-zero amount. Skips placeholder years
/// that render as $0 ahead of the certified value.
pub fn first_nonzero_amount(text: &str, re: &Regex) -> Option<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|v| parse_amount(v) > 0.0)
        .map(String::from)
}

/// Largest amount captured by any of the patterns.
pub fn max_amount(text: &str, patterns: &[Regex]) -> Option<String> {
    patterns
        .iter()
        .filter_map(|re| first_match(text, re))
        .map(|v| (parse_amount(&v), v))
        .filter(|(n, _)| *n > 0.0)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, v)| v)
}

/// Parse a static selector.
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css}: {e}"))
}

/// Element text with whitespace runs collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn select_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

/// First element matching `sel` whose text contains `label`.
pub fn element_containing<'a>(doc: &'a Html, sel: &Selector, label: &str) -> Option<ElementRef<'a>> {
    doc.select(sel).find(|el| element_text(*el).contains(label))
}

pub fn next_element_sibling(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// Text after the last `:` of a "Label: value" element.
pub fn after_colon(text: &str) -> &str {
    text.rsplit(':').next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_footnotes_and_borders_are_removed() {
        let cleaned = clean_rendered_text("Code: [NB12][1]\n│Market│1,000│\n[1]: https://x");
        assert!(cleaned.contains("Code: NB12"));
        assert!(!cleaned.contains("https://x"));
        assert!(!cleaned.contains('│'));
    }

    #[test]
    fn page_text_keeps_labels_and_values() {
        let html = "<html><body><p>Year Built: 1987</p><p><b>Market</b></p><p>450,000</p></body></html>";
        let text = page_text(html);
        let year = Regex::new(r"Year Built:?\s*(\d{4})").unwrap();
        let market = Regex::new(r"Market\s*([\d,]+)").unwrap();
        assert_eq!(first_match(&text, &year).as_deref(), Some("1987"));
        assert_eq!(first_nonzero_amount(&text, &market).as_deref(), Some("450,000"));
    }

    #[test]
    fn zero_values_are_skipped() {
        let re = Regex::new(r"Market\s*([\d,]+)").unwrap();
        let text = "Market 0\nMarket 512,300\nMarket 9";
        assert_eq!(first_nonzero_amount(text, &re).as_deref(), Some("512,300"));
        assert_eq!(first_nonzero_amount("Market 0", &re), None);
    }

    #[test]
    fn max_amount_picks_largest_label() {
        let patterns = vec![
            Regex::new(r"Main Area[:\s]+([\d,]+)").unwrap(),
            Regex::new(r"Gross Area[:\s]+([\d,]+)").unwrap(),
        ];
        let text = "Main Area: 1,800\nGross Area: 2,150";
        assert_eq!(max_amount(text, &patterns).as_deref(), Some("2,150"));
    }

    #[test]
    fn element_helpers() {
        let doc = Html::parse_document(
            "<div><p>Current Owner:</p><p>SMITH  JANE</p><p>Year Built: 1999</p></div>",
        );
        let p = selector("p");
        let label = element_containing(&doc, &p, "Current Owner:").unwrap();
        let owner = next_element_sibling(label).map(element_text);
        assert_eq!(owner.as_deref(), Some("SMITH JANE"));
        let year = element_containing(&doc, &p, "Year Built").map(element_text).unwrap();
        assert_eq!(after_colon(&year), "1999");
    }
}
