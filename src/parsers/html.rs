use scraper::{ElementRef, Html, Selector};

/// Elements whose text never reaches the reader
const HIDDEN_TEXT_PARENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Parses HTML content and only extracts links (no text)
pub fn parse_links_only(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let links = links(&doc);
    ::log::debug!("HTML parser found {} links", links.len());
    links
}

/// Raw `href` values of every anchor, in document order
pub fn links(doc: &Html) -> Vec<String> {
    select(doc, "a")
        .into_iter()
        .filter_map(|e| e.value().attr("href"))
        .map(|s| s.to_string())
        .collect()
}

/// Text of the `<title>` element, if present and non-empty
pub fn title(doc: &Html) -> Option<String> {
    let text = first_text(doc, "title");
    if text.is_empty() { None } else { Some(text) }
}

/// Visible text of the body, whitespace-normalized
pub fn body_text(doc: &Html) -> String {
    match select(doc, "body").into_iter().next() {
        Some(body) => element_text(body),
        None => String::new(),
    }
}

/// Visible text below an element, whitespace-normalized
pub fn element_text(element: ElementRef) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .map(|parent| HIDDEN_TEXT_PARENTS.contains(&parent.name()))
            .unwrap_or(false);
        if !hidden {
            parts.push(&**text);
        }
    }
    normalize_text(&parts.join(" "))
}

/// Collapse every run of whitespace into a single space
pub fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Select elements by CSS; an invalid selector selects nothing
pub fn select<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => doc.select(&selector).collect(),
        Err(e) => {
            ::log::error!("Invalid selector {:?}: {:?}", css, e);
            Vec::new()
        }
    }
}

pub fn count_elements(doc: &Html, css: &str) -> usize {
    select(doc, css).len()
}

pub fn has_element(doc: &Html, css: &str) -> bool {
    count_elements(doc, css) > 0
}

/// Whitespace-normalized text of the first matching element
pub fn first_text(doc: &Html, css: &str) -> String {
    select(doc, css)
        .into_iter()
        .next()
        .map(|el| normalize_text(&el.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default()
}

/// `content` attribute of the first matching meta element
pub fn meta_content(doc: &Html, css: &str) -> Option<String> {
    select(doc, css)
        .into_iter()
        .find_map(|el| el.value().attr("content"))
        .map(normalize_text)
}

/// Nearest ancestor element with the given tag name
pub fn closest<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == tag)
}

/// Attribute value, treating empty strings as absent
pub fn non_empty_attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .filter(|value| !value.trim().is_empty())
}
