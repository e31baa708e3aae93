//! Heuristic checks that only need the parsed document.

use crate::config::CheckToggles;
use crate::filter::{is_web_scheme, resolve_href};
use crate::parsers::html;
use crate::results::Issue;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

const DEPRECATED_TAGS: &str = "center, font, marquee, blink, frame";
const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";
const TEXT_BLOCKS: &str = "p, span, h1, h2, h3, h4, h5, h6";
const DUMMY_PATTERNS: [&str; 4] = ["lorem ipsum", "coming soon", "add text here", "test content"];
const SUSPICIOUS_IMAGE_NAMES: [&str; 3] = ["screenshot", "untitled", "ds_store"];
const CLICK_HANDLERS: [&str; 3] = ["onclick", "ng-click", "@click"];

const MIN_TITLE_CHARS: usize = 10;
const MAX_POSITIONED_ELEMENTS: usize = 20;
const LONG_TEXT_CHARS: usize = 500;
const MIN_EMPTY_DIV_HEIGHT: f64 = 50.0;
const MAX_EMPTY_DIVS: usize = 5;

static POSITIONED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)position\s*:\s*(absolute|fixed)").expect("positioned-style regex should be valid")
});

static STYLE_HEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*height\s*:\s*(\d+(?:\.\d+)?)\s*px")
        .expect("height-style regex should be valid")
});

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(jpg|jpeg|png|gif|svg|webp|avif)$").expect("image extension regex should be valid")
});

/// Everything learned from the document before any follow-up network call
#[derive(Debug, Default)]
pub struct LocalFindings {
    pub title: Option<String>,
    pub body_text: String,
    pub issues: Vec<Issue>,
    /// Same-host links selected for the broken-link probe
    pub internal_links: Vec<String>,
}

/// Run every document-only check enabled by the toggles
pub fn inspect(page_url: &Url, page: &str, checks: &CheckToggles) -> LocalFindings {
    let doc = Html::parse_document(page);
    let title = html::title(&doc);
    let body_text = html::body_text(&doc);

    let mut issues = seo(&doc, title.as_deref());
    issues.extend(heading_hierarchy(&doc));
    issues.extend(deprecated_tags(&doc));
    issues.extend(visual_heuristics(&doc));

    if checks.check_dummy_content {
        issues.extend(dummy_content(&body_text));
    }
    if checks.check_images {
        issues.extend(images(&doc, page_url));
    }

    let mut internal_links = Vec::new();
    if checks.check_broken_links {
        issues.extend(form_labels(&doc));
        issues.extend(unlinked_buttons(&doc));
        let (link_issues, links) = anchors(&doc, page_url);
        issues.extend(link_issues);
        internal_links = links;
    }

    LocalFindings {
        title,
        body_text,
        issues,
        internal_links,
    }
}

pub fn seo(doc: &Html, title: Option<&str>) -> Vec<Issue> {
    let mut issues = Vec::new();

    match title {
        None => issues.push(Issue::error("SEO", "Missing <title> tag")),
        Some(title) if title.chars().count() < MIN_TITLE_CHARS => {
            issues.push(Issue::warning("SEO", "Title too short (< 10 chars)"))
        }
        Some(_) => {}
    }
    if !html::has_element(doc, "h1") {
        issues.push(Issue::error("SEO", "Missing <h1> tag"));
    }
    if !html::has_element(doc, "meta[name=\"description\"]") {
        issues.push(Issue::warning("SEO", "Missing Meta Description"));
    }
    if !html::has_element(doc, "meta[name=\"viewport\"]") {
        issues.push(Issue::error(
            "SEO",
            "Missing Viewport Meta Tag (Mobile Responsiveness)",
        ));
    }

    issues
}

pub fn heading_hierarchy(doc: &Html) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut last_level = 0usize;

    for heading in html::select(doc, HEADINGS) {
        let Some(level) = heading_level(heading) else {
            continue;
        };
        if level > last_level + 1 {
            let previous = if last_level == 0 {
                "Start".to_string()
            } else {
                format!("H{}", last_level)
            };
            issues.push(Issue::warning(
                "Accessibility",
                format!(
                    "Skipped heading level: {} -> H{} (should be H{})",
                    previous,
                    level,
                    last_level + 1
                ),
            ));
        }
        last_level = level;
    }

    issues
}

fn heading_level(heading: ElementRef) -> Option<usize> {
    heading.value().name().strip_prefix('h')?.parse().ok()
}

pub fn deprecated_tags(doc: &Html) -> Vec<Issue> {
    html::select(doc, DEPRECATED_TAGS)
        .into_iter()
        .map(|el| {
            Issue::error(
                "Standards",
                format!("Deprecated HTML tag used: <{}>", el.value().name()),
            )
        })
        .collect()
}

/// Layout heuristics that approximate what a rendered page would show
pub fn visual_heuristics(doc: &Html) -> Vec<Issue> {
    let mut issues = Vec::new();

    let positioned = html::select(doc, "[style]")
        .into_iter()
        .filter(|el| el.value().attr("style").is_some_and(|s| POSITIONED.is_match(s)))
        .count();
    if positioned > MAX_POSITIONED_ELEMENTS {
        issues.push(Issue::warning(
            "Visual",
            format!(
                "High number of absolute/fixed elements ({}). Potential for layout overlaps.",
                positioned
            ),
        ));
    }

    let long_blocks = html::select(doc, TEXT_BLOCKS)
        .into_iter()
        .filter(|el| html::element_text(*el).chars().count() > LONG_TEXT_CHARS)
        .count();
    if long_blocks > 0 {
        issues.push(Issue::info(
            "Visual",
            format!(
                "Found {} blocks with long text. Check for truncation.",
                long_blocks
            ),
        ));
    }

    let empty_divs = html::select(doc, "div")
        .into_iter()
        .filter(|div| is_empty_tall_container(*div))
        .count();
    if empty_divs > MAX_EMPTY_DIVS {
        issues.push(Issue::warning(
            "Visual",
            format!(
                "Found {} large empty containers. Could be missing content.",
                empty_divs
            ),
        ));
    }

    issues
}

fn is_empty_tall_container(div: ElementRef) -> bool {
    if !html::element_text(div).is_empty() {
        return false;
    }
    let has_media = div
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| matches!(el.value().name(), "img" | "svg" | "iframe"));
    if has_media {
        return false;
    }
    declared_height(div).is_some_and(|height| height > MIN_EMPTY_DIV_HEIGHT)
}

/// Height declared through the `height` attribute or an inline style, in px
fn declared_height(element: ElementRef) -> Option<f64> {
    let from_style = element
        .value()
        .attr("style")
        .and_then(|style| STYLE_HEIGHT.captures(style))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());

    from_style.or_else(|| {
        element
            .value()
            .attr("height")
            .map(|h| h.trim().trim_end_matches("px"))
            .and_then(|h| h.parse().ok())
    })
}

/// Placeholder copy left over from templates
pub fn dummy_content(body_text: &str) -> Vec<Issue> {
    let lower = body_text.to_lowercase();
    DUMMY_PATTERNS
        .iter()
        .filter(|pattern| lower.contains(*pattern))
        .map(|pattern| {
            Issue::warning(
                "Content",
                format!("Potential Dummy Content found: \"{}\"", pattern),
            )
        })
        .collect()
}

pub fn images(doc: &Html, page_url: &Url) -> Vec<Issue> {
    let mut issues = Vec::new();
    let secure_page = page_url.scheme() == "https";

    for img in html::select(doc, "img") {
        let raw_src = img.value().attr("src").unwrap_or_default();
        let src = resolve_href(page_url, raw_src)
            .map(|u| u.to_string())
            .unwrap_or_default();
        let lower = src.to_lowercase();
        let filename = lower.rsplit('/').next().unwrap_or_default().to_string();

        if html::non_empty_attr(img, "alt").is_none() {
            let original_name = src.rsplit('/').next().unwrap_or_default();
            issues.push(Issue::warning(
                "Accessibility",
                format!("Image missing alt text: {}", original_name),
            ));
        }

        if SUSPICIOUS_IMAGE_NAMES.iter().any(|name| lower.contains(name)) {
            issues.push(Issue::warning(
                "Assets",
                format!("Suspicious image filename: {}", filename),
            ));
        }

        if !IMAGE_EXTENSION.is_match(&lower) {
            issues.push(Issue::warning(
                "Assets",
                format!("Image has weird extension or no extension: {}", filename),
            ));
        }

        if secure_page && src.starts_with("http://") {
            issues.push(Issue::error(
                "Security",
                format!("Mixed Content: Image loads over HTTP: {}", filename),
            ));
        }
    }

    issues
}

/// Form controls a screen reader cannot name
pub fn form_labels(doc: &Html) -> Vec<Issue> {
    let labelled_ids: HashSet<&str> = html::select(doc, "label[for]")
        .into_iter()
        .filter_map(|label| label.value().attr("for"))
        .collect();

    html::select(doc, "input, select, textarea")
        .into_iter()
        .filter(|control| !is_unlabelled_exempt(*control))
        .filter(|control| {
            let by_for = control
                .value()
                .id()
                .is_some_and(|id| !id.is_empty() && labelled_ids.contains(id));
            let wrapped = html::closest(*control, "label").is_some();
            let aria = html::non_empty_attr(*control, "aria-label").is_some()
                || html::non_empty_attr(*control, "aria-labelledby").is_some();
            !(by_for || wrapped || aria)
        })
        .map(|_| Issue::warning("Accessibility", "Form input missing label or aria-label"))
        .collect()
}

fn is_unlabelled_exempt(control: ElementRef) -> bool {
    if control.value().name() != "input" {
        return false;
    }
    let kind = control.value().attr("type").unwrap_or_default().to_ascii_lowercase();
    matches!(kind.as_str(), "hidden" | "submit" | "button")
}

/// Buttons that neither navigate, submit, nor carry a visible handler
pub fn unlinked_buttons(doc: &Html) -> Vec<Issue> {
    let count = html::select(doc, "button")
        .into_iter()
        .filter(|button| {
            let in_anchor = html::closest(*button, "a").is_some();
            let in_form = html::closest(*button, "form").is_some();
            let is_submit = button
                .value()
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("submit"));
            let has_handler = CLICK_HANDLERS
                .iter()
                .any(|attr| html::non_empty_attr(*button, attr).is_some());
            !(in_anchor || in_form || is_submit || has_handler)
        })
        .count();

    if count > 0 {
        vec![Issue::warning(
            "Accessibility",
            format!(
                "Found {} buttons with no clear action (link/form/click)",
                count
            ),
        )]
    } else {
        Vec::new()
    }
}

/// Link hygiene checks; also returns the same-host links worth probing
pub fn anchors(doc: &Html, page_url: &Url) -> (Vec<Issue>, Vec<String>) {
    let mut issues = Vec::new();
    let mut internal = Vec::new();
    let page_host = page_url.host_str().unwrap_or_default();

    for anchor in html::select(doc, "a") {
        let href = anchor.value().attr("href").map(str::trim).unwrap_or_default();
        if href.is_empty() || href == "#" {
            let has_behaviour = anchor.value().attr("onclick").is_some()
                || anchor.value().attr("role").is_some();
            if !has_behaviour {
                issues.push(Issue::warning("Links", "Empty link found"));
            }
            continue;
        }

        let Some(mut target) = resolve_href(page_url, href) else {
            continue;
        };
        if !is_web_scheme(&target) {
            continue;
        }

        let host = target.host_str().unwrap_or_default().to_string();
        if !host.eq_ignore_ascii_case(page_host) {
            let opens_new_tab = anchor.value().attr("target") == Some("_blank");
            if !opens_new_tab {
                issues.push(Issue::warning(
                    "Links",
                    format!("External link opens in same tab: {}", host),
                ));
            } else {
                let has_noopener = anchor
                    .value()
                    .attr("rel")
                    .is_some_and(|rel| rel.contains("noopener"));
                if !has_noopener {
                    issues.push(Issue::warning(
                        "Security",
                        format!("External link unsafe: missing rel=\"noopener\": {}", host),
                    ));
                }
            }
        } else {
            target.set_fragment(None);
            let target = target.to_string();
            if !internal.contains(&target) {
                internal.push(target);
            }
        }
    }

    (issues, internal)
}
