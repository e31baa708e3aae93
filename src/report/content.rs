//! Page-level content metrics for the exported report.

use crate::filter::resolve_href;
use crate::parsers::html;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use url::Url;

/// Number of keywords listed in the density table
const TOP_KEYWORDS: usize = 10;

const STOP_WORDS: [&str; 24] = [
    "this", "that", "with", "from", "have", "what", "your", "will", "when", "more", "some",
    "about", "there", "they", "their", "which", "would", "like", "been", "just", "very",
    "should", "make", "made",
];

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("sentence regex should be valid"));

static VOWEL_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[aeiouy]+").expect("vowel regex should be valid"));

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("punctuation regex should be valid"));

/// Structural SEO summary of a single page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSeoAnalysis {
    pub title: String,
    pub title_length: usize,
    pub meta_description: String,
    pub h1_count: usize,
    pub h1_content: String,
    pub images_total: usize,
    pub images_missing_alt: usize,
    pub links_total: usize,
    pub internal_links: usize,
    pub word_count: usize,
    /// Flesch-Kincaid grade level, one decimal
    pub readability_score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordDensity {
    pub word: String,
    pub count: usize,
    /// Share of all counted words, in percent with one decimal
    pub density: String,
}

/// Build the SEO summary and return it with the page's visible text
pub fn analyze_page(page_url: &Url, page: &str) -> (PageSeoAnalysis, String) {
    let doc = Html::parse_document(page);
    let text = html::body_text(&doc);
    let title = html::title(&doc).unwrap_or_default();
    let headings = html::select(&doc, "h1");
    let images = html::select(&doc, "img");
    let anchors = html::select(&doc, "a");

    let page_host = page_url.host_str().unwrap_or_default();
    let internal_links = anchors
        .iter()
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_href(page_url, href))
        .filter(|target| target.host_str().is_some_and(|h| h.eq_ignore_ascii_case(page_host)))
        .count();

    let analysis = PageSeoAnalysis {
        title_length: title.chars().count(),
        title,
        meta_description: html::meta_content(&doc, "meta[name=\"description\"]")
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| "Missing".to_string()),
        h1_count: headings.len(),
        h1_content: headings
            .iter()
            .map(|h| html::element_text(*h))
            .collect::<Vec<_>>()
            .join(" | "),
        images_total: images.len(),
        images_missing_alt: images
            .iter()
            .filter(|img| img.value().attr("alt").is_none_or(str::is_empty))
            .count(),
        links_total: anchors.len(),
        internal_links,
        word_count: word_count(&text),
        readability_score: format!("{:.1}", readability_grade(&text)),
    };

    (analysis, text)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Approximate Flesch-Kincaid grade level, floored at zero
pub fn readability_grade(text: &str) -> f64 {
    let words = word_count(text);
    if words == 0 {
        return 0.0;
    }
    let sentences = SENTENCE_BREAK.split(text).count() as f64;
    // Counting vowel groups is a rough stand-in for syllables
    let syllables = VOWEL_GROUP.split(text).count() as f64;
    let words = words as f64;

    let grade = 0.39 * (words / sentences) + 11.8 * (syllables / words) - 15.59;
    grade.max(0.0)
}

/// Most frequent meaningful words, by count and then first appearance
pub fn keyword_density(text: &str) -> Vec<KeywordDensity> {
    let lowered = text.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, "");
    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .collect();
    if words.is_empty() {
        return Vec::new();
    }

    let stop_words: HashSet<&str> = STOP_WORDS.into_iter().collect();
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in words.iter().copied().filter(|w| !stop_words.contains(w)) {
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    let mut ranked: Vec<(&str, usize)> = order
        .into_iter()
        .map(|word| (word, counts.get(word).copied().unwrap_or_default()))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let total = words.len() as f64;
    ranked
        .into_iter()
        .take(TOP_KEYWORDS)
        .map(|(word, count)| KeywordDensity {
            word: word.to_string(),
            count,
            density: format!("{:.1}", count as f64 / total * 100.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_density() {
        let text = "Rust crawler: the crawler visits pages. This crawler likes Rust pages, pages, pages!";
        let keywords = keyword_density(text);

        let words: Vec<&str> = keywords.iter().map(|k| k.word.as_str()).collect();
        assert_eq!(words, vec!["pages", "crawler", "rust", "visits", "likes"]);
        assert_eq!(keywords[0].count, 4);
        // 12 words longer than three characters, stop words included in the total
        assert_eq!(keywords[0].density, "33.3");
    }

    #[test]
    fn test_keyword_density_top_ten() {
        let text: String = (0..15).map(|i| format!("keyword{} ", i)).collect();
        assert_eq!(keyword_density(&text).len(), 10);
        assert!(keyword_density("a an the").is_empty());
    }

    #[test]
    fn test_readability_grade() {
        assert_eq!(readability_grade(""), 0.0);
        let simple = "The cat sat. The dog ran.";
        assert!(readability_grade(simple) < 1.0);
        let dense = "Institutional interoperability considerations necessitate comprehensive organizational documentation";
        assert!(readability_grade(dense) > 10.0);
    }

    #[test]
    fn test_analyze_page() {
        let page = r#"<html><head><title>Beta Shop</title>
            <meta name="description" content="All the things"></head>
            <body><h1>Shop</h1><h1>Deals</h1>
            <img src="a.png" alt="A"><img src="b.png"><img src="c.png" alt="">
            <a href="/cart">Cart</a><a href="https://beta.example.com/help">Help</a>
            <a href="https://other.com">Other</a><a>Bare</a>
            <p>Buy now and save.</p></body></html>"#;
        let url = Url::parse("https://beta.example.com/").unwrap();

        let (analysis, text) = analyze_page(&url, page);
        assert_eq!(analysis.title, "Beta Shop");
        assert_eq!(analysis.title_length, 9);
        assert_eq!(analysis.meta_description, "All the things");
        assert_eq!(analysis.h1_count, 2);
        assert_eq!(analysis.h1_content, "Shop | Deals");
        assert_eq!(analysis.images_total, 3);
        assert_eq!(analysis.images_missing_alt, 2);
        assert_eq!(analysis.links_total, 4);
        assert_eq!(analysis.internal_links, 2);
        assert!(text.contains("Buy now and save."));
        assert_eq!(analysis.word_count, word_count(&text));

        let value = serde_json::to_value(&analysis).unwrap();
        assert!(value.get("imagesMissingAlt").is_some());
        assert!(value.get("readabilityScore").unwrap().is_string());
    }

    #[test]
    fn test_missing_meta_description() {
        let url = Url::parse("https://example.com/").unwrap();
        let (analysis, _) = analyze_page(&url, "<html><body></body></html>");
        assert_eq!(analysis.meta_description, "Missing");
        assert_eq!(analysis.title_length, 0);
    }
}
