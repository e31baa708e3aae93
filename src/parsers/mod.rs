pub mod html;


/// Content type classification used to skip non-HTML targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserType {
    Html,
    /// Plain text, feeds and other documents without anchors
    Text,
}

impl ParserType {
    /// Determines the parser type based on the URL path
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
        if path.ends_with(".txt")
            || path.ends_with(".xml")
            || path.ends_with(".json")
            || path.ends_with(".yaml")
            || path.ends_with(".yml")
        {
            ::log::debug!("Classifying as Text: {}", url);
            ParserType::Text
        } else {
            ParserType::Html
        }
    }

    /// Returns if the parser should extract links
    pub fn should_extract_links(&self) -> bool {
        matches!(self, ParserType::Html)
    }
}
