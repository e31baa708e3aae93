/// Longest sanitized name, in characters
const MAX_FILENAME_CHARS: usize = 100;

/// Convert a project name or URL into something safe to use in a filename
pub fn sanitize_filename(name: &str) -> String {
    // Remove protocol and replace everything outside [A-Za-z0-9._-]
    let name = name.replace("http://", "").replace("https://", "");
    let name: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_CHARS)
        .collect();

    if name.is_empty() {
        "report".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Acme Shop"), "Acme_Shop");
        assert_eq!(
            sanitize_filename("https://beta.example.com/a?b=c"),
            "beta.example.com_a_b_c"
        );
        assert_eq!(sanitize_filename("  "), "report");
        assert_eq!(sanitize_filename(&"x".repeat(300)).len(), 100);
    }
}
