use regex::Regex;

/// Character that turns a dependency reference into a pattern.
pub const WILDCARD: char = '*';

/// A dependency pattern like `build:*`, where each `*` matches any substring
/// (including an empty one). Patterns are anchored to the whole id.
#[derive(Debug, Clone)]
pub struct Wildcard {
    regex: Regex,
}

impl Wildcard {
    /// True if `text` contains a wildcard and should be expanded.
    pub fn is_pattern(text: &str) -> bool {
        text.contains(WILDCARD)
    }

    /// Compile `pattern`. Everything but `*` is matched literally.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let body = pattern
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$"))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, id: &str) -> bool {
        self.regex.is_match(id)
    }
}
