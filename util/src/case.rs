//! Case conversions for input names.
//!
//! Input names are usually written as rust idents (`sass_lint`) or camel case
//! (`sassLint`); module specifiers and environment variables want something else.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Lower,
    Upper,
    Digit,
}

fn kind(c: char) -> Option<Kind> {
    if c.is_ascii_digit() {
        Some(Kind::Digit)
    } else if c.is_uppercase() {
        Some(Kind::Upper)
    } else if c.is_alphanumeric() {
        Some(Kind::Lower)
    } else {
        None
    }
}

/// Split `text` into words on separators, lower->upper transitions,
/// letter/digit transitions, and the end of an acronym ("XMLHttp" -> "XML", "Http").
fn words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut word = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let Some(this) = kind(c) else {
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            continue;
        };

        if let Some(prev) = i.checked_sub(1).and_then(|p| kind(chars[p])) {
            let next = chars.get(i + 1).and_then(|&n| kind(n));
            let boundary = match (prev, this) {
                (Kind::Lower, Kind::Upper) => true,
                (Kind::Digit, Kind::Upper | Kind::Lower) => true,
                (Kind::Upper | Kind::Lower, Kind::Digit) => true,
                (Kind::Upper, Kind::Upper) => next == Some(Kind::Lower),
                _ => false,
            };
            if boundary && !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
        }
        word.push(c);
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

/// `getModule` -> `get-module`, `sass_lint` -> `sass-lint`.
pub fn kebab_case(text: &str) -> String {
    words(text)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// `getModule` -> `GET_MODULE`, for exporting inputs as environment variables.
pub fn env_case(text: &str) -> String {
    words(text)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}
