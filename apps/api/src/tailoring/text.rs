//! Text primitives shared by every tailoring stage.
//!
//! Tokens keep their surface spelling so extracted phrases and rewritten lines
//! can be reported in the casing the author used, while all comparisons run on
//! the lowercase `norm` form.

/// A single word-like token from posting or resume text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub surface: String,
    pub norm: String,
    /// Byte range of the token in the source text.
    pub start: usize,
    pub end: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '+' || c == '#'
}

/// Characters that only belong to a token when they sit between two word
/// characters: `cross-functional`, `CI/CD`, `P&L`, `monday.com`.
fn is_joiner(c: char) -> bool {
    matches!(c, '-' | '/' | '&' | '.' | '\'')
}

/// Splits text into tokens. Punctuation and whitespace separate tokens;
/// joiners are kept only inside a word.
pub fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (i, &(offset, c)) in chars.iter().enumerate() {
        if is_word_char(c) {
            if current.is_empty() {
                start = offset;
            }
            current.push(c);
            continue;
        }
        let joins = is_joiner(c)
            && !current.is_empty()
            && chars.get(i + 1).is_some_and(|(_, next)| next.is_alphanumeric());
        if joins {
            current.push(c);
            continue;
        }
        flush(&mut current, start, offset, &mut tokens);
    }
    flush(&mut current, start, text.len(), &mut tokens);

    tokens
}

fn flush(current: &mut String, start: usize, end: usize, tokens: &mut Vec<Token>) {
    if current.is_empty() {
        return;
    }
    let surface = std::mem::take(current);
    let norm = surface.to_lowercase();
    tokens.push(Token {
        surface,
        norm,
        start,
        end,
    });
}

/// Lowercase token norms of `text`.
pub fn terms(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|t| t.norm).collect()
}

/// Canonical form of a phrase: lowercase tokens joined by single spaces.
pub fn normalize_phrase(text: &str) -> String {
    terms(text).join(" ")
}

/// Position of the first occurrence of `needle` as a contiguous run in `haystack`.
pub fn find_sequence(haystack: &[String], needle: &[String]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Light suffix-stripping stemmer used for stem-level matching only.
///
/// Never used by the integrity check: a stem match is evidence of relevance,
/// not permission to print a different word.
pub fn stem(word: &str) -> String {
    let mut stemmed = word.to_string();

    if let Some(base) = stemmed.strip_suffix("ies") {
        if base.chars().count() >= 2 {
            return format!("{base}y");
        }
    }

    for suffix in ["ing", "ed", "es", "s", "e"] {
        if let Some(base) = stemmed.strip_suffix(suffix) {
            if base.chars().count() >= 3 && !base.ends_with('s') {
                stemmed = base.to_string();
                break;
            }
        }
    }

    // planned -> plann -> plan
    let chars: Vec<char> = stemmed.chars().collect();
    if chars.len() >= 4 {
        let last = chars[chars.len() - 1];
        let prev = chars[chars.len() - 2];
        if last == prev && !matches!(last, 'l' | 's' | 'z') && last.is_alphabetic() {
            stemmed.pop();
        }
    }

    stemmed
}

/// Uppercases the first character of `text`.
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercases the first character of `text`.
pub fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
