//! Text cleaning primitives: strip chat noise, collapse whitespace.

use std::sync::OnceLock;

use regex::Regex;

static URL_RE: OnceLock<Regex> = OnceLock::new();
static EMOJI_RE: OnceLock<Regex> = OnceLock::new();
static MENTION_RE: OnceLock<Regex> = OnceLock::new();
static HASHTAG_RE: OnceLock<Regex> = OnceLock::new();
static SPACES_RE: OnceLock<Regex> = OnceLock::new();

fn url_re() -> &'static Regex {
    URL_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("url pattern is valid")
    })
}

fn emoji_re() -> &'static Regex {
    // Pictographs, skin-tone modifiers, flags (regional indicators),
    // ZWJ, variation selector-16 and the keycap combiner.
    EMOJI_RE.get_or_init(|| {
        Regex::new(
            r"[\p{Extended_Pictographic}\p{Emoji_Modifier}\x{1F1E6}-\x{1F1FF}\x{200D}\x{FE0F}\x{20E3}]",
        )
        .expect("emoji pattern is valid")
    })
}

fn mention_re() -> &'static Regex {
    MENTION_RE.get_or_init(|| Regex::new(r"@\w+").expect("mention pattern is valid"))
}

fn hashtag_re() -> &'static Regex {
    HASHTAG_RE.get_or_init(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"))
}

fn spaces_re() -> &'static Regex {
    SPACES_RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Remove URLs, emoji, @mentions and #hashtags. URLs go first: they may
/// themselves contain `@` or `#`.
pub fn strip_noise(raw: &str) -> String {
    let text = url_re().replace_all(raw, " ");
    let text = emoji_re().replace_all(&text, "");
    let text = mention_re().replace_all(&text, " ");
    let text = hashtag_re().replace_all(&text, " ");
    text.into_owned()
}

/// Collapse whitespace runs into single spaces and trim.
pub fn collapse_whitespace(raw: &str) -> String {
    spaces_re().replace_all(raw.trim(), " ").trim().to_string()
}

/// Full normalization: strip noise, lower-case, collapse whitespace.
/// Returns an empty string when either the trimmed input or the cleaned
/// result has fewer than `min_chars` characters.
pub fn normalize(raw: &str, min_chars: usize) -> String {
    if raw.trim().chars().count() < min_chars {
        return String::new();
    }

    let cleaned = collapse_whitespace(&strip_noise(raw).to_lowercase());
    if cleaned.chars().count() < min_chars {
        tracing::trace!(len = cleaned.chars().count(), min = min_chars, "Text rejected after cleaning");
        return String::new();
    }
    cleaned
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Trim punctuation around a whitespace-delimited token.
pub fn trim_token(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}
