//! Text normalization and quote matching.
//!
//! PDF text extraction mangles quotes in predictable ways: words broken by
//! a hyphen at a line end, soft hyphens, runs of whitespace, stray
//! punctuation. Matching is done on two projections of the text so a quote
//! survives all of these.

use std::sync::LazyLock;

use regex::Regex;

/// A word split by a hyphen (or soft hyphen) followed by whitespace.
static HYPHEN_BREAK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\w)[-\u{AD}]\s+").ok());

/// Joins hyphen-broken words, drops remaining hyphens, collapses whitespace
/// and lowercases.
#[must_use]
pub fn normalize(text: &str) -> String {
    let joined = HYPHEN_BREAK
        .as_ref()
        .map_or_else(|| text.into(), |re| re.replace_all(text, "$1"));
    let stripped: String = joined.chars().filter(|&c| c != '-' && c != '\u{AD}').collect();
    collapse_whitespace(&stripped).to_lowercase()
}

/// Lowercase alphabetic characters only.
#[must_use]
pub fn letters_only(text: &str) -> String {
    project(text, char::is_alphabetic).text
}

/// Replaces every whitespace run with a single space and trims the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns `true` if `query` occurs in `text` under either projection.
///
/// The normalized projection is tried first; the letters-only projection
/// is only used when the query has at least one letter.
#[must_use]
pub fn contains_quote(text: &str, query: &str) -> bool {
    let norm_query = normalize(query);
    if !norm_query.is_empty() && normalize(text).contains(&norm_query) {
        return true;
    }
    let letter_query = letters_only(query);
    !letter_query.is_empty() && letters_only(text).contains(&letter_query)
}

/// Finds up to `max_matches` non-overlapping occurrences of `query` and
/// returns a window of roughly `context_window` characters around each.
///
/// Occurrences are located on the letters-only projection (or the
/// alphanumeric one if the query has no letters) and mapped back to byte
/// offsets in `text`, so the window is taken from the original text. Each
/// snippet has its whitespace collapsed.
#[must_use]
pub fn find_matches(text: &str, query: &str, context_window: usize, max_matches: usize) -> Vec<String> {
    if max_matches == 0 {
        return Vec::new();
    }

    let letters = letters_only(query);
    let (haystack, needle) = if letters.is_empty() {
        (project(text, char::is_alphanumeric), project(query, char::is_alphanumeric).text)
    } else {
        (project(text, char::is_alphabetic), letters)
    };
    if needle.is_empty() {
        return Vec::new();
    }

    let half = context_window / 2;
    let mut snippets = Vec::new();
    let mut from = 0;
    while snippets.len() < max_matches {
        let Some(found) = haystack.text[from..].find(&needle) else {
            break;
        };
        let start_byte = from + found;
        let end_byte = start_byte + needle.len();
        if let Some((start, end)) = haystack.original_range(start_byte, end_byte) {
            let window_start = step_back(text, start, half);
            let window_end = step_forward(text, end, half);
            snippets.push(collapse_whitespace(&text[window_start..window_end]));
        }
        from = end_byte;
    }
    snippets
}

/// A filtered, lowercased view of a text that remembers where each of its
/// characters came from.
struct Projection {
    text: String,
    /// For each byte offset in `text` at which a char starts: the original
    /// byte range of the char it came from.
    origins: Vec<(usize, usize, usize)>,
}

impl Projection {
    /// Maps a byte range in the projection to a byte range in the original.
    fn original_range(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let first = self.origin_at(start)?;
        let last_char_start = self.text[..end].char_indices().next_back()?.0;
        let last = self.origin_at(last_char_start)?;
        Some((first.0, last.1))
    }

    fn origin_at(&self, projected: usize) -> Option<(usize, usize)> {
        self.origins
            .binary_search_by_key(&projected, |&(p, _, _)| p)
            .ok()
            .map(|i| (self.origins[i].1, self.origins[i].2))
    }
}

fn project(text: &str, keep: fn(char) -> bool) -> Projection {
    let mut projected = String::with_capacity(text.len());
    let mut origins = Vec::with_capacity(text.len());
    for (start, c) in text.char_indices() {
        let end = start + c.len_utf8();
        for lower in c.to_lowercase() {
            if keep(lower) {
                origins.push((projected.len(), start, end));
                projected.push(lower);
            }
        }
    }
    Projection {
        text: projected,
        origins,
    }
}

/// Byte offset `chars` characters before `from`, clamped to the start.
fn step_back(text: &str, from: usize, chars: usize) -> usize {
    if chars == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map_or(0, |(i, _)| i)
}

/// Byte offset `chars` characters after `from`, clamped to the end.
fn step_forward(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| from + i)
}
