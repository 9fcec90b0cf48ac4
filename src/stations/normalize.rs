//! The single name-normalization rule applied everywhere station names are
//! compared. Index construction, alias tables, and raw-record lookups must
//! all funnel through [`normalize_name`] or they will disagree.

use regex::Regex;
use std::sync::LazyLock;

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("parenthetical pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Normalizes a station name for index keys and comparisons.
///
/// Lowercase; en-dash, em-dash, hyphen, and slash become spaces;
/// parenthetical suffixes are stripped; curly quotes become straight;
/// whitespace is collapsed and trimmed. Idempotent.
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = PARENTHETICAL.replace_all(&lowered, " ");

    let replaced: String = stripped
        .chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' | '-' | '/' => ' ',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();

    WHITESPACE.replace_all(&replaced, " ").trim().to_string()
}
