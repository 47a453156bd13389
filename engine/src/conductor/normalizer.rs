//! Text normalization for model output
//!
//! Removes quoting and markup characters (`"`, `` ` ``, `[`, `]`, `<`, `>`)
//! and `---` rules, collapses every whitespace run to a single space and
//! trims. Normalizing already normalized text changes nothing.

use regex::Regex;
use std::sync::OnceLock;

static MARKUP: OnceLock<Regex> = OnceLock::new();
static WHITESPACE: OnceLock<Regex> = OnceLock::new();

fn markup() -> &'static Regex {
    MARKUP.get_or_init(|| Regex::new(r#"["`\[\]<>]|---"#).expect("Invalid markup pattern"))
}

fn whitespace() -> &'static Regex {
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Invalid whitespace pattern"))
}

/// Clean raw model output into presentable prose
pub fn normalize(text: &str) -> String {
    // Dropping a markup character can join dashes into a new `---`
    // (`-<-->`), so strip until stable before collapsing whitespace.
    let mut cleaned = markup().replace_all(text, "").into_owned();
    while markup().is_match(&cleaned) {
        cleaned = markup().replace_all(&cleaned, "").into_owned();
    }

    whitespace().replace_all(&cleaned, " ").trim().to_string()
}
