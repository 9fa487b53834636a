//! Key and value text transformations used by the quick edit prompts.

use std::sync::LazyLock;

use regex::Regex;

const MAX_DEFAULT_KEY_CHARS: usize = 20;

#[allow(clippy::expect_used)] // literal pattern
static NON_WORD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("non-word pattern"));

#[allow(clippy::expect_used)] // literal pattern
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\r|\n").expect("line break pattern"));

#[allow(clippy::expect_used)] // literal pattern
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w\S*").expect("word pattern"));

/// Proposed key for a literal text.
///
/// ```
/// use thymeleaf_i18n_language_server::ide::quick_edit::naming::derive_default_key;
///
/// assert_eq!(derive_default_key("Hello, World!"), "hello_world");
/// ```
#[must_use]
pub fn derive_default_key(text: &str) -> String {
    let lowered = text.to_lowercase();
    let squashed = NON_WORD_RUN.replace_all(&lowered, "_");
    squashed.trim_matches('_').chars().take(MAX_DEFAULT_KEY_CHARS).collect()
}

/// Normalizes a typed key: whitespace becomes `.`, lowercase, `#{`/`}` stripped.
#[must_use]
pub fn normalize_key_input(input: &str) -> String {
    let dotted: String = input
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '.' } else { c })
        .collect::<String>()
        .to_lowercase();

    let without_open = dotted.strip_prefix("#{").unwrap_or(&dotted);
    without_open.strip_suffix('}').unwrap_or(without_open).to_string()
}

/// Proposed translation for a key: `_` become spaces, words title-cased.
#[must_use]
pub fn title_case_value(key: &str) -> String {
    let spaced = key.replace('_', " ");
    WORD.replace_all(&spaced, |captures: &regex::Captures<'_>| {
        let word = &captures[0];
        let mut chars = word.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
        })
    })
    .into_owned()
}

/// Replaces line breaks with the two-character escape `\n`.
#[must_use]
pub fn escape_newlines(text: &str) -> String {
    LINE_BREAK.replace_all(text, r"\n").into_owned()
}

/// `#{key}` with double quotes escaped for use inside an attribute.
#[must_use]
pub fn reference_expression(key: &str) -> String {
    format!("#{{{key}}}").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::simple("Hello World", "hello_world")]
    #[case::punctuation_runs("Save & continue...", "save_continue")]
    #[case::leading_trailing("  (Welcome!)  ", "welcome")]
    #[case::truncated("This is a rather long sentence", "this_is_a_rather_lon")]
    #[case::unicode_word_chars("Überprüfen Sie", "überprüfen_sie")]
    #[case::nothing_left("!!!", "")]
    fn test_derive_default_key(#[case] text: &str, #[case] expected: &str) {
        assert_that!(derive_default_key(text), eq(expected));
    }

    #[rstest]
    #[case::spaces_to_dots("Home Page Title", "home.page.title")]
    #[case::reference_syntax("#{Nav.Home}", "nav.home")]
    #[case::trimmed("  key  ", "key")]
    #[case::only_prefix("#{open", "open")]
    fn test_normalize_key_input(#[case] input: &str, #[case] expected: &str) {
        assert_that!(normalize_key_input(input), eq(expected));
    }

    #[rstest]
    #[case::underscores("welcome_message", "Welcome Message")]
    #[case::dotted_key("nav.home_link", "Nav.home Link")]
    #[case::mixed_case("hELLO", "Hello")]
    fn test_title_case_value(#[case] key: &str, #[case] expected: &str) {
        assert_that!(title_case_value(key), eq(expected));
    }

    #[rstest]
    #[case::lf("a\nb", r"a\nb")]
    #[case::crlf("a\r\nb", r"a\nb")]
    #[case::cr("a\rb", r"a\nb")]
    fn test_escape_newlines(#[case] text: &str, #[case] expected: &str) {
        assert_that!(escape_newlines(text), eq(expected));
    }

    #[googletest::test]
    fn reference_expression_escapes_quotes() {
        expect_that!(reference_expression("greeting"), eq("#{greeting}"));
        expect_that!(reference_expression("say\"hi"), eq(r#"#{say\"hi}"#));
    }
}
