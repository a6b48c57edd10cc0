//! Filename synthesis for saved prompts.
//!
//! Names follow `prompt-<timestamp>[-<slug>].md`. The timestamp is UTC with
//! millisecond precision and sorts lexically; the slug comes from the first
//! non-blank line of the prompt.

use chrono::{DateTime, Utc};

/// Maximum slug length in bytes (the slug is always ASCII).
pub const MAX_SLUG_LEN: usize = 40;

/// Timestamp layout used in filenames: `yyyyMMdd_HHmmssfff`.
const FILENAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";

/// Derive a filesystem-safe slug from the first non-blank line of `text`.
///
/// Lower-cases the line, turns whitespace runs into single hyphens, drops
/// anything outside `[a-z0-9_-]`, collapses repeated hyphens, trims hyphens
/// at both ends and truncates to [`MAX_SLUG_LEN`]. May return an empty string.
pub fn slugify(text: &str) -> String {
    let Some(line) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return String::new();
    };

    let mut slug = String::with_capacity(line.len());
    let mut in_whitespace = false;
    for c in line.to_lowercase().chars() {
        if c.is_whitespace() {
            in_whitespace = true;
            continue;
        }
        if in_whitespace {
            push_hyphen(&mut slug);
            in_whitespace = false;
        }
        match c {
            'a'..='z' | '0'..='9' | '_' => slug.push(c),
            '-' => push_hyphen(&mut slug),
            _ => {}
        }
    }

    let slug = slug.trim_matches('-');
    let slug = if slug.len() > MAX_SLUG_LEN {
        slug[..MAX_SLUG_LEN].trim_end_matches('-')
    } else {
        slug
    };
    slug.to_owned()
}

/// Push a hyphen unless the slug already ends with one.
fn push_hyphen(slug: &mut String) {
    if !slug.ends_with('-') {
        slug.push('-');
    }
}

/// Format the filename timestamp component.
pub fn filename_timestamp(at: DateTime<Utc>) -> String {
    at.format(FILENAME_TIMESTAMP_FORMAT).to_string()
}

/// Compose a prompt filename.
///
/// `attempt` disambiguates names that are already taken: attempt `0` yields
/// the plain name, attempt `n` appends `-<n + 1>` before the extension.
pub fn prompt_filename(at: DateTime<Utc>, slug: &str, attempt: u32) -> String {
    let mut name = format!("prompt-{}", filename_timestamp(at));
    if !slug.is_empty() {
        name.push('-');
        name.push_str(slug);
    }
    if attempt > 0 {
        name.push_str(&format!("-{}", attempt + 1));
    }
    name.push_str(".md");
    name
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().expect("valid timestamp")
    }

    #[test]
    fn test_should_slugify_punctuated_title() {
        assert_eq!(slugify("Hello, World!  Foo"), "hello-world-foo");
    }

    #[test]
    fn test_should_return_empty_slug_for_punctuation_only() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("   \n\t\n"), "");
    }

    #[test]
    fn test_should_use_first_non_blank_line() {
        assert_eq!(slugify("\n\n   \nRemember to buy milk\nand eggs"), "remember-to-buy-milk");
    }

    #[test]
    fn test_should_collapse_hyphens_and_trim_edges() {
        assert_eq!(slugify("--a -- b--"), "a-b");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
        assert_eq!(slugify("? leading and trailing ?"), "leading-and-trailing");
    }

    #[test]
    fn test_should_drop_non_ascii_letters() {
        assert_eq!(slugify("Café déjà vu"), "caf-dj-vu");
    }

    #[test]
    fn test_should_truncate_without_trailing_hyphen() {
        // 39 chars then a hyphen at index 39.
        let line = format!("{} tail", "a".repeat(39));
        let slug = slugify(&line);
        assert_eq!(slug, "a".repeat(39));

        let long = "word ".repeat(20);
        let slug = slugify(&long);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert!(slug.starts_with("word-word"));
    }

    #[test]
    fn test_should_format_millisecond_timestamp() {
        // 2026-02-03 14:30:12.045 UTC
        let ts = at(1_770_129_012_045);
        assert_eq!(filename_timestamp(ts), "20260203_143012045");
    }

    #[test]
    fn test_should_compose_filename_with_and_without_slug() {
        let ts = at(1_770_129_012_045);
        assert_eq!(
            prompt_filename(ts, "hello-world-foo", 0),
            "prompt-20260203_143012045-hello-world-foo.md"
        );
        assert_eq!(prompt_filename(ts, "", 0), "prompt-20260203_143012045.md");
    }

    #[test]
    fn test_should_append_attempt_suffix() {
        let ts = at(0);
        assert_eq!(prompt_filename(ts, "x", 1), "prompt-19700101_000000000-x-2.md");
        assert_eq!(prompt_filename(ts, "", 2), "prompt-19700101_000000000-3.md");
    }

    #[test]
    fn test_should_be_deterministic_and_distinct_across_timestamps() {
        let slug = slugify("same text");
        assert_eq!(prompt_filename(at(1), &slug, 0), prompt_filename(at(1), &slug, 0));
        assert_ne!(prompt_filename(at(1), &slug, 0), prompt_filename(at(2), &slug, 0));
    }

    #[test]
    fn test_should_not_contain_unsafe_characters() {
        let name = prompt_filename(at(1_770_129_012_045), &slugify("a:b/c\\d*e"), 0);
        assert!(!name.contains(':'));
        assert!(!name.contains('/'));
        assert!(!name.contains('\\'));
    }
}
