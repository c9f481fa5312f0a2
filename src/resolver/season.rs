//! Season number detection from anime titles
//!
//! Titles encode season numbers in many shapes ("Season 2", "S2",
//! "2nd Season", a trailing bare number, "Part 2", "Cour 2"). Detection is a
//! prioritized list of matchers tried in a fixed order: the first pattern
//! that matches wins, and the matchers are never reconciled against each
//! other.

use regex::Regex;
use std::sync::LazyLock;

/// Matchers in priority order. Earlier patterns are more explicit forms;
/// the trailing bare number is deliberately late so "Show S3" never falls
/// through to it.
static SEASON_MATCHERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[Ss]eason\s+(\d+)",
        r"[Ss](\d+)",
        r"(\d+)(?:st|nd|rd|th)\s+[Ss]eason",
        r"\s+(\d+)$",
        r"[Pp]art\s+(\d+)",
        r"[Cc]our\s+(\d+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Detect the season number from a title, defaulting to 1
///
/// # Examples
///
/// ```
/// use kai_dl::resolver::detect_season;
///
/// assert_eq!(detect_season("Show Season 2"), 2);
/// assert_eq!(detect_season("Show S3"), 3);
/// assert_eq!(detect_season("Show"), 1);
/// ```
#[must_use]
pub fn detect_season(title: &str) -> u32 {
    for matcher in SEASON_MATCHERS.iter() {
        if let Some(captures) = matcher.captures(title)
            && let Some(number) = captures.get(1)
            && let Ok(season) = number.as_str().parse::<u32>()
        {
            return season;
        }
    }
    1
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_season_word() {
        assert_eq!(detect_season("Show Season 2"), 2);
        assert_eq!(detect_season("Show season 11"), 11);
    }

    #[test]
    fn short_s_prefix() {
        assert_eq!(detect_season("Show S3"), 3);
    }

    #[test]
    fn ordinal_season() {
        assert_eq!(detect_season("Show 2nd Season"), 2);
        assert_eq!(detect_season("Show 3rd Season"), 3);
        assert_eq!(detect_season("Show 4th Season"), 4);
    }

    #[test]
    fn trailing_bare_number() {
        assert_eq!(detect_season("Show 4"), 4);
    }

    #[test]
    fn part_and_cour() {
        assert_eq!(detect_season("Show Part 2"), 2);
        assert_eq!(detect_season("Show Cour 3"), 3);
    }

    #[test]
    fn no_match_defaults_to_one() {
        assert_eq!(detect_season("Show"), 1);
        assert_eq!(detect_season(""), 1);
    }

    #[test]
    fn first_matching_pattern_wins() {
        // "Season 2" outranks the trailing "3"
        assert_eq!(detect_season("Show Season 2 Extra 3"), 2);
    }

    #[test]
    fn season_word_outranks_s_prefix() {
        // Both patterns could fire; the explicit word is tried first
        assert_eq!(detect_season("ShowS5 Season 2"), 2);
    }
}
