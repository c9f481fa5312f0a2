//! Utility functions for filename generation and sanitization

/// Characters that are illegal in filenames on at least one supported platform
const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strip filesystem-illegal characters from a name
///
/// # Examples
///
/// ```
/// use kai_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Re:Zero"), "ReZero");
/// assert_eq!(sanitize_filename("A/B\\C"), "ABC");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .collect()
}

/// Build the output filename for one episode
///
/// Format: `"<title> Season <NN> Episode <EE>.mp4"`. The season is always
/// zero-padded to two digits. The episode number is zero-padded to two
/// digits when the display id is a whole number and kept verbatim otherwise
/// (so "7.5" stays "7.5").
///
/// # Examples
///
/// ```
/// use kai_dl::utils::episode_filename;
///
/// assert_eq!(episode_filename("Show", 1, "7"), "Show Season 01 Episode 07.mp4");
/// assert_eq!(episode_filename("Show", 1, "7.5"), "Show Season 01 Episode 7.5.mp4");
/// ```
#[must_use]
pub fn episode_filename(title: &str, season: u32, display_id: &str) -> String {
    let episode_part = match display_id.parse::<f64>() {
        Ok(n) if n.fract() == 0.0 && n >= 0.0 => format!("{:02}", n as u64),
        _ => display_id.to_string(),
    };
    sanitize_filename(&format!(
        "{title} Season {season:02} Episode {episode_part}.mp4"
    ))
}

/// Build the output filename for a merged episode range
#[must_use]
pub fn merged_filename(title: &str, season: u32, first_id: &str, last_id: &str) -> String {
    sanitize_filename(&format!(
        "{title} Season {season:02} Episodes {first_id}-{last_id}.mp4"
    ))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_all_illegal_characters() {
        assert_eq!(sanitize_filename(r#"a<b>c:d"e/f\g|h?i*j"#), "abcdefghij");
    }

    #[test]
    fn sanitize_keeps_ordinary_unicode() {
        assert_eq!(sanitize_filename("Kaguya-sama: Love Is War"), "Kaguya-sama Love Is War");
        assert_eq!(sanitize_filename("進撃の巨人"), "進撃の巨人");
    }

    #[test]
    fn whole_number_episode_is_zero_padded() {
        assert_eq!(
            episode_filename("Show", 1, "7"),
            "Show Season 01 Episode 07.mp4"
        );
    }

    #[test]
    fn fractional_episode_is_kept_verbatim() {
        assert_eq!(
            episode_filename("Show", 1, "7.5"),
            "Show Season 01 Episode 7.5.mp4"
        );
    }

    #[test]
    fn two_digit_episode_is_not_padded_further() {
        assert_eq!(
            episode_filename("Show", 1, "12"),
            "Show Season 01 Episode 12.mp4"
        );
    }

    #[test]
    fn season_is_always_two_digits() {
        assert_eq!(
            episode_filename("Show", 12, "1"),
            "Show Season 12 Episode 01.mp4"
        );
    }

    #[test]
    fn non_numeric_episode_id_is_kept_verbatim() {
        assert_eq!(
            episode_filename("Show", 1, "OVA"),
            "Show Season 01 Episode OVA.mp4"
        );
    }

    #[test]
    fn episode_filename_sanitizes_title() {
        assert_eq!(
            episode_filename("Re:Zero", 2, "1"),
            "ReZero Season 02 Episode 01.mp4"
        );
    }

    #[test]
    fn merged_filename_includes_range_bounds() {
        assert_eq!(
            merged_filename("Show", 1, "3", "5.5"),
            "Show Season 01 Episodes 3-5.5.mp4"
        );
    }
}
