//! Shortened report used when long content cannot be posted.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest content sent through the callback-relay fallback.
pub const SHORT_CONTENT_LIMIT: usize = 500;

const DEFAULT_TITLE: &str = "# Library status";
const MAX_TITLE_CHARS: usize = 120;

static TOTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"- \*\*Total books\*\*: (\d+)").unwrap());
static UNRETURNED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"- \*\*Unreturned books\*\*: (\d+)").unwrap());
static RETURN_RATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"- \*\*Return rate\*\*: ([\d.]+)%").unwrap());

fn capture<'a>(pattern: &Regex, content: &'a str) -> Option<&'a str> {
    pattern
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Reduce a status report to at most [`SHORT_CONTENT_LIMIT`] characters.
///
/// Content already within the limit is returned unchanged. Otherwise the
/// result keeps the first `# ` title line, the three headline statistics,
/// a one-line verdict and a footer naming the original length.
pub fn shorten_content(content: &str, now: NaiveDateTime) -> String {
    let length = content.chars().count();
    if length <= SHORT_CONTENT_LIMIT {
        return content.to_string();
    }

    let title: String = content
        .lines()
        .find(|line| line.starts_with("# "))
        .unwrap_or(DEFAULT_TITLE)
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();

    let total = capture(&TOTAL, content);
    let unreturned = capture(&UNRETURNED, content);
    let rate = capture(&RETURN_RATE, content);

    let verdict = match unreturned.and_then(|n| n.parse::<u64>().ok()) {
        Some(0) => "All books have been returned.".to_string(),
        _ => format!("{} books are not yet returned.", unreturned.unwrap_or("?")),
    };

    let summary = format!(
        "{}\n\n## Summary ({})\n- Total books: {}\n- Unreturned books: {}\n- Return rate: {}%\n\n{}\n\n---\n*Auto-generated summary (original content: {} chars)*",
        title,
        now.format("%Y-%m-%d %H:%M"),
        total.unwrap_or("?"),
        unreturned.unwrap_or("?"),
        rate.unwrap_or("?"),
        verdict,
        length
    );

    if summary.chars().count() > SHORT_CONTENT_LIMIT {
        summary.chars().take(SHORT_CONTENT_LIMIT).collect()
    } else {
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn report(unreturned: usize) -> String {
        let mut content = String::from("# Library status\n\n## Statistics\n");
        content.push_str("- **Total books**: 120\n");
        content.push_str(&format!("- **Unreturned books**: {}\n", unreturned));
        content.push_str("- **Return rate**: 97.5%\n\n");
        for i in 0..40 {
            content.push_str(&format!("| Book {} | Reader | on loan |\n", i));
        }
        content
    }

    #[test]
    fn test_short_content_unchanged() {
        assert_eq!(shorten_content("# Hi", now()), "# Hi");
    }

    #[test]
    fn test_extracts_statistics() {
        let content = report(3);
        let short = shorten_content(&content, now());

        assert!(short.chars().count() <= SHORT_CONTENT_LIMIT);
        assert!(short.starts_with("# Library status"));
        assert!(short.contains("- Total books: 120"));
        assert!(short.contains("- Unreturned books: 3"));
        assert!(short.contains("- Return rate: 97.5%"));
        assert!(short.contains("3 books are not yet returned."));
        assert!(short.contains(&format!("original content: {} chars", content.chars().count())));
    }

    #[test]
    fn test_all_returned_verdict() {
        let short = shorten_content(&report(0), now());
        assert!(short.contains("All books have been returned."));
    }

    #[test]
    fn test_unknown_statistics() {
        let content = "x".repeat(800);
        let short = shorten_content(&content, now());
        assert!(short.starts_with(DEFAULT_TITLE));
        assert!(short.contains("- Total books: ?"));
        assert!(short.contains("? books are not yet returned."));
    }

    #[test]
    fn test_long_title_is_capped() {
        let content = format!("# {}\n{}", "T".repeat(600), "x".repeat(100));
        let short = shorten_content(&content, now());
        assert!(short.chars().count() <= SHORT_CONTENT_LIMIT);
    }
}
