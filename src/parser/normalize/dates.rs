use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static JP_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)年(\d+)月(\d+)日").unwrap());

/// Parse a `Y年M月D日` date. Two-digit years are taken as 20xx.
pub fn parse_jp_date(text: &str) -> Option<NaiveDate> {
    let caps = JP_DATE_RE.captures(text.trim())?;
    let mut year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `Y年M月D日` to `YYYY-MM-DD`.
pub fn format_date(text: &str) -> Option<String> {
    parse_jp_date(text).map(|d| d.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_digit_year() {
        assert_eq!(format_date("2025年4月1日").as_deref(), Some("2025-04-01"));
    }

    #[test]
    fn two_digit_year() {
        assert_eq!(format_date("25年4月1日").as_deref(), Some("2025-04-01"));
    }

    #[test]
    fn invalid_calendar_day() {
        assert_eq!(format_date("2025年2月30日"), None);
        assert_eq!(format_date("2025年13月1日"), None);
    }

    #[test]
    fn not_a_date() {
        assert_eq!(format_date("随時"), None);
        assert_eq!(format_date("99999999999年1月1日"), None);
    }

    #[test]
    fn trailing_text_is_ignored() {
        assert_eq!(format_date("2024年12月31日まで").as_deref(), Some("2024-12-31"));
    }
}
