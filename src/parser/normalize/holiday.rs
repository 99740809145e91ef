use std::sync::LazyLock;

use regex::Regex;

static ANNUAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"年間休日数：\s*(\d+)\s*日").unwrap());
static WEEKEND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"週休二日制：\s*(\S+)").unwrap());
static OTHER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*他\s*|\s*他\s*$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Holidays {
    pub days_text: Option<String>,
    pub two_day_weekend: Option<String>,
    pub per_year: Option<i64>,
}

/// Pull the annual holiday count and two-day-weekend policy out of the
/// holiday cell; what is left becomes the days text.
pub fn parse_holidays(text: &str) -> Holidays {
    let per_year = ANNUAL_RE
        .captures(text)
        .and_then(|c| c[1].parse::<i64>().ok());
    let two_day_weekend = WEEKEND_RE.captures(text).map(|c| c[1].trim().to_string());

    let rest = ANNUAL_RE.replace_all(text, "");
    let rest = WEEKEND_RE.replace_all(rest.trim(), "");
    let rest = OTHER_RE.replace_all(rest.trim(), "");
    let rest = rest.trim();

    Holidays {
        days_text: (!rest.is_empty()).then(|| rest.to_string()),
        two_day_weekend,
        per_year,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cell() {
        let h = parse_holidays("土 日 祝日 他 週休二日制：毎週 年間休日数：120日");
        assert_eq!(h.per_year, Some(120));
        assert_eq!(h.two_day_weekend.as_deref(), Some("毎週"));
        assert_eq!(h.days_text.as_deref(), Some("土 日 祝日"));
    }

    #[test]
    fn leading_other_marker_removed() {
        let h = parse_holidays("他 週休二日制：その他 年間休日数： 105 日");
        assert_eq!(h.per_year, Some(105));
        assert_eq!(h.two_day_weekend.as_deref(), Some("その他"));
        assert_eq!(h.days_text, None);
    }

    #[test]
    fn plain_days_only() {
        let h = parse_holidays("日曜日");
        assert_eq!(h, Holidays { days_text: Some("日曜日".into()), ..Default::default() });
    }

    #[test]
    fn oversized_count_is_null() {
        let h = parse_holidays("年間休日数：99999999999999999999日");
        assert_eq!(h.per_year, None);
        assert_eq!(h.days_text, None);
    }
}
