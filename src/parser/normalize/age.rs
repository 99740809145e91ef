use std::sync::LazyLock;

use regex::Regex;

static UPPER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"〜?(\d+)歳以下").unwrap());
static LOWER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)歳以上〜?").unwrap());
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)歳〜(\d+)歳").unwrap());
static LOWER_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)歳以上$").unwrap());

const NO_RESTRICTION: &str = "不問";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeLimit {
    /// `None` only when the listing carries no age text.
    pub restricted: Option<bool>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

pub fn parse_age(text: &str) -> AgeLimit {
    let text = text.trim();
    if text.is_empty() {
        return AgeLimit::default();
    }
    if text == NO_RESTRICTION {
        return AgeLimit {
            restricted: Some(false),
            ..Default::default()
        };
    }

    let mut max = capture_number(&UPPER_RE, text, 1);
    let mut min = capture_number(&LOWER_RE, text, 1);
    if min.is_none() {
        min = capture_number(&RANGE_RE, text, 1);
    }
    if max.is_none() {
        max = capture_number(&RANGE_RE, text, 2);
    }
    if min.is_none() {
        min = capture_number(&LOWER_ONLY_RE, text, 1);
    }

    AgeLimit {
        restricted: Some(true),
        min,
        max,
    }
}

fn capture_number(re: &Regex, text: &str, group: usize) -> Option<i64> {
    re.captures(text)?.get(group)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(a: AgeLimit) -> (Option<bool>, Option<i64>, Option<i64>) {
        (a.restricted, a.min, a.max)
    }

    #[test]
    fn no_restriction() {
        assert_eq!(triple(parse_age("不問")), (Some(false), None, None));
    }

    #[test]
    fn lower_and_upper_words() {
        assert_eq!(triple(parse_age("18歳以上45歳以下")), (Some(true), Some(18), Some(45)));
    }

    #[test]
    fn upper_only() {
        assert_eq!(triple(parse_age("〜59歳以下")), (Some(true), None, Some(59)));
        assert_eq!(triple(parse_age("64歳以下")), (Some(true), None, Some(64)));
    }

    #[test]
    fn lower_only() {
        assert_eq!(triple(parse_age("60歳以上")), (Some(true), Some(60), None));
    }

    #[test]
    fn tilde_range() {
        assert_eq!(triple(parse_age("18歳〜35歳")), (Some(true), Some(18), Some(35)));
    }

    #[test]
    fn restricted_without_numbers() {
        assert_eq!(triple(parse_age("制限あり")), (Some(true), None, None));
    }

    #[test]
    fn absent_text() {
        assert_eq!(triple(parse_age("")), (None, None, None));
    }
}
