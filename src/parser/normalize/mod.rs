pub mod age;
pub mod dates;
pub mod holiday;
pub mod location;
pub mod wage;

use crate::record::{self, Field, RawRecord, Row};
use age::AgeLimit;
use holiday::Holidays;
use location::Location;
use wage::Wage;

/// A raw record plus the typed sub-fields derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub raw: RawRecord,
    pub wage: Wage,
    pub location: Location,
    pub holidays: Holidays,
    pub age: AgeLimit,
    pub special_conditions: Option<Vec<String>>,
    pub listing_count: Option<i64>,
    /// ISO `YYYY-MM-DD` renderings of the two listing dates.
    pub received: Option<String>,
    pub deadline: Option<String>,
}

/// Derive typed fields from a raw record. Never fails: anything that does not
/// parse leaves its derived field empty.
pub fn normalize(raw: &RawRecord) -> NormalizedRecord {
    let text = |f: Field| raw.get(f).filter(|s| !s.trim().is_empty());

    NormalizedRecord {
        wage: text(Field::Wage)
            .map(|w| wage::parse_wage(w, raw.get(Field::EmploymentType)))
            .unwrap_or_default(),
        location: text(Field::WorkLocation)
            .map(location::split_location)
            .unwrap_or_default(),
        holidays: text(Field::Holidays)
            .map(holiday::parse_holidays)
            .unwrap_or_default(),
        age: text(Field::Age).map(age::parse_age).unwrap_or_default(),
        special_conditions: text(Field::SpecialConditions).and_then(split_conditions),
        listing_count: text(Field::ListingCount).and_then(|s| s.trim().parse().ok()),
        received: text(Field::ReceivedDate).and_then(dates::format_date),
        deadline: text(Field::ReferralDeadline).and_then(dates::format_date),
        raw: raw.clone(),
    }
}

fn split_conditions(s: &str) -> Option<Vec<String>> {
    let items: Vec<String> = s
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

impl NormalizedRecord {
    /// Raw cells followed by the derived ones.
    pub fn to_row(&self) -> Row {
        let mut row = self.raw.to_row();
        let num = |v: Option<i64>| v.map(|n| n.to_string());

        row.push(record::WAGE_MIN, num(self.wage.min));
        row.push(record::WAGE_MAX, num(self.wage.max));
        row.push(record::WAGE_UNIT, self.wage.unit.map(|u| u.label().to_string()));
        row.push(record::PREFECTURE, self.location.prefecture.clone());
        row.push(record::LOCALITY, self.location.locality.clone());
        row.push(record::HOLIDAY_DAYS_TEXT, self.holidays.days_text.clone());
        row.push(record::HOLIDAY_WEEKEND, self.holidays.two_day_weekend.clone());
        row.push(record::HOLIDAY_PER_YEAR, num(self.holidays.per_year));
        row.push(record::AGE_RESTRICTED, self.age.restricted.map(|b| b.to_string()));
        row.push(record::AGE_MIN, num(self.age.min));
        row.push(record::AGE_MAX, num(self.age.max));
        row.push(
            record::CONDITIONS_LIST,
            self.special_conditions
                .as_ref()
                .and_then(|v| serde_json::to_string(v).ok()),
        );
        row.push(record::LISTING_COUNT_NUM, num(self.listing_count));
        row.push(record::RECEIVED_ISO, self.received.clone());
        row.push(record::DEADLINE_ISO, self.deadline.clone());
        row
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Schema;

    fn raw(pairs: &[(Field, &str)]) -> RawRecord {
        let mut r = RawRecord::default();
        for (f, v) in pairs {
            r.set(*f, Some(v.to_string()));
        }
        r
    }

    #[test]
    fn full_listing() {
        let r = raw(&[
            (Field::WorkLocation, "東京都 渋谷区"),
            (Field::EmploymentType, "正社員"),
            (Field::Wage, "月給 200,000円〜250,000円"),
            (Field::Holidays, "土 日 祝日 週休二日制：毎週 年間休日数：125日"),
            (Field::Age, "18歳以上45歳以下"),
            (Field::SpecialConditions, "駅近, , 車通勤可"),
            (Field::ListingCount, "2"),
            (Field::ReceivedDate, "2025年4月1日"),
            (Field::ReferralDeadline, "2025年6月30日"),
        ]);
        let n = normalize(&r);
        assert_eq!(n.wage.min, Some(200000));
        assert_eq!(n.location.locality.as_deref(), Some("渋谷区"));
        assert_eq!(n.holidays.per_year, Some(125));
        assert_eq!(n.age.max, Some(45));
        assert_eq!(
            n.special_conditions,
            Some(vec!["駅近".to_string(), "車通勤可".to_string()])
        );
        assert_eq!(n.listing_count, Some(2));

        let row = n.to_row();
        assert_eq!(row.get(record::RECEIVED_ISO), Some("2025-04-01"));
        assert_eq!(row.get(record::DEADLINE_ISO), Some("2025-06-30"));
        assert_eq!(row.get(record::CONDITIONS_LIST), Some(r#"["駅近","車通勤可"]"#));
        assert_eq!(row.get(record::AGE_RESTRICTED), Some("true"));
        // Raw text survives untouched.
        assert_eq!(row.get("賃金"), Some("月給 200,000円〜250,000円"));
    }

    #[test]
    fn empty_record_yields_all_nulls() {
        let n = normalize(&RawRecord::default());
        let row = n.to_row();
        for col in Schema::Normalized.columns() {
            assert!(row.has_column(&col), "missing {}", col);
            assert_eq!(row.get(&col), None, "{} should be null", col);
        }
    }

    #[test]
    fn junk_never_panics() {
        let junk = [
            "", " ", "〜", "円", "年月日", "歳以上歳以下", "９９９円", "1e400円",
            "-5円〜-3円", "他", "週休二日制：", "0年0月0日", "\u{0}\u{FEFF}",
            "東京都東京都東京都", "999999999999999999999999歳以下",
        ];
        for a in junk {
            let pairs: Vec<(Field, &str)> = Field::ALL.iter().map(|f| (*f, a)).collect();
            let n = normalize(&raw(&pairs));
            let _ = n.to_row();
        }
    }

    #[test]
    fn listing_count_non_numeric() {
        let n = normalize(&raw(&[(Field::ListingCount, "1人")]));
        assert_eq!(n.listing_count, None);
    }
}
