use std::fmt;

/// Fixed vocabulary of fields scraped from one listing, in raw column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    JobNumber,
    Occupation,
    Employer,
    WorkLocation,
    JobDescription,
    EmploymentType,
    NonRegularTitle,
    Wage,
    ListingCategory,
    ReceivedDate,
    ReferralDeadline,
    WorkHours,
    Holidays,
    Age,
    Visibility,
    SpecialConditions,
    ListingCount,
    JobSheetUrl,
    DetailUrl,
}

impl Field {
    pub const COUNT: usize = 19;

    pub const ALL: [Field; Field::COUNT] = [
        Field::JobNumber,
        Field::Occupation,
        Field::Employer,
        Field::WorkLocation,
        Field::JobDescription,
        Field::EmploymentType,
        Field::NonRegularTitle,
        Field::Wage,
        Field::ListingCategory,
        Field::ReceivedDate,
        Field::ReferralDeadline,
        Field::WorkHours,
        Field::Holidays,
        Field::Age,
        Field::Visibility,
        Field::SpecialConditions,
        Field::ListingCount,
        Field::JobSheetUrl,
        Field::DetailUrl,
    ];

    /// Column name in the store; doubles as the label text on the listing.
    pub fn column(self) -> &'static str {
        match self {
            Field::JobNumber => "求人番号",
            Field::Occupation => "職種",
            Field::Employer => "事業所名",
            Field::WorkLocation => "就業場所",
            Field::JobDescription => "仕事の内容",
            Field::EmploymentType => "雇用形態",
            Field::NonRegularTitle => "正社員以外の名称",
            Field::Wage => "賃金",
            Field::ListingCategory => "求人区分",
            Field::ReceivedDate => "受付年月日",
            Field::ReferralDeadline => "紹介期限日",
            Field::WorkHours => "就業時間",
            Field::Holidays => "休日",
            Field::Age => "年齢",
            Field::Visibility => "公開範囲",
            Field::SpecialConditions => "こだわり条件",
            Field::ListingCount => "求人数",
            Field::JobSheetUrl => "求人票リンク",
            Field::DetailUrl => "詳細リンク",
        }
    }

    /// Map a cleaned body label to its field, if it is part of the vocabulary.
    pub fn from_label(label: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.column() == label)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One listing as scraped. Every vocabulary field is always present; `None`
/// means the listing fragment did not carry it. Body labels outside the
/// vocabulary are kept in `extra`, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    values: [Option<String>; Field::COUNT],
    extra: Vec<(String, String)>,
}

impl RawRecord {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values[field.index()].as_deref()
    }

    pub fn extra(&self) -> &[(String, String)] {
        &self.extra
    }

    pub(crate) fn set(&mut self, field: Field, value: Option<String>) {
        self.values[field.index()] = value;
    }

    pub(crate) fn set_extra(&mut self, label: String, value: String) {
        match self.extra.iter_mut().find(|(l, _)| *l == label) {
            Some(slot) => slot.1 = value,
            None => self.extra.push((label, value)),
        }
    }

    pub fn to_row(&self) -> Row {
        let mut row = Row::default();
        for field in Field::ALL {
            row.push(field.column(), self.get(field).map(str::to_string));
        }
        for (label, value) in self.extra() {
            row.push(label, Some(value.clone()));
        }
        row
    }
}

/// A record flattened to named cells, ready for the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Option<String>)>,
}

impl Row {
    pub fn push(&mut self, column: &str, value: Option<String>) {
        self.cells.push((column.to_string(), value));
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, v)| v.as_deref())
    }

    #[cfg(test)]
    pub fn has_column(&self, column: &str) -> bool {
        self.cells.iter().any(|(c, _)| c == column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }
}

/// Which fixed column order the store is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    Raw,
    Normalized,
}

pub const PREFECTURE: &str = "就業場所_都道府県";
pub const LOCALITY: &str = "就業場所_市区町村";
pub const WAGE_MIN: &str = "賃金_下限";
pub const WAGE_MAX: &str = "賃金_上限";
pub const WAGE_UNIT: &str = "賃金_単位";
pub const RECEIVED_ISO: &str = "受付年月日_YYYYMMDD";
pub const DEADLINE_ISO: &str = "紹介期限日_YYYYMMDD";
pub const HOLIDAY_DAYS_TEXT: &str = "休日_曜日等";
pub const HOLIDAY_WEEKEND: &str = "休日_週休二日制";
pub const HOLIDAY_PER_YEAR: &str = "休日_年間休日数";
pub const AGE_RESTRICTED: &str = "年齢制限_有無";
pub const AGE_MIN: &str = "年齢制限_下限";
pub const AGE_MAX: &str = "年齢制限_上限";
pub const CONDITIONS_LIST: &str = "こだわり条件_リスト";
pub const LISTING_COUNT_NUM: &str = "求人数_数値";

/// Derived columns that hold plain numbers.
pub const NUMERIC_COLUMNS: &[&str] = &[
    WAGE_MIN,
    WAGE_MAX,
    HOLIDAY_PER_YEAR,
    AGE_MIN,
    AGE_MAX,
    LISTING_COUNT_NUM,
];

const NORMALIZED_ORDER: &[&str] = &[
    "求人番号",
    "職種",
    "事業所名",
    "就業場所",
    PREFECTURE,
    LOCALITY,
    "仕事の内容",
    "雇用形態",
    "正社員以外の名称",
    "賃金",
    WAGE_MIN,
    WAGE_MAX,
    WAGE_UNIT,
    "求人区分",
    "受付年月日",
    RECEIVED_ISO,
    "紹介期限日",
    DEADLINE_ISO,
    "就業時間",
    "休日",
    HOLIDAY_DAYS_TEXT,
    HOLIDAY_WEEKEND,
    HOLIDAY_PER_YEAR,
    "年齢",
    AGE_RESTRICTED,
    AGE_MIN,
    AGE_MAX,
    "公開範囲",
    "こだわり条件",
    CONDITIONS_LIST,
    "求人数",
    LISTING_COUNT_NUM,
    "求人票リンク",
    "詳細リンク",
];

impl Schema {
    pub fn columns(self) -> Vec<String> {
        match self {
            Schema::Raw => Field::ALL.iter().map(|f| f.column().to_string()).collect(),
            Schema::Normalized => NORMALIZED_ORDER.iter().map(|c| c.to_string()).collect(),
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_has_every_field_as_null() {
        let r = RawRecord::default();
        let row = r.to_row();
        for f in Field::ALL {
            assert!(row.has_column(f.column()), "missing {}", f);
            assert_eq!(row.get(f.column()), None);
        }
    }

    #[test]
    fn field_index_matches_position() {
        for (i, f) in Field::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn normalized_order_keeps_every_raw_column() {
        let normalized = Schema::Normalized.columns();
        for c in Schema::Raw.columns() {
            assert!(normalized.contains(&c), "{} dropped", c);
        }
        assert_eq!(normalized.len(), 34);
    }

    #[test]
    fn extras_follow_vocabulary_and_overwrite_in_place() {
        let mut r = RawRecord::default();
        r.set_extra("備考".into(), "a".into());
        r.set_extra("備考".into(), "b".into());
        let row = r.to_row();
        let cols: Vec<&str> = row.columns().collect();
        assert_eq!(cols.len(), Field::COUNT + 1);
        assert_eq!(cols.last(), Some(&"備考"));
        assert_eq!(row.get("備考"), Some("b"));
    }

    #[test]
    fn label_lookup() {
        assert_eq!(Field::from_label("賃金"), Some(Field::Wage));
        assert_eq!(Field::from_label("雇用期間"), None);
    }
}
