use std::sync::LazyLock;

use regex::Regex;

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)円[〜～]([\d.]+)円").unwrap());
static FIXED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([\d.]+)円$").unwrap());
static FIXED_HOURLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\d.]+)円／ ?時間給$").unwrap());
static FIXED_DAILY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\d.]+)円／ ?日給$").unwrap());

const HOURLY_MARKER: &str = "時間給";
const DAILY_MARKER: &str = "日給";
const PART_TIME: &str = "パート労働者";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WageUnit {
    Hourly,
    Daily,
    /// Monthly salary or a flat amount.
    Flat,
}

impl WageUnit {
    pub fn label(self) -> &'static str {
        match self {
            WageUnit::Hourly => "円/時",
            WageUnit::Daily => "円/日",
            WageUnit::Flat => "円",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wage {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub unit: Option<WageUnit>,
}

impl Wage {
    fn range(min: &str, max: &str, unit: WageUnit) -> Wage {
        match (to_yen(min), to_yen(max)) {
            (Some(min), Some(max)) => Wage {
                min: Some(min),
                max: Some(max),
                unit: Some(unit),
            },
            _ => Wage::default(),
        }
    }

    fn fixed(value: &str, unit: WageUnit) -> Wage {
        Wage::range(value, value, unit)
    }
}

/// Parse the wage cell into a range and unit. The first matching pattern
/// decides the result; a match whose numbers do not parse yields no wage.
///
/// Unit markers are looked for in the wage text and the employment type.
pub fn parse_wage(text: &str, employment: Option<&str>) -> Wage {
    let text = text.replace(',', "");
    let text = text.trim();
    if text.is_empty() {
        return Wage::default();
    }
    let employment = employment.unwrap_or("");
    let marked = |marker: &str| text.contains(marker) || employment.contains(marker);

    if let Some(caps) = RANGE_RE.captures(text) {
        let unit = if marked(HOURLY_MARKER) {
            WageUnit::Hourly
        } else if marked(DAILY_MARKER) {
            WageUnit::Daily
        } else {
            WageUnit::Flat
        };
        return Wage::range(&caps[1], &caps[2], unit);
    }
    if let Some(caps) = FIXED_HOURLY_RE.captures(text) {
        return Wage::fixed(&caps[1], WageUnit::Hourly);
    }
    if let Some(caps) = FIXED_DAILY_RE.captures(text) {
        return Wage::fixed(&caps[1], WageUnit::Daily);
    }
    if let Some(caps) = FIXED_RE.captures(text) {
        let unit = if employment == PART_TIME {
            WageUnit::Hourly
        } else {
            WageUnit::Flat
        };
        return Wage::fixed(&caps[1], unit);
    }
    Wage::default()
}

fn to_yen(s: &str) -> Option<i64> {
    let v = s.parse::<f64>().ok()?;
    v.is_finite().then_some(v.trunc() as i64)
}
