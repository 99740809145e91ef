use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Selector};

use crate::error::ExtractionFailure;
use crate::record::{Field, RawRecord};

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static HEAD_ROW: LazyLock<Selector> = LazyLock::new(|| sel("tr.kyujin_head"));
static BODY_ROW: LazyLock<Selector> = LazyLock::new(|| sel("tr.kyujin_body"));
static OCCUPATION: LazyLock<Selector> = LazyLock::new(|| sel("tr.kyujin_head td.m13 div"));
static DATES: LazyLock<Selector> = LazyLock::new(|| {
    sel("tr:not(.kyujin_head):not(.kyujin_body):not(.kyujin_foot) div.flex.fs13")
});
static LABELED_ROW: LazyLock<Selector> =
    LazyLock::new(|| sel("tr.kyujin_body tr.border_new"));
static LABEL_CELL: LazyLock<Selector> = LazyLock::new(|| sel("td.fb"));
static DIV: LazyLock<Selector> = LazyLock::new(|| sel("div"));
static CONDITION_TAG: LazyLock<Selector> =
    LazyLock::new(|| sel("div.kodawari span.nes_label"));
static JOB_SHEET_LINK: LazyLock<Selector> = LazyLock::new(|| sel("a#ID_kyujinhyoBtn"));
static DETAIL_LINK: LazyLock<Selector> = LazyLock::new(|| sel("a#ID_dispDetailBtn"));

const LABEL_SUFFIX: &str = "（手当等を含む）";
const RECEIVED_LABEL: &str = "受付年月日：";
const DEADLINE_LABEL: &str = "紹介期限日：";
const COUNT_MARKER: &str = "求人数：";
const COUNT_CLASS: &str = "ml01";

/// Turn one listing table into a raw record. Links are resolved against `base`.
pub fn extract_listing(
    fragment: ElementRef<'_>,
    base: &Url,
    index: usize,
) -> Result<RawRecord, ExtractionFailure> {
    let fail = |reason: String| ExtractionFailure { index, reason };

    if fragment.select(&HEAD_ROW).next().is_none() && fragment.select(&BODY_ROW).next().is_none() {
        return Err(fail("fragment has neither a header nor a body row".into()));
    }

    let mut record = RawRecord::default();

    let occupation = fragment.select(&OCCUPATION).next().map(|d| joined(d, ""));
    record.set(Field::Occupation, occupation.and_then(non_empty));

    if let Some(dates) = fragment.select(&DATES).next() {
        let text = joined(dates, " ");
        let tokens: Vec<&str> = text.split_whitespace().collect();
        record.set(Field::ReceivedDate, token_after(&tokens, RECEIVED_LABEL));
        record.set(Field::ReferralDeadline, token_after(&tokens, DEADLINE_LABEL));
    }

    for row in fragment.select(&LABELED_ROW) {
        let Some(label_cell) = row.select(&LABEL_CELL).next() else {
            continue;
        };
        let Some(value_cell) = next_cell(label_cell) else {
            continue;
        };
        let label = clean_label(label_cell);
        if label.is_empty() {
            continue;
        }
        let value = cell_value(&label, value_cell);
        match Field::from_label(&label) {
            Some(field) => record.set(field, non_empty(value)),
            None => record.set_extra(label, value),
        }
    }

    let tags: Vec<String> = fragment
        .select(&CONDITION_TAG)
        .map(|t| joined(t, ""))
        .collect();
    record.set(
        Field::SpecialConditions,
        (!tags.is_empty()).then(|| tags.join(", ")),
    );

    record.set(Field::ListingCount, listing_count(fragment));

    record.set(
        Field::JobSheetUrl,
        link(fragment, &JOB_SHEET_LINK, base).map_err(fail)?,
    );
    record.set(
        Field::DetailUrl,
        link(fragment, &DETAIL_LINK, base).map_err(fail)?,
    );

    if record.get(Field::JobNumber).is_none() {
        record.set(Field::JobNumber, job_number_fallback(fragment));
    }

    Ok(record)
}

/// Text nodes trimmed, blanks dropped, joined with `sep`.
fn joined(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Every non-blank line of the element's text, trimmed.
fn lines(el: ElementRef<'_>) -> Vec<String> {
    el.text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

fn token_after(tokens: &[&str], label: &str) -> Option<String> {
    tokens.iter().enumerate().find_map(|(i, t)| {
        if *t == label {
            tokens.get(i + 1).map(|v| v.to_string())
        } else {
            t.strip_prefix(label)
                .filter(|rest| !rest.is_empty())
                .map(str::to_string)
        }
    })
}

fn next_cell(cell: ElementRef<'_>) -> Option<ElementRef<'_>> {
    cell.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "td")
}

fn clean_label(cell: ElementRef<'_>) -> String {
    collapse(&joined(cell, ""))
        .replace(LABEL_SUFFIX, "")
        .trim()
        .to_string()
}

fn cell_value(label: &str, cell: ElementRef<'_>) -> String {
    match Field::from_label(label) {
        Some(Field::Wage) => lines(cell).join(" "),
        Some(Field::JobDescription) => match cell.select(&DIV).next() {
            Some(div) => lines(div).join("\n"),
            None => collapse(&joined(cell, " ")),
        },
        Some(Field::JobNumber) => match cell.select(&DIV).next() {
            Some(div) => joined(div, ""),
            None => joined(cell, ""),
        },
        _ => collapse(&joined(cell, " ")),
    }
}

/// The number in the first `div.ml01` after the "求人数：" text.
fn listing_count(fragment: ElementRef<'_>) -> Option<String> {
    let mut after_marker = false;
    for node in fragment.descendants() {
        if let Some(text) = node.value().as_text() {
            if text.trim().contains(COUNT_MARKER) {
                after_marker = true;
            }
            continue;
        }
        if !after_marker {
            continue;
        }
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().name() == "div" && el.value().classes().any(|c| c == COUNT_CLASS) {
                return non_empty(joined(el, ""));
            }
        }
    }
    None
}

fn link(fragment: ElementRef<'_>, selector: &Selector, base: &Url) -> Result<Option<String>, String> {
    let Some(href) = fragment
        .select(selector)
        .next()
        .and_then(|a| a.value().attr("href"))
    else {
        return Ok(None);
    };
    base.join(href.trim())
        .map(|u| Some(u.to_string()))
        .map_err(|e| format!("cannot resolve link `{}`: {}", href, e))
}

fn job_number_fallback(fragment: ElementRef<'_>) -> Option<String> {
    fragment
        .select(&LABEL_CELL)
        .find(|td| joined(*td, "").contains(Field::JobNumber.column()))
        .and_then(next_cell)
        .and_then(|td| td.select(&DIV).next())
        .map(|div| joined(div, ""))
        .and_then(non_empty)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_listing(html: &str) -> Result<RawRecord, ExtractionFailure> {
        let doc = Html::parse_document(html);
        let table = doc.select(&sel("table.kyujin")).next().unwrap();
        let base = Url::parse("https://www.hellowork.mhlw.go.jp/kensaku/GECA110010.do").unwrap();
        extract_listing(table, &base, 1)
    }

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/result_page.html").unwrap()
    }

    #[test]
    fn full_listing_fields() {
        let r = first_listing(&fixture()).unwrap();
        assert_eq!(r.get(Field::Occupation), Some("一般事務員"));
        assert_eq!(r.get(Field::ReceivedDate), Some("2025年4月1日"));
        assert_eq!(r.get(Field::ReferralDeadline), Some("2025年6月30日"));
        assert_eq!(r.get(Field::JobNumber), Some("13010-12345651"));
        assert_eq!(r.get(Field::Employer), Some("株式会社 サンプル商事"));
        assert_eq!(r.get(Field::WorkLocation), Some("東京都 渋谷区"));
        assert_eq!(r.get(Field::Wage), Some("200,000円〜250,000円 月給"));
        assert_eq!(r.get(Field::WorkHours), Some("(1) 9時00分〜18時00分"));
        assert_eq!(
            r.get(Field::JobDescription),
            Some("・受付業務\n・データ入力\n・電話応対")
        );
        assert_eq!(r.get(Field::SpecialConditions), Some("駅近, 車通勤可"));
        assert_eq!(r.get(Field::ListingCount), Some("2"));
        assert_eq!(
            r.get(Field::JobSheetUrl),
            Some("https://www.hellowork.mhlw.go.jp/kensaku/GECA110010.do?screenId=GECA110010&action=dispDetailBtn&kJNo=1301012345651")
        );
        assert_eq!(
            r.get(Field::DetailUrl),
            Some("https://www.hellowork.mhlw.go.jp/kensaku/GECA110020.do?kJNo=1301012345651")
        );
        // Label carried a suffix that must be stripped.
        assert!(r.extra().iter().all(|(l, _)| !l.contains(LABEL_SUFFIX)));
        assert_eq!(r.extra(), &[("雇用期間".to_string(), "定めなし".to_string())]);
    }

    #[test]
    fn sparse_listing_keeps_every_field() {
        let html = r#"<table class="kyujin mt1 noborder">
            <tr class="kyujin_head"><td class="m13"><div>倉庫作業員</div></td></tr>
            <tr class="kyujin_body"><td><table>
              <tr class="border_new"><td class="fb">求人番号</td><td>27010-999</td></tr>
              <tr class="border_new"><td class="fb"> </td><td>ignored</td></tr>
            </table></td></tr>
        </table>"#;
        let r = first_listing(html).unwrap();
        assert_eq!(r.get(Field::Occupation), Some("倉庫作業員"));
        assert_eq!(r.get(Field::JobNumber), Some("27010-999"));
        for f in [
            Field::Wage,
            Field::ReceivedDate,
            Field::ReferralDeadline,
            Field::SpecialConditions,
            Field::ListingCount,
            Field::JobSheetUrl,
            Field::DetailUrl,
        ] {
            assert_eq!(r.get(f), None, "{}", f);
        }
        assert!(r.extra().is_empty());
    }

    #[test]
    fn job_number_found_by_fallback() {
        let html = r#"<table class="kyujin mt1 noborder">
            <tr class="kyujin_head"><td class="m13"><div>調理師</div></td></tr>
            <tr class="kyujin_foot"><td class="fb">求人番号：</td><td><div>01010-777</div></td></tr>
        </table>"#;
        let r = first_listing(html).unwrap();
        assert_eq!(r.get(Field::JobNumber), Some("01010-777"));
    }

    #[test]
    fn dates_glued_to_labels() {
        let html = r#"<table class="kyujin mt1 noborder">
            <tr class="kyujin_head"><td class="m13"><div>看護師</div></td></tr>
            <tr><td><div class="flex fs13"><span>受付年月日：2025年5月7日</span><span>紹介期限日：</span><span>2025年7月31日</span></div></td></tr>
        </table>"#;
        let r = first_listing(html).unwrap();
        assert_eq!(r.get(Field::ReceivedDate), Some("2025年5月7日"));
        assert_eq!(r.get(Field::ReferralDeadline), Some("2025年7月31日"));
    }

    #[test]
    fn not_a_listing() {
        let err = first_listing(r#"<table class="kyujin"><tr><td>広告</td></tr></table>"#)
            .unwrap_err();
        assert_eq!(err.index, 1);
    }

    #[test]
    fn label_after_token_missing() {
        assert_eq!(token_after(&["受付年月日："], RECEIVED_LABEL), None);
        assert_eq!(token_after(&["x", "受付年月日：", "2025年1月1日"], RECEIVED_LABEL).as_deref(), Some("2025年1月1日"));
    }
}
