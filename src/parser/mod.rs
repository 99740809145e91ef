pub mod extract;
pub mod normalize;

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{Html, Selector};

use crate::error::ExtractionFailure;
use crate::record::RawRecord;

static LISTING_FRAGMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.kyujin.mt1.noborder").unwrap());
static READY_MARKER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(READY_MARKER_CSS).unwrap());
static INFO_MESSAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.msg_disp_info").unwrap());

/// CSS that is present once a result page (listings or the empty message) has rendered.
pub const READY_MARKER_CSS: &str = "table.kyujin, div.msg_disp_info";
const NO_RESULTS_TEXT: &str = "ご指定の条件に該当する求人はありませんでした";

/// What one result page holds, in fragment order.
pub struct ParsedPage {
    pub no_results: bool,
    pub listings: Vec<Result<RawRecord, ExtractionFailure>>,
}

/// Whether the result page has rendered either listings or the info message.
pub fn is_ready(markup: &str) -> bool {
    let doc = Html::parse_document(markup);
    let found = doc.select(&READY_MARKER).next().is_some();
    found
}

/// Run the field extractor over every listing fragment on a result page.
pub fn parse_page(markup: &str, page_url: &str) -> ParsedPage {
    let doc = Html::parse_document(markup);
    let no_results = doc
        .select(&INFO_MESSAGE)
        .any(|d| d.text().collect::<String>().contains(NO_RESULTS_TEXT));

    let base = Url::parse(page_url);
    let listings = doc
        .select(&LISTING_FRAGMENT)
        .enumerate()
        .map(|(i, fragment)| match &base {
            Ok(base) => extract::extract_listing(fragment, base, i + 1),
            Err(e) => Err(ExtractionFailure {
                index: i + 1,
                reason: format!("page URL `{}` is not absolute: {}", page_url, e),
            }),
        })
        .collect();

    ParsedPage {
        no_results,
        listings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;

    const URL: &str = "https://www.hellowork.mhlw.go.jp/kensaku/GECA110010.do";

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn result_page_listings_in_order() {
        let page = parse_page(&fixture("result_page"), URL);
        assert!(!page.no_results);
        assert_eq!(page.listings.len(), 3);

        let numbers: Vec<_> = page
            .listings
            .iter()
            .filter_map(|l| l.as_ref().ok())
            .map(|r| r.get(Field::JobNumber).unwrap_or("").to_string())
            .collect();
        assert_eq!(numbers, ["13010-12345651", "27010-55555551"]);

        let failure = page.listings[2].as_ref().unwrap_err();
        assert_eq!(failure.index, 3);
    }

    #[test]
    fn empty_search_is_detected() {
        let markup = fixture("no_results");
        assert!(is_ready(&markup));
        let page = parse_page(&markup, URL);
        assert!(page.no_results);
        assert!(page.listings.is_empty());
    }

    #[test]
    fn unrelated_page_is_not_ready() {
        assert!(!is_ready("<html><body><p>メンテナンス中</p></body></html>"));
    }

    #[test]
    fn relative_page_url_fails_each_listing() {
        let page = parse_page(&fixture("result_page"), "GECA110010.do");
        assert!(page.listings.iter().all(|l| l.is_err()));
    }
}
