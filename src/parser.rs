//! Field extraction for the e-commerce test site.
//!
//! Each field has its own function with an explicit fallback, so a product
//! card with a missing piece degrades to `""` or `0` instead of failing.
//! Where several elements match, the first one inside the card wins.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ParseError;
use crate::models::ListingEntry;

static PRODUCT_NODE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.thumbnail").unwrap());
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.title").unwrap());
static PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="price"], .price"#).unwrap());
static RATING_ATTR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".ratings [data-rating]").unwrap());
static RATING_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".ratings p").unwrap());
static STAR_ICON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".ws-icon-star, .glyphicon-star").unwrap());
static REVIEW_COUNT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="reviewCount"], .review-count"#).unwrap());
static SNIPPET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.description").unwrap());
static DETAIL_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="description"]"#).unwrap());
static DETAIL_DESCRIPTION_FALLBACK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".description").unwrap());
static NEXT_PAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"ul.pagination a[rel="next"], ul.pagination li.next a, ul.pagination a.next"#,
    )
    .unwrap()
});
static BASE_HREF: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").unwrap());

pub const MAX_RATING: u8 = 5;

/// Products found on one listing page, plus the cards that had to be skipped.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub entries: Vec<ListingEntry>,
    pub skipped: Vec<ParseError>,
}

pub fn parse_listing(html: &str, page_url: &Url) -> ListingPage {
    let doc = Html::parse_document(html);
    let base = document_base(&doc, page_url);

    let mut page = ListingPage::default();
    for (index, node) in doc.select(&PRODUCT_NODE).enumerate() {
        match parse_product_node(node, &base) {
            Ok(entry) => page.entries.push(entry),
            Err(reason) => page.skipped.push(ParseError { index, reason }),
        }
    }
    page
}

fn parse_product_node(node: ElementRef<'_>, base: &Url) -> Result<ListingEntry, String> {
    let link = node
        .select(&TITLE_LINK)
        .next()
        .ok_or_else(|| "no title link".to_string())?;

    let title = link
        .value()
        .attr("title")
        .map(normalize_whitespace)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| element_text(link));
    if title.is_empty() {
        return Err("empty title".to_string());
    }

    let href = link
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| format!("'{}' has no product link", title))?;
    let product_url = resolve_product_url(base, href)
        .ok_or_else(|| format!("'{}' has unusable product link '{}'", title, href))?;

    Ok(ListingEntry {
        price: extract_price(node),
        rating: extract_rating(node),
        reviews_count: extract_reviews_count(node),
        snippet: extract_snippet(node),
        title,
        product_url: product_url.to_string(),
    })
}

/// Honors a `<base href>` if the page declares one.
fn document_base(doc: &Html, page_url: &Url) -> Url {
    doc.select(&BASE_HREF)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

fn resolve_product_url(base: &Url, href: &str) -> Option<Url> {
    let url = base.join(href).ok()?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Some(url),
        _ => None,
    }
}

fn extract_price(node: ElementRef<'_>) -> String {
    node.select(&PRICE)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// Star count from `data-rating`, else counted icons, clamped to 0..=5.
fn extract_rating(node: ElementRef<'_>) -> u8 {
    if let Some(el) = node.select(&RATING_ATTR).next() {
        let value = el.value().attr("data-rating").unwrap_or_default();
        return value
            .trim()
            .parse::<i64>()
            .map(clamp_rating)
            .unwrap_or(0);
    }

    node.select(&RATING_ROW)
        .map(|row| row.select(&STAR_ICON).count())
        .find(|&stars| stars > 0)
        .map(|stars| clamp_rating(stars as i64))
        .unwrap_or(0)
}

fn clamp_rating(value: i64) -> u8 {
    value.clamp(0, MAX_RATING as i64) as u8
}

/// "11 reviews" -> 11. Anything unparseable is 0.
fn extract_reviews_count(node: ElementRef<'_>) -> u32 {
    node.select(&REVIEW_COUNT)
        .next()
        .map(element_text)
        .and_then(|text| {
            text.split_whitespace()
                .next()
                .and_then(|token| token.parse::<u32>().ok())
        })
        .unwrap_or(0)
}

fn extract_snippet(node: ElementRef<'_>) -> String {
    node.select(&SNIPPET)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// Description text from a product detail page, `""` when the page has none.
pub fn parse_description(html: &str) -> String {
    let doc = Html::parse_document(html);
    doc.select(&DETAIL_DESCRIPTION)
        .next()
        .or_else(|| doc.select(&DETAIL_DESCRIPTION_FALLBACK).next())
        .map(element_text)
        .unwrap_or_default()
}

/// Absolute URL of the next listing page, if the pagination block has an enabled "next" link.
pub fn next_page_url(html: &str, page_url: &Url) -> Option<Url> {
    let doc = Html::parse_document(html);
    let base = document_base(&doc, page_url);

    doc.select(&NEXT_PAGE)
        .filter(|link| !in_disabled_item(*link))
        .filter_map(|link| link.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && *href != "#")
        .find_map(|href| resolve_product_url(&base, href))
}

fn in_disabled_item(link: ElementRef<'_>) -> bool {
    link.value().classes().any(|c| c == "disabled")
        || link
            .ancestors()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "li")
            .take(1)
            .any(|li| li.value().classes().any(|c| c == "disabled"))
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LISTING: &str = include_str!("../tests/fixtures/listing_single.html");

    fn page_url() -> Url {
        Url::parse("https://webscraper.io/test-sites/e-commerce/static/computers/laptops").unwrap()
    }

    fn card(inner: &str) -> String {
        format!(
            r#"<html><body><div class="card thumbnail"><div class="caption">{}</div></div></body></html>"#,
            inner
        )
    }

    #[test]
    fn parses_fixture_product() {
        let page = parse_listing(LISTING, &page_url());
        assert!(page.skipped.is_empty());
        assert_eq!(
            page.entries,
            vec![ListingEntry {
                title: "Lenovo V110 15.6".to_string(),
                price: "$356.49".to_string(),
                rating: 4,
                reviews_count: 11,
                product_url: "https://webscraper.io/test-sites/e-commerce/static/product/31"
                    .to_string(),
                snippet: "Lenovo V110-15IAP, 15.6\" HD, Celeron N3350 1.1GHz, 4GB, 128GB SSD, Windows 10 Home".to_string(),
            }]
        );
    }

    #[test]
    fn page_without_products_is_empty_not_an_error() {
        let page = parse_listing("<html><body><p>Nothing here</p></body></html>", &page_url());
        assert!(page.entries.is_empty());
        assert!(page.skipped.is_empty());
    }

    #[test]
    fn card_without_title_link_is_skipped() {
        let html = card(r#"<h4 class="price">$10.00</h4>"#);
        let page = parse_listing(&html, &page_url());
        assert!(page.entries.is_empty());
        assert_eq!(page.skipped.len(), 1);
        assert_eq!(page.skipped[0].index, 0);
    }

    #[test]
    fn card_without_href_is_skipped() {
        let html = card(r#"<a class="title" title="Widget">Widget</a>"#);
        let page = parse_listing(&html, &page_url());
        assert!(page.entries.is_empty());
        assert!(page.skipped[0].reason.contains("Widget"));
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let html = card(r#"<a class="title" href="/product/1">Bare  Widget</a>"#);
        let entry = &parse_listing(&html, &page_url()).entries[0];
        assert_eq!(entry.title, "Bare Widget");
        assert_eq!(entry.price, "");
        assert_eq!(entry.rating, 0);
        assert_eq!(entry.reviews_count, 0);
        assert_eq!(entry.snippet, "");
        assert_eq!(entry.product_url, "https://webscraper.io/product/1");
    }

    #[test]
    fn rating_is_clamped() {
        let html = card(
            r#"<a class="title" href="p/1" title="A">A</a>
               <div class="ratings"><p data-rating="9"></p></div>"#,
        );
        assert_eq!(parse_listing(&html, &page_url()).entries[0].rating, 5);

        let html = card(
            r#"<a class="title" href="p/1" title="A">A</a>
               <div class="ratings"><p data-rating="-2"></p></div>"#,
        );
        assert_eq!(parse_listing(&html, &page_url()).entries[0].rating, 0);
    }

    #[test]
    fn first_rating_indicator_wins() {
        let html = card(
            r#"<a class="title" href="p/1" title="A">A</a>
               <div class="ratings"><p data-rating="2"></p><p data-rating="5"></p></div>"#,
        );
        assert_eq!(parse_listing(&html, &page_url()).entries[0].rating, 2);
    }

    #[test]
    fn rating_falls_back_to_star_icons() {
        let html = card(
            r#"<a class="title" href="p/1" title="A">A</a>
               <div class="ratings">
                 <p class="pull-right">3 reviews</p>
                 <p><span class="glyphicon glyphicon-star"></span><span class="glyphicon glyphicon-star"></span><span class="glyphicon glyphicon-star"></span></p>
               </div>"#,
        );
        assert_eq!(parse_listing(&html, &page_url()).entries[0].rating, 3);
    }

    #[test]
    fn unparseable_review_count_is_zero() {
        let html = card(
            r#"<a class="title" href="p/1" title="A">A</a>
               <div class="ratings"><p class="review-count">no reviews</p></div>"#,
        );
        assert_eq!(parse_listing(&html, &page_url()).entries[0].reviews_count, 0);
    }

    #[test]
    fn relative_links_respect_base_href() {
        let html = r#"<html><head><base href="https://shop.example/catalog/"></head><body>
            <div class="thumbnail"><a class="title" href="item/7" title="Seven">Seven</a></div>
            </body></html>"#;
        let entry = &parse_listing(html, &page_url()).entries[0];
        assert_eq!(entry.product_url, "https://shop.example/catalog/item/7");
    }

    #[test]
    fn javascript_links_are_rejected() {
        let html = card(r#"<a class="title" href="javascript:void(0)" title="A">A</a>"#);
        let page = parse_listing(&html, &page_url());
        assert!(page.entries.is_empty());
        assert_eq!(page.skipped.len(), 1);
    }

    #[test]
    fn description_from_detail_page() {
        let html = include_str!("../tests/fixtures/product_31.html");
        assert_eq!(
            parse_description(html),
            "Lenovo V110-15IAP, 15.6\" HD, Celeron N3350 1.1GHz, 4GB, 128GB SSD, Windows 10 Home"
        );
    }

    #[test]
    fn missing_description_is_empty() {
        assert_eq!(parse_description("<html><body><h4>x</h4></body></html>"), "");
    }

    #[test]
    fn next_page_link_is_followed_until_disabled() {
        let html = r#"<ul class="pagination">
            <li class="page-item"><a class="page-link" href="?page=1">1</a></li>
            <li class="page-item"><a class="page-link next" href="?page=2" rel="next">&rsaquo;</a></li>
        </ul>"#;
        assert_eq!(
            next_page_url(html, &page_url()).unwrap().as_str(),
            "https://webscraper.io/test-sites/e-commerce/static/computers/laptops?page=2"
        );

        let last = r##"<ul class="pagination">
            <li class="page-item next disabled"><a class="page-link" href="#">&rsaquo;</a></li>
        </ul>"##;
        assert!(next_page_url(last, &page_url()).is_none());
    }

    #[test]
    fn no_pagination_block_means_no_next_page() {
        assert!(next_page_url(LISTING, &page_url()).is_none());
    }
}
