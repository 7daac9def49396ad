//! HTML parsers for the catalog and quotes pages
//!
//! Every function here is pure: it takes page text (and the page URL for
//! resolving relative links) and returns owned records. Fetching, pacing and
//! random synthesis happen in the callers.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// Label of the navigation root, which is not a category
pub const ROOT_CATEGORY_LABEL: &str = "Books";

/// One book container of a listing page
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub title: String,
    pub detail_url: String,
    pub price: f64,
    pub availability: String,
    pub rating: Option<u8>,
    pub image_url: String,
}

/// Fields read from a book detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDetails {
    pub description: Option<String>,
    pub upc: String,
    /// Value of the availability row of the product table
    pub availability_info: Option<String>,
    /// Third breadcrumb link (Home > Books > Category)
    pub category: Option<String>,
}

/// One quote block of a quotes page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteEntry {
    /// Quote text with the quotation marks stripped, `None` without a text span
    pub text: Option<String>,
    pub author: Option<String>,
    pub tags: Vec<String>,
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector '{}': {:?}", css, e))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn resolve(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base_url.join(href).ok().map(|url| url.to_string())
}

/// Parses a displayed price, dropping the currency symbol and separators
///
/// `"£51.77"` gives `51.77`.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().ok()
}

/// Maps a star-rating class token to its value
pub fn rating_from_word(word: &str) -> Option<u8> {
    match word {
        "One" => Some(1),
        "Two" => Some(2),
        "Three" => Some(3),
        "Four" => Some(4),
        "Five" => Some(5),
        _ => None,
    }
}

/// Finds the first `20xx` year in a piece of text
pub fn extract_year(text: &str) -> Option<i32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"20\d{2}").expect("year pattern is valid"));

    re.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Strips the trailing book count some navigation labels carry
fn clean_category_name(label: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\s+\d+$").expect("count pattern is valid"));

    re.replace(label.trim(), "").trim().to_string()
}

/// Strips straight and curly quotation marks around a quote
pub fn strip_quotation_marks(text: &str) -> String {
    text.trim()
        .trim_matches(|c| c == '"' || c == '\u{201c}' || c == '\u{201d}')
        .to_string()
}

/// Extracts the category names and URLs from the catalog home page
///
/// Names are deduplicated in first-seen order and the navigation root is
/// left out.
pub fn parse_categories(html: &str, base_url: &Url) -> Result<Vec<(String, String)>, String> {
    let document = Html::parse_document(html);
    let link_selector = selector("ul.nav.nav-list a")?;

    let mut categories: Vec<(String, String)> = Vec::new();
    for link in document.select(&link_selector) {
        let name = clean_category_name(&element_text(link));
        if name.is_empty() || name == ROOT_CATEGORY_LABEL {
            continue;
        }
        if categories.iter().any(|(existing, _)| *existing == name) {
            continue;
        }

        let url = link
            .value()
            .attr("href")
            .and_then(|href| resolve(href, base_url))
            .unwrap_or_default();
        categories.push((name, url));
    }

    Ok(categories)
}

/// Extracts the book containers of a listing page
///
/// An empty vector means the page has no containers, which ends pagination.
/// A container that cannot be read yields an `Err` entry with the reason.
pub fn parse_listing(
    html: &str,
    page_url: &Url,
) -> Result<Vec<Result<ListingEntry, String>>, String> {
    let document = Html::parse_document(html);
    let container_selector = selector("article.product_pod")?;
    let title_selector = selector("h3 a")?;
    let price_selector = selector("p.price_color")?;
    let availability_selector = selector("p.instock.availability")?;
    let rating_selector = selector("p.star-rating")?;
    let image_selector = selector("div.image_container img")?;

    let entries = document
        .select(&container_selector)
        .map(|container| -> Result<ListingEntry, String> {
            let link = container
                .select(&title_selector)
                .next()
                .ok_or_else(|| "book container without title link".to_string())?;

            let title = link
                .value()
                .attr("title")
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| element_text(link));

            let detail_url = link
                .value()
                .attr("href")
                .and_then(|href| resolve(href, page_url))
                .ok_or_else(|| format!("book '{}' has no detail link", title))?;

            let price_text = container
                .select(&price_selector)
                .next()
                .map(element_text)
                .unwrap_or_else(|| "£0.00".to_string());
            let price = parse_price(&price_text)
                .ok_or_else(|| format!("book '{}' has unreadable price '{}'", title, price_text))?;

            let availability = container
                .select(&availability_selector)
                .next()
                .map(element_text)
                .unwrap_or_else(|| "Unknown".to_string());

            let rating = container
                .select(&rating_selector)
                .next()
                .and_then(|p| p.value().classes().find_map(rating_from_word));

            let image_url = container
                .select(&image_selector)
                .next()
                .and_then(|img| img.value().attr("src"))
                .and_then(|src| resolve(src, page_url))
                .unwrap_or_default();

            Ok(ListingEntry {
                title,
                detail_url,
                price,
                availability,
                rating,
                image_url,
            })
        })
        .collect();

    Ok(entries)
}

/// Extracts description, UPC, availability row and category from a detail page
pub fn parse_book_details(html: &str) -> Result<BookDetails, String> {
    let document = Html::parse_document(html);
    let description_selector = selector("#product_description ~ p")?;
    let row_selector = selector("table.table.table-striped tr")?;
    let th_selector = selector("th")?;
    let td_selector = selector("td")?;
    let breadcrumb_selector = selector("ul.breadcrumb a")?;

    let mut details = BookDetails {
        description: document
            .select(&description_selector)
            .next()
            .map(element_text)
            .filter(|d| !d.is_empty()),
        ..BookDetails::default()
    };

    for row in document.select(&row_selector) {
        let (Some(th), Some(td)) = (
            row.select(&th_selector).next(),
            row.select(&td_selector).next(),
        ) else {
            continue;
        };

        let key = element_text(th).to_lowercase();
        let value = element_text(td);

        if key.contains("upc") {
            details.upc = value;
        } else if key.contains("availab") {
            details.availability_info = Some(value);
        }
    }

    details.category = document
        .select(&breadcrumb_selector)
        .nth(2)
        .map(element_text)
        .filter(|c| !c.is_empty());

    Ok(details)
}

/// Extracts the quote blocks of a quotes page
///
/// Every block is returned, including blocks without a text span, so their
/// authors are still seen.
pub fn parse_quotes(html: &str) -> Result<Vec<QuoteEntry>, String> {
    let document = Html::parse_document(html);
    let quote_selector = selector("div.quote")?;
    let author_selector = selector("small.author")?;
    let text_selector = selector("span.text")?;
    let tag_selector = selector("a.tag")?;

    let quotes = document
        .select(&quote_selector)
        .map(|block| {
            let author = block
                .select(&author_selector)
                .next()
                .map(element_text)
                .filter(|a| !a.is_empty());
            let text = block
                .select(&text_selector)
                .next()
                .map(|span| strip_quotation_marks(&element_text(span)));
            let tags = block
                .select(&tag_selector)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect();

            QuoteEntry { text, author, tags }
        })
        .collect();

    Ok(quotes)
}
