//! Search result parsing
//!
//! The site's `/browser?keyword=` page has shifted its card markup several
//! times, so every element is located through a prioritized selector list:
//! the first selector with a non-empty match set wins. Results are
//! deduplicated by URL and capped at the caller's limit.

use scraper::{ElementRef, Html};
use std::collections::HashSet;

use crate::error::Result;
use crate::types::SearchResult;

use super::{compile_selectors, first_matching_set};

/// Card containers, most specific markup generation first
const ITEM_SELECTORS: &[&str] = &[
    ".anime-item",
    ".film_list-wrap .flw-item",
    ".block_area-content .item",
    "article",
    ".anime-card",
];

/// Anchor inside a card
const LINK_SELECTORS: &[&str] = &[
    r#"a[href*="/watch/"]"#,
    r#"a[href*="/anime/"]"#,
    "a.film-poster-ahref",
    ".film-name a",
    "a",
];

/// Title element inside a card
const TITLE_SELECTORS: &[&str] = &[
    ".film-name",
    ".title",
    "h3",
    ".anime-name",
    r#"[class*="title"]"#,
];

/// Parse search result cards out of a browser page
///
/// `base_url` is prepended to relative links. Returns at most `max_results`
/// unique results in document order.
pub fn parse_search_results(
    html: &str,
    base_url: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    let document = Html::parse_document(html);
    let item_chains = compile_selectors(ITEM_SELECTORS)?;
    let link_chains = compile_selectors(LINK_SELECTORS)?;
    let title_chains = compile_selectors(TITLE_SELECTORS)?;
    let img_chain = compile_selectors(&["img"])?;

    let items = first_matching_set(&document, &item_chains);

    let mut seen_urls = HashSet::new();
    let mut results = Vec::new();

    for item in items {
        let Some(link) = first_in_element(item, &link_chains) else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", base_url.trim_end_matches('/'), href)
        };
        if !seen_urls.insert(url.clone()) {
            continue;
        }

        let title = first_in_element(item, &title_chains)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| element_text(link));
        if title.is_empty() {
            continue;
        }

        let image = first_in_element(item, &img_chain)
            .and_then(|img| {
                img.value()
                    .attr("src")
                    .filter(|s| !s.is_empty())
                    .or_else(|| img.value().attr("data-src"))
            })
            .unwrap_or_default()
            .to_string();

        let anime_id = url.rsplit('/').next().unwrap_or_default().to_string();

        results.push(SearchResult {
            title,
            url,
            image,
            anime_id,
        });

        if results.len() >= max_results {
            break;
        }
    }

    Ok(results)
}

/// First element matched by any selector in the chain, scoped to `element`
fn first_in_element<'a>(
    element: ElementRef<'a>,
    chain: &[scraper::Selector],
) -> Option<ElementRef<'a>> {
    chain
        .iter()
        .find_map(|selector| element.select(selector).next())
}

/// Whitespace-trimmed concatenated text of an element
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
