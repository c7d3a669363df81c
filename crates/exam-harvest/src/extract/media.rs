//! Image URL extraction.

use scraper::{Html, Selector};
use url::Url;

/// Sources containing any of these are page chrome rather than question content.
const CHROME_MARKERS: &[&str] = &["logo", "icon", "avatar", "banner", "ad"];

/// Content images in document order, resolved against `page_url`.
pub fn content_images(document: &Html, page_url: &str) -> Vec<String> {
    image_sources(document)
        .filter(|src| {
            let lower = src.to_lowercase();
            !CHROME_MARKERS.iter().any(|m| lower.contains(m))
        })
        .map(|src| resolve(page_url, src))
        .collect()
}

/// Every image in document order, resolved against `page_url`.
pub fn all_images(document: &Html, page_url: &str) -> Vec<String> {
    image_sources(document)
        .map(|src| resolve(page_url, src))
        .collect()
}

fn image_sources(document: &Html) -> impl Iterator<Item = &str> {
    let sel = Selector::parse("img[src]").ok();
    sel.into_iter().flat_map(move |sel| {
        document
            .select(&sel)
            .filter_map(|el| el.value().attr("src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .collect::<Vec<_>>()
    })
}

/// Absolute sources pass through; relative ones are joined onto the page URL.
fn resolve(page_url: &str, src: &str) -> String {
    if src.starts_with("http") {
        return src.to_string();
    }
    Url::parse(page_url)
        .and_then(|base| base.join(src))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| src.to_string())
}
