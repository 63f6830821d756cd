use anyhow::{Context, Result};
use url::Url;

/// Query parameter carrying the requested page number
pub const PAGE_PARAM: &str = "pr";

/// Query parameter carrying the page size
pub const PAGE_SIZE_PARAM: &str = "ps";

/// Builds the report URL for one page of results
///
/// Existing query pairs in `base_url` are kept in their original order. Any
/// `pr` or `ps` pairs already present are dropped and replaced by the given
/// page and page size, which are appended at the end.
pub fn paged_url(base_url: &str, page: u32, page_size: u32) -> Result<Url> {
    let mut url = base_url.parse::<Url>().context("parse URL")?;

    let kept = url
        .query_pairs()
        .filter(|(name, _)| name != PAGE_PARAM && name != PAGE_SIZE_PARAM)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect::<Vec<(String, String)>>();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(PAGE_PARAM, &page.to_string())
        .append_pair(PAGE_SIZE_PARAM, &page_size.to_string());

    Ok(url)
}
