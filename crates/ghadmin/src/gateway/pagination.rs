//! Link-header pagination and page collection.

use std::future::Future;

use super::errors::Result;
use super::types::Page;

/// Page numbers advertised by a `Link` response header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkPagination {
    pub last_page: Option<u32>,
    pub next_page: Option<u32>,
}

/// Read the `next` and `last` page numbers out of a `Link` header.
///
/// Each entry has the form `<url?per_page=100&page=N>; rel="next"`. Entries
/// with other relations, or whose URL has no `page` parameter, are ignored.
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    link_header
        .split(',')
        .filter_map(|entry| {
            let (target, params) = entry.trim().split_once(';')?;
            let url = target.trim().strip_prefix('<')?.strip_suffix('>')?;
            let rel = params
                .split(';')
                .find_map(|p| p.trim().strip_prefix("rel="))?
                .trim_matches('"');
            Some((rel, page_param(url)?))
        })
        .fold(LinkPagination::default(), |mut info, (rel, page)| {
            match rel {
                "next" => info.next_page = Some(page),
                "last" => info.last_page = Some(page),
                _ => {}
            }
            info
        })
}

fn page_param(url: &str) -> Option<u32> {
    url.split_once('?')?
        .1
        .split('&')
        .find_map(|pair| pair.strip_prefix("page="))?
        .parse()
        .ok()
}

/// Fetch pages starting at 1 until one reports no next page.
///
/// A next page that does not move forward ends the walk, so a misbehaving
/// server cannot loop it forever.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page = 1;

    loop {
        let fetched = fetch(page).await?;
        if page == 1 {
            items.reserve(fetched.size_hint(page));
        }
        items.extend(fetched.items);

        match fetched.next_page {
            Some(next) if next > page => page = next,
            Some(next) => {
                tracing::warn!(page, next, "Pagination did not advance, stopping");
                break;
            }
            None => break,
        }
    }

    Ok(items)
}
