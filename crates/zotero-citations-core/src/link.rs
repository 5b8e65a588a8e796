//! `Link` response header parsing for result paging.
//!
//! The API advertises neighbouring pages as
//! `<url>; rel="next", <url>; rel="prev", <url>; rel="last"`. Only `prev`
//! and `next` matter here; a missing relation means that direction is
//! unavailable.

/// Cursors for the neighbouring result pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// Extract the `prev` and `next` URLs from a `Link` header value.
///
/// Entries are split on `,`, each entry on `"; "`. The URL token has its
/// surrounding angle brackets removed. Unrecognised relations and
/// malformed entries are ignored.
pub fn parse_link_header(header: &str) -> PageLinks {
    let mut links = PageLinks::default();

    for entry in header.split(',') {
        let mut parts = entry.split("; ");
        let (Some(target), Some(rel)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Some(url) = strip_angle_brackets(target) else {
            continue;
        };

        match rel.trim() {
            "rel=\"prev\"" => links.previous = Some(url.to_string()),
            "rel=\"next\"" => links.next = Some(url.to_string()),
            _ => {}
        }
    }

    links
}

fn strip_angle_brackets(token: &str) -> Option<&str> {
    let url = token.trim().strip_prefix('<')?.strip_suffix('>')?;
    (!url.is_empty()).then_some(url)
}
