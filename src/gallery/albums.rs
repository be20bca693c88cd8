//! Child-album listing.
//!
//! The listing is the gallery's `.photos--folders` row. Each album card links
//! to `<name>/index.html`; the link's last path segment (percent-decoded) is
//! the card's identity and is matched against child album names exactly.

use super::media::LISTING_CLASS;
use super::{
    CARD_SELECTOR, GROUP_SELECTOR, GalleryError, PageChanges, PageContext, ROW_SELECTOR,
    decode_url, fill_template, url_path,
};
use crate::config::IndexHtmlSettings;
use crate::html::{Document, DomError, InsertPosition, NodeId, escape};
use crate::types::{Album, INDEX_HTML};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

const LINK_SELECTOR: &str = "a[href]";
const COUNT_SELECTOR: &str = ".folder-count";

/// Order in which newly added album cards are inserted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AlbumOrder {
    /// Alphabetical by directory name.
    Name,
    /// Oldest media first; albums without media last.
    #[default]
    Date,
}

/// Page-relative URL of a child album's page.
pub fn album_path(album: &Album) -> String {
    format!("{}/{INDEX_HTML}", urlencoding::encode(&album.name))
}

/// Album name an album link points at.
pub(crate) fn album_name_from_href(href: &str) -> Option<String> {
    let path = url_path(href.trim());
    let path = path.strip_suffix(INDEX_HTML).unwrap_or(path);
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    match segment {
        "" | "." | ".." => None,
        s => Some(decode_url(s)),
    }
}

fn folder_identity(doc: &Document, card: NodeId) -> Result<Option<String>, DomError> {
    let link = if doc.tag_name(card) == Some("a") && doc.has_attribute(card, "href") {
        Some(card)
    } else {
        doc.query(card, LINK_SELECTOR)?
    };
    Ok(link
        .and_then(|l| doc.get_attribute(l, "href"))
        .and_then(|href| album_name_from_href(&href)))
}

pub(crate) fn sort_albums(albums: &mut [&Album], order: AlbumOrder) {
    match order {
        AlbumOrder::Name => albums.sort_by(|a, b| a.name.cmp(&b.name)),
        AlbumOrder::Date => albums.sort_by(|a, b| {
            let by_date = match (a.earliest_media(), b.earliest_media()) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_date.then_with(|| a.name.cmp(&b.name))
        }),
    }
}

fn render_item(album: &Album, settings: &IndexHtmlSettings) -> String {
    fill_template(
        &settings.album_item,
        &[
            ("albumPath", &escape(&album_path(album))),
            ("albumName", &escape(&album.name)),
            ("albumCount", &album.media_count().to_string()),
        ],
    )
}

/// Refresh the card's file count. Returns whether it changed.
fn update_count(doc: &mut Document, card: NodeId, count: usize) -> Result<bool, DomError> {
    let Some(counter) = doc.query(card, COUNT_SELECTOR)? else {
        return Ok(false);
    };
    let count = count.to_string();
    if doc.text_content(counter).trim() == count {
        return Ok(false);
    }
    doc.set_text_content(counter, &count);
    Ok(true)
}

/// Make the album listing match the album's listable children.
pub(crate) fn reconcile_albums(
    doc: &mut Document,
    gallery: NodeId,
    ctx: &PageContext,
    changes: &mut PageChanges,
) -> Result<(), GalleryError> {
    let mut listing = doc.query(gallery, &format!(".{LISTING_CLASS}"))?;

    let mut on_page: HashMap<String, NodeId> = HashMap::new();
    let mut stale = Vec::new();
    if let Some(listing) = listing {
        for card in doc.query_all(listing, CARD_SELECTOR)? {
            if let Some(name) = folder_identity(doc, card)? {
                if let Some(earlier) = on_page.insert(name, card) {
                    stale.push(earlier);
                }
            }
        }
    }

    let children: HashMap<&str, &Album> = ctx
        .album
        .child_albums
        .iter()
        .map(|a| (a.name.as_str(), a))
        .collect();
    on_page.retain(|name, &mut card| {
        let keep = children.contains_key(name.as_str());
        if !keep {
            stale.push(card);
        }
        keep
    });
    for &card in &stale {
        doc.remove(card);
    }
    changes.albums_removed += stale.len();

    if let Some(current) = listing.filter(|_| !stale.is_empty()) {
        if doc.query(current, CARD_SELECTOR)?.is_none() {
            let group = doc
                .closest(current, GROUP_SELECTOR)?
                .filter(|&g| doc.ancestors(g).any(|a| a == gallery));
            doc.remove(current);
            if let Some(group) = group {
                if doc.query(group, ROW_SELECTOR)?.is_none() {
                    doc.remove(group);
                }
            }
            listing = None;
        }
    }

    for (name, &card) in &on_page {
        if let Some(child) = children.get(name.as_str()) {
            if update_count(doc, card, child.media_count())? {
                changes.albums_updated += 1;
            }
        }
    }

    let mut missing: Vec<&Album> = ctx
        .album
        .child_albums
        .iter()
        .filter(|a| !on_page.contains_key(&a.name))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    sort_albums(&mut missing, ctx.album_order);
    let items: String = missing.iter().map(|a| render_item(a, ctx.settings)).collect();

    match listing {
        Some(listing) => {
            doc.insert_html(listing, InsertPosition::BeforeEnd, &items)?;
        }
        None => {
            let block = fill_template(&ctx.settings.album_block, &[("albumItems", &items)]);
            let group = fill_template(&ctx.settings.group_block, &[("groupBlock", &block)]);
            doc.insert_html(gallery, InsertPosition::AfterBegin, &group)?;
        }
    }
    changes.albums_added += missing.len();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::reconcile;
    use crate::test_helpers::*;

    #[test]
    fn album_name_from_various_hrefs() {
        assert_eq!(album_name_from_href("Beach/index.html").as_deref(), Some("Beach"));
        assert_eq!(album_name_from_href("My%20Trip/").as_deref(), Some("My Trip"));
        assert_eq!(album_name_from_href("./Beach/index.html?x=1#top").as_deref(), Some("Beach"));
        assert_eq!(album_name_from_href("Beach").as_deref(), Some("Beach"));
        assert_eq!(album_name_from_href("index.html"), None);
        assert_eq!(album_name_from_href("../"), None);
    }

    #[test]
    fn album_path_encodes_name() {
        assert_eq!(album_path(&album_named("My Trip")), "My%20Trip/index.html");
    }

    #[test]
    fn date_order_puts_empty_albums_last() {
        let old = child_with_media_on("Zoo", 2020);
        let new = child_with_media_on("Alps", 2023);
        let empty_b = album_named("B");
        let empty_a = album_named("A");
        let mut albums = vec![&empty_b, &new, &empty_a, &old];
        sort_albums(&mut albums, AlbumOrder::Date);
        let names: Vec<&str> = albums.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Zoo", "Alps", "A", "B"]);

        sort_albums(&mut albums, AlbumOrder::Name);
        let names: Vec<&str> = albums.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["A", "Alps", "B", "Zoo"]);
    }

    // =========================================================================
    // Listing reconciliation
    // =========================================================================

    #[test]
    fn new_listing_goes_first_in_gallery() {
        let page = r#"<main id="gallery"><div class="group" id="existing"><div class="photos">
            <div class="card" data-src="Files/a.jpg"></div></div></div></main>"#;
        let mut album = album_named("Trip");
        album.media_files = vec![image_at("a.jpg", 9, 0)];
        album.child_albums = vec![child_with_media("Beach", 3)];
        let fixture = PageFixture::new(album);
        let out = reconcile(page, &fixture.context()).unwrap();

        let listing_at = out.html.find("photos--folders").unwrap();
        let existing_at = out.html.find("id=\"existing\"").unwrap();
        assert!(listing_at < existing_at);
        assert_eq!(album_links(&out.html), vec!["Beach/index.html"]);
        assert_eq!(out.changes.albums_added, 1);
    }

    #[test]
    fn new_albums_append_to_existing_listing_in_order() {
        let mut album = album_named("Trip");
        album.child_albums = vec![child_with_media("Beach", 1)];
        let mut fixture = PageFixture::new(album);
        fixture.album_order = AlbumOrder::Name;
        let first = reconcile(EMPTY_PAGE, &fixture.context()).unwrap();

        fixture.album.child_albums.push(child_with_media("Zoo", 1));
        fixture.album.child_albums.push(child_with_media("Alps", 1));
        let second = reconcile(&first.html, &fixture.context()).unwrap();
        assert_eq!(
            album_links(&second.html),
            vec!["Beach/index.html", "Alps/index.html", "Zoo/index.html"]
        );
        assert_eq!(second.html.matches("photos--folders").count(), 1);
    }

    #[test]
    fn counts_are_refreshed() {
        let mut album = album_named("Trip");
        album.child_albums = vec![child_with_media("Beach", 2)];
        let mut fixture = PageFixture::new(album);
        let first = reconcile(EMPTY_PAGE, &fixture.context()).unwrap();
        assert_eq!(folder_counts(&first.html), vec!["2"]);

        fixture.album.child_albums = vec![child_with_media("Beach", 5)];
        let second = reconcile(&first.html, &fixture.context()).unwrap();
        assert_eq!(folder_counts(&second.html), vec!["5"]);
        assert_eq!(second.changes.albums_updated, 1);
        assert_eq!(second.changes.albums_added, 0);
    }

    #[test]
    fn removing_last_album_removes_listing_and_its_group() {
        let mut album = album_named("Trip");
        album.child_albums = vec![child_with_media("Beach", 1)];
        let mut fixture = PageFixture::new(album);
        let first = reconcile(EMPTY_PAGE, &fixture.context()).unwrap();

        fixture.album.child_albums.clear();
        let second = reconcile(&first.html, &fixture.context()).unwrap();
        assert!(!second.html.contains("photos--folders"));
        assert!(!second.html.contains("class=\"group\""));
        assert_eq!(second.changes.albums_removed, 1);
    }

    #[test]
    fn hand_written_album_card_is_matched_by_href() {
        let page = r#"<main id="gallery"><div class="photos photos--folders">
            <div class="card folder"><a href="./Beach/"><b>Our beach!</b></a></div>
        </div></main>"#;
        let mut album = album_named("Trip");
        album.child_albums = vec![child_with_media("Beach", 1)];
        let fixture = PageFixture::new(album);
        let out = reconcile(page, &fixture.context()).unwrap();
        assert!(out.html.contains("Our beach!"));
        assert_eq!(out.changes.albums_added, 0);
        assert_eq!(out.changes.albums_removed, 0);
    }

    #[test]
    fn album_matching_is_case_sensitive() {
        let page = r#"<main id="gallery"><div class="photos photos--folders">
            <div class="card folder"><a href="beach/index.html">beach</a></div>
        </div></main>"#;
        let mut album = album_named("Trip");
        album.child_albums = vec![child_with_media("Beach", 1)];
        let fixture = PageFixture::new(album);
        let out = reconcile(page, &fixture.context()).unwrap();
        assert_eq!(album_links(&out.html), vec!["Beach/index.html"]);
        assert_eq!(out.changes.albums_removed, 1);
        assert_eq!(out.changes.albums_added, 1);
    }

    #[test]
    fn album_listing_skipped_when_templates_empty() {
        let mut album = album_named("Trip");
        album.child_albums = vec![child_with_media("Beach", 1)];
        let mut fixture = PageFixture::new(album);
        fixture.settings.index_html.album_block.clear();
        let out = reconcile(EMPTY_PAGE, &fixture.context()).unwrap();
        assert!(!out.html.contains("photos--folders"));
        assert_eq!(out.changes.albums_added, 0);
    }
}
