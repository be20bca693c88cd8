//! Media cards: one card per file in the album's `Files/` folder.
//!
//! A card's identity is the file name it points at (`data-src`, else the src
//! of its `img`/`video`), percent-decoded and compared case-insensitively.
//! Album cards and anything inside the album listing are not media cards.

use super::grouping::group_by_time_window;
use super::{
    CARD_SELECTOR, GROUP_SELECTOR, GalleryError, PageChanges, PageContext, ROW_SELECTOR,
    decode_url, fill_template, url_path,
};
use crate::config::IndexHtmlSettings;
use crate::html::{Document, DomError, InsertPosition, NodeId, escape};
use crate::types::{FILES_DIR_NAME, MediaFile};
use chrono::TimeDelta;
use std::collections::{HashMap, HashSet};

const MEDIA_SOURCE: &str = "img[src], video[src], source[src]";
const FOLDER_CLASS: &str = "folder";
pub(crate) const LISTING_CLASS: &str = "photos--folders";

/// Page-relative URL of a media file.
pub fn media_path(file: &MediaFile) -> String {
    format!("{FILES_DIR_NAME}/{}", urlencoding::encode(&file.name))
}

/// Lowercased file name a media URL points at.
pub(crate) fn identity_from_url(url: &str) -> Option<String> {
    let path = url_path(url.trim());
    let last = path.rsplit('/').next().unwrap_or_default();
    let name = decode_url(last);
    (!name.is_empty()).then(|| name.to_lowercase())
}

fn card_identity(doc: &Document, card: NodeId) -> Result<Option<String>, DomError> {
    let src = match doc
        .get_attribute(card, "data-src")
        .filter(|s| !s.trim().is_empty())
    {
        Some(src) => Some(src),
        None => doc
            .query(card, MEDIA_SOURCE)?
            .and_then(|media| doc.get_attribute(media, "src")),
    };
    Ok(src.as_deref().and_then(identity_from_url))
}

/// Media cards under `gallery` with their identities, in document order.
pub(crate) fn media_cards(
    doc: &Document,
    gallery: NodeId,
) -> Result<Vec<(NodeId, String)>, DomError> {
    let mut cards = Vec::new();
    for card in doc.query_all(gallery, CARD_SELECTOR)? {
        let in_listing = doc
            .ancestors(card)
            .take_while(|&a| a != gallery)
            .any(|a| doc.has_class(a, LISTING_CLASS));
        if doc.has_class(card, FOLDER_CLASS) || in_listing {
            continue;
        }
        if let Some(identity) = card_identity(doc, card)? {
            cards.push((card, identity));
        }
    }
    Ok(cards)
}

/// Remove `cards`, then any row they leave without cards and any group left
/// without rows. Containers the removed cards did not live in are untouched.
fn remove_cards(doc: &mut Document, gallery: NodeId, cards: &[NodeId]) -> Result<(), DomError> {
    let mut rows = Vec::new();
    let mut groups = Vec::new();
    {
        let view: &Document = doc;
        let in_gallery = |node: &NodeId| view.ancestors(*node).any(|a| a == gallery);
        for &card in cards {
            rows.extend(view.closest(card, ROW_SELECTOR)?.filter(in_gallery));
            groups.extend(view.closest(card, GROUP_SELECTOR)?.filter(in_gallery));
        }
    }
    for &card in cards {
        doc.remove(card);
    }
    for row in rows {
        if doc.is_attached(row)
            && !doc.has_class(row, LISTING_CLASS)
            && doc.query(row, CARD_SELECTOR)?.is_none()
        {
            doc.remove(row);
        }
    }
    for group in groups {
        if doc.is_attached(group) && doc.query(group, ROW_SELECTOR)?.is_none() {
            doc.remove(group);
        }
    }
    Ok(())
}

fn render_item(file: &MediaFile, settings: &IndexHtmlSettings) -> String {
    let template = if file.is_image() {
        &settings.image_item
    } else {
        &settings.video_item
    };
    fill_template(template, &[("mediaFilePath", &escape(&media_path(file)))])
}

fn render_group(files: &[&MediaFile], settings: &IndexHtmlSettings) -> String {
    let items: String = files.iter().map(|f| render_item(f, settings)).collect();
    let row = fill_template(&settings.media_block, &[("mediaItems", &items)]);
    fill_template(
        &settings.group_block,
        &[("groupBlock", &(row + &settings.text_item))],
    )
}

/// Make the page's media cards match the album's files one-to-one.
///
/// Stale and duplicate cards are removed (the last duplicate is kept), then
/// files without a card are grouped by time and appended to the gallery.
pub(crate) fn reconcile_media(
    doc: &mut Document,
    gallery: NodeId,
    ctx: &PageContext,
    changes: &mut PageChanges,
) -> Result<(), GalleryError> {
    let mut on_page: HashMap<String, NodeId> = HashMap::new();
    let mut stale = Vec::new();
    for (card, identity) in media_cards(doc, gallery)? {
        if let Some(earlier) = on_page.insert(identity, card) {
            stale.push(earlier);
        }
    }

    let on_disk: HashSet<String> = ctx.album.media_files.iter().map(MediaFile::identity).collect();
    stale.extend(
        on_page
            .iter()
            .filter(|(identity, _)| !on_disk.contains(*identity))
            .map(|(_, &card)| card),
    );
    remove_cards(doc, gallery, &stale)?;
    changes.media_removed += stale.len();

    let mut seen = HashSet::new();
    let missing: Vec<&MediaFile> = ctx
        .album
        .media_files
        .iter()
        .filter(|f| {
            let identity = f.identity();
            !on_page.contains_key(&identity) && seen.insert(identity)
        })
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let window = TimeDelta::minutes(i64::from(ctx.settings.group_time_window));
    let markup: String =
        group_by_time_window(&missing, window, ctx.settings.count_elements_in_group)
            .iter()
            .map(|group| render_group(group, ctx.settings))
            .collect();
    doc.insert_html(gallery, InsertPosition::BeforeEnd, &markup)?;
    changes.media_added += missing.len();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{GALLERY_SELECTOR, reconcile};
    use crate::test_helpers::*;

    fn gallery_of(doc: &Document) -> NodeId {
        doc.query(doc.root(), GALLERY_SELECTOR).unwrap().unwrap()
    }

    #[test]
    fn media_path_percent_encodes_name() {
        let file = image_at("My Photo #1.jpg", 9, 0);
        assert_eq!(media_path(&file), "Files/My%20Photo%20%231.jpg");
        assert_eq!(media_path(&image_at("IMG_001.jpg", 9, 0)), "Files/IMG_001.jpg");
    }

    #[test]
    fn identity_from_url_decodes_and_lowercases() {
        assert_eq!(identity_from_url("Files/My%20Photo.JPG").as_deref(), Some("my photo.jpg"));
        assert_eq!(identity_from_url("../x/Files/a.jpg?v=1").as_deref(), Some("a.jpg"));
        assert_eq!(identity_from_url("Files/").as_deref(), None);
        assert_eq!(identity_from_url("").as_deref(), None);
    }

    // =========================================================================
    // Card discovery
    // =========================================================================

    #[test]
    fn cards_found_by_data_src_or_nested_source() {
        let doc = Document::parse(
            r#"<main id="gallery">
              <div class="card" data-src="Files/A.jpg"></div>
              <div class="card"><video src="Files/b.mp4"></video></div>
              <div class="card"><p>no media</p></div>
              <div class="photos photos--folders"><div class="card"><img src="x.jpg"></div></div>
              <div class="card folder"><img src="icon.png"></div>
            </main>"#,
        )
        .unwrap();
        let ids: Vec<String> = media_cards(&doc, gallery_of(&doc))
            .unwrap()
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        assert_eq!(ids, vec!["a.jpg", "b.mp4"]);
    }

    #[test]
    fn entity_encoded_src_matches_file() {
        let page = r#"<main id="gallery"><div class="group"><div class="photos">
            <div class="card" data-src="Files/Tom&amp;Jerry.jpg"></div></div></div></main>"#;
        let mut album = album_named("Trip");
        album.media_files = vec![image_at("Tom&Jerry.jpg", 9, 0)];
        let fixture = PageFixture::new(album);
        let out = reconcile(page, &fixture.context()).unwrap();
        assert_eq!(out.changes.media_added, 0);
        assert_eq!(out.changes.media_removed, 0);
    }

    #[test]
    fn card_matching_ignores_case() {
        let page = r#"<main id="gallery"><div class="group"><div class="photos">
            <div class="card" data-src="Files/img_001.JPG"></div></div></div></main>"#;
        let mut album = album_named("Trip");
        album.media_files = vec![image_at("IMG_001.jpg", 9, 0)];
        let fixture = PageFixture::new(album);
        let out = reconcile(page, &fixture.context()).unwrap();
        assert_eq!((out.changes.media_added, out.changes.media_removed), (0, 0));
        assert_eq!(card_sources(&out.html), vec!["Files/img_001.JPG"]);
    }

    // =========================================================================
    // Removal and cleanup
    // =========================================================================

    #[test]
    fn duplicate_cards_keep_the_last() {
        let page = r#"<main id="gallery"><div class="group">
            <div class="photos"><div class="card first" data-src="Files/a.jpg"></div></div>
            <div class="photos"><div class="card second" data-src="Files/a.jpg"></div></div>
        </div></main>"#;
        let mut album = album_named("Trip");
        album.media_files = vec![image_at("a.jpg", 9, 0)];
        let fixture = PageFixture::new(album);
        let out = reconcile(page, &fixture.context()).unwrap();
        assert!(!out.html.contains("card first"));
        assert!(out.html.contains("card second"));
        assert_eq!(out.changes.media_removed, 1);
        assert_eq!(out.html.matches("class=\"photos\"").count(), 1);
    }

    #[test]
    fn emptied_group_is_removed_but_not_its_neighbours() {
        let page = r#"<main id="gallery">
            <div class="group" id="g1"><div class="photos"><div class="card" data-src="Files/gone.jpg"></div></div></div>
            <div class="group" id="g2"><div class="photos"><div class="card" data-src="Files/kept.jpg"></div></div></div>
        </main>"#;
        let mut album = album_named("Trip");
        album.media_files = vec![image_at("kept.jpg", 9, 0)];
        let fixture = PageFixture::new(album);
        let out = reconcile(page, &fixture.context()).unwrap();
        assert!(!out.html.contains("id=\"g1\""));
        assert!(out.html.contains("id=\"g2\""));
    }

    #[test]
    fn untouched_page_keeps_empty_containers() {
        let page = r#"<main id="gallery"><div class="group" id="placeholder"><div class="photos"></div></div></main>"#;
        let fixture = PageFixture::new(album_named("Trip"));
        let out = reconcile(page, &fixture.context()).unwrap();
        assert!(out.html.contains("id=\"placeholder\""));
    }

    #[test]
    fn removing_a_card_leaves_unrelated_containers_alone() {
        let page = r#"<main id="gallery">
            <div class="group" id="prose"><div class="story"><p>Hand-written intro.</p></div></div>
            <div class="group" id="g1"><div class="photos">
                <div class="card" data-src="Files/gone.jpg"></div></div></div>
            <div class="group" id="g2"><div class="photos">
                <div class="card" data-src="Files/kept.jpg"></div></div>
                <div class="photos" id="empty-row"></div></div>
            </main>"#;
        let mut album = album_named("Trip");
        album.media_files = vec![image_at("kept.jpg", 9, 0)];
        let fixture = PageFixture::new(album);
        let out = reconcile(page, &fixture.context()).unwrap();
        assert_eq!(out.changes.media_removed, 1);
        assert!(!out.html.contains("id=\"g1\""));
        assert!(out.html.contains("Hand-written intro."));
        assert!(out.html.contains("id=\"prose\""));
        assert!(out.html.contains("id=\"empty-row\""));
        assert_eq!(card_sources(&out.html), vec!["Files/kept.jpg"]);
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    #[test]
    fn new_groups_append_after_existing_content() {
        let page = r#"<main id="gallery"><div class="group" id="old"><div class="photos">
            <div class="card" data-src="Files/a.jpg"></div></div></div></main>"#;
        let mut album = album_named("Trip");
        album.media_files = vec![image_at("a.jpg", 9, 0), image_at("b.jpg", 9, 1)];
        let fixture = PageFixture::new(album);
        let out = reconcile(page, &fixture.context()).unwrap();
        assert_eq!(card_sources(&out.html), vec!["Files/a.jpg", "Files/b.jpg"]);
        assert_eq!(out.html.matches("class=\"group\"").count(), 2);
    }

    #[test]
    fn group_size_limit_splits_groups() {
        let mut album = album_named("Trip");
        album.media_files = (0..5).map(|i| image_at(&format!("{i}.jpg"), 9, 0)).collect();
        let mut fixture = PageFixture::new(album);
        fixture.settings.index_html.count_elements_in_group = 2;
        let out = reconcile(EMPTY_PAGE, &fixture.context()).unwrap();
        let sizes: Vec<usize> = gallery_groups(&out.html)
            .iter()
            .map(|rows| rows.iter().map(Vec::len).sum())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn new_group_carries_text_placeholder_and_kinds() {
        let mut album = album_named("Trip");
        album.media_files = vec![image_at("a.jpg", 9, 0), video_at("b.mp4", 9, 1)];
        let fixture = PageFixture::new(album);
        let out = reconcile(EMPTY_PAGE, &fixture.context()).unwrap();
        assert!(out.html.contains("Place text here."));
        assert!(out.html.contains(r#"data-type="image" data-src="Files/a.jpg""#));
        assert!(out.html.contains(r#"data-type="video" data-src="Files/b.mp4""#));
        assert!(out.html.contains("<video src=\"Files/b.mp4\""));
    }

    #[test]
    fn files_differing_only_in_case_get_one_card() {
        let mut album = album_named("Trip");
        album.media_files = vec![image_at("a.JPG", 9, 0), image_at("a.jpg", 9, 0)];
        let fixture = PageFixture::new(album);
        let once = reconcile(EMPTY_PAGE, &fixture.context()).unwrap();
        let twice = reconcile(&once.html, &fixture.context()).unwrap();
        assert_eq!(card_sources(&once.html).len(), 1);
        assert_eq!(twice.html, once.html);
    }
}
