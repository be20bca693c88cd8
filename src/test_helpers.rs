//! Shared test utilities.
//!
//! Builders for in-memory albums and media, filesystem helpers for scan and
//! library tests, and extractors that read a reconciled page back into plain
//! values so assertions stay short.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut album = album_named("Trip");
//! album.media_files = vec![image_at("IMG_001.jpg", 9, 0), image_at("IMG_002.jpg", 9, 1)];
//! let fixture = PageFixture::new(album);
//! let out = reconcile(EMPTY_PAGE, &fixture.context()).unwrap();
//!
//! assert_eq!(
//!     gallery_groups(&out.html),
//!     vec![vec![vec!["Files/IMG_001.jpg", "Files/IMG_002.jpg"]]],
//! );
//! ```

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use filetime::FileTime;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::config::AppSettings;
use crate::gallery::{AlbumOrder, AssetLinks, AssetProbe, GALLERY_SELECTOR, PageContext};
use crate::gallery::template::blank_index_html;
use crate::html::Document;
use crate::types::{Album, MediaFile, MediaKind};

/// Smallest page `reconcile` accepts.
pub const EMPTY_PAGE: &str =
    r#"<html><head></head><body><main id="gallery"></main></body></html>"#;

pub fn blank_page() -> String {
    blank_index_html()
}

// =========================================================================
// Filesystem
// =========================================================================

/// Create an empty file, and its parent directories.
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"").unwrap();
}

/// Set a file's modification time from a local wall-clock time.
pub fn set_mtime(path: &Path, at: NaiveDateTime) {
    let local = Local.from_local_datetime(&at).single().unwrap();
    filetime::set_file_mtime(path, FileTime::from_system_time(SystemTime::from(local))).unwrap();
}

pub fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

// =========================================================================
// Model builders
// =========================================================================

pub fn image_on(name: &str, year: i32, month: u32, day: u32, hour: u32, minute: u32) -> MediaFile {
    MediaFile::new(
        name,
        format!("/library/Files/{name}"),
        MediaKind::Image,
        local(year, month, day, hour, minute),
    )
}

/// An image taken on 2024-05-01 at `hour:minute`.
pub fn image_at(name: &str, hour: u32, minute: u32) -> MediaFile {
    image_on(name, 2024, 5, 1, hour, minute)
}

pub fn video_at(name: &str, hour: u32, minute: u32) -> MediaFile {
    MediaFile {
        kind: MediaKind::Video,
        ..image_at(name, hour, minute)
    }
}

pub fn album_named(name: &str) -> Album {
    Album::new(name, format!("/library/{name}"))
}

/// A child album holding `count` images.
pub fn child_with_media(name: &str, count: u32) -> Album {
    let mut album = album_named(name);
    album.media_files = (0..count)
        .map(|i| image_at(&format!("{name}_{i}.jpg"), 10, i % 60))
        .collect();
    album
}

/// A child album with one image taken on January 1st of `year`.
pub fn child_with_media_on(name: &str, year: i32) -> Album {
    let mut album = album_named(name);
    album.media_files = vec![image_on("first.jpg", year, 1, 1, 12, 0)];
    album
}

/// File names per group, for grouping assertions.
pub fn names_of_groups(groups: &[Vec<&MediaFile>]) -> Vec<Vec<String>> {
    groups
        .iter()
        .map(|g| g.iter().map(|f| f.name.clone()).collect())
        .collect()
}

// =========================================================================
// Page context
// =========================================================================

/// Probe that reports every asset as present.
pub struct AllExist;

impl AssetProbe for AllExist {
    fn exists(&self, _href: &str) -> bool {
        true
    }
}

/// Owns everything a [`PageContext`] borrows, with stock settings.
pub struct PageFixture {
    pub album: Album,
    pub settings: AppSettings,
    pub album_order: AlbumOrder,
    pub assets: AssetLinks,
}

impl PageFixture {
    pub fn new(album: Album) -> Self {
        Self {
            album,
            settings: AppSettings::default(),
            album_order: AlbumOrder::default(),
            assets: AssetLinks::at_depth(0, "System/styles.css", "System/script.js"),
        }
    }

    pub fn context(&self) -> PageContext<'_> {
        PageContext {
            album: &self.album,
            settings: &self.settings.index_html,
            localization: &self.settings.localization,
            album_order: self.album_order,
            assets: &self.assets,
            probe: &AllExist,
        }
    }
}

// =========================================================================
// Page extractors
// =========================================================================

fn parse_gallery(html: &str) -> (Document, crate::html::NodeId) {
    let doc = Document::parse(html).unwrap();
    let gallery = doc
        .query(doc.root(), GALLERY_SELECTOR)
        .unwrap()
        .unwrap_or_else(|| panic!("no gallery in page:\n{html}"));
    (doc, gallery)
}

fn row_sources(doc: &Document, row: crate::html::NodeId) -> Vec<String> {
    doc.query_all(row, ".card[data-src]")
        .unwrap()
        .into_iter()
        .filter(|&c| !doc.has_class(c, "folder"))
        .filter_map(|c| doc.get_attribute(c, "data-src"))
        .collect()
}

/// `data-src` of every media card, per row, per group. Groups holding only
/// the album listing are skipped.
pub fn gallery_groups(html: &str) -> Vec<Vec<Vec<String>>> {
    let (doc, gallery) = parse_gallery(html);
    doc.query_all(gallery, ".group")
        .unwrap()
        .into_iter()
        .map(|group| {
            doc.query_all(group, ".photos")
                .unwrap()
                .into_iter()
                .filter(|&row| !doc.has_class(row, "photos--folders"))
                .map(|row| row_sources(&doc, row))
                .collect::<Vec<_>>()
        })
        .filter(|rows| !rows.is_empty())
        .collect()
}

/// `data-src` of every media card in document order.
pub fn card_sources(html: &str) -> Vec<String> {
    let (doc, gallery) = parse_gallery(html);
    doc.query_all(gallery, ".photos")
        .unwrap()
        .into_iter()
        .filter(|&row| !doc.has_class(row, "photos--folders"))
        .flat_map(|row| row_sources(&doc, row))
        .collect()
}

/// Link targets in the album listing, in order.
pub fn album_links(html: &str) -> Vec<String> {
    let (doc, gallery) = parse_gallery(html);
    doc.query_all(gallery, ".photos--folders a[href]")
        .unwrap()
        .into_iter()
        .filter_map(|a| doc.get_attribute(a, "href"))
        .collect()
}

/// Trimmed text of every `.folder-count` in the listing.
pub fn folder_counts(html: &str) -> Vec<String> {
    let (doc, gallery) = parse_gallery(html);
    doc.query_all(gallery, ".folder-count")
        .unwrap()
        .into_iter()
        .map(|c| doc.text_content(c).trim().to_string())
        .collect()
}
