//! Filesystem scanning.
//!
//! Builds [`Album`] values from a library tree:
//!
//! ```text
//! library/
//! ├── System/                # shared assets, never an album
//! ├── index.html             # root album page
//! ├── Files/                 # root album media
//! ├── Summer/
//! │   ├── index.html
//! │   ├── Files/
//! │   │   ├── IMG_001.jpg
//! │   │   └── clip.mp4
//! │   └── Beach/             # nested album, listed on Summer's page
//! │       ├── index.html
//! │       └── Files/
//! └── .git/                  # hidden, ignored
//! ```
//!
//! Media are the supported files directly inside an album's `Files/` folder.
//! A media file's timestamp is its modification time in local time.

use crate::types::{Album, FILES_DIR_NAME, INDEX_HTML, MediaFile, MediaKind, files_dir};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Library directory holding shared styles, scripts and settings.
pub const SYSTEM_DIR_NAME: &str = "System";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "avi", "mkv"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Classify a path by extension (case-insensitive).
pub fn media_kind(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

pub fn is_video(path: &Path) -> bool {
    media_kind(path) == Some(MediaKind::Video)
}

/// Directories that can never be albums.
fn is_reserved(name: &str) -> bool {
    name == FILES_DIR_NAME || name == SYSTEM_DIR_NAME || name.starts_with('.')
}

/// Supported media directly inside `files_dir`, sorted by name.
///
/// A missing folder yields an empty list.
pub fn scan_media(files_dir: &Path) -> Result<Vec<MediaFile>, ScanError> {
    if !files_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut media = Vec::new();
    for entry in WalkDir::new(files_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = media_kind(entry.path()) else {
            continue;
        };
        if crate::video::is_work_file(entry.path()) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        media.push(MediaFile::new(
            entry.file_name().to_string_lossy(),
            entry.path(),
            kind,
            DateTime::<Local>::from(modified).naive_local(),
        ));
    }
    media.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(media)
}

fn has_media(album_dir: &Path) -> Result<bool, ScanError> {
    Ok(!scan_media(&files_dir(album_dir))?.is_empty())
}

/// Immediate subdirectories that are not reserved, sorted by name.
fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if entry.file_type()?.is_dir() && !is_reserved(&name.to_string_lossy()) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Whether a directory shows up in its parent's album listing: it needs a
/// page and something to show, either media or listable albums of its own.
pub fn is_listable(dir: &Path) -> Result<bool, ScanError> {
    if !dir.join(INDEX_HTML).is_file() {
        return Ok(false);
    }
    if has_media(dir)? {
        return Ok(true);
    }
    for child in subdirectories(dir)? {
        if is_listable(&child)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

/// Scan one album: its media plus its listable child albums (each with its
/// own media, for counts and date ordering).
pub fn scan_album(album_dir: &Path) -> Result<Album, ScanError> {
    let mut album = Album::new(dir_name(album_dir), album_dir);
    album.media_files = scan_media(&album.files_dir())?;
    for child_dir in subdirectories(album_dir)? {
        if is_listable(&child_dir)? {
            let mut child = Album::new(dir_name(&child_dir), &child_dir);
            child.media_files = scan_media(&child.files_dir())?;
            album.child_albums.push(child);
        }
    }
    Ok(album)
}

/// Every album directory under `root` (root included), ordered so that each
/// album comes after all of its descendants. The root is always last.
///
/// Any directory that is not reserved or hidden counts, page or not; a
/// global fill gives each one a page. Reserved and hidden directories are
/// not descended into.
pub fn discover_albums(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_reserved(&e.file_name().to_string_lossy()));

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            found.push(entry.into_path());
        }
    }
    found.reverse();
    Ok(found)
}
