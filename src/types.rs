//! Data model shared by scanning, reconciliation and orchestration.
//!
//! Albums and media files are rebuilt from the filesystem on every run and
//! never persisted; the durable state is the directory tree plus each
//! album's generated `index.html`.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Media subfolder inside every album.
pub const FILES_DIR_NAME: &str = "Files";
/// Generated gallery page inside every album.
pub const INDEX_HTML: &str = "index.html";
pub const README_MD: &str = "README.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Value written to a card's `data-type` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// A photo or video found in an album's media folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// File name with extension, unique within the media folder.
    pub name: String,
    pub full_path: PathBuf,
    pub kind: MediaKind,
    /// Ordering and grouping timestamp (file modification time, local).
    pub created_at: NaiveDateTime,
}

impl MediaFile {
    pub fn new(
        name: impl Into<String>,
        full_path: impl Into<PathBuf>,
        kind: MediaKind,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            kind,
            created_at,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    /// Case-insensitive key used to match the file against page cards.
    pub fn identity(&self) -> String {
        self.name.to_lowercase()
    }
}

/// An album directory: its media plus the child albums listed on its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    /// Directory name, unique within the parent.
    pub name: String,
    pub full_path: PathBuf,
    pub media_files: Vec<MediaFile>,
    pub child_albums: Vec<Album>,
}

impl Album {
    pub fn new(name: impl Into<String>, full_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            media_files: Vec::new(),
            child_albums: Vec::new(),
        }
    }

    pub fn files_dir(&self) -> PathBuf {
        files_dir(&self.full_path)
    }

    pub fn index_html_path(&self) -> PathBuf {
        self.full_path.join(INDEX_HTML)
    }

    pub fn readme_path(&self) -> PathBuf {
        self.files_dir().join(README_MD)
    }

    /// Timestamp of the oldest media file, if any.
    pub fn earliest_media(&self) -> Option<NaiveDateTime> {
        self.media_files.iter().map(|m| m.created_at).min()
    }

    pub fn media_count(&self) -> usize {
        self.media_files.len()
    }
}

pub fn files_dir(album_dir: &Path) -> PathBuf {
    album_dir.join(FILES_DIR_NAME)
}
