//! Library and album scaffolding, and filling album pages.
//!
//! A library is a plain directory tree. `init` lays down the shared assets,
//! `new` adds an album folder with an empty page, and `fill` reconciles album
//! pages against their media:
//!
//! ```text
//! library/
//! ├── README.md
//! ├── System/
//! │   ├── album_settings.json
//! │   ├── script.js
//! │   └── styles.css
//! ├── index.html               # root album (fill with no album name)
//! ├── Files/
//! └── Summer/
//!     ├── index.html           # links ../System/styles.css
//!     └── Files/
//!         ├── README.md
//!         └── IMG_001.jpg
//! ```
//!
//! Scaffolding never overwrites an existing file unless forced, and reports
//! each file as added or found. A fill writes the page through a temp file and
//! a rename, so a failed reconciliation leaves the previous page in place.

use crate::config::{self, ConfigError, SETTINGS_FILE_NAME};
use crate::gallery::template::blank_index_html;
use crate::gallery::{
    self, AlbumOrder, AssetLinks, FsAssetProbe, GalleryError, PageChanges, PageContext,
};
use crate::scan::{self, SYSTEM_DIR_NAME, ScanError};
use crate::types::{FILES_DIR_NAME, INDEX_HTML, README_MD, files_dir};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const STYLE_FILE_NAME: &str = "styles.css";
pub const SCRIPT_FILE_NAME: &str = "script.js";

const STYLES_CSS: &str = include_str!("../static/styles.css");
const SCRIPT_JS: &str = include_str!("../static/script.js");
const LIBRARY_README: &str = include_str!("../static/README_Library.md");
const FILES_README: &str = include_str!("../static/README_Files.md");

#[derive(Error, Debug)]
pub enum AlbumError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Settings error: {0}")]
    Config(#[from] ConfigError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("{}: {source}", page.display())]
    Gallery {
        page: PathBuf,
        #[source]
        source: GalleryError,
    },
    #[error("Invalid album name {0:?}")]
    InvalidName(String),
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// A file the scaffolding touched, relative to the library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Added(PathBuf),
    Found(PathBuf),
}

/// Paths of a library rooted at `root`.
#[derive(Debug, Clone)]
pub struct AlbumLibrary {
    pub root: PathBuf,
}

impl AlbumLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn system_dir(&self) -> PathBuf {
        self.root.join(SYSTEM_DIR_NAME)
    }

    pub fn style_path(&self) -> PathBuf {
        self.system_dir().join(STYLE_FILE_NAME)
    }

    pub fn script_path(&self) -> PathBuf {
        self.system_dir().join(SCRIPT_FILE_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.system_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn readme_path(&self) -> PathBuf {
        self.root.join(README_MD)
    }

    /// `path` relative to the root, or unchanged when it lies outside.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    fn ensure_file(&self, path: &Path, contents: &str, force: bool) -> io::Result<FileEvent> {
        let relative = self.relative(path);
        if path.exists() && !force {
            return Ok(FileEvent::Found(relative));
        }
        fs::write(path, contents)?;
        Ok(FileEvent::Added(relative))
    }

    /// Create the album directory at `relative` (empty for the root album)
    /// with its media folder, media README and blank page.
    fn ensure_album(&self, relative: &Path, events: &mut Vec<FileEvent>) -> io::Result<PathBuf> {
        let dir = self.root.join(relative);
        let media = files_dir(&dir);
        fs::create_dir_all(&media)?;
        events.push(self.ensure_file(&media.join(README_MD), FILES_README, false)?);
        events.push(self.ensure_file(&dir.join(INDEX_HTML), &blank_index_html(), false)?);
        Ok(dir)
    }
}

/// Create (or complete) a library at `root`.
///
/// Existing files are kept unless `force` is set.
pub fn create_library(root: &Path, force: bool) -> Result<(AlbumLibrary, Vec<FileEvent>), AlbumError> {
    let library = AlbumLibrary::new(root);
    fs::create_dir_all(library.system_dir())?;
    let events = vec![
        library.ensure_file(&library.style_path(), STYLES_CSS, force)?,
        library.ensure_file(&library.script_path(), SCRIPT_JS, force)?,
        library.ensure_file(&library.readme_path(), LIBRARY_README, force)?,
        library.ensure_file(&library.settings_path(), &config::stock_settings_json(), force)?,
    ];
    Ok((library, events))
}

/// Normalize an album path relative to the library root.
///
/// `.` components are dropped; absolute paths, `..`, hidden directories and
/// the reserved `Files`/`System` names are rejected. An empty result names the
/// root album.
pub fn album_relative_path(path: &Path) -> Result<PathBuf, AlbumError> {
    let invalid = || AlbumError::InvalidName(path.display().to_string());
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => {
                let part_str = part.to_string_lossy();
                let part_trimmed = part_str.trim();
                if part_trimmed.is_empty()
                    || part_trimmed.starts_with('.')
                    || part_trimmed == FILES_DIR_NAME
                    || part_trimmed == SYSTEM_DIR_NAME
                {
                    return Err(invalid());
                }
                relative.push(part);
            }
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(invalid());
            }
        }
    }
    Ok(relative)
}

/// Result of scaffolding an album.
#[derive(Debug, Clone)]
pub struct CreatedAlbum {
    pub dir: PathBuf,
    pub events: Vec<FileEvent>,
}

/// Create the library (if needed) and a named album inside it.
pub fn create_album(root: &Path, name: &str) -> Result<CreatedAlbum, AlbumError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AlbumError::InvalidName(name.to_string()));
    }
    let relative = album_relative_path(Path::new(name))?;
    let (library, mut events) = create_library(root, false)?;
    let dir = library.ensure_album(&relative, &mut events)?;
    Ok(CreatedAlbum { dir, events })
}

/// Parameters of a single-album fill.
#[derive(Debug, Clone)]
pub struct FillRequest {
    pub root: PathBuf,
    /// Album path relative to `root`; empty for the root album.
    pub album: PathBuf,
    pub order: AlbumOrder,
}

/// Outcome of filling one album page.
#[derive(Debug, Clone)]
pub struct FillReport {
    /// Page path relative to the library root.
    pub page: PathBuf,
    pub changes: PageChanges,
    /// Scaffolding events (library and album files).
    pub files: Vec<FileEvent>,
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = path.with_extension("html.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

/// Scaffold, scan and reconcile one album page.
pub fn fill_album(request: &FillRequest) -> Result<FillReport, AlbumError> {
    if !request.root.is_dir() {
        return Err(AlbumError::NotFound(request.root.clone()));
    }
    let relative = album_relative_path(&request.album)?;
    let (library, mut files) = create_library(&request.root, false)?;
    let album_dir = library.ensure_album(&relative, &mut files)?;

    let settings = config::load_settings(&library.settings_path(), &album_dir)?;
    let album = scan::scan_album(&album_dir)?;
    let page_path = album.index_html_path();
    let page = library.relative(&page_path);
    let html = fs::read_to_string(&page_path)?;

    let depth = relative.components().count();
    let assets = AssetLinks::at_depth(
        depth,
        &format!("{SYSTEM_DIR_NAME}/{STYLE_FILE_NAME}"),
        &format!("{SYSTEM_DIR_NAME}/{SCRIPT_FILE_NAME}"),
    );
    let probe = FsAssetProbe::new(&album_dir);
    let ctx = PageContext {
        album: &album,
        settings: &settings.index_html,
        localization: &settings.localization,
        album_order: request.order,
        assets: &assets,
        probe: &probe,
    };
    let outcome = gallery::reconcile(&html, &ctx).map_err(|source| AlbumError::Gallery {
        page: page.clone(),
        source,
    })?;
    write_atomic(&page_path, &outcome.html)?;

    Ok(FillReport {
        page,
        changes: outcome.changes,
        files,
    })
}

/// Fill every album under `root`, descendants before ancestors, root last.
///
/// `on_filled` sees each report as soon as its page is written. Stops at the
/// first failing album; pages already written stay written.
pub fn fill_global(
    root: &Path,
    order: AlbumOrder,
    mut on_filled: impl FnMut(&FillReport),
) -> Result<usize, AlbumError> {
    if !root.is_dir() {
        return Err(AlbumError::NotFound(root.to_path_buf()));
    }
    let (library, mut events) = create_library(root, false)?;
    library.ensure_album(Path::new(""), &mut events)?;

    let albums = scan::discover_albums(root)?;
    for dir in &albums {
        let request = FillRequest {
            root: root.to_path_buf(),
            album: library.relative(dir),
            order,
        };
        on_filled(&fill_album(&request)?);
    }
    Ok(albums.len())
}
