//! Album settings.
//!
//! Settings are JSON and layered: stock defaults, then the library-wide
//! `System/album_settings.json`, then an optional `album_settings.json` inside
//! the album directory itself. Each layer is deep-merged over the previous
//! one, so a file only needs the keys it overrides:
//!
//! ```text
//! library/
//! ├── System/
//! │   └── album_settings.json     # library layer (overrides stock defaults)
//! └── Travel/
//!     ├── album_settings.json     # album layer (overrides library)
//!     └── index.html
//! ```
//!
//! ```json
//! { "index_html": { "group_time_window": 5 } }
//! ```
//!
//! An empty settings file counts as absent. Unknown keys are rejected to
//! catch typos early.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of a settings layer (library `System/` dir or album dir).
pub const SETTINGS_FILE_NAME: &str = "album_settings.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    /// Informational culture tag for the localized strings (e.g. `en-US`).
    pub culture: String,
    pub localization: Localization,
    pub index_html: IndexHtmlSettings,
    pub ffmpeg: FfmpegSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            culture: "en-US".to_string(),
            localization: Localization::default(),
            index_html: IndexHtmlSettings::default(),
            ffmpeg: FfmpegSettings::default(),
        }
    }
}

impl AppSettings {
    /// Validate values that would otherwise fail deep inside a fill.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let html = &self.index_html;
        if html.count_elements_in_group == 0 {
            return Err(ConfigError::Validation(
                "index_html.count_elements_in_group must be at least 1".into(),
            ));
        }
        if html.indent_size < 0 {
            return Err(ConfigError::Validation(
                "index_html.indent_size must not be negative".into(),
            ));
        }
        let required = [
            ("group_block", &html.group_block, "{{groupBlock}}"),
            ("media_block", &html.media_block, "{{mediaItems}}"),
            ("image_item", &html.image_item, "{{mediaFilePath}}"),
            ("video_item", &html.video_item, "{{mediaFilePath}}"),
        ];
        for (key, template, placeholder) in required {
            if !template.contains(placeholder) {
                return Err(ConfigError::Validation(format!(
                    "index_html.{key} must contain {placeholder}"
                )));
            }
        }
        if html.supports_albums() {
            if !html.album_block.contains("{{albumItems}}") {
                return Err(ConfigError::Validation(
                    "index_html.album_block must contain {{albumItems}}".into(),
                ));
            }
            if !html.album_item.contains("{{albumPath}}") {
                return Err(ConfigError::Validation(
                    "index_html.album_item must contain {{albumPath}}".into(),
                ));
            }
        }
        if self.localization.month_names.len() != 12 {
            return Err(ConfigError::Validation(
                "localization.month_names must list 12 months".into(),
            ));
        }
        if self.ffmpeg.path.trim().is_empty() {
            return Err(ConfigError::Validation("ffmpeg.path must not be empty".into()));
        }
        Ok(())
    }
}

/// Markup templates and grouping rules for gallery pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexHtmlSettings {
    /// Minutes after a group's first file within which files join the group.
    pub group_time_window: u32,
    /// Maximum number of files per group.
    pub count_elements_in_group: usize,
    /// Spaces per indentation level in the written page.
    pub indent_size: i32,
    pub group_block: String,
    pub media_block: String,
    pub image_item: String,
    pub video_item: String,
    /// Placeholder for hand-written prose appended to every new group.
    pub text_item: String,
    /// Wrapper for the child-album listing. Empty disables album listings.
    pub album_block: String,
    pub album_item: String,
}

impl IndexHtmlSettings {
    /// Child albums are listed only when both album templates are set.
    pub fn supports_albums(&self) -> bool {
        !self.album_block.trim().is_empty() && !self.album_item.trim().is_empty()
    }
}

impl Default for IndexHtmlSettings {
    fn default() -> Self {
        Self {
            group_time_window: 2,
            count_elements_in_group: 10,
            indent_size: 2,
            group_block: r#"<div class="group">{{groupBlock}}</div>"#.to_string(),
            media_block: r#"<div class="photos">{{mediaItems}}</div>"#.to_string(),
            image_item: concat!(
                r#"<article class="card" data-type="image" data-src="{{mediaFilePath}}">"#,
                r#"<a class="media" href="{{mediaFilePath}}">"#,
                r#"<img src="{{mediaFilePath}}" loading="lazy" alt="">"#,
                r#"</a></article>"#,
            )
            .to_string(),
            video_item: concat!(
                r#"<article class="card" data-type="video" data-src="{{mediaFilePath}}">"#,
                r#"<a class="media" href="{{mediaFilePath}}">"#,
                r#"<video src="{{mediaFilePath}}" muted playsinline preload="metadata"></video>"#,
                r#"<span class="play" aria-hidden="true"></span>"#,
                r#"<span class="video-ribbon" aria-hidden="true">VIDEO</span>"#,
                r#"</a></article>"#,
            )
            .to_string(),
            text_item: "<!--\n<div class=\"story\">\n    <p>Place text here.</p>\n</div>\n-->"
                .to_string(),
            album_block: r#"<div class="photos photos--folders">{{albumItems}}</div>"#
                .to_string(),
            album_item: concat!(
                r#"<article class="card folder">"#,
                r#"<a class="media" href="{{albumPath}}">"#,
                r#"<div class="folder-icon" aria-hidden="true"></div>"#,
                r#"<div class="folder-text">"#,
                r#"<div class="folder-name">{{albumName}}</div>"#,
                r#"<div class="folder-count">{{albumCount}}</div>"#,
                r#"</div></a></article>"#,
            )
            .to_string(),
        }
    }
}

/// User-facing strings. Messages use positional `{0}`, `{1}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Localization {
    pub file_added: String,
    pub file_found: String,
    pub album_created: String,
    pub gallery_updated: String,
    pub gallery_changes: String,
    pub error: String,
    pub path_not_found: String,
    pub no_video_in_directory: String,
    pub video_files_found: String,
    pub processing: String,
    pub video_compressed: String,
    pub compression_failed: String,
    pub video_files_compressed: String,
    pub published: String,
    pub media_view: String,
    pub close_media_view: String,
    pub scale_media_view: String,
    pub full_screen_media_view: String,
    pub switch_image_media_view: String,
    /// January through December, used for the long header date.
    pub month_names: Vec<String>,
}

impl Default for Localization {
    fn default() -> Self {
        let s = |v: &str| v.to_string();
        Self {
            file_added: s("Added: {0}"),
            file_found: s("Found: {0}"),
            album_created: s("Album ready: {0}"),
            gallery_updated: s("Gallery updated: {0}"),
            gallery_changes: s("media +{0} -{1}, albums +{2} -{3} ~{4}"),
            error: s("Error: {0}"),
            path_not_found: s("Path not found: {0}"),
            no_video_in_directory: s("No video files in {0}"),
            video_files_found: s("Found {0} video file(s) in {1}"),
            processing: s("[{0}/{1}] {2}"),
            video_compressed: s("Compressed: {0}"),
            compression_failed: s("Compression failed: {0} ({1})"),
            video_files_compressed: s("Compressed {0} of {1} video file(s)"),
            published: s("Published"),
            media_view: s("Media viewer"),
            close_media_view: s("Close"),
            scale_media_view: s("Fit to screen"),
            full_screen_media_view: s("Full screen"),
            switch_image_media_view: s("Switch"),
            month_names: [
                "January",
                "February",
                "March",
                "April",
                "May",
                "June",
                "July",
                "August",
                "September",
                "October",
                "November",
                "December",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl Localization {
    /// Month name for a 1-based month number.
    pub fn month_name(&self, month: u32) -> &str {
        month
            .checked_sub(1)
            .and_then(|i| self.month_names.get(i as usize))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Substitute positional `{0}`, `{1}`, ... placeholders in a message.
pub fn fmt_message(template: &str, args: &[&str]) -> String {
    args.iter()
        .enumerate()
        .fold(template.to_string(), |msg, (i, arg)| {
            msg.replace(&format!("{{{i}}}"), arg)
        })
}

/// How `compress` invokes ffmpeg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FfmpegSettings {
    /// Executable name or path.
    pub path: String,
    /// Argument template. `{{inputPath}}`, `{{outputPath}}` and `{{crf}}` are
    /// substituted; an argument that is exactly `{{audio}}` expands to the
    /// audio codec arguments.
    pub arguments: Vec<String>,
    pub audio: AudioSettings,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self {
            path: "ffmpeg".to_string(),
            arguments: [
                "-hide_banner",
                "-loglevel",
                "error",
                "-y",
                "-i",
                "{{inputPath}}",
                "-c:v",
                "libx264",
                "-preset",
                "slow",
                "-crf",
                "{{crf}}",
                "-pix_fmt",
                "yuv420p",
                "{{audio}}",
                "-movflags",
                "+faststart",
                "{{outputPath}}",
            ]
            .map(String::from)
            .to_vec(),
            audio: AudioSettings::default(),
        }
    }
}

/// Audio re-encoding used when stream-copying the original audio fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioSettings {
    pub codec: String,
    pub bitrate_kbps: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            codec: "aac".to_string(),
            bitrate_kbps: 192,
        }
    }
}

// =============================================================================
// Settings loading, merging, and validation
// =============================================================================

/// Returns the stock default settings as a JSON object.
///
/// This is the base layer every user file is merged onto.
pub fn stock_defaults_value() -> Value {
    serde_json::to_value(AppSettings::default()).unwrap_or(Value::Null)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Objects are merged key-by-key (overlay keys override base keys).
/// - Any other overlay value (arrays included) replaces the base value.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_json(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_json(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load a settings file as raw JSON.
///
/// Returns `Ok(None)` if the file does not exist or is blank.
pub fn load_raw_settings(path: &Path) -> Result<Option<Value>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&content)?))
}

/// Merge overlays in order onto a base value, then deserialize and validate.
pub fn resolve_settings(
    base: Value,
    overlays: impl IntoIterator<Item = Value>,
) -> Result<AppSettings, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_json);
    let settings: AppSettings = serde_json::from_value(merged)?;
    settings.validate()?;
    Ok(settings)
}

/// Load the effective settings for an album.
///
/// `library_settings` is the library's `System/album_settings.json`;
/// `album_dir` may carry its own `album_settings.json` on top. Pass the
/// library root itself as `album_dir` for the root album; the two layers are
/// distinct files so nothing is applied twice.
pub fn load_settings(library_settings: &Path, album_dir: &Path) -> Result<AppSettings, ConfigError> {
    let overlays = [
        load_raw_settings(library_settings)?,
        load_raw_settings(&album_dir.join(SETTINGS_FILE_NAME))?,
    ];
    resolve_settings(stock_defaults_value(), overlays.into_iter().flatten())
}

/// Stock settings as pretty-printed JSON, used by `gen-config` and `init`.
pub fn stock_settings_json() -> String {
    serde_json::to_string_pretty(&AppSettings::default()).unwrap_or_default() + "\n"
}
