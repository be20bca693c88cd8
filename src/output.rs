//! CLI output formatting.
//!
//! Every message comes from the [`Localization`] table, so the wording (and
//! language) is configured alongside the rest of the album settings.
//!
//! # Output Format
//!
//! ## Init / New
//!
//! ```text
//! Added: System/styles.css
//! Found: System/script.js
//! Added: Summer/index.html
//! Album ready: Summer
//! ```
//!
//! ## Fill
//!
//! ```text
//! Gallery updated: Summer/index.html
//!     media +3 -1, albums +0 -0 ~0
//! Gallery updated: index.html
//! ```
//!
//! Only files the fill actually created are listed. Pages whose cards did not
//! change get no second line.
//!
//! ## Compress
//!
//! ```text
//! Found 2 video file(s) in Summer/Files
//! [1/2] a.mp4
//!     Compressed: a.mp4
//! [2/2] b.mov
//!     Compression failed: b.mov (ffmpeg could not compress b.mov)
//! Compressed 1 of 2 video file(s)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::{Localization, fmt_message};
use crate::library::{CreatedAlbum, FileEvent, FillReport};
use crate::video::CompressEvent;
use std::fmt::Display;
use std::path::Path;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_event_line(event: &FileEvent, loc: &Localization) -> String {
    match event {
        FileEvent::Added(path) => fmt_message(&loc.file_added, &[&path.display().to_string()]),
        FileEvent::Found(path) => fmt_message(&loc.file_found, &[&path.display().to_string()]),
    }
}

// ============================================================================
// Init / New
// ============================================================================

pub fn format_file_events(events: &[FileEvent], loc: &Localization) -> Vec<String> {
    events.iter().map(|e| file_event_line(e, loc)).collect()
}

pub fn print_file_events(events: &[FileEvent], loc: &Localization) {
    for line in format_file_events(events, loc) {
        println!("{}", line);
    }
}

pub fn format_album_created(album: &CreatedAlbum, root: &Path, loc: &Localization) -> Vec<String> {
    let mut lines = format_file_events(&album.events, loc);
    let relative = album.dir.strip_prefix(root).unwrap_or(&album.dir);
    lines.push(fmt_message(
        &loc.album_created,
        &[&relative.display().to_string()],
    ));
    lines
}

pub fn print_album_created(album: &CreatedAlbum, root: &Path, loc: &Localization) {
    for line in format_album_created(album, root, loc) {
        println!("{}", line);
    }
}

// ============================================================================
// Fill
// ============================================================================

pub fn format_fill_report(report: &FillReport, loc: &Localization) -> Vec<String> {
    let mut lines: Vec<String> = report
        .files
        .iter()
        .filter(|e| matches!(e, FileEvent::Added(_)))
        .map(|e| file_event_line(e, loc))
        .collect();
    lines.push(fmt_message(
        &loc.gallery_updated,
        &[&report.page.display().to_string()],
    ));

    let c = &report.changes;
    let counts = [
        c.media_added,
        c.media_removed,
        c.albums_added,
        c.albums_removed,
        c.albums_updated,
    ];
    if counts.iter().any(|&n| n > 0) {
        let counts = counts.map(|n| n.to_string());
        let args: Vec<&str> = counts.iter().map(String::as_str).collect();
        lines.push(format!("    {}", fmt_message(&loc.gallery_changes, &args)));
    }
    lines
}

pub fn print_fill_report(report: &FillReport, loc: &Localization) {
    for line in format_fill_report(report, loc) {
        println!("{}", line);
    }
}

// ============================================================================
// Compress
// ============================================================================

pub fn format_compress_event(event: &CompressEvent, loc: &Localization) -> Vec<String> {
    match event {
        CompressEvent::VideosFound { count, dir } => vec![fmt_message(
            &loc.video_files_found,
            &[&count.to_string(), &dir.display().to_string()],
        )],
        CompressEvent::NoVideos { dir } => vec![fmt_message(
            &loc.no_video_in_directory,
            &[&dir.display().to_string()],
        )],
        CompressEvent::Started { index, total, path } => vec![fmt_message(
            &loc.processing,
            &[&index.to_string(), &total.to_string(), &file_name(path)],
        )],
        CompressEvent::Compressed { path } => vec![format!(
            "    {}",
            fmt_message(&loc.video_compressed, &[&file_name(path)])
        )],
        CompressEvent::Failed { path, reason } => vec![format!(
            "    {}",
            fmt_message(&loc.compression_failed, &[&file_name(path), reason])
        )],
        CompressEvent::Finished { compressed, total } => vec![fmt_message(
            &loc.video_files_compressed,
            &[&compressed.to_string(), &total.to_string()],
        )],
    }
}

// ============================================================================
// Errors
// ============================================================================

pub fn format_error(err: &dyn Display, loc: &Localization) -> String {
    fmt_message(&loc.error, &[&err.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::PageChanges;
    use std::path::PathBuf;

    fn loc() -> Localization {
        Localization::default()
    }

    #[test]
    fn file_name_falls_back_to_display() {
        assert_eq!(file_name(Path::new("/a/b.mp4")), "b.mp4");
        assert_eq!(file_name(Path::new("/")), "/");
    }

    // =========================================================================
    // Scaffolding output
    // =========================================================================

    #[test]
    fn file_events_use_localized_templates() {
        let events = [
            FileEvent::Added(PathBuf::from("System/styles.css")),
            FileEvent::Found(PathBuf::from("README.md")),
        ];
        assert_eq!(
            format_file_events(&events, &loc()),
            vec!["Added: System/styles.css", "Found: README.md"]
        );
    }

    #[test]
    fn album_created_ends_with_relative_name() {
        let album = CreatedAlbum {
            dir: PathBuf::from("/lib/Summer"),
            events: vec![FileEvent::Added(PathBuf::from("Summer/index.html"))],
        };
        assert_eq!(
            format_album_created(&album, Path::new("/lib"), &loc()),
            vec!["Added: Summer/index.html", "Album ready: Summer"]
        );
    }

    #[test]
    fn custom_localization_is_used() {
        let mut loc = loc();
        loc.file_added = "Hinzugefügt: {0}".into();
        let events = [FileEvent::Added(PathBuf::from("a"))];
        assert_eq!(format_file_events(&events, &loc), vec!["Hinzugefügt: a"]);
    }

    // =========================================================================
    // Fill output
    // =========================================================================

    #[test]
    fn fill_report_lists_added_files_and_changes() {
        let report = FillReport {
            page: PathBuf::from("Summer/index.html"),
            changes: PageChanges {
                media_added: 3,
                media_removed: 1,
                albums_updated: 2,
                ..Default::default()
            },
            files: vec![
                FileEvent::Found(PathBuf::from("System/styles.css")),
                FileEvent::Added(PathBuf::from("Summer/Files/README.md")),
            ],
        };
        assert_eq!(
            format_fill_report(&report, &loc()),
            vec![
                "Added: Summer/Files/README.md",
                "Gallery updated: Summer/index.html",
                "    media +3 -1, albums +0 -0 ~2",
            ]
        );
    }

    #[test]
    fn link_only_changes_print_one_line() {
        let report = FillReport {
            page: PathBuf::from("index.html"),
            changes: PageChanges {
                links_added: 2,
                ..Default::default()
            },
            files: vec![FileEvent::Found(PathBuf::from("index.html"))],
        };
        assert_eq!(
            format_fill_report(&report, &loc()),
            vec!["Gallery updated: index.html"]
        );
    }

    // =========================================================================
    // Compress output
    // =========================================================================

    #[test]
    fn compress_run_reads_top_to_bottom() {
        let loc = loc();
        let lines: Vec<String> = [
            CompressEvent::VideosFound { count: 2, dir: PathBuf::from("Files") },
            CompressEvent::Started { index: 1, total: 2, path: PathBuf::from("Files/a.mp4") },
            CompressEvent::Compressed { path: PathBuf::from("Files/a.mp4") },
            CompressEvent::Started { index: 2, total: 2, path: PathBuf::from("Files/b.mov") },
            CompressEvent::Failed { path: PathBuf::from("Files/b.mov"), reason: "boom".into() },
            CompressEvent::Finished { compressed: 1, total: 2 },
        ]
        .iter()
        .flat_map(|e| format_compress_event(e, &loc))
        .collect();
        assert_eq!(
            lines,
            vec![
                "Found 2 video file(s) in Files",
                "[1/2] a.mp4",
                "    Compressed: a.mp4",
                "[2/2] b.mov",
                "    Compression failed: b.mov (boom)",
                "Compressed 1 of 2 video file(s)",
            ]
        );
    }

    #[test]
    fn no_videos_message() {
        let lines = format_compress_event(
            &CompressEvent::NoVideos { dir: PathBuf::from("clips") },
            &loc(),
        );
        assert_eq!(lines, vec!["No video files in clips"]);
    }

    #[test]
    fn error_line() {
        assert_eq!(format_error(&"disk full", &loc()), "Error: disk full");
    }
}
