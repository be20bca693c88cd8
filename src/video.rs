//! In-place video compression through ffmpeg.
//!
//! `compress` takes one video, or every video directly inside a folder, and
//! re-encodes it with the configured ffmpeg argument template:
//!
//! ```text
//! clip.mp4                      original
//! clip.__tmp__.mp4              ffmpeg output
//! clip.__old__.mp4              original while the two are swapped
//! ```
//!
//! The first attempt stream-copies the audio; if ffmpeg fails, the audio is
//! re-encoded with the configured codec and bitrate. After a successful encode
//! [`FileSwapper`] moves the new file into place and restores the original
//! access and modification times, so the video keeps its place in gallery
//! grouping. Leftover temp and backup files from an interrupted run are
//! removed before each attempt and are never picked up as inputs.
//!
//! Progress is reported as [`CompressEvent`]s over an optional channel;
//! nothing here prints.

use crate::config::FfmpegSettings;
use crate::scan::is_video;
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use thiserror::Error;

const TEMP_MARKER: &str = ".__tmp__";
const BACKUP_MARKER: &str = ".__old__";

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error("ffmpeg could not compress {}", .0.display())]
    CompressionFailed(PathBuf),
}

/// Runs an external program to completion. Returns whether it succeeded.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<bool>;
}

/// Runs commands as real child processes with their output discarded.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<bool> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        Ok(status.success())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum VideoQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl VideoQuality {
    /// x264 constant rate factor; lower is better quality.
    pub fn crf(self) -> u8 {
        match self {
            VideoQuality::Low => 28,
            VideoQuality::Medium => 20,
            VideoQuality::High => 17,
        }
    }
}

/// Builds ffmpeg invocations from [`FfmpegSettings`] and runs them.
pub struct FfmpegCompressor<'a> {
    settings: &'a FfmpegSettings,
    runner: &'a dyn CommandRunner,
}

impl<'a> FfmpegCompressor<'a> {
    pub fn new(settings: &'a FfmpegSettings, runner: &'a dyn CommandRunner) -> Self {
        Self { settings, runner }
    }

    pub fn build_args(
        &self,
        input: &Path,
        output: &Path,
        quality: VideoQuality,
        copy_audio: bool,
    ) -> Vec<String> {
        let audio: Vec<String> = if copy_audio {
            vec!["-c:a".into(), "copy".into()]
        } else {
            vec![
                "-c:a".into(),
                self.settings.audio.codec.clone(),
                "-b:a".into(),
                format!("{}k", self.settings.audio.bitrate_kbps),
            ]
        };
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let crf = quality.crf().to_string();
        self.settings
            .arguments
            .iter()
            .flat_map(|arg| {
                if arg == "{{audio}}" {
                    audio.clone()
                } else {
                    vec![
                        arg.replace("{{inputPath}}", &input)
                            .replace("{{outputPath}}", &output)
                            .replace("{{crf}}", &crf),
                    ]
                }
            })
            .collect()
    }

    /// Encode `input` into `output`, copying audio first and re-encoding it
    /// if that fails.
    pub fn compress(&self, input: &Path, output: &Path, quality: VideoQuality) -> Result<(), VideoError> {
        for copy_audio in [true, false] {
            remove_if_exists(output)?;
            let args = self.build_args(input, output, quality, copy_audio);
            if self.runner.run(&self.settings.path, &args)? && output.is_file() {
                return Ok(());
            }
        }
        remove_if_exists(output)?;
        Err(VideoError::CompressionFailed(input.to_path_buf()))
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

fn marked_path(original: &Path, marker: &str) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match original.extension() {
        Some(ext) => format!("{stem}{marker}.{}", ext.to_string_lossy()),
        None => format!("{stem}{marker}"),
    };
    original.with_file_name(name)
}

/// Whether `path` is a temp or backup file left by a compression run.
pub fn is_work_file(path: &Path) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy())
        .is_some_and(|stem| stem.ends_with(TEMP_MARKER) || stem.ends_with(BACKUP_MARKER))
}

/// Replaces a file with its re-encoded copy, keeping its timestamps.
#[derive(Debug)]
pub struct FileSwapper {
    original: PathBuf,
    temp: PathBuf,
    backup: PathBuf,
    accessed: FileTime,
    modified: FileTime,
}

impl FileSwapper {
    /// Capture `original`'s timestamps and derive the temp and backup paths.
    pub fn new(original: &Path) -> io::Result<Self> {
        let meta = fs::metadata(original)?;
        Ok(Self {
            original: original.to_path_buf(),
            temp: marked_path(original, TEMP_MARKER),
            backup: marked_path(original, BACKUP_MARKER),
            accessed: FileTime::from_last_access_time(&meta),
            modified: FileTime::from_last_modification_time(&meta),
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    pub fn clean_residual(&self) -> io::Result<()> {
        remove_if_exists(&self.temp)?;
        remove_if_exists(&self.backup)
    }

    /// Swap the temp file in for the original. On failure the original is
    /// put back and the temp file removed.
    pub fn commit(&self) -> io::Result<()> {
        let set_aside =
            remove_if_exists(&self.backup).and_then(|()| fs::rename(&self.original, &self.backup));
        if let Err(err) = set_aside {
            let _ = remove_if_exists(&self.temp);
            return Err(err);
        }
        let placed = fs::rename(&self.temp, &self.original)
            .and_then(|()| filetime::set_file_times(&self.original, self.accessed, self.modified));
        if let Err(err) = placed {
            self.rollback();
            return Err(err);
        }
        remove_if_exists(&self.backup)
    }

    /// Put the backup back in place. Only valid once the original has been
    /// moved to the backup path.
    fn rollback(&self) {
        let _ = remove_if_exists(&self.temp);
        let _ = remove_if_exists(&self.original);
        let _ = fs::rename(&self.backup, &self.original);
    }
}

/// Progress of a `compress` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressEvent {
    VideosFound { count: usize, dir: PathBuf },
    NoVideos { dir: PathBuf },
    Started { index: usize, total: usize, path: PathBuf },
    Compressed { path: PathBuf },
    Failed { path: PathBuf, reason: String },
    Finished { compressed: usize, total: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressSummary {
    pub total: usize,
    pub compressed: usize,
    pub failed: usize,
}

/// Compress one file in place.
pub fn compress_file(
    path: &Path,
    compressor: &FfmpegCompressor,
    quality: VideoQuality,
) -> Result<(), VideoError> {
    let swapper = FileSwapper::new(path)?;
    swapper.clean_residual()?;
    compressor.compress(path, swapper.temp_path(), quality)?;
    swapper.commit()?;
    Ok(())
}

/// Videos directly inside `dir`, sorted, skipping leftover work files.
fn videos_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut videos = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_video(&path) && !is_work_file(&path) {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

/// Compress the video at `path`, or every video directly inside it.
///
/// A file that fails is reported and skipped; the run goes on with the next.
pub fn compress_path(
    path: &Path,
    settings: &FfmpegSettings,
    runner: &dyn CommandRunner,
    quality: VideoQuality,
    events: Option<Sender<CompressEvent>>,
) -> Result<CompressSummary, VideoError> {
    let emit = |event: CompressEvent| {
        if let Some(tx) = &events {
            let _ = tx.send(event);
        }
    };

    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        let videos = videos_in(path)?;
        if videos.is_empty() {
            emit(CompressEvent::NoVideos {
                dir: path.to_path_buf(),
            });
            return Ok(CompressSummary::default());
        }
        emit(CompressEvent::VideosFound {
            count: videos.len(),
            dir: path.to_path_buf(),
        });
        videos
    } else {
        return Err(VideoError::PathNotFound(path.to_path_buf()));
    };

    let compressor = FfmpegCompressor::new(settings, runner);
    let mut summary = CompressSummary {
        total: files.len(),
        ..Default::default()
    };
    for (i, file) in files.iter().enumerate() {
        emit(CompressEvent::Started {
            index: i + 1,
            total: summary.total,
            path: file.clone(),
        });
        match compress_file(file, &compressor, quality) {
            Ok(()) => {
                summary.compressed += 1;
                emit(CompressEvent::Compressed { path: file.clone() });
            }
            Err(err) => {
                summary.failed += 1;
                emit(CompressEvent::Failed {
                    path: file.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    emit(CompressEvent::Finished {
        compressed: summary.compressed,
        total: summary.total,
    });
    Ok(summary)
}
