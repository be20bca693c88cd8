use clap::{Parser, Subcommand};
use photo_album::config::{self, AppSettings, Localization, fmt_message};
use photo_album::gallery::AlbumOrder;
use photo_album::library::{self, AlbumLibrary, FillRequest};
use photo_album::output;
use photo_album::video::{self, SystemRunner, VideoQuality};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "photo-album")]
#[command(about = "Scaffold and maintain static photo/video gallery pages")]
#[command(long_about = "\
Scaffold and maintain static photo/video gallery pages

Your filesystem is the data source. Every folder is an album, its Files/
folder holds the media, and index.html is the page. Filling a page adds
cards for new media and sub-albums, removes cards whose files are gone,
and leaves everything you wrote by hand alone.

Library structure:

  library/
  ├── README.md
  ├── System/
  │   ├── album_settings.json      # Library settings (run 'gen-config' for all keys)
  │   ├── styles.css               # Shared stylesheet
  │   └── script.js                # Shared lightbox script
  ├── index.html                   # Root album page
  ├── Files/                       # Root album media
  ├── Summer/
  │   ├── album_settings.json      # Per-album settings (optional, overrides library)
  │   ├── index.html
  │   └── Files/
  │       ├── IMG_001.jpg
  │       └── clip.mp4
  └── Years/
      └── 2020/                    # Nested album
          ├── index.html
          └── Files/

New media is grouped by capture time (file modification time): files taken
within the configured window share a group, up to a maximum group size.

Run 'photo-album gen-config' to print the stock album_settings.json.")]
#[command(version = version_string())]
struct Cli {
    /// Library root directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the library's shared files (styles, script, settings, README)
    Init {
        /// Overwrite shared files that already exist
        #[arg(long)]
        force: bool,
    },
    /// Create an album folder with an empty page
    New {
        /// Album path relative to the library root (e.g. "Years/2020")
        album: String,
    },
    /// Bring album pages up to date with their media
    Fill {
        /// Album path relative to the library root; the root album when omitted
        album: Option<PathBuf>,
        /// Fill every album in the library, children before parents
        #[arg(short, long, conflicts_with = "album")]
        global: bool,
        /// Order of newly added sub-album cards
        #[arg(long, value_enum, default_value_t = AlbumOrder::Date)]
        order_album: AlbumOrder,
    },
    /// Re-encode videos in place with ffmpeg
    Compress {
        /// A video file, or a directory whose videos are all compressed
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = VideoQuality::Medium)]
        quality: VideoQuality,
    },
    /// Print the stock album_settings.json with every option
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err((err, loc)) => {
            eprintln!("{}", output::format_error(&err, &loc));
            ExitCode::FAILURE
        }
    }
}

type CliError = (Box<dyn std::error::Error>, Localization);

/// Effective settings at the library root, or stock settings when the
/// library has none (or they do not load).
fn library_settings(root: &Path) -> AppSettings {
    config::load_settings(&AlbumLibrary::new(root).settings_path(), root).unwrap_or_default()
}

/// Attach the library's message table to an error.
fn localized<E: Into<Box<dyn std::error::Error>>>(root: &Path) -> impl FnOnce(E) -> CliError {
    move |err| (err.into(), library_settings(root).localization)
}

fn with_loc<E: Into<Box<dyn std::error::Error>>>(loc: &Localization) -> impl FnOnce(E) -> CliError {
    move |err| (err.into(), loc.clone())
}

/// Create `root` when needed and make it absolute.
fn prepare_root(root: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    root.canonicalize()
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Init { force } => {
            let root = prepare_root(&cli.root).map_err(localized(&cli.root))?;
            let (_, events) = library::create_library(&root, force).map_err(localized(&root))?;
            output::print_file_events(&events, &library_settings(&root).localization);
        }
        Command::New { album } => {
            let root = prepare_root(&cli.root).map_err(localized(&cli.root))?;
            let created = library::create_album(&root, &album).map_err(localized(&root))?;
            output::print_album_created(&created, &root, &library_settings(&root).localization);
        }
        Command::Fill {
            album,
            global,
            order_album,
        } => {
            let root = cli
                .root
                .canonicalize()
                .map_err(|_| library::AlbumError::NotFound(cli.root.clone()))
                .map_err(localized(&cli.root))?;
            let loc = library_settings(&root).localization;
            if global {
                library::fill_global(&root, order_album, |report| {
                    output::print_fill_report(report, &loc);
                })
                .map_err(with_loc(&loc))?;
            } else {
                let request = FillRequest {
                    root: root.clone(),
                    album: album.unwrap_or_default(),
                    order: order_album,
                };
                let report = library::fill_album(&request).map_err(with_loc(&loc))?;
                output::print_fill_report(&report, &loc);
            }
        }
        Command::Compress { path, quality } => {
            let settings = library_settings(&cli.root);
            if !path.exists() {
                let message = fmt_message(
                    &settings.localization.path_not_found,
                    &[&path.display().to_string()],
                );
                return Err((message.into(), settings.localization));
            }

            let loc = settings.localization.clone();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_compress_event(&event, &loc) {
                        println!("{}", line);
                    }
                }
            });
            let result =
                video::compress_path(&path, &settings.ffmpeg, &SystemRunner, quality, Some(tx));
            if printer.join().is_err() {
                return Err(("output thread panicked".into(), settings.localization));
            }
            let summary = result.map_err(with_loc(&settings.localization))?;
            if summary.failed > 0 {
                let message = format!("{} of {} video file(s) failed", summary.failed, summary.total);
                return Err((message.into(), settings.localization));
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_settings_json());
        }
    }

    Ok(())
}
