//! # Photo Album
//!
//! Scaffolds and maintains static photo/video gallery pages. A library is a
//! plain folder tree: every folder is an album, its `Files/` folder holds the
//! media, and its `index.html` is the page a browser opens directly.
//!
//! # Reconcile, Don't Regenerate
//!
//! Pages are edited by hand (captions, reordered cards, extra sections), so
//! `fill` never rewrites a page from a template. It parses the existing page,
//! compares the cards under `#gallery` with what is on disk, and edits only
//! the difference:
//!
//! ```text
//! index.html ──parse──▶ Document ──reconcile──▶ Document ──format──▶ index.html
//!                           ▲
//!            scan ──▶ Album ─┘   (media files, child albums, settings)
//! ```
//!
//! Cards for new media are appended in time-window groups, cards whose file is
//! gone are removed along with any container they leave empty, and the album
//! listing gains or loses sub-album cards. Running `fill` twice in a row
//! writes the same bytes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Reads an album folder into an [`types::Album`]; finds every album in a library |
//! | [`gallery`] | Page reconciliation: header placeholders, media cards, album listing, asset links |
//! | [`html`] | Tolerant HTML parser, mutable tree, selector queries and the pretty-printer |
//! | [`library`] | `init`, `new` and `fill` over a library on disk |
//! | [`video`] | In-place ffmpeg compression with an atomic file swap |
//! | [`config`] | Layered `album_settings.json` loading, validation and the message table |
//! | [`types`] | Album and media types shared across modules |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Settings Cascade (Stock → Library → Album)
//!
//! ```text
//! (built-in defaults)
//! library/System/album_settings.json   ← library-wide
//! library/Summer/album_settings.json   ← one album
//! ```
//!
//! Each layer is a partial JSON object merged key by key onto the one above.
//! Unknown keys are errors, so a typo fails loudly instead of being ignored.
//!
//! ## Maud for the Blank Page
//!
//! The page `new` writes is built with [Maud](https://maud.lambda.xyz/), so the
//! skeleton is checked at compile time. Everything after that point is edited
//! through [`html::Document`], never re-rendered.
//!
//! ## Relative Links Only
//!
//! Pages reference media, sub-albums and shared assets by relative URL, so a
//! library works from `file://` as well as from any static file server.

pub mod config;
pub mod gallery;
pub mod html;
pub mod library;
pub mod output;
pub mod scan;
pub mod types;
pub mod video;

#[cfg(test)]
pub(crate) mod test_helpers;
