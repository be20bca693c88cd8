//! Gallery page reconciliation.
//!
//! [`reconcile`] takes an album page (an existing `index.html` or the blank
//! template) and brings it in line with what is on disk, without discarding
//! anything a person wrote by hand:
//!
//! ```text
//! parse ─→ header placeholders ─→ album listing ─→ media cards ─→ asset links ─→ format
//! ```
//!
//! Each step diffs the page against the scanned [`Album`]: entries missing
//! from the page are rendered from the configured templates and inserted,
//! entries whose file or album is gone are removed together with any
//! container they leave empty, and entries present in both are left alone
//! (album cards get their file count refreshed). Nothing is rebuilt from
//! scratch, so reconciling the same page twice yields identical bytes.
//!
//! Anchors in the page:
//!
//! | Selector | Meaning |
//! |----------|---------|
//! | `#gallery` | Gallery container. Required. |
//! | `.group` | Visual block wrapping one or more rows plus prose |
//! | `.photos` | Row of cards |
//! | `.card` with `data-src` or an `img`/`video` | Media card |
//! | `.photos--folders` | Child-album listing |
//! | `.card.folder` | Album card, identified by its link |
//! | `link[rel=stylesheet]`, `script[src]` | Shared assets |

pub mod albums;
pub mod assets;
pub mod grouping;
pub mod header;
pub mod media;
pub mod template;

pub use albums::AlbumOrder;
pub use assets::{AssetLinks, AssetProbe, FsAssetProbe};

use crate::config::{IndexHtmlSettings, Localization};
use crate::html::{Document, DomError, FormatError, HtmlFormatter};
use crate::types::Album;
use thiserror::Error;

pub const GALLERY_SELECTOR: &str = "#gallery";
pub(crate) const CARD_SELECTOR: &str = ".card";
pub(crate) const ROW_SELECTOR: &str = ".photos";
pub(crate) const GROUP_SELECTOR: &str = ".group";

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Page has no gallery container (expected an element matching {0:?})")]
    Structural(&'static str),
    #[error("{0}")]
    Document(#[from] DomError),
    #[error("Invalid page format settings: {0}")]
    Format(#[from] FormatError),
}

/// Everything one reconciliation needs besides the page itself.
pub struct PageContext<'a> {
    pub album: &'a Album,
    pub settings: &'a IndexHtmlSettings,
    pub localization: &'a Localization,
    pub album_order: AlbumOrder,
    /// Shared stylesheet/script hrefs, relative to the album directory.
    pub assets: &'a AssetLinks,
    pub probe: &'a dyn AssetProbe,
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageChanges {
    pub media_added: usize,
    pub media_removed: usize,
    pub albums_added: usize,
    pub albums_removed: usize,
    pub albums_updated: usize,
    pub links_added: usize,
    pub links_removed: usize,
}

impl PageChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The formatted page, ready to write.
    pub html: String,
    pub changes: PageChanges,
}

/// Reconcile `html` against the album in `ctx`.
///
/// Fails without producing output when the page cannot be parsed, has no
/// gallery container, or the indent setting is invalid.
pub fn reconcile(html: &str, ctx: &PageContext) -> Result<ReconcileOutcome, GalleryError> {
    let formatter = HtmlFormatter::new(ctx.settings.indent_size)?;
    let mut doc = Document::parse(html)?;
    let gallery = doc
        .query(doc.root(), GALLERY_SELECTOR)?
        .ok_or(GalleryError::Structural(GALLERY_SELECTOR))?;

    let mut changes = PageChanges::default();
    header::fill_placeholders(&mut doc, ctx)?;
    if ctx.settings.supports_albums() {
        albums::reconcile_albums(&mut doc, gallery, ctx, &mut changes)?;
    }
    media::reconcile_media(&mut doc, gallery, ctx, &mut changes)?;
    assets::reconcile_links(&mut doc, ctx, &mut changes)?;

    Ok(ReconcileOutcome {
        html: formatter.format(&doc.serialize()),
        changes,
    })
}

/// Replace each `{{key}}` in `template` with its (already escaped) value.
pub(crate) fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |out, (key, value)| {
        out.replace(&format!("{{{{{key}}}}}"), value)
    })
}

/// Percent-decode a URL component, keeping the input if it is not UTF-8.
pub(crate) fn decode_url(component: &str) -> String {
    urlencoding::decode(component)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| component.to_string())
}

/// The path part of a URL: everything before `?` or `#`.
pub(crate) fn url_path(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or_default()
}
