//! Shared stylesheet and script links.
//!
//! Links whose local target no longer exists are dropped. If a page ends up
//! with no stylesheet (or no external script), the library's shared one is
//! added to `<head>`.

use super::{PageChanges, PageContext, decode_url, url_path};
use crate::html::{Document, DomError, InsertPosition, NodeId, escape};
use std::path::PathBuf;

const STYLE_LINKS: &str = "link[rel=stylesheet], link[rel=preload][as=style]";
const SCRIPTS: &str = "script[src]";

/// Decides whether a linked asset exists.
pub trait AssetProbe {
    fn exists(&self, href: &str) -> bool;
}

/// Resolves hrefs against an album directory on disk.
///
/// Remote, protocol-relative, root-relative and `data:` URLs cannot be
/// checked and always count as present.
#[derive(Debug, Clone)]
pub struct FsAssetProbe {
    album_dir: PathBuf,
}

impl FsAssetProbe {
    pub fn new(album_dir: impl Into<PathBuf>) -> Self {
        Self {
            album_dir: album_dir.into(),
        }
    }
}

impl AssetProbe for FsAssetProbe {
    fn exists(&self, href: &str) -> bool {
        let href = href.trim();
        if is_unresolvable(href) {
            return true;
        }
        let path = url_path(href);
        if path.is_empty() {
            return false;
        }
        self.album_dir.join(decode_url(path)).is_file()
    }
}

fn is_unresolvable(href: &str) -> bool {
    if href.starts_with('/') || href.starts_with("data:") {
        return true;
    }
    // scheme ":" before any path separator, e.g. https://, mailto:
    match href.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && !scheme.contains('/')
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Hrefs of the library-wide assets, relative to the album directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLinks {
    pub stylesheet: String,
    pub script: String,
}

impl AssetLinks {
    /// Links from an album `depth` levels below the library root.
    pub fn at_depth(depth: usize, stylesheet: &str, script: &str) -> Self {
        let up = "../".repeat(depth);
        Self {
            stylesheet: format!("{up}{stylesheet}"),
            script: format!("{up}{script}"),
        }
    }
}

fn prune(
    doc: &mut Document,
    selector: &str,
    attr: &str,
    probe: &dyn AssetProbe,
) -> Result<usize, DomError> {
    let mut removed = 0;
    for node in doc.query_all(doc.root(), selector)? {
        let missing = doc
            .get_attribute(node, attr)
            .is_some_and(|href| !probe.exists(&href));
        if missing {
            doc.remove(node);
            removed += 1;
        }
    }
    Ok(removed)
}

fn head_of(doc: &Document) -> Result<NodeId, DomError> {
    let root = doc.root();
    Ok(doc
        .query(root, "head")?
        .or(doc.query(root, "html")?)
        .unwrap_or(root))
}

pub(crate) fn reconcile_links(
    doc: &mut Document,
    ctx: &PageContext,
    changes: &mut PageChanges,
) -> Result<(), DomError> {
    changes.links_removed += prune(doc, STYLE_LINKS, "href", ctx.probe)?;
    changes.links_removed += prune(doc, SCRIPTS, "src", ctx.probe)?;

    let root = doc.root();
    if doc.query(root, STYLE_LINKS)?.is_none() {
        let head = head_of(doc)?;
        let link = format!(
            r#"<link rel="stylesheet" href="{}">"#,
            escape(&ctx.assets.stylesheet)
        );
        doc.insert_html(head, InsertPosition::BeforeEnd, &link)?;
        changes.links_added += 1;
    }
    if doc.query(root, SCRIPTS)?.is_none() {
        let head = head_of(doc)?;
        let script = format!(
            r#"<script defer src="{}"></script>"#,
            escape(&ctx.assets.script)
        );
        doc.insert_html(head, InsertPosition::BeforeEnd, &script)?;
        changes.links_added += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    struct Missing(&'static str);

    impl AssetProbe for Missing {
        fn exists(&self, href: &str) -> bool {
            href != self.0
        }
    }

    fn run(page: &str, probe: &dyn AssetProbe) -> (String, PageChanges) {
        let fixture = PageFixture::new(album_named("Trip"));
        let mut ctx = fixture.context();
        ctx.probe = probe;
        let mut doc = Document::parse(page).unwrap();
        let mut changes = PageChanges::default();
        reconcile_links(&mut doc, &ctx, &mut changes).unwrap();
        (doc.serialize(), changes)
    }

    #[test]
    fn unresolvable_hrefs() {
        assert!(is_unresolvable("https://cdn.example.com/a.css"));
        assert!(is_unresolvable("//cdn.example.com/a.css"));
        assert!(is_unresolvable("/site.css"));
        assert!(is_unresolvable("data:text/css,body{}"));
        assert!(!is_unresolvable("../System/styles.css"));
        assert!(!is_unresolvable("dir/a:b.css"));
    }

    #[test]
    fn fs_probe_checks_album_relative_files() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("System/styles.css"));
        touch(&tmp.path().join("My Css/a.css"));
        let album = tmp.path().join("Trip");
        std::fs::create_dir(&album).unwrap();
        let probe = FsAssetProbe::new(&album);
        assert!(probe.exists("../System/styles.css?v=3"));
        assert!(probe.exists("../My%20Css/a.css"));
        assert!(!probe.exists("../System/missing.css"));
        assert!(!probe.exists(""));
        assert!(probe.exists("https://example.com/x.js"));
    }

    #[test]
    fn at_depth_prefixes_parent_segments() {
        let links = AssetLinks::at_depth(2, "System/styles.css", "System/script.js");
        assert_eq!(links.stylesheet, "../../System/styles.css");
        assert_eq!(links.script, "../../System/script.js");
        assert_eq!(AssetLinks::at_depth(0, "a.css", "b.js").stylesheet, "a.css");
    }

    #[test]
    fn adds_shared_assets_to_head() {
        let (html, changes) = run("<html><head><title>t</title></head><body></body></html>", &AllExist);
        assert_eq!(
            html,
            concat!(
                "<html><head><title>t</title>",
                r#"<link rel="stylesheet" href="System/styles.css">"#,
                r#"<script defer src="System/script.js"></script>"#,
                "</head><body></body></html>"
            )
        );
        assert_eq!(changes.links_added, 2);
    }

    #[test]
    fn missing_link_is_replaced() {
        let page = r#"<html><head><link rel="stylesheet" href="old.css"><script src="app.js"></script></head></html>"#;
        let (html, changes) = run(page, &Missing("old.css"));
        assert!(!html.contains("old.css"));
        assert!(html.contains(r#"href="System/styles.css""#));
        assert!(html.contains(r#"<script src="app.js"></script>"#));
        assert_eq!(changes.links_removed, 1);
        assert_eq!(changes.links_added, 1);
    }

    #[test]
    fn existing_links_are_kept() {
        let page = r#"<html><head><link rel="preload" as="style" href="a.css"><script src="b.js"></script></head></html>"#;
        let (html, changes) = run(page, &AllExist);
        assert_eq!(html, page);
        assert!(changes.is_empty());
    }

    #[test]
    fn fragment_without_head_gets_links_at_root() {
        let (html, _) = run("<main id=\"gallery\"></main>", &AllExist);
        assert!(html.ends_with(r#"<script defer src="System/script.js"></script>"#));
    }
}
