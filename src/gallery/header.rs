//! Header and control-label placeholders.
//!
//! A fresh page carries `{{title}}`, `{{published}}`, the date placeholders
//! and the lightbox labels. They are filled by walking the `title`, `header`
//! and `#lightbox` subtrees and editing text nodes and attribute values in
//! place, so the step is safe to run on every fill: once a placeholder is
//! gone there is nothing left to match. Text written anywhere else (the
//! gallery's stories included) is never touched, nor is the content of
//! `script` and `style` elements.
//!
//! The two date placeholders stay in the page until the album has media.

use super::PageContext;
use crate::html::{Document, DomError, NodeId, NodeKind, escape};

/// Placeholder keys and their values for one album.
pub(crate) fn header_values(ctx: &PageContext) -> Vec<(&'static str, String)> {
    let loc = ctx.localization;
    let mut values = vec![
        ("title", ctx.album.name.clone()),
        ("published", loc.published.clone()),
        ("mediaView", loc.media_view.clone()),
        ("closeMediaView", loc.close_media_view.clone()),
        ("scaleMediaView", loc.scale_media_view.clone()),
        ("fullScreenMediaView", loc.full_screen_media_view.clone()),
        ("switchImageMediaView", loc.switch_image_media_view.clone()),
    ];
    if let Some(earliest) = ctx.album.earliest_media() {
        use chrono::Datelike;
        values.push(("createdAtIso", earliest.format("%Y-%m-%d").to_string()));
        values.push((
            "createdAtHuman",
            format!(
                "{} {} {}",
                earliest.day(),
                loc.month_name(earliest.month()),
                earliest.year()
            ),
        ));
    }
    values
}

fn substitute(raw: &str, values: &[(&str, String)]) -> Option<String> {
    if !raw.contains("{{") {
        return None;
    }
    let mut out = raw.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{{{key}}}}}"), &escape(value));
    }
    (out != raw).then_some(out)
}

const PLACEHOLDER_SCOPES: &str = "title, header, #lightbox";

/// Placeholder scopes that are not nested in another scope, each followed by
/// its descendants.
fn placeholder_nodes(doc: &Document) -> Result<Vec<NodeId>, DomError> {
    let scopes = doc.query_all(doc.root(), PLACEHOLDER_SCOPES)?;
    let mut nodes = Vec::new();
    for &scope in &scopes {
        if doc.ancestors(scope).any(|a| scopes.contains(&a)) {
            continue;
        }
        nodes.push(scope);
        nodes.extend(doc.descendants(scope));
    }
    Ok(nodes)
}

/// Fill placeholders in the page's header areas. Returns how many nodes
/// changed.
pub(crate) fn fill_placeholders(doc: &mut Document, ctx: &PageContext) -> Result<usize, DomError> {
    let values = header_values(ctx);
    let mut changed = 0;
    for node in placeholder_nodes(doc)? {
        match doc.kind(node) {
            NodeKind::Text(raw) => {
                let in_code = doc.parent(node).and_then(|p| doc.tag_name(p)).is_some_and(|t| {
                    t == "script" || t == "style"
                });
                if in_code {
                    continue;
                }
                if let Some(new) = substitute(raw, &values) {
                    doc.set_raw_text(node, new);
                    changed += 1;
                }
            }
            NodeKind::Element { attrs, .. } => {
                let updates: Vec<(String, String)> = attrs
                    .iter()
                    .filter_map(|a| {
                        let raw = a.value.as_deref()?;
                        substitute(raw, &values).map(|new| (a.name.clone(), new))
                    })
                    .collect();
                if !updates.is_empty() {
                    changed += 1;
                }
                for (name, new) in updates {
                    doc.set_raw_attribute(node, &name, Some(new));
                }
            }
            _ => {}
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    const HEADER: &str = r#"<html><head><title>{{title}}</title><script>var t = "{{title}}";</script></head>
<body><header><h1>{{title}}</h1><p><span>{{published}}</span> <time datetime="{{createdAtIso}}">{{createdAtHuman}}</time></p></header>
<main id="gallery"></main><div id="lightbox"><button title="{{closeMediaView}}" aria-label="{{closeMediaView}}">x</button></div></body></html>"#;

    fn filled(album: &crate::types::Album) -> String {
        let fixture = PageFixture::new(album.clone());
        let mut doc = Document::parse(HEADER).unwrap();
        fill_placeholders(&mut doc, &fixture.context()).unwrap();
        doc.serialize()
    }

    #[test]
    fn fills_title_labels_and_dates() {
        let mut album = album_named("Summer & Sea");
        album.media_files = vec![image_on("a.jpg", 2024, 3, 7, 10, 0), image_on("b.jpg", 2024, 3, 5, 8, 0)];
        let html = filled(&album);
        assert!(html.contains("<title>Summer &amp; Sea</title>"));
        assert!(html.contains("<h1>Summer &amp; Sea</h1>"));
        assert!(html.contains("<span>Published</span>"));
        assert!(html.contains(r#"<time datetime="2024-03-05">5 March 2024</time>"#));
        assert!(html.contains(r#"title="Close" aria-label="Close""#));
    }

    #[test]
    fn script_content_is_left_alone() {
        let html = filled(&album_named("Trip"));
        assert!(html.contains(r#"var t = "{{title}}";"#));
    }

    #[test]
    fn dates_wait_for_media() {
        let html = filled(&album_named("Trip"));
        assert!(html.contains(r#"<time datetime="{{createdAtIso}}">{{createdAtHuman}}</time>"#));
        assert!(html.contains("<h1>Trip</h1>"));
    }

    #[test]
    fn filling_twice_changes_nothing() {
        let mut album = album_named("Trip");
        album.media_files = vec![image_at("a.jpg", 9, 0)];
        let fixture = PageFixture::new(album);
        let ctx = fixture.context();
        let mut doc = Document::parse(HEADER).unwrap();
        assert!(fill_placeholders(&mut doc, &ctx).unwrap() > 0);
        let once = doc.serialize();
        assert_eq!(fill_placeholders(&mut doc, &ctx).unwrap(), 0);
        assert_eq!(doc.serialize(), once);
    }

    #[test]
    fn unknown_placeholders_survive() {
        let fixture = PageFixture::new(album_named("Trip"));
        let mut doc = Document::parse("<header><p>{{custom}} {{title}}</p></header>").unwrap();
        fill_placeholders(&mut doc, &fixture.context()).unwrap();
        assert_eq!(doc.serialize(), "<header><p>{{custom}} Trip</p></header>");
    }

    #[test]
    fn gallery_prose_keeps_literal_placeholders() {
        let fixture = PageFixture::new(album_named("Trip"));
        let page = r#"<header><h1>{{title}}</h1></header><main id="gallery"><div class="story"><p>Write {{title}} to show the album name.</p></div></main>"#;
        let mut doc = Document::parse(page).unwrap();
        assert_eq!(fill_placeholders(&mut doc, &fixture.context()).unwrap(), 1);
        let html = doc.serialize();
        assert!(html.contains("<h1>Trip</h1>"));
        assert!(html.contains("Write {{title}} to show the album name."));
    }
}
