//! The blank album page written by `new`.
//!
//! Everything album-specific is a `{{placeholder}}` filled in by the first
//! fill; the gallery container starts empty.

use maud::{DOCTYPE, html};

pub fn blank_index_html() -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "{{title}}" }
            }
            body {
                div.container {
                    header.album-header {
                        h1 { "{{title}}" }
                        p.album-meta {
                            span.published { "{{published}}" }
                            " "
                            time datetime="{{createdAtIso}}" { "{{createdAtHuman}}" }
                        }
                    }
                    main #gallery {}
                }
                div #lightbox .lightbox aria-hidden="true" role="dialog" aria-label="{{mediaView}}" {
                    div.lb-stage {}
                    div.lb-counter {
                        span.count {}
                        " / "
                        span.total {}
                    }
                    button.lb-arrow.prev type="button" aria-label="{{switchImageMediaView}}" { "‹" }
                    button.lb-arrow.next type="button" aria-label="{{switchImageMediaView}}" { "›" }
                    div.lb-controls {
                        button.lb-btn.fit type="button" title="{{scaleMediaView}}" aria-label="{{scaleMediaView}}" { "⤢" }
                        button.lb-btn.fs type="button" title="{{fullScreenMediaView}}" aria-label="{{fullScreenMediaView}}" { "⛶" }
                        button.lb-btn.close type="button" title="{{closeMediaView}}" aria-label="{{closeMediaView}}" { "×" }
                    }
                }
            }
        }
    }
    .into_string()
}
