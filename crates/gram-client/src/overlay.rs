//! Caption overlay via the CDN's URL transformation grammar.
//!
//! ImageKit media URLs look like
//! `https://ik.imagekit.io/<bucket>/<path...>`. A transformation is a
//! `tr:` path segment spliced between the host+bucket prefix (the first
//! four `/`-separated segments of the URL) and the stored path. The
//! segment-count split is a fact of that URL grammar, not a choice.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// The caption as an `ie-` (encoded text) overlay parameter:
/// standard base64, then percent-encoded for URL embedding.
fn encode_overlay_text(text: &str) -> String {
    urlencoding::encode(&STANDARD.encode(text.as_bytes())).into_owned()
}

/// Splice a white-on-translucent-black caption overlay into a stored
/// media URL. An empty caption leaves the URL untouched.
pub fn transformed_url(original: &str, caption: &str) -> String {
    if caption.is_empty() {
        return original.to_string();
    }

    let overlay = format!(
        "l-text,ie-{},ly-N20,lx-20,fs-100,co-white,bg-000000A0,l-end",
        encode_overlay_text(caption)
    );

    let parts: Vec<&str> = original.split('/').collect();
    format!(
        "{}/tr:{}/{}",
        parts[..parts.len().min(4)].join("/"),
        overlay,
        parts[parts.len().min(4)..].join("/")
    )
}
