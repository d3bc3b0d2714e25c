//! Delivery-network URL handling.
//!
//! Delivery URLs have the shape
//! `https://imagedelivery.net/<account>/<image-id>/<variant>` (or the
//! `/cdn-cgi/imagedelivery/` path form behind a custom domain). The final
//! segment is either a named variant or a numeric-transform token such as
//! `w=800,q=75`. Anything else passes through untouched.

const DELIVERY_HOST: &str = "imagedelivery.net";
const DELIVERY_PATH_MARKER: &str = "/cdn-cgi/imagedelivery/";

/// Variant token that serves the stored bytes without any presentation
/// transform. Processing engines must always read this rendition.
pub const PROCESSING_VARIANT: &str = "original";

/// Derive the delivery URL for a required size/quality.
///
/// Replaces the final path segment with a comma-joined `w=<w>,q=<q>` token
/// when either parameter is supplied; with both absent, or for URLs that are
/// not delivery-shaped, the input is returned unchanged. Idempotent: the
/// replacement never accumulates.
pub fn resolve(base_url: &str, width: Option<u32>, quality: Option<u8>) -> String {
    if width.is_none() && quality.is_none() {
        return base_url.to_string();
    }

    let mut parts = Vec::new();
    if let Some(w) = width {
        parts.push(format!("w={w}"));
    }
    if let Some(q) = quality {
        parts.push(format!("q={q}"));
    }
    replace_variant(base_url, &parts.join(","))
}

/// Derive the URL a processing engine should read: the stored original,
/// regardless of what variant the UI currently displays.
pub fn processing_url(base_url: &str) -> String {
    replace_variant(base_url, PROCESSING_VARIANT)
}

fn replace_variant(base_url: &str, variant: &str) -> String {
    match variant_slot(base_url) {
        Some((head, tail)) => format!("{head}{variant}{tail}"),
        None => base_url.to_string(),
    }
}

/// Split a delivery-shaped URL around its variant segment, returning the
/// part up to and including the final `/` and any `?`/`#` suffix. `None`
/// when the URL is not recognizably delivery-shaped.
fn variant_slot(url: &str) -> Option<(&str, &str)> {
    let core_end = url.find(['?', '#']).unwrap_or(url.len());
    let (core, tail) = url.split_at(core_end);

    let rest = core
        .strip_prefix("https://")
        .or_else(|| core.strip_prefix("http://"))?;
    let path_start = rest.find('/')?;
    let host = &rest[..path_start];
    let path = &rest[path_start..];

    let segments_start = if host.eq_ignore_ascii_case(DELIVERY_HOST)
        || host
            .to_ascii_lowercase()
            .ends_with(&format!(".{DELIVERY_HOST}"))
    {
        path_start + 1
    } else if let Some(marker) = path.find(DELIVERY_PATH_MARKER) {
        path_start + marker + DELIVERY_PATH_MARKER.len()
    } else {
        return None;
    };

    let segments = &rest[segments_start..];
    if segments.is_empty() || segments.ends_with('/') {
        return None;
    }
    // account hash, image id, variant
    if segments.split('/').count() < 3 {
        return None;
    }

    let last_slash = segments.rfind('/')?;
    let head_len = core.len() - (segments.len() - last_slash - 1);
    Some((&url[..head_len], tail))
}
