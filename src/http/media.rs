//! Media type matching for `Content-Type` and `Accept` headers.

/// Split an `Accept` header into media ranges, best quality first.
///
/// Parameters are dropped from the returned ranges. Ranges with equal
/// quality keep their header order.
pub fn sorted_acceptable_types(accept: &str) -> Vec<String> {
    let mut ranges: Vec<(f32, &str)> = accept
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| (quality(item), item))
        .collect();

    // `sort_by` is stable, which keeps header order among equal qualities.
    ranges.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    ranges
        .into_iter()
        .map(|(_, item)| essence(item).to_string())
        .collect()
}

/// Whether the media type `actual` is covered by the range `allowed`.
///
/// `allowed` may be `*` or `*/*`, a wildcard such as `text/*` or `*/json`,
/// a bare subtype such as `json` (read as `*/json`), or a full type.
/// Parameters on `actual` (for example `; charset=utf-8`) are ignored.
pub fn content_type_matches(actual: &str, allowed: &str) -> bool {
    let allowed = essence(allowed);
    if allowed == "*" || allowed == "*/*" {
        return true;
    }

    let actual = essence(actual);
    let (actual_type, actual_subtype) = match actual.split_once('/') {
        Some(parts) => parts,
        None => ("*", actual),
    };
    let (allowed_type, allowed_subtype) = match allowed.split_once('/') {
        Some(parts) => parts,
        None => ("*", allowed),
    };

    let type_matches = allowed_type == "*"
        || actual_type == "*"
        || allowed_type.eq_ignore_ascii_case(actual_type);
    let subtype_matches = allowed_subtype == "*"
        || actual_subtype == "*"
        || allowed_subtype.eq_ignore_ascii_case(actual_subtype);

    type_matches && subtype_matches
}

/// The media type with any parameters stripped.
fn essence(media_type: &str) -> &str {
    media_type
        .split(';')
        .next()
        .unwrap_or(media_type)
        .trim()
}

fn quality(item: &str) -> f32 {
    item.split(';')
        .skip(1)
        .filter_map(|param| param.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
        .and_then(|(_, value)| value.trim().parse::<f32>().ok())
        .unwrap_or(1.0)
}
