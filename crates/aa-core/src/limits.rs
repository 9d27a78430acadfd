//! Input guard rails enforced at the query and export boundary.
//!
//! Every bound here exists to keep a single hostile or careless caller from
//! stalling the service: query length caps the substring scan, depth caps
//! the BFS fan-out on a densely connected graph, and the result cap bounds
//! response size. Filename sanitization confines layer artifacts to the
//! configured output directory regardless of caller input.

use crate::error::{AtlasError, AtlasResult};

/// Maximum accepted length for a search query, in characters.
pub const MAX_QUERY_LEN: usize = 100;

/// Maximum traversal depth for relationship exploration.
pub const MAX_DEPTH: u32 = 4;

/// Maximum number of items returned from a single traversal.
pub const MAX_TRAVERSAL_RESULTS: usize = 1000;

/// Hard cap on the search result limit; larger requests are clamped.
pub const MAX_SEARCH_RESULTS: usize = 100;

/// Default search result limit when the caller does not supply one.
pub const DEFAULT_SEARCH_RESULTS: usize = 5;

/// Default page size for tactic listings.
pub const DEFAULT_TACTIC_PAGE: usize = 20;

/// Description length shown in summaries; full text stays in the node.
pub const DESCRIPTION_PREVIEW: usize = 500;

/// Rejects queries longer than [`MAX_QUERY_LEN`].
pub fn check_query_len(query: &str) -> AtlasResult<()> {
    if query.chars().count() > MAX_QUERY_LEN {
        return Err(AtlasError::InvalidInput(format!(
            "query exceeds maximum length of {} characters",
            MAX_QUERY_LEN
        )));
    }
    Ok(())
}

/// Rejects traversal depths above [`MAX_DEPTH`].
pub fn check_depth(depth: u32) -> AtlasResult<()> {
    if depth > MAX_DEPTH {
        return Err(AtlasError::InvalidInput(format!(
            "depth {} exceeds maximum of {}",
            depth, MAX_DEPTH
        )));
    }
    Ok(())
}

/// Clamps a caller-supplied result limit to [`MAX_SEARCH_RESULTS`].
///
/// Oversized limits are clamped silently rather than rejected.
pub fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).min(MAX_SEARCH_RESULTS)
}

/// Truncates a description for summary rendering.
pub fn preview(description: &str) -> String {
    if description.is_empty() {
        return "No description.".to_string();
    }
    let truncated: String = description.chars().take(DESCRIPTION_PREVIEW).collect();
    if truncated.chars().count() < description.chars().count() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Reduces a caller-supplied filename to a safe basename ending in `.json`.
///
/// Strips any directory component, drops every character outside
/// `[A-Za-z0-9._-]`, and appends `.json` if missing. The result is only
/// ever joined against the configured output directory, so path traversal
/// is impossible by construction.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let mut clean: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    // A name that sanitized away entirely still needs a usable basename.
    let stem_empty = clean.trim_matches('.').is_empty();
    if stem_empty {
        clean = "layer".to_string();
    }

    if !clean.ends_with(".json") {
        clean.push_str(".json");
    }
    clean
}
