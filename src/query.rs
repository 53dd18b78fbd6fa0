use crate::pattern::CompiledPattern;
use crate::traits::{IndexStore, QueryField, ResultSet, SearchRequest};
use log::{debug, warn};

/// How many times `limit` the storage prefilter is asked for, to compensate
/// for rows the exact pattern later rejects. When the exact pattern rejects
/// more than this share of prefiltered rows the result set comes back
/// under-filled; that is expected behavior, not an error.
pub const PREFILTER_OVERSAMPLE: usize = 4;

/// Resolves one [`SearchRequest`] against a store.
///
/// The store does a cheap case-insensitive substring prefilter on the core
/// literal; rows are then matched exactly in the order returned, stopping as
/// soon as `limit` matches are found. A store failure yields an empty result
/// set carrying the error text, never a panic.
pub fn execute<S: IndexStore>(store: &S, request: &SearchRequest) -> ResultSet {
    let compiled = CompiledPattern::compile(&request.pattern);
    let core = CompiledPattern::core_literal(&request.pattern);
    let field = if request.match_full_path {
        QueryField::Path
    } else {
        QueryField::Name
    };

    let prefetch = request.limit.saturating_mul(PREFILTER_OVERSAMPLE);
    let rows = match store.query_by_field(field, &core, request.parent_filter.as_deref(), prefetch)
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Search for '{}' failed: {}", request.pattern, e);
            return ResultSet {
                entries: Vec::new(),
                generation: request.generation,
                error: Some(e.to_string()),
            };
        }
    };

    let mut entries = Vec::new();
    for entry in rows {
        if entries.len() >= request.limit {
            break;
        }
        let target = if request.match_full_path {
            entry.path.as_str()
        } else {
            entry.name.as_str()
        };
        if compiled.matches(target) {
            entries.push(entry);
        }
    }

    debug!(
        "Search for '{}' returned {} results (generation {}).",
        request.pattern,
        entries.len(),
        request.generation
    );
    ResultSet {
        entries,
        generation: request.generation,
        error: None,
    }
}
