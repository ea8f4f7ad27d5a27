//! Metric names recorded by the assembler.

/// Event context served from cache (counter).
pub const EVENT_CONTEXT_CACHE_HITS_TOTAL: &str = "event_context_cache_hits_total";
/// Event context assembled from the views (counter).
pub const EVENT_CONTEXT_CACHE_MISSES_TOTAL: &str = "event_context_cache_misses_total";
/// Failed view queries (counter).
pub const VIEW_QUERY_ERRORS_TOTAL: &str = "view_query_errors_total";
