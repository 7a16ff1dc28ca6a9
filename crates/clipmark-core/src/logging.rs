//! Structured logging field name constants for clipmark.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-item iteration (per-segment sync verdicts) |

/// Correlation ID propagated across a request. Format: UUIDv7.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "provider", "sync", "search"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "reconcile", "folder_sync", "segment_search"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "sync_document", "sync_folder", "search", "assign_color"
pub const OPERATION: &str = "op";

/// Owning user UUID. Every query is scoped by this.
pub const USER_ID: &str = "user_id";

/// Document UUID being operated on.
pub const DOCUMENT_ID: &str = "document_id";

/// Segment UUID being operated on.
pub const SEGMENT_ID: &str = "segment_id";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";
