//! Standard success response envelopes.
//!
//! Success responses are `{"status": "success", "data": ...}`; list
//! endpoints add `{"pagination": {total, limit, offset}}`.

use axum::response::Json;
use serde::Serialize;

/// Pagination metadata for list responses.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Total items matching the query across all pages.
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Wrap a payload in the standard success envelope.
pub fn success<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "success",
        "data": data,
    }))
}

/// Wrap a list payload with pagination metadata.
pub fn success_paginated<T: Serialize>(data: T, pagination: PaginationMeta) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "success",
        "data": data,
        "pagination": pagination,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let Json(value) = success(serde_json::json!({"id": 1}));
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["id"], 1);
    }

    #[test]
    fn test_paginated_envelope_shape() {
        let Json(value) = success_paginated(
            vec![1, 2, 3],
            PaginationMeta {
                total: 10,
                limit: 3,
                offset: 0,
            },
        );
        assert_eq!(value["pagination"]["total"], 10);
        assert_eq!(value["pagination"]["limit"], 3);
        assert_eq!(value["data"].as_array().unwrap().len(), 3);
    }
}
