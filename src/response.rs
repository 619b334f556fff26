//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// `{"success": true, "message"?: ..., "data": ...}`, the envelope every
/// endpoint returns on success.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: i64,
    pub items_per_page: u32,
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message: None,
            data,
        }),
    )
}

pub fn ok_message<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message: Some(message.to_string()),
            data,
        }),
    )
}

pub fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::CREATED,
        Json(Envelope {
            success: true,
            message: Some(message.to_string()),
            data,
        }),
    )
}

/// `{"success": true, "message": ...}` with no data key, for deletes.
pub fn message_only(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "success": true, "message": message })),
    )
}

/// Pagination meta from 1-based page, page size, and total row count.
pub fn pagination(page: u32, limit: u32, total_items: i64) -> Pagination {
    let limit = limit.max(1);
    let total_pages = ((total_items.max(0) as u64).div_ceil(u64::from(limit))) as u32;
    Pagination {
        current_page: page.max(1),
        total_pages,
        total_items: total_items.max(0),
        items_per_page: limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_up_partial_pages() {
        let p = pagination(2, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.current_page, 2);
        assert_eq!(p.items_per_page, 10);
    }

    #[test]
    fn pagination_handles_empty_result() {
        let p = pagination(1, 12, 0);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.total_items, 0);
    }
}
