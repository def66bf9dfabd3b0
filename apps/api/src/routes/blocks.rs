//! Axum route handlers for block validation and publish gating.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;
use crate::layout::editor::{lenient_seq, normalize_block_width};
use crate::layout::{
    check_publish_validity, validate_blocks_for_editor, BlockValidationResult, EditorBlock,
    LayoutPolicy, PublishValidityResult,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Editor payload. Both fields tolerate any JSON; bad values are normalized.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateBlocksRequest {
    pub block_width_px: Value,
    #[serde(deserialize_with = "lenient_seq")]
    pub blocks: Vec<EditorBlock>,
}

#[derive(Debug, Serialize)]
pub struct ValidateBlocksResponse {
    pub results: Vec<BlockValidationResult>,
    pub publish: PublishValidityResult,
}

#[derive(Debug, Deserialize)]
pub struct PublishCheckRequest {
    pub results: Vec<BlockValidationResult>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/layout/policy
///
/// Returns the thresholds this instance resolves with, so the editor can explain limits.
pub async fn handle_get_policy(State(state): State<AppState>) -> Json<LayoutPolicy> {
    Json(state.policy)
}

/// POST /api/v1/blocks/validate
///
/// Resolves and validates every block for the editor preview and reports whether the
/// template as a whole may be published.
pub async fn handle_validate_blocks(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ValidateBlocksResponse>, AppError> {
    let Json(payload) = payload?;
    // Any JSON value is accepted; a non-object body is an empty request.
    let request: ValidateBlocksRequest = serde_json::from_value(payload).unwrap_or_default();

    let limit = state.config.max_blocks_per_request;
    if request.blocks.len() > limit {
        return Err(AppError::PayloadTooLarge(format!(
            "{} blocks submitted; at most {limit} per request",
            request.blocks.len()
        )));
    }

    let block_width_px = normalize_block_width(&request.block_width_px);
    let policy = state.policy;
    let blocks = request.blocks;

    // Batches can be large; keep the resolution loop off the async workers.
    let results = tokio::task::spawn_blocking(move || {
        validate_blocks_for_editor(&blocks, block_width_px, &policy)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in block validation: {e}")))?;

    let publish = check_publish_validity(&results);
    debug!(
        blocks = results.len(),
        blocked = publish.blocked_blocks.len(),
        can_publish = publish.can_publish,
        "validated blocks"
    );

    Ok(Json(ValidateBlocksResponse { results, publish }))
}

/// POST /api/v1/blocks/publish-check
///
/// Gates a publish on previously computed validation results.
pub async fn handle_publish_check(
    payload: Result<Json<PublishCheckRequest>, JsonRejection>,
) -> Result<Json<PublishValidityResult>, AppError> {
    let Json(request) = payload?;
    Ok(Json(check_publish_validity(&request.results)))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::layout::LayoutPolicy;
    use crate::routes::build_router;
    use crate::state::AppState;

    use super::*;

    fn make_app(max_blocks_per_request: usize) -> Router {
        build_router(AppState::new(Config {
            port: 0,
            rust_log: "info".to_string(),
            max_blocks_per_request,
            policy: LayoutPolicy::default(),
        }))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(make_app(10), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_get_policy_returns_defaults() {
        let request = Request::builder()
            .uri("/api/v1/layout/policy")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(make_app(10), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["minHeightPx"], 150.0);
        assert_eq!(body["maxHeightPx"], 800.0);
        assert_eq!(body["maxTableRows"], 17);
    }

    #[tokio::test]
    async fn test_validate_blocks_mixed_batch() {
        let payload = json!({
            "blockWidthPx": 1200,
            "blocks": [
                { "blockId": "kpis", "cells": [{ "chartId": "k", "bodyType": "kpi" }] },
                { "blockId": "orders", "cells": [
                    { "chartId": "t", "bodyType": "table", "contentMetadata": { "rowCount": 25 } }
                ] },
                { "blockId": "hero", "cells": [
                    { "chartId": "i", "bodyType": "image", "imageMode": "setIntrinsic",
                      "aspectRatio": "16:9", "cellWidth": 1 }
                ] }
            ]
        });
        let (status, body) = send(make_app(10), post_json("/api/v1/blocks/validate", payload)).await;
        assert_eq!(status, StatusCode::OK);

        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["blockId"], "kpis");
        assert_eq!(
            results[0]["heightResolution"]["priority"],
            "READABILITY_ENFORCEMENT"
        );
        assert_eq!(results[1]["publishBlocked"], true);
        assert_eq!(results[1]["requiredActions"], json!(["aggregate"]));
        assert_eq!(results[2]["heightResolution"]["priority"], "INTRINSIC_MEDIA");

        assert_eq!(body["publish"]["canPublish"], false);
        assert_eq!(body["publish"]["blockedBlocks"][0]["blockId"], "orders");
    }

    #[tokio::test]
    async fn test_validate_blocks_tolerates_garbage_fields() {
        let payload = json!({
            "blockWidthPx": "wide",
            "blocks": [{ "blockId": 7, "cells": [{ "bodyType": null, "cellWidth": [] }] }]
        });
        let (status, body) = send(make_app(10), post_json("/api/v1/blocks/validate", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["blockId"], "7");
        assert_eq!(body["publish"]["canPublish"], true);
    }

    #[tokio::test]
    async fn test_validate_blocks_over_limit_is_rejected() {
        let blocks: Vec<Value> = (0..3).map(|i| json!({ "blockId": i })).collect();
        let payload = json!({ "blockWidthPx": 800, "blocks": blocks });
        let (status, body) = send(make_app(2), post_json("/api/v1/blocks/validate", payload)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_validate_blocks_non_object_body_is_empty_request() {
        let (status, body) =
            send(make_app(10), post_json("/api/v1/blocks/validate", json!([1, 2]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], json!([]));
        assert_eq!(body["publish"]["canPublish"], true);
    }

    #[tokio::test]
    async fn test_unreadable_body_uses_error_shape() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/blocks/validate")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(make_app(10), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");

        let (status, body) = send(
            make_app(10),
            post_json("/api/v1/blocks/publish-check", json!([])),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_publish_check_round_trip() {
        let payload = json!({
            "blockWidthPx": 1200,
            "blocks": [{ "blockId": "ok", "cells": [{ "bodyType": "text" }] }]
        });
        let (_, validated) =
            send(make_app(10), post_json("/api/v1/blocks/validate", payload)).await;

        let check = json!({ "results": validated["results"] });
        let (status, body) =
            send(make_app(10), post_json("/api/v1/blocks/publish-check", check)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["canPublish"], true);
        assert_eq!(body["blockedBlocks"], json!([]));
    }
}
