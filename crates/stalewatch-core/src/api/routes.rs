//! API routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))

        // Metrics
        .route("/metrics", get(handlers::metrics))

        // Backups
        .route("/", post(handlers::check_and_remediate))
        .route("/checkBackup", post(handlers::check_backup))

        // Service-account keys
        .route("/keys", post(handlers::check_keys))

        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{finished_minutes_ago, services, FakeAdmin, RecordingMessenger};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(admin: Arc<FakeAdmin>, messenger: Arc<RecordingMessenger>) -> Router {
        let (services, _) = services(admin, messenger);
        create_router(AppState {
            services,
            metrics: None,
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn request(extra: Value) -> Value {
        let mut body = json!({
            "slackChannelName": "ops-alerts",
            "projectID": "demo-project",
            "serviceName": "freshness",
            "region": "us-central1",
            "slackToken": "xoxb-test"
        });
        if let (Some(target), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        body
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(
            Arc::new(FakeAdmin::default()),
            Arc::new(RecordingMessenger::default()),
        );

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_backup_route() {
        let admin = Arc::new(FakeAdmin::default());
        admin.push_backup("orders-db", Ok(Some(finished_minutes_ago(90))));
        let messenger = Arc::new(RecordingMessenger::with_channels(&[("C9", "ops-alerts")]));
        let app = router(admin.clone(), messenger.clone());

        let response = app
            .oneshot(post_json(
                "/checkBackup",
                request(json!({
                    "instances": ["orders-db"],
                    "threshold": {"orders-db": 60}
                })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["info"], "Processes successfully initiated.");
        assert_eq!(body["report"]["outcomes"][0]["outcome"], "stale_needs_alert");
        assert_eq!(messenger.posted().len(), 1);
        assert_eq!(admin.calls("insert_backup"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_root_route_remediates() {
        let admin = Arc::new(FakeAdmin::default());
        admin.push_backup("orders-db", Ok(Some(finished_minutes_ago(5))));
        let app = router(admin.clone(), Arc::new(RecordingMessenger::default()));

        let response = app
            .oneshot(post_json(
                "/",
                request(json!({
                    "instances": ["orders-db"],
                    "threshold": {"orders-db": "None"}
                })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(admin.targets("insert_backup"), vec!["orders-db".to_string()]);
        assert_eq!(
            json_body(response).await["report"]["backups_initiated"],
            json!(["orders-db"])
        );
    }

    #[tokio::test]
    async fn test_keys_route_missing_project() {
        let app = router(
            Arc::new(FakeAdmin::default()),
            Arc::new(RecordingMessenger::default()),
        );
        let mut body = request(json!({"exclude": []}));
        body.as_object_mut().unwrap().remove("projectID");

        let response = app.oneshot(post_json("/keys", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Please provide projectID"})
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = router(
            Arc::new(FakeAdmin::default()),
            Arc::new(RecordingMessenger::default()),
        );

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/keys")
                    .body(Body::from("threshold=5"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let app = router(
            Arc::new(FakeAdmin::default()),
            Arc::new(RecordingMessenger::default()),
        );

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
