pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::enhancement::handlers;
use crate::state::AppState;

/// Headroom for multipart boundaries and headers on top of the CV itself.
const MULTIPART_OVERHEAD_BYTES: usize = 16 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_cv_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/languages", get(handlers::handle_languages))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/input",
            patch(handlers::handle_update_input),
        )
        .route(
            "/api/v1/sessions/:id/cv",
            post(handlers::handle_upload_cv).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/sessions/:id/submit", post(handlers::handle_submit))
        .route(
            "/api/v1/sessions/:id/settled",
            get(handlers::handle_settled),
        )
        .route(
            "/api/v1/sessions/:id/comparison",
            get(handlers::handle_comparison),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::enhancement::generator::{CvGenerator, GenerationError};
    use crate::enhancement::language::Language;
    use crate::enhancement::orchestrator::Orchestrator;
    use crate::enhancement::registry::SessionRegistry;
    use crate::llm_client::LlmError;

    /// Echoes its inputs so tests can see what reached the generator.
    struct EchoGenerator;

    #[async_trait]
    impl CvGenerator for EchoGenerator {
        async fn generate(
            &self,
            original_cv: &str,
            job_title: &str,
            position: &str,
            language: Language,
        ) -> Result<String, GenerationError> {
            Ok(format!("[{language}] {position} {job_title}: {original_cv}"))
        }
    }

    struct BrokenGenerator;

    #[async_trait]
    impl CvGenerator for BrokenGenerator {
        async fn generate(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: Language,
        ) -> Result<String, GenerationError> {
            Err(LlmError::Api {
                status: 401,
                message: "invalid x-api-key".to_string(),
            }
            .into())
        }
    }

    /// Answers after a delay long enough for a client to give up first.
    struct SlowGenerator;

    #[async_trait]
    impl CvGenerator for SlowGenerator {
        async fn generate(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: Language,
        ) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("Enhanced CV text".to_string())
        }
    }

    struct PanickingGenerator;

    #[async_trait]
    impl CvGenerator for PanickingGenerator {
        async fn generate(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: Language,
        ) -> Result<String, GenerationError> {
            panic!("generator blew up");
        }
    }

    fn test_router(generator: Arc<dyn CvGenerator>) -> Router {
        build_router(AppState {
            sessions: SessionRegistry::default(),
            orchestrator: Orchestrator::new(generator),
            config: Config {
                anthropic_api_key: "test-key".to_string(),
                port: 0,
                rust_log: "info".to_string(),
                max_cv_bytes: 64,
                session_idle_ttl: Duration::from_secs(3600),
            },
        })
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        router.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_session(router: &Router, body: Option<Value>) -> String {
        let response = send(router, Method::POST, "/api/v1/sessions", body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["id"].as_str().unwrap().to_string()
    }

    fn multipart_request(uri: &str, file_name: &str, content: &[u8]) -> Request<Body> {
        let boundary = "cvtailorboundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let router = test_router(Arc::new(EchoGenerator));
        let response = send(&router, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 0);
    }

    #[tokio::test]
    async fn test_languages_lists_closed_set() {
        let router = test_router(Arc::new(EchoGenerator));
        let response = send(&router, Method::GET, "/api/v1/languages", None).await;
        assert_eq!(
            json_body(response).await,
            json!([
                {"tag": "en", "name": "English"},
                {"tag": "it", "name": "Italian"}
            ])
        );
    }

    #[tokio::test]
    async fn test_new_session_starts_idle() {
        let router = test_router(Arc::new(EchoGenerator));
        let id = create_session(&router, None).await;

        let response = send(&router, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        let body = json_body(response).await;
        assert_eq!(body["status"], "idle");
        assert_eq!(body["language"], "en");
        assert_eq!(body["is_loading"], false);
        assert_eq!(body["error"], Value::Null);
        assert_eq!(body["result"], "");
    }

    #[tokio::test]
    async fn test_full_submission_flow() {
        let router = test_router(Arc::new(EchoGenerator));
        let id = create_session(&router, Some(json!({"language": "it"}))).await;

        let response = send(
            &router,
            Method::PATCH,
            &format!("/api/v1/sessions/{id}/input"),
            Some(json!({
                "original_cv": "John Doe, 5 years experience",
                "job_title": "Backend Engineer",
                "position": "Senior"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &router,
            Method::POST,
            &format!("/api/v1/sessions/{id}/submit"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["is_loading"], false);
        assert_eq!(body["error"], Value::Null);
        assert_eq!(
            body["result"],
            "[it] Senior Backend Engineer: John Doe, 5 years experience"
        );

        let response = send(
            &router,
            Method::GET,
            &format!("/api/v1/sessions/{id}/comparison"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["original_cv"], "John Doe, 5 years experience");
        assert_eq!(body["language"], "it");
    }

    #[tokio::test]
    async fn test_submit_with_missing_fields_is_bad_request() {
        let router = test_router(Arc::new(EchoGenerator));
        let id = create_session(&router, Some(json!({"job_title": "X", "position": "Y"}))).await;

        let response = send(
            &router,
            Method::POST,
            &format!("/api/v1/sessions/{id}/submit"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(
            body["error"]["message"],
            "Please fill in all fields and provide your CV."
        );

        let response = send(&router, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        let body = json_body(response).await;
        assert_eq!(
            body["error"],
            "Please fill in all fields and provide your CV."
        );
        assert_eq!(body["status"], "idle");
    }

    #[tokio::test]
    async fn test_generation_failure_hides_cause() {
        let router = test_router(Arc::new(BrokenGenerator));
        let id = create_session(
            &router,
            Some(json!({"original_cv": "cv", "job_title": "X", "position": "Y"})),
        )
        .await;

        let response = send(
            &router,
            Method::POST,
            &format!("/api/v1/sessions/{id}/submit"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(
            body["error"]["message"],
            "An error occurred while enhancing your CV. Please try again."
        );
        assert!(!body.to_string().contains("x-api-key"));

        let response = send(
            &router,
            Method::GET,
            &format!("/api/v1/sessions/{id}/comparison"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_detached_submit_then_settled() {
        let router = test_router(Arc::new(EchoGenerator));
        let id = create_session(
            &router,
            Some(json!({"original_cv": "cv", "job_title": "SRE", "position": "Lead"})),
        )
        .await;

        let response = send(
            &router,
            Method::POST,
            &format!("/api/v1/sessions/{id}/submit?detach=true"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert_eq!(body["is_loading"], true);
        assert_eq!(body["status"], "pending");

        let response = send(
            &router,
            Method::GET,
            &format!("/api/v1/sessions/{id}/settled?timeout_secs=5"),
            None,
        )
        .await;
        let body = json_body(response).await;
        assert_eq!(body["is_loading"], false);
        assert_eq!(body["status"], "success");
        assert_eq!(body["result"], "[en] Lead SRE: cv");
    }

    #[tokio::test]
    async fn test_client_disconnect_does_not_cancel_submission() {
        let router = test_router(Arc::new(SlowGenerator));
        let id = create_session(
            &router,
            Some(json!({
                "original_cv": "John Doe, 5 years experience",
                "job_title": "Backend Engineer",
                "position": "Senior"
            })),
        )
        .await;

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/sessions/{id}/submit"))
            .body(Body::empty())
            .unwrap();
        let gave_up =
            tokio::time::timeout(Duration::from_millis(50), router.clone().oneshot(request)).await;
        assert!(gave_up.is_err(), "client must give up before the generator answers");

        let response = send(
            &router,
            Method::GET,
            &format!("/api/v1/sessions/{id}/settled?timeout_secs=5"),
            None,
        )
        .await;
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["is_loading"], false);
        assert_eq!(body["error"], Value::Null);
        assert_eq!(body["result"], "Enhanced CV text");
    }

    #[tokio::test]
    async fn test_panicking_generator_reports_generic_failure() {
        let router = test_router(Arc::new(PanickingGenerator));
        let id = create_session(
            &router,
            Some(json!({"original_cv": "cv", "job_title": "X", "position": "Y"})),
        )
        .await;

        let response = send(
            &router,
            Method::POST,
            &format!("/api/v1/sessions/{id}/submit"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["code"], "GENERATION_ERROR");

        let response = send(&router, Method::GET, &format!("/api/v1/sessions/{id}"), None).await;
        let body = json_body(response).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["is_loading"], false);
    }

    #[tokio::test]
    async fn test_detached_submit_validates_synchronously() {
        let router = test_router(Arc::new(EchoGenerator));
        let id = create_session(&router, None).await;

        let response = send(
            &router,
            Method::POST,
            &format!("/api/v1/sessions/{id}/submit?detach=true"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_patch_rejects_unknown_language() {
        let router = test_router(Arc::new(EchoGenerator));
        let id = create_session(&router, None).await;

        let response = send(
            &router,
            Method::PATCH,
            &format!("/api/v1/sessions/{id}/input"),
            Some(json!({"language": "fr"})),
        )
        .await;
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let router = test_router(Arc::new(EchoGenerator));
        let uri = format!("/api/v1/sessions/{}", uuid::Uuid::new_v4());

        let response = send(&router, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");

        let response = send(&router, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let router = test_router(Arc::new(EchoGenerator));
        let id = create_session(&router, None).await;
        let uri = format!("/api/v1/sessions/{id}");

        let response = send(&router, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&router, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_plain_text_cv() {
        let router = test_router(Arc::new(EchoGenerator));
        let id = create_session(&router, None).await;

        let request = multipart_request(
            &format!("/api/v1/sessions/{id}/cv"),
            "cv.txt",
            "Giulia Bianchi\nIngegnere".as_bytes(),
        );
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["original_cv"],
            "Giulia Bianchi\nIngegnere"
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_non_utf8_and_oversized_files() {
        let router = test_router(Arc::new(EchoGenerator));
        let id = create_session(&router, None).await;
        let uri = format!("/api/v1/sessions/{id}/cv");

        let response = router
            .clone()
            .oneshot(multipart_request(&uri, "cv.pdf", &[0xff, 0xfe, 0x00, 0x25]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "PAYLOAD_ERROR");

        let response = router
            .clone()
            .oneshot(multipart_request(&uri, "cv.txt", &[b'a'; 65]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&router, Method::GET, &uri.replace("/cv", ""), None).await;
        assert_eq!(json_body(response).await["original_cv"], "");
    }
}
