mod admin;
mod auth;
mod utils;

pub use admin::{add_admin_index, add_model_routes};

use crate::{admin::AdminSite, prelude::*};

use axum::{
    http::StatusCode,
    response::Redirect,
    routing::get,
    Router,
};

pub fn add_routes(router: Router<AppState>, site: AdminSite) -> Router<AppState> {
    let router = auth::add_routes(router);
    let router = router.merge(site.into_router());

    return router
        .route("/", get(|| async { Redirect::to("/admin") }))
        .route("/health", get(|| async { StatusCode::NO_CONTENT }));
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{admin::default_site, config};

    use std::sync::Arc;

    use axum::{
        body::Body,
        error_handling::HandleErrorLayer,
        http::{header, Request},
        BoxError,
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::{ServiceBuilder, ServiceExt};
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    const TEST_DATABASE_URL: &str = "postgres://bingo@localhost/bingo_test";

    // The pool never connects unless a handler reaches the database.
    fn test_state() -> AppState {
        let cfg = config::from_lookup(|key: &str| {
            (key == "DATABASE_URL").then(|| TEST_DATABASE_URL.to_string())
        })
        .unwrap();

        AppState {
            cfg: Arc::new(cfg),
            db: PgPoolOptions::new().connect_lazy(TEST_DATABASE_URL).unwrap(),
        }
    }

    fn test_router() -> Router {
        let session_service = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(|_: BoxError| async {
                StatusCode::BAD_REQUEST
            }))
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false));

        add_routes(Router::new(), default_site().unwrap())
            .with_state(test_state())
            .layer(session_service)
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();

        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_check_answers_no_content() {
        let response = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn root_redirects_to_admin() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/admin");
    }

    #[tokio::test]
    async fn anonymous_admin_requests_go_to_login() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/admin/game-sets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/admin/login?next=/admin/game-sets"
        );
    }

    #[tokio::test]
    async fn login_page_carries_a_csrf_token() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/admin/login?next=/admin/squares")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(response).await;
        assert!(body.contains(r#"name="csrf_token""#));
        assert!(body.contains(r#"name="next""#));
        assert!(body.contains("squares"));
    }

    #[tokio::test]
    async fn posts_without_a_csrf_token_are_forbidden() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=host&password=hunter22"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unparseable_keys_are_not_found() {
        for uri in [
            "/admin/squares/abc/change",
            "/admin/game-sets/1.5/delete",
            "/admin/game-instances/12/change",
            "/admin/game-cards/not-a-uuid/delete",
        ] {
            let response = test_router()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn admin_posts_without_a_csrf_token_are_forbidden() {
        for uri in [
            "/admin/game-sets/add",
            "/admin/squares/3/change",
            "/admin/game-cards/67e55044-10b1-426f-9247-bb680e5fe0c8/delete",
            "/admin/logout",
        ] {
            let response = test_router()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(uri)
                        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                        .body(Body::from("csrf_token=forged&name=Office+Bingo"))
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }
}
