use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use stackmaker::server::router;
use stackmaker::StackConfig;
use tower::ServiceExt;

#[tokio::test]
async fn preflight_allows_any_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/create-teams")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .expect("request");

    let response = router(StackConfig::default())
        .oneshot(request)
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn greeting_is_served_through_the_router() {
    let request = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .expect("request");

    let response = router(StackConfig::default())
        .oneshot(request)
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    assert_eq!(&body[..], b"\"FFG StackMaker\"");
}

#[tokio::test]
async fn create_teams_posts_reach_the_assigner() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/create-teams")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"players":[{"name":"a","rank":3,"role1":"Top"},{"name":"b","rank":2,"role1":"Mid"}],"roles":["Top","Mid"]}"#,
        ))
        .expect("request");

    let response = router(StackConfig::default())
        .oneshot(request)
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(payload["teams"][0]["members"].as_array().map(Vec::len), Some(2));
}
