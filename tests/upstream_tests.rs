mod common;

use actix_web::{test, web, App};
use httpmock::Method::GET;
use httpmock::MockServer;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;

use common::{app_state_with_api, http_client, EchoFetcher};
use manga_page_gateway::error::RetrievalError;
use manga_page_gateway::http_client::FetchError;
use manga_page_gateway::retrieval::{ManifestSource, PageFetcher};
use manga_page_gateway::routes;
use manga_page_gateway::sources::mangadex::MangaDexClient;

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn at_home_body(result: &str) -> Value {
    json!({
        "result": result,
        "baseUrl": "https://node.example/",
        "chapter": {
            "hash": "abc123",
            "data": ["1-a.png", "2-b.png"],
            "dataSaver": ["1-a.jpg"]
        }
    })
}

#[tokio::test]
async fn test_locate_reads_at_home_manifest() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/at-home/server/c1");
            then.status(200).json_body(at_home_body("ok"));
        })
        .await;

    let client = MangaDexClient::new(http_client(), &server.base_url());
    let manifest = client.locate("c1").await.unwrap();

    assert_eq!(manifest.delivery_base_url, "https://node.example");
    assert_eq!(manifest.content_hash, "abc123");
    assert_eq!(manifest.standard_refs, vec!["1-a.png", "2-b.png"]);
    assert_eq!(manifest.reduced_refs, vec!["1-a.jpg"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_locate_is_never_cached() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/at-home/server/c1");
            then.status(200).json_body(at_home_body("ok"));
        })
        .await;

    let client = MangaDexClient::new(http_client(), &server.base_url());
    client.locate("c1").await.unwrap();
    client.locate("c1").await.unwrap();

    mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_locate_404_is_not_found() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/at-home/server/gone");
            then.status(404)
                .json_body(json!({"result": "error", "errors": [{"status": 404}]}));
        })
        .await;

    let client = MangaDexClient::new(http_client(), &server.base_url());
    let err = client.locate("gone").await.unwrap_err();

    assert!(matches!(err, RetrievalError::NotFound(ref id) if id == "gone"));
}

#[tokio::test]
async fn test_locate_upstream_failures_are_unavailable() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/at-home/server/refused");
            then.status(200).json_body(at_home_body("error"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/at-home/server/garbled");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/at-home/server/overloaded");
            then.status(503);
        })
        .await;

    let client = MangaDexClient::new(http_client(), &server.base_url());
    for chapter in ["refused", "garbled", "overloaded"] {
        let err = client.locate(chapter).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable", "{}", chapter);
    }
}

#[tokio::test]
async fn test_search_forwards_query() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/manga")
                .query_param("title", "berserk")
                .query_param("limit", "5");
            then.status(200).json_body(json!({"result": "ok", "data": []}));
        })
        .await;

    let client = MangaDexClient::new(http_client(), &server.base_url());
    let results = client.search_manga("berserk", 5).await.unwrap();

    assert_eq!(results["result"], "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_non_success_is_status_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/data/h/1.png");
            then.status(500);
        })
        .await;

    let err = http_client()
        .fetch(&server.url("/data/h/1.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 500, .. }));
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_fetch_defaults_content_type() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/data/h/1.png");
            then.status(200).body("pixels");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/data-saver/h/1.webp");
            then.status(200).header("content-type", "image/webp").body("small");
        })
        .await;

    let client = http_client();

    let page = client.fetch(&server.url("/data/h/1.png")).await.unwrap();
    assert_eq!(page.content_type, "image/jpeg");
    assert_eq!(&page.body.into_bytes().await.unwrap()[..], b"pixels");

    let page = client.fetch(&server.url("/data-saver/h/1.webp")).await.unwrap();
    assert_eq!(page.content_type, "image/webp");
    assert_eq!(&page.body.into_bytes().await.unwrap()[..], b"small");
}

#[actix_web::test]
async fn test_pages_endpoint_serves_at_home_shape() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/at-home/server/c1");
            then.status(200).json_body(at_home_body("ok"));
        })
        .await;

    let state = app_state_with_api(&server.base_url(), Arc::new(EchoFetcher::default()), None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/chapter/c1/pages").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["result"], "ok");
    assert_eq!(body["baseUrl"], "https://node.example");
    assert_eq!(body["chapter"]["hash"], "abc123");
    assert_eq!(body["chapter"]["dataSaver"], json!(["1-a.jpg"]));
}
