//! Integration tests for the resolver against real HTTP services.
//!
//! Each test spins up Axum servers on random ports that impersonate
//! download services, then drives the production `ReqwestTransport`
//! through the fallback order.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::time::timeout;

use docferry::classify::DocumentReference;
use docferry::error::ResolveError;
use docferry::resolve::{
    EndpointShape, ReqwestTransport, Resolver, ServiceEndpoint,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

const PDF_BODY: &[u8] = b"%PDF-1.7 integration test document";

/// Start an Axum server on a random port, return its base URL.
async fn spawn_service(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

/// A service that answers GET with the document bytes.
async fn spawn_direct_service() -> String {
    let app = Router::new().route("/dl/{id}", get(|| async { PDF_BODY.to_vec() }));
    spawn_service(app).await
}

/// A service that answers every request with a server error.
async fn spawn_broken_service() -> String {
    let app = Router::new().route(
        "/dl/{id}",
        get(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
    );
    spawn_service(app).await
}

/// A service that accepts the connection and then stalls.
async fn spawn_slow_service() -> String {
    let app = Router::new().route(
        "/dl/{id}",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            PDF_BODY.to_vec()
        }),
    );
    spawn_service(app).await
}

fn direct_endpoint(name: &str, base: &str) -> ServiceEndpoint {
    ServiceEndpoint {
        name: name.into(),
        url: format!("{base}/dl/{{id}}"),
        shape: EndpointShape::DirectBinary,
    }
}

fn resolver(endpoints: &[ServiceEndpoint], per_call: Duration) -> Resolver {
    Resolver::new(endpoints, Arc::new(ReqwestTransport), per_call).unwrap()
}

fn reference() -> DocumentReference {
    DocumentReference {
        id: "123456789".into(),
        source_url: "https://www.scribd.com/document/123456789/My-Title".into(),
    }
}

#[tokio::test]
async fn direct_service_serves_document() {
    timeout(TEST_TIMEOUT, async {
        let base = spawn_direct_service().await;
        let resolver = resolver(&[direct_endpoint("direct", &base)], Duration::from_secs(5));

        let doc = resolver.resolve(&reference()).await.unwrap();
        assert_eq!(doc.data, PDF_BODY);
        assert_eq!(doc.source, "direct");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn json_service_round_trip() {
    timeout(TEST_TIMEOUT, async {
        let pdf_base = spawn_direct_service().await;
        let pdf_url = format!("{pdf_base}/dl/123456789");

        let app = Router::new().route(
            "/download",
            post(move || {
                let pdf_url = pdf_url.clone();
                async move {
                    Json(serde_json::json!({
                        "success": true,
                        "pdf_url": pdf_url,
                    }))
                }
            }),
        );
        let api_base = spawn_service(app).await;

        let endpoints = [ServiceEndpoint {
            name: "api".into(),
            url: format!("{api_base}/download"),
            shape: EndpointShape::JsonWrapped {
                url_field: "pdf_url".into(),
            },
        }];
        let resolver = resolver(&endpoints, Duration::from_secs(5));

        let doc = resolver.resolve(&reference()).await.unwrap();
        assert_eq!(doc.data, PDF_BODY);
        assert_eq!(doc.source, "api");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn html_service_with_relative_link() {
    timeout(TEST_TIMEOUT, async {
        let app = Router::new()
            .route(
                "/view/{id}",
                get(|| async {
                    axum::response::Html(
                        r#"<html><body><a href="/files/doc.pdf">Download PDF</a></body></html>"#,
                    )
                }),
            )
            .route("/files/doc.pdf", get(|| async { PDF_BODY.to_vec() }));
        let base = spawn_service(app).await;

        let endpoints = [ServiceEndpoint {
            name: "page".into(),
            url: format!("{base}/view/{{id}}"),
            shape: EndpointShape::HtmlEmbedded {
                link_pattern: r#"href="([^"]+\.pdf)""#.into(),
            },
        }];
        let resolver = resolver(&endpoints, Duration::from_secs(5));

        let doc = resolver.resolve(&reference()).await.unwrap();
        assert_eq!(doc.data, PDF_BODY);
        assert_eq!(doc.source, "page");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn fallback_skips_failing_service() {
    timeout(TEST_TIMEOUT, async {
        let broken = spawn_broken_service().await;
        let good = spawn_direct_service().await;

        let endpoints = [
            direct_endpoint("broken", &broken),
            direct_endpoint("good", &good),
        ];
        let resolver = resolver(&endpoints, Duration::from_secs(5));

        let doc = resolver.resolve(&reference()).await.unwrap();
        assert_eq!(doc.source, "good");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn slow_service_times_out_and_next_succeeds() {
    timeout(TEST_TIMEOUT, async {
        let slow = spawn_slow_service().await;
        let good = spawn_direct_service().await;

        let endpoints = [
            direct_endpoint("slow", &slow),
            direct_endpoint("good", &good),
        ];
        // Tight budget so the stalled attempt aborts quickly.
        let resolver = resolver(&endpoints, Duration::from_millis(300));

        let doc = resolver.resolve(&reference()).await.unwrap();
        assert_eq!(doc.source, "good");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn exhaustion_returns_not_retrievable() {
    timeout(TEST_TIMEOUT, async {
        let broken = spawn_broken_service().await;

        let html_app =
            Router::new().route("/dl/{id}", get(|| async { "<html>not a pdf</html>" }));
        let html = spawn_service(html_app).await;

        let endpoints = [
            direct_endpoint("broken", &broken),
            direct_endpoint("html", &html),
        ];
        let resolver = resolver(&endpoints, Duration::from_secs(5));

        let err = resolver.resolve(&reference()).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotRetrievable { ref id } if id == "123456789"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unreachable_services_classify_as_transport_error() {
    timeout(TEST_TIMEOUT, async {
        // Bind then drop, so the port is very likely unoccupied.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoints = [direct_endpoint(
            "ghost",
            &format!("http://127.0.0.1:{port}"),
        )];
        let resolver = resolver(&endpoints, Duration::from_secs(2));

        let err = resolver.resolve(&reference()).await.unwrap_err();
        assert!(matches!(err, ResolveError::TransportError(_)));
    })
    .await
    .expect("test timed out");
}
