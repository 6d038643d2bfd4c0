//! End-to-end fetch scenarios against a local HTTP fixture.

use digest::Digest;
use epo_download::{CatalogClient, FetchError, FetchOptions, Fetcher};
use epo_telemetry::PipelineMetrics;
use sha1::Sha1;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sha1_hex(data: &[u8]) -> String {
    let digest = Sha1::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn catalog_json(items: &[(i64, &str, usize, &str)]) -> String {
    let items_json: Vec<String> = items
        .iter()
        .map(|(id, name, size, checksum)| {
            format!(
                r#"{{"itemId": {id}, "itemName": "{name}", "fileSize": "{size}", "fileChecksum": "{checksum}"}}"#
            )
        })
        .collect();
    format!(
        r#"{{"id": 3, "name": "Test product", "deliveries": [{{"deliveryId": 1, "items": [{}]}}]}}"#,
        items_json.join(",")
    )
}

async fn mount_item(server: &MockServer, item_id: i64, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/products/3/delivery/1/item/{item_id}/download")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

fn options(concurrency: usize) -> FetchOptions {
    FetchOptions {
        concurrent_downloads: concurrency,
        timeout: Duration::from_secs(5),
        ..FetchOptions::default()
    }
}

/// Three items with valid checksums land on disk and the counters add up.
#[tokio::test]
async fn downloads_all_items() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let bodies: Vec<Vec<u8>> = vec![vec![b'a'; 100], vec![b'b'; 200], vec![b'c'; 300]];
    let items: Vec<(i64, String, usize, String)> = bodies
        .iter()
        .enumerate()
        .map(|(i, body)| {
            (
                i as i64 + 1,
                format!("item{}.zip", i + 1),
                body.len(),
                sha1_hex(body),
            )
        })
        .collect();

    let catalog_items: Vec<(i64, &str, usize, &str)> = items
        .iter()
        .map(|(id, name, size, sum)| (*id, name.as_str(), *size, sum.as_str()))
        .collect();
    Mock::given(method("GET"))
        .and(path("/products/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_json(&catalog_items)))
        .mount(&server)
        .await;
    for (i, body) in bodies.iter().enumerate() {
        mount_item(&server, i as i64 + 1, body.clone()).await;
    }

    let metrics = Arc::new(PipelineMetrics::new());
    let fetcher = Fetcher::new(options(2), Arc::clone(&metrics)).unwrap();
    let catalog = CatalogClient::new(fetcher.http().clone(), &server.uri());
    let descriptors = catalog.fetch_descriptors("3", dir.path()).await.unwrap();
    assert_eq!(descriptors.len(), 3);

    let token = CancellationToken::new();
    let bytes = fetcher.fetch_all(&descriptors, &token).await.unwrap();

    assert_eq!(bytes.iter().sum::<u64>(), 600);
    for (_, name, size, _) in &catalog_items {
        let content = std::fs::read(dir.path().join(name)).unwrap();
        assert_eq!(content.len(), *size);
    }
    assert_eq!(metrics.download.files_total.get(), 3);
    assert_eq!(metrics.download.files_success.get(), 3);
    assert_eq!(metrics.download.files_failed.get(), 0);
    assert_eq!(metrics.download.bytes_total.get(), 600);
}

/// A second run over the same state downloads zero bytes via the skip path.
#[tokio::test]
async fn second_run_skips_valid_files() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let body = vec![b'x'; 150];
    let checksum = sha1_hex(&body);
    Mock::given(method("GET"))
        .and(path("/products/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_json(&[(
            1,
            "only.zip",
            body.len(),
            &checksum,
        )])))
        .mount(&server)
        .await;
    mount_item(&server, 1, body.clone()).await;

    let first_metrics = Arc::new(PipelineMetrics::new());
    let fetcher = Fetcher::new(options(2), Arc::clone(&first_metrics)).unwrap();
    let catalog = CatalogClient::new(fetcher.http().clone(), &server.uri());
    let descriptors = catalog.fetch_descriptors("3", dir.path()).await.unwrap();
    let token = CancellationToken::new();
    fetcher.fetch_all(&descriptors, &token).await.unwrap();
    assert_eq!(first_metrics.download.bytes_total.get(), 150);

    let second_metrics = Arc::new(PipelineMetrics::new());
    let fetcher = Fetcher::new(options(2), Arc::clone(&second_metrics)).unwrap();
    let bytes = fetcher.fetch_all(&descriptors, &token).await.unwrap();

    assert_eq!(bytes, vec![0]);
    assert_eq!(second_metrics.download.files_success.get(), 1);
    assert_eq!(second_metrics.download.bytes_total.get(), 0);
}

/// A stale file on disk fails skip-verify and is silently re-downloaded.
#[tokio::test]
async fn stale_existing_file_is_replaced() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let body = b"fresh content".to_vec();
    let checksum = sha1_hex(&body);
    Mock::given(method("GET"))
        .and(path("/products/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_json(&[(
            1,
            "data.zip",
            body.len(),
            &checksum,
        )])))
        .mount(&server)
        .await;
    mount_item(&server, 1, body.clone()).await;

    std::fs::write(dir.path().join("data.zip"), b"stale").unwrap();

    let metrics = Arc::new(PipelineMetrics::new());
    let fetcher = Fetcher::new(options(1), Arc::clone(&metrics)).unwrap();
    let catalog = CatalogClient::new(fetcher.http().clone(), &server.uri());
    let descriptors = catalog.fetch_descriptors("3", dir.path()).await.unwrap();
    let token = CancellationToken::new();
    fetcher.fetch_all(&descriptors, &token).await.unwrap();

    assert_eq!(std::fs::read(dir.path().join("data.zip")).unwrap(), body);
    assert_eq!(metrics.download.files_success.get(), 1);
    assert_eq!(metrics.download.files_failed.get(), 0);
}

/// Two 500s then a 200: retries succeed and nothing is counted failed.
#[tokio::test]
async fn transient_errors_are_retried() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let body = vec![b'r'; 64];
    let checksum = sha1_hex(&body);
    Mock::given(method("GET"))
        .and(path("/products/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_json(&[(
            1,
            "flaky.zip",
            body.len(),
            &checksum,
        )])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/3/delivery/1/item/1/download"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_item(&server, 1, body.clone()).await;

    let metrics = Arc::new(PipelineMetrics::new());
    let fetcher = Fetcher::new(options(1), Arc::clone(&metrics)).unwrap();
    let catalog = CatalogClient::new(fetcher.http().clone(), &server.uri());
    let descriptors = catalog.fetch_descriptors("3", dir.path()).await.unwrap();
    let token = CancellationToken::new();
    fetcher.fetch_all(&descriptors, &token).await.unwrap();

    assert_eq!(metrics.download.files_success.get(), 1);
    assert_eq!(metrics.download.files_failed.get(), 0);
    assert_eq!(std::fs::read(dir.path().join("flaky.zip")).unwrap(), body);
}

/// Exhausted retries fail the item, count it, and leave no partial file.
#[tokio::test]
async fn persistent_failure_surfaces_after_retries() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/products/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_json(&[(
            1,
            "broken.zip",
            64,
            "0000000000000000000000000000000000000000",
        )])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/3/delivery/1/item/1/download"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let metrics = Arc::new(PipelineMetrics::new());
    let fetcher = Fetcher::new(
        FetchOptions {
            max_retries: 1,
            ..options(1)
        },
        Arc::clone(&metrics),
    )
    .unwrap();
    let catalog = CatalogClient::new(fetcher.http().clone(), &server.uri());
    let descriptors = catalog.fetch_descriptors("3", dir.path()).await.unwrap();
    let token = CancellationToken::new();
    let err = fetcher.fetch_all(&descriptors, &token).await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 503, .. }));
    assert_eq!(metrics.download.files_failed.get(), 1);
    assert!(!dir.path().join("broken.zip").exists());
}

/// With verify_sha1 on, a body that does not match the manifest checksum is
/// rejected and removed.
#[tokio::test]
async fn post_download_verification_rejects_bad_body() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/products/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_json(&[(
            1,
            "tampered.zip",
            32,
            "1111111111111111111111111111111111111111",
        )])))
        .mount(&server)
        .await;
    mount_item(&server, 1, vec![b't'; 32]).await;

    let metrics = Arc::new(PipelineMetrics::new());
    let fetcher = Fetcher::new(
        FetchOptions {
            verify_sha1: true,
            max_retries: 1,
            ..options(1)
        },
        Arc::clone(&metrics),
    )
    .unwrap();
    let catalog = CatalogClient::new(fetcher.http().clone(), &server.uri());
    let descriptors = catalog.fetch_descriptors("3", dir.path()).await.unwrap();
    let token = CancellationToken::new();
    let err = fetcher.fetch_all(&descriptors, &token).await.unwrap_err();

    assert!(matches!(err, FetchError::Checksum { .. }));
    assert!(!dir.path().join("tampered.zip").exists());
}

/// Catalog errors carry the URL and the HTTP status.
#[tokio::test]
async fn catalog_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let catalog = CatalogClient::new(reqwest::Client::new(), &server.uri());
    let err = catalog.fetch_product("3").await.unwrap_err();
    let FetchError::Catalog { url, message } = err else {
        panic!("expected catalog error");
    };
    assert!(url.ends_with("/products/3"));
    assert!(message.contains("404"));
}
