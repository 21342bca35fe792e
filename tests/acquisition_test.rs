use image_labeler::{cache_key, Acquisition, ImageCache};
use reqwest::StatusCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_cached_file_skips_network() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cat.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let cache = ImageCache::new(dir.path())?;
    let url = format!("{}/cat.jpg", server.uri());
    std::fs::write(cache.path_for(&url), b"stale")?;

    let acquisition = cache.acquire(&url).await?;
    assert_eq!(acquisition, Acquisition::Cached(cache.path_for(&url)));
    assert_eq!(std::fs::read(cache.path_for(&url))?, b"stale");
    Ok(())
}

#[tokio::test]
async fn test_ok_response_is_written() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    let body: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    Mock::given(method("GET"))
        .and(path("/dog.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let cache = ImageCache::new(dir.path())?;
    let url = format!("{}/dog.jpg", server.uri());

    let acquisition = cache.acquire(&url).await?;
    let expected = dir.path().join(format!("{}.jpg", cache_key(&url)));
    assert_eq!(acquisition, Acquisition::Downloaded(expected.clone()));
    assert_eq!(std::fs::read(&expected)?, body);

    // Second call is served from disk; the mock expects exactly one request.
    assert_eq!(cache.acquire(&url).await?, Acquisition::Cached(expected));

    // Only the final file is left behind, no partial downloads.
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_non_ok_response_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.jpg"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/moved.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let cache = ImageCache::new(dir.path())?;

    let url = format!("{}/missing.jpg", server.uri());
    let acquisition = cache.acquire(&url).await?;
    assert_eq!(acquisition, Acquisition::Failed { status: StatusCode::NOT_FOUND });
    assert!(acquisition.path().is_none());
    assert!(!cache.path_for(&url).exists());

    let url = format!("{}/moved.jpg", server.uri());
    assert!(cache.acquire(&url).await?.is_failed());

    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_host_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let cache = ImageCache::new(dir.path())?;
    let result = cache.acquire("http://127.0.0.1:9/nothing.jpg").await;
    assert!(result.is_err());
    Ok(())
}
