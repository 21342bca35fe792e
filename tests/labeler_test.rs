use image_labeler::{BatchLabeler, ImageCache, ImageModel, LabelerError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Scores an "image" by treating its first three bytes as per-label weights.
struct ByteWeightModel {
    labels: Vec<String>,
    calls: AtomicUsize,
}

impl ByteWeightModel {
    fn new() -> Self {
        Self {
            labels: vec!["daisy".into(), "sun flowers".into(), "roses".into()],
            calls: AtomicUsize::new(0),
        }
    }
}

impl ImageModel for ByteWeightModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, image: &[u8]) -> Result<Vec<f32>, LabelerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.len() < 3 {
            return Err(LabelerError::DecodeError("too short".into()));
        }
        let total: f32 = image[..3].iter().map(|&b| b as f32).sum::<f32>().max(1.0);
        Ok(image[..3].iter().map(|&b| b as f32 / total).collect())
    }
}

/// Returns a single score no matter how many labels it declares.
struct OneScoreModel {
    labels: Vec<String>,
}

impl ImageModel for OneScoreModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, _image: &[u8]) -> Result<Vec<f32>, LabelerError> {
        Ok(vec![0.9])
    }
}

async fn serve(server: &MockServer, route: &str, body: &[u8], hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(hits)
        .mount(server)
        .await;
}

fn labeler(dir: &tempfile::TempDir) -> BatchLabeler<ByteWeightModel> {
    let cache = ImageCache::new(dir.path()).unwrap();
    BatchLabeler::new(Arc::new(ByteWeightModel::new()), cache, 4).unwrap()
}

#[tokio::test]
async fn test_batch_returns_one_record_per_url() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    serve(&server, "/a.jpg", &[10, 80, 10], 1).await;
    serve(&server, "/b.jpg", &[70, 20, 10], 1).await;
    serve(&server, "/c.jpg", &[5, 5, 90], 1).await;

    let dir = tempfile::tempdir()?;
    let labeler = labeler(&dir);
    let urls: Vec<String> = ["a", "b", "c"].iter().map(|n| format!("{}/{}.jpg", server.uri(), n)).collect();

    let results = labeler.label_batch(&urls, false).await?;
    assert_eq!(results.len(), 3);
    for (result, url) in results.iter().zip(&urls) {
        assert_eq!(&result.url, url);
        assert_eq!(result.scores.len(), 3);
        let mut labels: Vec<&str> = result.scores.iter().map(|(l, _)| l.as_str()).collect();
        labels.sort();
        assert_eq!(labels, vec!["daisy", "roses", "sun_flowers"]);
        assert!(result.scores.windows(2).all(|w| w[0].1 >= w[1].1));
    }
    assert_eq!(results[0].top().map(|(l, _)| l), Some("sun_flowers"));
    assert_eq!(results[1].top().map(|(l, _)| l), Some("daisy"));
    assert_eq!(results[2].top().map(|(l, _)| l), Some("roses"));
    assert!((results[2].get("roses").unwrap() - 0.9).abs() < 1e-6);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_matches_sequential() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir()?;
    let labeler = labeler(&dir);

    let mut urls = Vec::new();
    for i in 0..12u8 {
        let route = format!("/img{}.png", i);
        serve(&server, &route, &[i, 12 - i, 6], 1).await;
        urls.push(format!("{}{}", server.uri(), route));
    }

    let sequential = labeler.label_batch(&urls, false).await?;
    let concurrent = labeler.label_batch(&urls, true).await?;
    assert_eq!(sequential, concurrent);
    assert_eq!(
        concurrent.iter().map(|r| r.url.clone()).collect::<Vec<_>>(),
        urls
    );
    assert_eq!(labeler.model().calls.load(Ordering::SeqCst), 24);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_urls_download_once() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    serve(&server, "/same.jpg", &[1, 2, 3], 1).await;

    let dir = tempfile::tempdir()?;
    let labeler = labeler(&dir);
    let url = format!("{}/same.jpg", server.uri());

    let results = labeler.label_batch(&[url.as_str(), url.as_str(), url.as_str()], true).await?;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r == &results[0]));
    Ok(())
}

#[tokio::test]
async fn test_failed_acquisition_aborts_batch() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    serve(&server, "/ok.jpg", &[1, 2, 3], 1).await;
    Mock::given(method("GET"))
        .and(path("/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let labeler = labeler(&dir);
    let gone = format!("{}/gone.jpg", server.uri());
    let urls = vec![format!("{}/ok.jpg", server.uri()), gone.clone()];

    match labeler.label_batch(&urls, false).await {
        Err(LabelerError::AcquisitionFailed { url, status }) => {
            assert_eq!(url, gone);
            assert_eq!(status.as_u16(), 404);
        }
        other => panic!("expected AcquisitionFailed, got {:?}", other.map(|r| r.len())),
    }
    assert_eq!(labeler.model().calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_model_error_propagates() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    serve(&server, "/tiny.jpg", &[1], 1).await;

    let dir = tempfile::tempdir()?;
    let labeler = labeler(&dir);
    let result = labeler.label_image(&format!("{}/tiny.jpg", server.uri())).await;
    assert!(matches!(result, Err(LabelerError::DecodeError(_))));
    Ok(())
}

#[tokio::test]
async fn test_label_image_uses_cache() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let labeler = labeler(&dir);
    // Nothing listens here; the pre-seeded cache entry must be used.
    let url = "http://127.0.0.1:9/offline.jpg";
    std::fs::write(labeler.cache().path_for(url), [0u8, 0, 50])?;

    let result = labeler.label_image(url).await?;
    assert_eq!(result.url, url);
    assert_eq!(result.top(), Some(("roses", 1.0)));
    Ok(())
}

#[tokio::test]
async fn test_empty_batch_and_empty_url() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let labeler = labeler(&dir);

    let empty: Vec<String> = Vec::new();
    assert!(labeler.label_batch(&empty, true).await?.is_empty());

    let result = labeler.label_batch(&["  "], false).await;
    assert!(matches!(result, Err(LabelerError::ValidationError(_))));

    let info = labeler.info();
    assert_eq!(info.num_labels, 3);
    assert_eq!(info.pool_size, 4);
    assert_eq!(info.cache_dir, dir.path());
    Ok(())
}

#[test]
fn test_zero_pool_size_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ImageCache::new(dir.path()).unwrap();
    let result = BatchLabeler::new(Arc::new(ByteWeightModel::new()), cache, 0);
    assert!(matches!(result, Err(LabelerError::ValidationError(_))));
}

#[tokio::test]
async fn test_score_count_must_match_labels() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    serve(&server, "/a.jpg", &[1, 2, 3], 1).await;

    let dir = tempfile::tempdir()?;
    let model = OneScoreModel { labels: vec!["a".into(), "b".into(), "c".into()] };
    let labeler = BatchLabeler::new(Arc::new(model), ImageCache::new(dir.path())?, 4)?;

    let result = labeler.label_image(&format!("{}/a.jpg", server.uri())).await;
    assert!(matches!(result, Err(LabelerError::PredictionError(_))));
    Ok(())
}

#[tokio::test]
async fn test_acquisition_respects_pool_size() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    let delay = Duration::from_millis(200);
    let mut urls = Vec::new();
    for i in 0..6 {
        let route = format!("/slow{}.jpg", i);
        Mock::given(method("GET"))
            .and(path(route.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]).set_delay(delay))
            .expect(1)
            .mount(&server)
            .await;
        urls.push(format!("{}{}", server.uri(), route));
    }

    let dir = tempfile::tempdir()?;
    let cache = ImageCache::new(dir.path())?;
    let labeler = BatchLabeler::new(Arc::new(ByteWeightModel::new()), cache, 2)?;

    // Six delayed downloads, at most two in flight: three rounds at minimum.
    let start = Instant::now();
    let results = labeler.label_batch(&urls, true).await?;
    assert_eq!(results.len(), 6);
    assert!(start.elapsed() >= delay * 3, "finished in {:?}", start.elapsed());
    Ok(())
}
