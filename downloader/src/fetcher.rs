/// Concurrent retrieval of cover variants.
///
/// One task per variant. A variant whose retrieval fails in any way is
/// logged and dropped; it never fails the stage as a whole.
use std::fmt::Display;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use coverfetch_shared::{FetchError, FetchResult, Locators, Payload};

use crate::concurrency_limit;

/// Retrieves variant payloads over HTTP.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    /// Caps in-flight requests when set.
    limit: Option<Arc<Semaphore>>,
}

impl Fetcher {
    /// Create a fetcher with unbounded fan-out.
    pub fn new(client: Client) -> Self {
        Self { client, limit: None }
    }

    /// Limit how many requests run at once. `None` removes the limit.
    pub fn with_max_concurrent(mut self, max_concurrent: Option<usize>) -> Self {
        self.limit = concurrency_limit(max_concurrent);
        self
    }

    /// Fetch every locator concurrently.
    ///
    /// Returns only the variants that responded `200 OK` and whose body was
    /// read completely. Waits for every spawned retrieval before returning.
    pub async fn fetch<K>(&self, locators: &Locators<K>) -> FetchResult<K>
    where
        K: Ord + Clone + Display + Send + 'static,
    {
        // Spawning into the set registers each task before any of them is awaited.
        let mut tasks = JoinSet::new();
        for (key, url) in locators {
            let client = self.client.clone();
            let limit = self.limit.clone();
            let key = key.clone();
            let url = url.clone();
            tasks.spawn(async move {
                let _permit = match limit {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let outcome = fetch_one(&client, &url).await;
                (key, url, outcome)
            });
        }

        let mut payloads = FetchResult::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, url, Ok(payload))) => {
                    let len = payload.as_bytes().len();
                    debug!("Fetched {} cover ({} bytes) from {}", key, len, url);
                    payloads.insert(key, payload);
                }
                Ok((key, url, Err(e))) => {
                    warn!("Dropping {} cover from {}: {}", key, url, e);
                }
                Err(e) => {
                    warn!("Fetch task did not complete: {}", e);
                }
            }
        }

        info!("Fetched {}/{} covers", payloads.len(), locators.len());
        payloads
    }
}

/// Retrieve a single resource.
async fn fetch_one(client: &Client, url: &str) -> Result<Payload, FetchError> {
    let response = client.get(url).send().await.map_err(FetchError::Transport)?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status(status));
    }

    let body = response.bytes().await.map_err(FetchError::Body)?;
    Ok(Payload::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverfetch_shared::ImageSize;
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

    async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_empty_locators() {
        let fetcher = Fetcher::new(Client::new());
        let locators: Locators<ImageSize> = Locators::new();
        assert!(fetcher.fetch(&locators).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_variant_is_dropped() {
        let server = MockServer::start().await;
        mount(&server, "/small", ResponseTemplate::new(200).set_body_bytes(PNG)).await;
        mount(&server, "/large", ResponseTemplate::new(404)).await;

        let mut locators = Locators::new();
        locators.insert(ImageSize::Small, format!("{}/small", server.uri()));
        locators.insert(ImageSize::Large, format!("{}/large", server.uri()));

        let fetched = Fetcher::new(Client::new()).fetch(&locators).await;
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[&ImageSize::Small].as_bytes(), PNG);
        assert!(!fetched.contains_key(&ImageSize::Large));
    }

    #[tokio::test]
    async fn test_only_ok_status_counts() {
        let server = MockServer::start().await;
        mount(&server, "/created", ResponseTemplate::new(201).set_body_bytes(PNG)).await;
        mount(&server, "/error", ResponseTemplate::new(500).set_body_bytes(PNG)).await;

        let mut locators = Locators::new();
        locators.insert(ImageSize::Default, format!("{}/created", server.uri()));
        locators.insert(ImageSize::XLarge, format!("{}/error", server.uri()));

        let fetched = Fetcher::new(Client::new()).fetch(&locators).await;
        assert!(fetched.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_is_dropped() {
        let server = MockServer::start().await;
        mount(&server, "/ok", ResponseTemplate::new(200).set_body_bytes(PNG)).await;

        let mut locators = Locators::new();
        locators.insert(ImageSize::Small, format!("{}/ok", server.uri()));
        // Nothing listens on port 1.
        locators.insert(ImageSize::Large, "http://127.0.0.1:1/unreachable".to_string());

        let fetched = Fetcher::new(Client::new()).fetch(&locators).await;
        assert_eq!(fetched.keys().copied().collect::<Vec<_>>(), vec![ImageSize::Small]);
    }

    #[tokio::test]
    async fn test_bounded_fan_out_fetches_everything() {
        let server = MockServer::start().await;
        for size in ImageSize::ALL {
            mount(
                &server,
                &format!("/{}", size),
                ResponseTemplate::new(200).set_body_bytes(size.as_str().as_bytes()),
            )
            .await;
        }

        let locators: Locators<ImageSize> = ImageSize::ALL
            .into_iter()
            .map(|size| (size, format!("{}/{}", server.uri(), size)))
            .collect();

        for limit in [Some(0), Some(1), Some(2)] {
            let fetcher = Fetcher::new(Client::new()).with_max_concurrent(limit);
            let fetched = fetcher.fetch(&locators).await;
            assert_eq!(fetched.len(), ImageSize::ALL.len());
            assert_eq!(fetched[&ImageSize::XLarge].as_bytes(), b"xlarge");
        }
    }

    /// Serve one response that promises more body than it sends, then hang up.
    async fn truncated_body_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort")
                .await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/cover", addr)
    }

    #[tokio::test]
    async fn test_truncated_body_is_dropped() {
        let server = MockServer::start().await;
        mount(&server, "/ok", ResponseTemplate::new(200).set_body_bytes(PNG)).await;

        let mut locators = Locators::new();
        locators.insert(ImageSize::Small, format!("{}/ok", server.uri()));
        locators.insert(ImageSize::Large, truncated_body_server().await);

        let fetched = Fetcher::new(Client::new()).fetch(&locators).await;
        assert_eq!(fetched.keys().copied().collect::<Vec<_>>(), vec![ImageSize::Small]);
        assert_eq!(fetched[&ImageSize::Small].as_bytes(), PNG);
    }

    #[tokio::test]
    async fn test_variants_are_fetched_concurrently() {
        let delay = Duration::from_millis(500);
        let server = MockServer::start().await;
        for size in ImageSize::ALL {
            mount(
                &server,
                &format!("/{}", size),
                ResponseTemplate::new(200).set_body_bytes(PNG).set_delay(delay),
            )
            .await;
        }

        let locators: Locators<ImageSize> = ImageSize::ALL
            .into_iter()
            .map(|size| (size, format!("{}/{}", server.uri(), size)))
            .collect();

        let started = Instant::now();
        let fetched = Fetcher::new(Client::new()).fetch(&locators).await;
        let elapsed = started.elapsed();

        assert_eq!(fetched.len(), ImageSize::ALL.len());
        // Sequential fetching would take at least four delays.
        assert!(elapsed < delay * 2, "fetch took {:?}", elapsed);
    }
}
