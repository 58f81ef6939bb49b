//! Backend port (the five operations the controller consumes) and the HTTP
//! implementation that talks to `imagegen-daemon`.

use async_trait::async_trait;
use imagegen_proto::protocol::{
    routes, ApiError, GenerateRequest, GenerationOptions, GenerationResult, ImageData,
    ImagePathRequest, LogEntry, ReadinessStatus, SavedImage,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{BackendError, Result};

/// Backend operations.  Every call may fail with a transport error that is
/// distinct from the application-level flags inside the responses.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn check_environment(&self) -> Result<ReadinessStatus>;

    /// Next queued backend log line, or `None` when nothing is pending.
    async fn get_install_log(&self) -> Result<Option<LogEntry>>;

    async fn generate_image(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResult>;

    /// Encoded image payload for `image_path`.
    async fn get_image_data(&self, image_path: &str) -> Result<String>;

    /// Copy `image_path` to the desktop; returns the destination path.
    async fn save_image_to_desktop(&self, image_path: &str) -> Result<String>;
}

/// JSON-over-HTTP client for the daemon.
///
/// No request timeout is configured: generation can legitimately run for
/// many minutes and the client waits for it.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T> {
        let resp = self
            .client
            .get(self.url(route))
            .send()
            .await
            .map_err(|source| BackendError::Network {
                context: format!("GET {}", route),
                source,
            })?;
        decode(route, resp).await
    }

    async fn post_json<B, T>(&self, route: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let resp = self
            .client
            .post(self.url(route))
            .json(body)
            .send()
            .await
            .map_err(|source| BackendError::Network {
                context: format!("POST {}", route),
                source,
            })?;
        decode(route, resp).await
    }
}

async fn decode<T: DeserializeOwned>(route: &str, resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await.map_err(|source| BackendError::Network {
        context: format!("reading {}", route),
        source,
    })?;
    trace!("{} -> {} ({} bytes)", route, status, body.len());

    if !status.is_success() {
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| body.trim().to_string());
        debug!("{} failed with HTTP {}: {}", route, status, message);
        return Err(BackendError::Http {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| BackendError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn check_environment(&self) -> Result<ReadinessStatus> {
        self.get_json(routes::ENVIRONMENT).await
    }

    async fn get_install_log(&self) -> Result<Option<LogEntry>> {
        let entry: LogEntry = self.get_json(routes::INSTALL_LOG).await?;
        Ok((!entry.is_empty()).then_some(entry))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResult> {
        let body = GenerateRequest {
            prompt: prompt.to_string(),
            options: options.clone(),
        };
        self.post_json(routes::GENERATE, &body).await
    }

    async fn get_image_data(&self, image_path: &str) -> Result<String> {
        let body = ImagePathRequest {
            image_path: image_path.to_string(),
        };
        let data: ImageData = self.post_json(routes::IMAGE_DATA, &body).await?;
        Ok(data.data)
    }

    async fn save_image_to_desktop(&self, image_path: &str) -> Result<String> {
        let body = ImagePathRequest {
            image_path: image_path.to_string(),
        };
        let saved: SavedImage = self.post_json(routes::IMAGE_SAVE, &body).await?;
        Ok(saved.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = HttpBackend::new("http://127.0.0.1:8765/");
        assert_eq!(backend.base_url(), "http://127.0.0.1:8765");
        assert_eq!(
            backend.url(routes::ENVIRONMENT),
            "http://127.0.0.1:8765/api/environment"
        );
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_transport_error() {
        // Grab a free port, then release it so nothing is listening there.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let backend = HttpBackend::new(format!("http://127.0.0.1:{}", port));
        let err = backend.check_environment().await.unwrap_err();
        assert!(matches!(err, BackendError::Network { .. }));
        assert!(err.to_string().starts_with("GET /api/environment"));
    }
}
