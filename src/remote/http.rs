//! HTTP client for the remote location API.

use futures::future::BoxFuture;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{RemoteError, RemoteResult};
use super::RemoteLocationService;
use crate::location::{ApiMessage, UserLocation, UserLocationTimestamped};

/// Path of the update endpoint, relative to the API base.
const UPDATE_PATH: &str = "locations/update";

/// Path of the remove endpoint, relative to the API base.
const REMOVE_PATH: &str = "locations/remove";

/// JSON-over-HTTP implementation of [`RemoteLocationService`].
///
/// Cloning is cheap: the underlying connection pool is shared.
///
/// # Example
///
/// ```rust,ignore
/// use whereat_core::remote::{HttpLocationService, RemoteLocationService};
///
/// let api = HttpLocationService::new("https://whereat.example.org/api")?;
/// let peers = api.update(payload).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpLocationService {
    client: Client,
    update_url: Url,
    remove_url: Url,
}

impl HttpLocationService {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not a valid `http(s)` URL.
    pub fn new(base_url: &str) -> RemoteResult<Self> {
        Self::with_client(Client::new(), base_url)
    }

    /// Creates a client reusing an existing `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not a valid `http(s)` URL.
    pub fn with_client(client: Client, base_url: &str) -> RemoteResult<Self> {
        let base = Self::validate_base_url(base_url)?;
        Ok(Self {
            client,
            update_url: Self::endpoint(&base, UPDATE_PATH)?,
            remove_url: Self::endpoint(&base, REMOVE_PATH)?,
        })
    }

    /// Validates the base URL and normalizes it to end with a slash, so
    /// endpoint paths join beneath it instead of replacing its last segment.
    fn validate_base_url(base_url: &str) -> RemoteResult<Url> {
        let normalized = format!("{}/", base_url.trim().trim_end_matches('/'));
        let url = Url::parse(&normalized)
            .map_err(|e| RemoteError::InvalidUrl(format!("{base_url}: {e}")))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(RemoteError::InvalidUrl(format!(
                "Unsupported scheme {other}: {base_url}"
            ))),
        }
    }

    fn endpoint(base: &Url, path: &str) -> RemoteResult<Url> {
        base.join(path)
            .map_err(|e| RemoteError::InvalidUrl(format!("{base}{path}: {e}")))
    }

    async fn post_json<B, T>(client: Client, url: Url, body: B) -> RemoteResult<T>
    where
        B: Serialize + Send,
        T: DeserializeOwned,
    {
        log::debug!("POST {url}");
        let response = client.post(url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

impl RemoteLocationService for HttpLocationService {
    fn update(
        &self,
        location: UserLocationTimestamped,
    ) -> BoxFuture<'static, RemoteResult<Vec<UserLocation>>> {
        let client = self.client.clone();
        let url = self.update_url.clone();
        Box::pin(Self::post_json(client, url, location))
    }

    fn remove(&self, location: UserLocation) -> BoxFuture<'static, RemoteResult<ApiMessage>> {
        let client = self.client.clone();
        let url = self.remove_url.clone();
        Box::pin(Self::post_json(client, url, location))
    }
}
