//! DigitalOcean implementation of the volume API.
//!
//! Three endpoints are used: the region-filtered volume listing (followed
//! page by page), the volume actions endpoint for resize requests, and the
//! action lookup used while polling. Every request carries the API token as a bearer credential.

mod error;
mod types;

use std::fmt;
use std::time::Duration;

use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::ResizeConfig;
use crate::volume::{ActionId, ActionStatus, Volume, VolumeApi, VolumeFuture};
use types::{ActionStatusEnvelope, CreatedActionEnvelope, ResizeActionRequest, VolumeList};

pub use error::CloudError;

/// Production API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com";

/// Volumes requested per listing page; the API maximum.
const VOLUME_PAGE_SIZE: u32 = 200;

/// Default per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Volume API client for DigitalOcean Block Storage.
#[derive(Clone)]
pub struct DigitalOceanClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for DigitalOceanClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitalOceanClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl DigitalOceanClient {
    /// Constructs a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::Config`] when the configuration fails validation
    /// or the HTTP client cannot be built.
    pub fn new(config: &ResizeConfig) -> Result<Self, CloudError> {
        config
            .validate()
            .map_err(|err| CloudError::Config(err.to_string()))?;
        Self::with_endpoint(&config.api_url, &config.api_token, config.http_timeout())
    }

    /// Constructs a client against an explicit endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::Config`] when the HTTP client cannot be built.
    pub fn with_endpoint(
        base_url: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, CloudError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("volgrow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| CloudError::Config(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CloudError> {
        let transport = |err: reqwest::Error| CloudError::Transport {
            url: url.to_owned(),
            message: err.to_string(),
        };

        let response = request
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        debug!(url, status = status.as_u16(), "API response");

        if !status.is_success() {
            return Err(CloudError::Remote {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        serde_json::from_slice(&body).map_err(|err| CloudError::MalformedResponse {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
            message: err.to_string(),
        })
    }

    async fn list_matching(&self, region: &str, name: &str) -> Result<Volume, CloudError> {
        let url = self.endpoint("/v2/volumes");
        let page_size = VOLUME_PAGE_SIZE.to_string();
        let mut matches: Vec<Volume> = Vec::new();
        let mut page: u32 = 1;
        loop {
            let page_number = page.to_string();
            let query = [
                ("region", region),
                ("per_page", page_size.as_str()),
                ("page", page_number.as_str()),
            ];
            let list: VolumeList = self.send(&url, self.http.get(&url).query(&query)).await?;
            let more = list.has_next_page() && !list.volumes.is_empty();
            matches.extend(
                list
                    .volumes
                    .into_iter()
                    .filter(|volume| volume.name == name)
                    .map(|volume| volume.into_volume(region)),
            );
            if !more {
                break;
            }
            page = page.saturating_add(1);
            debug!(page, "fetching next volume page");
        }

        if matches.len() > 1 {
            return Err(CloudError::AmbiguousVolume {
                name: name.to_owned(),
                region: region.to_owned(),
                count: matches.len(),
            });
        }

        matches.pop().ok_or_else(|| CloudError::VolumeNotFound {
            name: name.to_owned(),
            region: region.to_owned(),
        })
    }

    async fn request_resize(
        &self,
        volume: &Volume,
        new_size_gb: u64,
    ) -> Result<ActionId, CloudError> {
        volume
            .check_resize_target(new_size_gb)
            .map_err(|source| CloudError::InvalidResize {
                volume_id: volume.id.clone(),
                source,
            })?;

        let url = self.endpoint(&format!("/v2/volumes/{}/actions", volume.id));
        let payload = ResizeActionRequest {
            kind: "resize",
            size_gigabytes: new_size_gb,
            region: &volume.region,
        };
        let envelope: CreatedActionEnvelope =
            self.send(&url, self.http.post(&url).json(&payload)).await?;
        info!(
            action_id = envelope.action.id,
            status = %envelope.action.status,
            "resize action created"
        );
        Ok(ActionId(envelope.action.id))
    }

    async fn fetch_action(&self, action: ActionId) -> Result<ActionStatus, CloudError> {
        let url = self.endpoint(&format!("/v2/actions/{action}"));
        let envelope: ActionStatusEnvelope = self.send(&url, self.http.get(&url)).await?;
        Ok(ActionStatus::from(envelope.action.status.as_str()))
    }
}

impl VolumeApi for DigitalOceanClient {
    type Error = CloudError;

    fn find_volume<'a>(
        &'a self,
        region: &'a str,
        name: &'a str,
    ) -> VolumeFuture<'a, Volume, Self::Error> {
        Box::pin(self.list_matching(region, name))
    }

    fn resize_volume<'a>(
        &'a self,
        volume: &'a Volume,
        new_size_gb: u64,
    ) -> VolumeFuture<'a, ActionId, Self::Error> {
        Box::pin(self.request_resize(volume, new_size_gb))
    }

    fn action_status<'a>(
        &'a self,
        action: &'a ActionId,
    ) -> VolumeFuture<'a, ActionStatus, Self::Error> {
        Box::pin(self.fetch_action(*action))
    }
}
