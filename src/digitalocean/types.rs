//! Wire types for the DigitalOcean `/v2` volume and action endpoints.

use serde::{Deserialize, Serialize};

use crate::volume::Volume;

#[derive(Debug, Deserialize)]
pub(super) struct VolumeList {
    pub(super) volumes: Vec<WireVolume>,
    #[serde(default)]
    pub(super) links: Links,
}

impl VolumeList {
    /// Whether the listing advertises a further page.
    pub(super) fn has_next_page(&self) -> bool {
        self
            .links
            .pages
            .as_ref()
            .is_some_and(|pages| pages.next.is_some())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct Links {
    #[serde(default)]
    pub(super) pages: Option<PageLinks>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct PageLinks {
    #[serde(default)]
    pub(super) next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireVolume {
    pub(super) id: String,
    pub(super) name: String,
    pub(super) size_gigabytes: u64,
    #[serde(default)]
    pub(super) region: Option<WireRegion>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireRegion {
    pub(super) slug: String,
}

impl WireVolume {
    /// Converts to the domain type, falling back to the queried region when
    /// the payload omits it.
    pub(super) fn into_volume(self, queried_region: &str) -> Volume {
        Volume {
            id: self.id,
            name: self.name,
            region: self
                .region
                .map_or_else(|| queried_region.to_owned(), |region| region.slug),
            size_gb: self.size_gigabytes,
        }
    }
}

/// Body of `POST /v2/volumes/{id}/actions`.
#[derive(Debug, Serialize)]
pub(super) struct ResizeActionRequest<'a> {
    #[serde(rename = "type")]
    pub(super) kind: &'static str,
    pub(super) size_gigabytes: u64,
    pub(super) region: &'a str,
}

/// Response of `POST /v2/volumes/{id}/actions`.
#[derive(Debug, Deserialize)]
pub(super) struct CreatedActionEnvelope {
    pub(super) action: CreatedAction,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatedAction {
    pub(super) id: u64,
    pub(super) status: String,
}

/// Response of `GET /v2/actions/{id}`.
#[derive(Debug, Deserialize)]
pub(super) struct ActionStatusEnvelope {
    pub(super) action: ActionState,
}

#[derive(Debug, Deserialize)]
pub(super) struct ActionState {
    pub(super) status: String,
}
