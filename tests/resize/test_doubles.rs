//! Test doubles for resize workflow scenarios.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use volgrow::{ActionId, ActionStatus, CloudError, Volume, VolumeApi, VolumeFuture};

/// Scripted volume API that records every call and replays action statuses.
#[derive(Clone, Debug, Default)]
pub struct ScriptedVolumeApi {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    volume: Option<Volume>,
    statuses: VecDeque<ActionStatus>,
    lookups: u32,
    resize_requests: Vec<u64>,
    status_checks: u32,
}

/// Number of calls made against each endpoint.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CallCounts {
    pub lookups: u32,
    pub resizes: u32,
    pub status_checks: u32,
}

impl CallCounts {
    pub const fn total(self) -> u32 {
        self.lookups + self.resizes + self.status_checks
    }
}

impl ScriptedVolumeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, context: &str) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: {context}: {err}"))
    }

    pub fn set_volume(&self, id: &str, size_gb: u64) {
        self.lock("set_volume").volume = Some(Volume {
            id: id.to_owned(),
            name: String::from("data"),
            region: String::from("nyc1"),
            size_gb,
        });
    }

    pub fn push_statuses(&self, statuses: impl IntoIterator<Item = ActionStatus>) {
        self.lock("push_statuses").statuses.extend(statuses);
    }

    pub fn counts(&self) -> CallCounts {
        let state = self.lock("counts");
        CallCounts {
            lookups: state.lookups,
            resizes: u32::try_from(state.resize_requests.len()).unwrap_or(u32::MAX),
            status_checks: state.status_checks,
        }
    }

    pub fn resize_requests(&self) -> Vec<u64> {
        self.lock("resize_requests").resize_requests.clone()
    }
}

impl VolumeApi for ScriptedVolumeApi {
    type Error = CloudError;

    fn find_volume<'a>(
        &'a self,
        region: &'a str,
        name: &'a str,
    ) -> VolumeFuture<'a, Volume, Self::Error> {
        let mut state = self.lock("find_volume");
        state.lookups += 1;
        let result = state.volume.clone().ok_or_else(|| CloudError::VolumeNotFound {
            name: name.to_owned(),
            region: region.to_owned(),
        });
        Box::pin(async move { result })
    }

    fn resize_volume<'a>(
        &'a self,
        volume: &'a Volume,
        new_size_gb: u64,
    ) -> VolumeFuture<'a, ActionId, Self::Error> {
        let result = volume
            .check_resize_target(new_size_gb)
            .map_err(|source| CloudError::InvalidResize {
                volume_id: volume.id.clone(),
                source,
            });
        if result.is_ok() {
            let mut state = self.lock("resize_volume");
            state.resize_requests.push(new_size_gb);
            if let Some(stored) = state.volume.as_mut() {
                stored.size_gb = new_size_gb;
            }
        }
        Box::pin(async move { result.map(|()| ActionId(36_804_636)) })
    }

    fn action_status<'a>(
        &'a self,
        _action: &'a ActionId,
    ) -> VolumeFuture<'a, ActionStatus, Self::Error> {
        let mut state = self.lock("action_status");
        state.status_checks += 1;
        let status = state
            .statuses
            .pop_front()
            .unwrap_or(ActionStatus::InProgress);
        Box::pin(async move { Ok(status) })
    }
}
