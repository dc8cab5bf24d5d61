//! Where the status display gets its occupancy snapshots from.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};

use crate::{
    error::{ParkError, Result},
    slots::{OccupancyMap, SlotId},
    state_service::StateService,
};

/// Display sync's view of the state service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn fetch(&self) -> Result<OccupancyMap>;
}

/// Polls a remote state service over `GET /data`.
pub struct HttpStateSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpStateSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, e: reqwest::Error) -> ParkError {
        if e.is_timeout() {
            ParkError::Timeout(self.timeout)
        } else if e.is_decode() {
            ParkError::MalformedResponse(e.to_string())
        } else {
            ParkError::Unreachable(format!("{}: {e}", self.url))
        }
    }
}

#[async_trait]
impl StateSource for HttpStateSource {
    async fn fetch(&self) -> Result<OccupancyMap> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ParkError::MalformedResponse(format!(
                "unexpected status {status} from {}",
                self.url
            )));
        }

        let body = response
            .json::<Map<String, Value>>()
            .await
            .map_err(|e| self.classify(e))?;
        let state = boolean_entries(body);
        debug!("Fetched {} slots from {}", state.len(), self.url);

        Ok(state)
    }
}

/// Keeps the boolean entries of a `/data` body.
///
/// Other keys may carry anything; whether every configured slot is present
/// is checked by the display.
fn boolean_entries(body: Map<String, Value>) -> OccupancyMap {
    body.into_iter()
        .filter_map(|(key, value)| match value.as_bool() {
            Some(occupied) => Some((SlotId::from(key), occupied)),
            None => {
                debug!("Skipping non-boolean key '{key}'");
                None
            }
        })
        .collect()
}

/// Reads the state service in-process when display and server share a daemon.
pub struct LocalStateSource {
    service: Arc<StateService>,
    timeout: Duration,
}

impl LocalStateSource {
    pub fn new(service: Arc<StateService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }
}

#[async_trait]
impl StateSource for LocalStateSource {
    async fn fetch(&self) -> Result<OccupancyMap> {
        tokio::time::timeout(self.timeout, self.service.fetch_state())
            .await
            .map_err(|_| ParkError::Timeout(self.timeout))?
    }
}
